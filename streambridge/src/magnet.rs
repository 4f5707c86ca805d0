//! Magnet URI ingest. A pure parse/validate step, no network.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MagnetError {
    #[error("invalid magnet link format")]
    InvalidMagnetFormat,
    #[error("magnet link carries no btih info hash")]
    InfoHashMissing,
}

static BTIH_RE: OnceLock<Regex> = OnceLock::new();

fn btih_re() -> &'static Regex {
    BTIH_RE.get_or_init(|| Regex::new(r"xt=urn:btih:([0-9a-fA-F]{40})").unwrap())
}

/// Extracts the canonical info hash from a magnet URI.
///
/// The hash is case-normalized to lowercase; trackers, display names and any
/// other query parameters are ignored.
pub fn ingest(magnet_link: &str) -> Result<String, MagnetError> {
    if !magnet_link.starts_with("magnet:?") {
        return Err(MagnetError::InvalidMagnetFormat);
    }
    match btih_re().captures(magnet_link) {
        Some(caps) => Ok(caps[1].to_lowercase()),
        None => Err(MagnetError::InfoHashMissing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "aabbccddeeff00112233445566778899aabbccdd";

    #[test]
    fn extracts_lowercase_hash() {
        let magnet = format!("magnet:?xt=urn:btih:{}", HASH.to_uppercase());
        assert_eq!(ingest(&magnet).unwrap(), HASH);
    }

    #[test]
    fn ignores_extra_parameters() {
        let magnet = format!(
            "magnet:?xt=urn:btih:{}&dn=Test&tr=udp%3A%2F%2Ftracker.example%3A1337",
            HASH
        );
        assert_eq!(ingest(&magnet).unwrap(), HASH);
    }

    #[test]
    fn accepts_btih_after_other_parameters() {
        let magnet = format!("magnet:?dn=Test&xt=urn:btih:{}", HASH);
        assert_eq!(ingest(&magnet).unwrap(), HASH);
    }

    #[test]
    fn rejects_non_magnet_input() {
        assert_eq!(
            ingest("http://example.com/file.torrent"),
            Err(MagnetError::InvalidMagnetFormat)
        );
        assert_eq!(ingest(""), Err(MagnetError::InvalidMagnetFormat));
    }

    #[test]
    fn rejects_magnet_without_btih() {
        assert_eq!(
            ingest("magnet:?dn=Test&tr=udp%3A%2F%2Ftracker.example%3A1337"),
            Err(MagnetError::InfoHashMissing)
        );
    }

    #[test]
    fn rejects_truncated_hash() {
        assert_eq!(
            ingest("magnet:?xt=urn:btih:aabbccdd"),
            Err(MagnetError::InfoHashMissing)
        );
    }
}
