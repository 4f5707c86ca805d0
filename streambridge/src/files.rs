//! Main-file selection for multi-file torrents.

use serde::{Deserialize, Serialize};

/// Container extensions considered playable video.
const VIDEO_EXTENSIONS: &[&str] = &[".mkv", ".mp4", ".avi", ".mov", ".webm", ".m4v"];

/// A file entry as reported by the transcoding daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub name: String,
    #[serde(default)]
    pub length: u64,
}

/// Picks the index of the "main" playable video: the largest file whose name
/// matches a known video container extension. Falls back to index 0 when the
/// list is empty or nothing matches.
///
/// Best-effort heuristic; multi-video torrents may resolve to the wrong file.
pub fn select_main_file(files: &[RemoteFile]) -> usize {
    files
        .iter()
        .enumerate()
        .filter(|(_, f)| is_video(&f.name))
        .max_by_key(|(_, f)| f.length)
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn is_video(name: &str) -> bool {
    let lower = name.to_lowercase();
    VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, length: u64) -> RemoteFile {
        RemoteFile {
            name: name.to_string(),
            length,
        }
    }

    #[test]
    fn picks_largest_video() {
        let files = vec![
            file("sample.mkv", 50_000_000),
            file("movie.mkv", 4_000_000_000),
            file("extras.mp4", 700_000_000),
        ];
        assert_eq!(select_main_file(&files), 1);
    }

    #[test]
    fn ignores_non_video_files() {
        let files = vec![
            file("readme.txt", 10_000_000_000),
            file("movie.avi", 900_000_000),
            file("cover.jpg", 2_000_000),
        ];
        assert_eq!(select_main_file(&files), 1);
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let files = vec![file("MOVIE.MP4", 1_000)];
        assert_eq!(select_main_file(&files), 0);
    }

    #[test]
    fn defaults_to_zero_when_no_video_matches() {
        let files = vec![file("a.txt", 1), file("b.nfo", 2)];
        assert_eq!(select_main_file(&files), 0);
    }

    #[test]
    fn defaults_to_zero_for_empty_list() {
        assert_eq!(select_main_file(&[]), 0);
    }
}
