//! Bearer-token auth: in-memory user store, bcrypt password hashes, signed
//! JWTs. Gates streaming only; nothing here survives a restart.

use crate::error::ApiError;
use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

const TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    username: String,
    exp: u64,
}

/// The authenticated principal a verified token resolves to.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
}

pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn new(secret: &str) -> Self {
        TokenKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user_id: &str, username: &str) -> Result<String, ApiError> {
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            exp: jsonwebtoken::get_current_timestamp() + TOKEN_TTL_SECS,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(e.into()))
    }

    pub fn verify(&self, token: &str) -> Result<AuthUser, ApiError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| AuthUser {
                user_id: data.claims.sub,
                username: data.claims.username,
            })
            .map_err(|_| ApiError::InvalidToken)
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Resolves the caller from the Authorization header. 401 when absent,
/// 403 when verification fails.
pub fn require_user(keys: &TokenKeys, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::MissingToken)?;
    keys.verify(token)
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    password_hash: String,
}

/// In-memory users keyed by username.
#[derive(Default)]
pub struct UserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl UserStore {
    pub fn new() -> Self {
        UserStore::default()
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<UserRecord, ApiError> {
        let mut users = self.users.write().await;
        if users.contains_key(username) {
            return Err(ApiError::Validation("username already taken".to_string()));
        }
        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| ApiError::Internal(e.into()))?;
        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_hash,
        };
        users.insert(username.to_string(), record.clone());
        Ok(record)
    }

    pub async fn verify(&self, username: &str, password: &str) -> Result<UserRecord, ApiError> {
        let users = self.users.read().await;
        let record = users.get(username).ok_or(ApiError::InvalidCredentials)?;
        if bcrypt::verify(password, &record.password_hash).unwrap_or(false) {
            Ok(record.clone())
        } else {
            Err(ApiError::InvalidCredentials)
        }
    }

    pub async fn clear(&self) {
        self.users.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_and_verify_round_trip() {
        let keys = TokenKeys::new("test-secret");
        let token = keys.issue("uid-1", "alice").unwrap();
        let user = keys.verify(&token).unwrap();
        assert_eq!(user.user_id, "uid-1");
        assert_eq!(user.username, "alice");
    }

    #[test]
    fn verify_rejects_foreign_signature() {
        let keys = TokenKeys::new("secret-a");
        let token = keys.issue("uid-1", "alice").unwrap();
        let other = TokenKeys::new("secret-b");
        assert!(matches!(
            other.verify(&token),
            Err(ApiError::InvalidToken)
        ));
    }

    #[test]
    fn bearer_token_requires_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn register_rejects_duplicates_and_login_checks_password() {
        let store = UserStore::new();
        store.register("alice", "hunter2").await.unwrap();
        assert!(matches!(
            store.register("alice", "other").await,
            Err(ApiError::Validation(_))
        ));
        assert!(store.verify("alice", "hunter2").await.is_ok());
        assert!(matches!(
            store.verify("alice", "wrong").await,
            Err(ApiError::InvalidCredentials)
        ));
        assert!(matches!(
            store.verify("bob", "hunter2").await,
            Err(ApiError::InvalidCredentials)
        ));
    }
}
