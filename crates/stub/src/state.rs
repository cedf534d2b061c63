//! In-memory accounts, tokens and catalog

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use apiprobe_common::Book;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use tokio::sync::RwLock;

use crate::catalog::seed_catalog;
use crate::error::{StubError, StubResult};

/// Longest username the stub accepts
pub const MAX_USERNAME_LEN: usize = 256;

/// Characters refused in usernames
const FORBIDDEN_USERNAME_CHARS: &[char] = &['<', '>', '\'', '"', ';'];

/// Knobs for exercising client-side timeouts and retries
#[derive(Debug, Clone, Default)]
pub struct StubOptions {
    /// Added before every answer except `/health`
    pub response_delay: Duration,

    /// The first N requests (excluding `/health`) get a 503
    pub transient_failures: u32,
}

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub password: String,
    pub books: Vec<Book>,
    pub token_issued: bool,
}

pub struct StubState {
    pub options: StubOptions,
    pub catalog: Vec<Book>,
    /// Keyed by user id
    pub users: RwLock<HashMap<String, UserRecord>>,
    /// Bearer token to user id
    pub tokens: RwLock<HashMap<String, String>>,
    failures_left: AtomicU32,
}

impl StubState {
    pub fn new(options: StubOptions) -> Self {
        let failures_left = AtomicU32::new(options.transient_failures);
        Self {
            options,
            catalog: seed_catalog(),
            users: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            failures_left,
        }
    }

    pub fn find_book(&self, isbn: &str) -> Option<&Book> {
        self.catalog.iter().find(|b| b.isbn == isbn)
    }

    /// Consume one injected failure, if any remain
    pub fn take_failure(&self) -> bool {
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Resolve the bearer token in `headers` to a user id
    pub async fn authenticate(&self, headers: &HeaderMap) -> StubResult<String> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(StubError::not_authorized)?;

        self.tokens
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or_else(StubError::not_authorized)
    }

    /// Authenticate and require the token to belong to `user_id`
    pub async fn authorize_for(&self, headers: &HeaderMap, user_id: &str) -> StubResult<()> {
        let owner = self.authenticate(headers).await?;
        if owner != user_id {
            return Err(StubError::wrong_user_id());
        }
        Ok(())
    }
}

/// At least eight characters with upper, lower, digit and a non-alphanumeric
pub fn password_is_strong(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(|c| c.is_uppercase())
        && password.chars().any(|c| c.is_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_alphanumeric())
}

pub fn username_is_acceptable(username: &str) -> bool {
    !username.trim().is_empty()
        && username.chars().count() <= MAX_USERNAME_LEN
        && !username.contains(FORBIDDEN_USERNAME_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_policy() {
        assert!(password_is_strong("TestPass123!1700000000000"));
        for weak in apiprobe_common::payload::invalid_passwords() {
            assert!(!password_is_strong(weak), "{:?} accepted", weak);
        }
        assert!(!password_is_strong("abc123"));
    }

    #[test]
    fn test_username_policy() {
        assert!(username_is_acceptable(" John_Ü_1700000000000 "));
        assert!(!username_is_acceptable(""));
        assert!(!username_is_acceptable(&"A".repeat(MAX_USERNAME_LEN + 1)));
        for hostile in apiprobe_common::payload::sql_injection_payloads()
            .iter()
            .chain(apiprobe_common::payload::xss_payloads())
        {
            assert!(!username_is_acceptable(hostile), "{:?} accepted", hostile);
        }
    }

    #[test]
    fn test_injected_failures_run_out() {
        let state = StubState::new(StubOptions {
            transient_failures: 2,
            ..StubOptions::default()
        });
        assert!(state.take_failure());
        assert!(state.take_failure());
        assert!(!state.take_failure());
    }

    #[tokio::test]
    async fn test_authenticate_requires_known_bearer() {
        let state = StubState::new(StubOptions::default());
        state
            .tokens
            .write()
            .await
            .insert("stub.abc".to_string(), "u-1".to_string());

        let mut headers = HeaderMap::new();
        assert!(state.authenticate(&headers).await.is_err());

        headers.insert(AUTHORIZATION, "Bearer invalid.token".parse().unwrap());
        assert!(state.authenticate(&headers).await.is_err());

        headers.insert(AUTHORIZATION, "Bearer stub.abc".parse().unwrap());
        assert_eq!(state.authenticate(&headers).await.unwrap(), "u-1");
        assert!(matches!(
            state.authorize_for(&headers, "u-2").await,
            Err(StubError::Unauthorized { code: "1207", .. })
        ));
    }
}
