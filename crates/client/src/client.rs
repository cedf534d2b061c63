//! Domain client for the Account and BookStore APIs

use std::time::{Duration, Instant};

use apiprobe_common::config::BookstoreConfig;
use apiprobe_common::{
    AccountView, AddBooksRequest, AddedBooks, AuthToken, Book, BookCollection, CreatedAccount,
    Credentials, Error, Result, UserIsbnRequest,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::contract::{Operation, Outcome};
use crate::request::{ApiRequest, ApiResponse, RequestBody};
use crate::timeout::within;

pub const USER_PATH: &str = "/Account/v1/User";
pub const TOKEN_PATH: &str = "/Account/v1/GenerateToken";
pub const AUTHORIZED_PATH: &str = "/Account/v1/Authorized";
pub const BOOKS_PATH: &str = "/BookStore/v1/Books";
pub const BOOK_PATH: &str = "/BookStore/v1/Book";

/// Typed access to the remote API.
///
/// Each operation sends the documented request shape, waits at most the
/// configured timeout and maps the answer through its status table. The client
/// holds no identity: user ids and tokens are passed per call.
#[derive(Debug, Clone)]
pub struct DomainClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl DomainClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("apiprobe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Transport {
                operation: "client_init".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &BookstoreConfig) -> Result<Self> {
        Self::new(&config.base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Same client with a different per-call bound
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    /// Issue an arbitrary request under the client's timeout
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let label = request.label();
        self.send_as(&label, request).await
    }

    async fn send_as(&self, operation: &str, request: ApiRequest) -> Result<ApiResponse> {
        within(self.timeout, operation, self.execute(operation, request)).await
    }

    async fn execute(&self, operation: &str, request: ApiRequest) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.http.request(request.method.clone(), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Raw { content_type, text } => {
                let builder = match content_type {
                    Some(ct) => builder.header(reqwest::header::CONTENT_TYPE, ct),
                    None => builder,
                };
                builder.body(text)
            }
        };

        let start = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(operation, self.timeout, e))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(operation, self.timeout, e))?;
        let elapsed = start.elapsed();

        debug!(
            "{} {} -> {} ({}ms)",
            request.method,
            request.path,
            status,
            elapsed.as_millis()
        );

        Ok(ApiResponse {
            status,
            body,
            content_type,
            elapsed,
        })
    }

    /// Send, require a success status, return the raw response
    async fn call(&self, op: Operation, subject: &str, request: ApiRequest) -> Result<ApiResponse> {
        let response = self.send_as(op.name(), request).await?;
        match op.classify(response.status) {
            Some(Outcome::Success) => Ok(response),
            _ => Err(op.failure(response.status, subject, &response.body)),
        }
    }

    /// Send, require a success status and a body that decodes into `T`
    async fn call_typed<T: DeserializeOwned>(
        &self,
        op: Operation,
        subject: &str,
        request: ApiRequest,
    ) -> Result<T> {
        let response = self.call(op, subject, request).await?;
        serde_json::from_str(&response.body).map_err(|_| op.violation(response.status, &response.body))
    }

    // Account operations

    pub async fn create_account(&self, credentials: &Credentials) -> Result<CreatedAccount> {
        let request = ApiRequest::post(USER_PATH).json(serde_json::to_value(credentials)?);
        self.call_typed(Operation::CreateAccount, &credentials.user_name, request)
            .await
    }

    /// Token envelope as returned; a `Failed` status is not an error here
    pub async fn issue_token(&self, credentials: &Credentials) -> Result<AuthToken> {
        let request = ApiRequest::post(TOKEN_PATH).json(serde_json::to_value(credentials)?);
        self.call_typed(Operation::IssueToken, &credentials.user_name, request)
            .await
    }

    pub async fn is_authorized(&self, credentials: &Credentials) -> Result<bool> {
        let request = ApiRequest::post(AUTHORIZED_PATH).json(serde_json::to_value(credentials)?);
        self.call_typed(Operation::IsAuthorized, &credentials.user_name, request)
            .await
    }

    pub async fn fetch_account(&self, user_id: &str, token: Option<&str>) -> Result<AccountView> {
        let request = ApiRequest::get(format!("{}/{}", USER_PATH, user_id)).bearer(token);
        self.call_typed(Operation::FetchAccount, user_id, request)
            .await
    }

    /// Delete an account.
    ///
    /// The remote answers 200 with an error body when the id does not match
    /// the token's user, which is reported as `NotFound`.
    pub async fn delete_account(&self, user_id: &str, token: Option<&str>) -> Result<()> {
        let op = Operation::DeleteAccount;
        let request = ApiRequest::delete(format!("{}/{}", USER_PATH, user_id)).bearer(token);
        let response = self.call(op, user_id, request).await?;
        if response.message().is_some() {
            return Err(Error::NotFound {
                kind: op.resource_kind().to_string(),
                id: user_id.to_string(),
                status: response.status,
            });
        }
        Ok(())
    }

    // Catalog operations

    pub async fn list_catalog(&self) -> Result<BookCollection> {
        self.call_typed(Operation::ListCatalog, "", ApiRequest::get(BOOKS_PATH))
            .await
    }

    pub async fn fetch_book(&self, isbn: &str) -> Result<Book> {
        let request = ApiRequest::get(BOOK_PATH).query("ISBN", isbn);
        self.call_typed(Operation::FetchBook, isbn, request).await
    }

    pub async fn add_books<S: AsRef<str>>(
        &self,
        user_id: &str,
        token: Option<&str>,
        isbns: &[S],
    ) -> Result<AddedBooks> {
        let subject = isbns
            .iter()
            .map(|i| i.as_ref())
            .collect::<Vec<_>>()
            .join(",");
        let body = AddBooksRequest::new(user_id, isbns);
        let request = ApiRequest::post(BOOKS_PATH)
            .bearer(token)
            .json(serde_json::to_value(&body)?);
        self.call_typed(Operation::AddBooks, &subject, request).await
    }

    pub async fn remove_book(&self, user_id: &str, token: Option<&str>, isbn: &str) -> Result<()> {
        let body = UserIsbnRequest {
            user_id: user_id.to_string(),
            isbn: isbn.to_string(),
        };
        let request = ApiRequest::delete(BOOK_PATH)
            .bearer(token)
            .json(serde_json::to_value(&body)?);
        self.call(Operation::RemoveBook, isbn, request).await?;
        Ok(())
    }

    pub async fn remove_all_books(&self, user_id: &str, token: Option<&str>) -> Result<()> {
        let request = ApiRequest::delete(BOOKS_PATH)
            .query("UserId", user_id)
            .bearer(token);
        self.call(Operation::RemoveAllBooks, user_id, request).await?;
        Ok(())
    }

    /// Swap `old_isbn` for `new_isbn` in the user's collection
    pub async fn replace_book(
        &self,
        user_id: &str,
        token: Option<&str>,
        old_isbn: &str,
        new_isbn: &str,
    ) -> Result<AccountView> {
        let body = UserIsbnRequest {
            user_id: user_id.to_string(),
            isbn: new_isbn.to_string(),
        };
        let request = ApiRequest::put(format!("{}/{}", BOOKS_PATH, old_isbn))
            .bearer(token)
            .json(serde_json::to_value(&body)?);
        self.call_typed(Operation::ReplaceBook, old_isbn, request)
            .await
    }
}

fn transport_error(operation: &str, limit: Duration, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout {
            operation: operation.to_string(),
            millis: limit.as_millis() as u64,
        }
    } else {
        Error::Transport {
            operation: operation.to_string(),
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = DomainClient::new("http://127.0.0.1:1/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:1");
    }

    #[test]
    fn test_with_timeout_keeps_base_url() {
        let client = DomainClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let short = client.with_timeout(Duration::from_millis(5));
        assert_eq!(short.timeout(), Duration::from_millis(5));
        assert_eq!(short.base_url(), client.base_url());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport() {
        // Port 1 is reserved and nothing listens on it in test environments.
        let client = DomainClient::new("http://127.0.0.1:1", Duration::from_secs(5)).unwrap();
        let err = client.list_catalog().await.unwrap_err();
        assert!(
            matches!(err, Error::Transport { ref operation, .. } if operation == "list_catalog"),
            "unexpected {:?}",
            err
        );
        assert!(err.is_transient());
    }
}
