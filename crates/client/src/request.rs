//! Raw requests and responses
//!
//! Typed operations on [`crate::DomainClient`] cover the documented request
//! shapes. Negative scenarios that need to break those shapes (wrong parameter
//! names, missing fields, no content type, forged tokens) build an
//! [`ApiRequest`] by hand and send it through the same timeout wrapper.

use std::time::Duration;

use apiprobe_common::schema::{self, Schema};
use apiprobe_common::{ApiMessage, Error, Result};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// Sent verbatim, with the given content type if any
    Raw {
        content_type: Option<String>,
        text: String,
    },
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            bearer: None,
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    /// Attach `Authorization: Bearer ..` when a token is given
    pub fn bearer(mut self, token: Option<&str>) -> Self {
        self.bearer = token.map(str::to_string);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn raw(mut self, content_type: Option<&str>, text: impl Into<String>) -> Self {
        self.body = RequestBody::Raw {
            content_type: content_type.map(str::to_string),
            text: text.into(),
        };
        self
    }

    /// Short label for logs and error messages
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Status and body of an answered request
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
    pub content_type: Option<String>,
    pub elapsed: Duration,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map_or(false, |ct| ct.starts_with("application/json"))
    }

    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Check the body against a schema, then decode it
    pub fn validate<T: DeserializeOwned>(&self, schema: &Schema) -> Result<T> {
        let value = self.json()?;
        schema::validate(schema, &value).map_err(Error::from)
    }

    /// Remote error body, if the response carries one
    pub fn message(&self) -> Option<ApiMessage> {
        ApiMessage::parse(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let req = ApiRequest::delete("/BookStore/v1/Books")
            .query("UserId", "u-1")
            .bearer(Some("t"))
            .raw(None, "{}");
        assert_eq!(req.label(), "DELETE /BookStore/v1/Books");
        assert_eq!(req.query, vec![("UserId".to_string(), "u-1".to_string())]);
        assert_eq!(req.bearer.as_deref(), Some("t"));
        assert!(matches!(req.body, RequestBody::Raw { content_type: None, .. }));

        let anonymous = ApiRequest::get("/x").bearer(None);
        assert!(anonymous.bearer.is_none());
    }

    #[test]
    fn test_response_helpers() {
        let resp = ApiResponse {
            status: 200,
            body: r#"{"code":"1207","message":"User Id not correct!"}"#.to_string(),
            content_type: Some("application/json; charset=utf-8".to_string()),
            elapsed: Duration::from_millis(3),
        };
        assert!(resp.is_success());
        assert!(resp.is_json());
        assert_eq!(resp.message().map(|m| m.code), Some("1207".to_string()));

        let err = resp
            .validate::<Value>(apiprobe_common::schema::book())
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
