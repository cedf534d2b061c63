//! Core types for the Account and BookStore APIs

use serde::{Deserialize, Deserializer, Serialize};

/// Identity used to create an account and obtain a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "userName")]
    pub user_name: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            password: password.into(),
        }
    }
}

/// Payload-level outcome of a token request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
    Success,
    Failed,
}

impl std::fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenStatus::Success => write!(f, "Success"),
            TokenStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Token envelope returned by `GenerateToken`.
///
/// The transport status is 200 even when authorization fails; the logical
/// outcome travels in `status`, so both channels are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub token: Option<String>,
    #[serde(default)]
    pub expires: Option<String>,
    pub status: TokenStatus,
    pub result: String,
}

impl AuthToken {
    pub fn is_success(&self) -> bool {
        self.status == TokenStatus::Success
    }

    /// Bearer value, present only for a successful non-empty token
    pub fn bearer(&self) -> Option<&str> {
        match (&self.status, self.token.as_deref()) {
            (TokenStatus::Success, Some(token)) if !token.is_empty() => Some(token),
            _ => None,
        }
    }
}

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub isbn: String,
    pub title: String,
    #[serde(rename = "subTitle", default, skip_serializing_if = "Option::is_none")]
    pub sub_title: Option<String>,
    pub author: String,
    #[serde(rename = "publish_date", alias = "publishDate")]
    pub publish_date: String,
    pub publisher: String,
    pub pages: u32,
    pub description: String,
    pub website: String,
}

/// Ordered list of books, either the catalog or a user's collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookCollection {
    #[serde(default)]
    pub books: Vec<Book>,
}

impl BookCollection {
    pub fn isbns(&self) -> Vec<&str> {
        self.books.iter().map(|b| b.isbn.as_str()).collect()
    }

    pub fn contains(&self, isbn: &str) -> bool {
        self.books.iter().any(|b| b.isbn == isbn)
    }

    /// Number of entries carrying this ISBN; more than one means duplication
    pub fn count_of(&self, isbn: &str) -> usize {
        self.books.iter().filter(|b| b.isbn == isbn).count()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

/// Reference to a book by ISBN, as used in collection requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsbnRef {
    pub isbn: String,
}

impl IsbnRef {
    pub fn new(isbn: impl Into<String>) -> Self {
        Self { isbn: isbn.into() }
    }
}

/// Response of a successful add-to-collection request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedBooks {
    #[serde(default)]
    pub books: Vec<IsbnRef>,
}

impl AddedBooks {
    pub fn isbns(&self) -> Vec<&str> {
        self.books.iter().map(|b| b.isbn.as_str()).collect()
    }
}

/// Response of a successful account creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedAccount {
    #[serde(rename = "userID", alias = "userId")]
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub books: Vec<Book>,
}

/// Account as seen through an authorized read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    #[serde(rename = "userId", alias = "userID")]
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub books: Vec<Book>,
}

impl AccountView {
    pub fn collection(&self) -> BookCollection {
        BookCollection {
            books: self.books.clone(),
        }
    }
}

/// Body of `POST /BookStore/v1/Books`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddBooksRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "collectionOfIsbns")]
    pub collection_of_isbns: Vec<IsbnRef>,
}

impl AddBooksRequest {
    pub fn new<S: AsRef<str>>(user_id: &str, isbns: &[S]) -> Self {
        Self {
            user_id: user_id.to_string(),
            collection_of_isbns: isbns.iter().map(|i| IsbnRef::new(i.as_ref())).collect(),
        }
    }
}

/// Body of `DELETE /BookStore/v1/Book` and `PUT /BookStore/v1/Books/{isbn}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIsbnRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub isbn: String,
}

/// Error body returned by the remote API (`{"code": "1207", "message": "..."}`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(deserialize_with = "string_or_number")]
    pub code: String,
    pub message: String,
}

impl ApiMessage {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Parse a body as an error message, if it looks like one
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Text(String),
        Number(i64),
    }

    Ok(match Code::deserialize(deserializer)? {
        Code::Text(s) => s,
        Code::Number(n) => n.to_string(),
    })
}

/// Login used against the UI product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiCredentials {
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_use_remote_field_names() {
        let creds = Credentials::new("abc", "TestPass123!");
        let json = serde_json::to_value(&creds).unwrap();
        assert_eq!(json["userName"], "abc");
        assert_eq!(json["password"], "TestPass123!");
    }

    #[test]
    fn test_failed_token_has_no_bearer() {
        let failed: AuthToken = serde_json::from_str(
            r#"{"token":null,"expires":null,"status":"Failed","result":"User authorization failed."}"#,
        )
        .unwrap();
        assert!(!failed.is_success());
        assert_eq!(failed.bearer(), None);

        let ok: AuthToken = serde_json::from_str(
            r#"{"token":"a.b.c","expires":"2030-01-01T00:00:00Z","status":"Success","result":"User authorized successfully."}"#,
        )
        .unwrap();
        assert_eq!(ok.bearer(), Some("a.b.c"));
    }

    #[test]
    fn test_created_account_accepts_both_id_spellings() {
        let upper: CreatedAccount =
            serde_json::from_str(r#"{"userID":"u-1","username":"abc","books":[]}"#).unwrap();
        let lower: CreatedAccount =
            serde_json::from_str(r#"{"userId":"u-1","username":"abc"}"#).unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_collection_counts_duplicates() {
        let book: Book = serde_json::from_value(serde_json::json!({
            "isbn": "9781449325862",
            "title": "Git Pocket Guide",
            "subTitle": "A Working Introduction",
            "author": "Richard E. Silverman",
            "publish_date": "2020-06-04T08:48:39.000Z",
            "publisher": "O'Reilly Media",
            "pages": 234,
            "description": "A guide",
            "website": "http://chimera.labs.oreilly.com/books/1230000000561/index.html"
        }))
        .unwrap();
        let collection = BookCollection {
            books: vec![book.clone(), book],
        };
        assert!(collection.contains("9781449325862"));
        assert_eq!(collection.count_of("9781449325862"), 2);
        assert_eq!(collection.count_of("0000000000000"), 0);
    }

    #[test]
    fn test_api_message_numeric_code() {
        let msg = ApiMessage::parse(r#"{"code":1207,"message":"User not found!"}"#).unwrap();
        assert_eq!(msg.code, "1207");
        assert!(ApiMessage::parse("not json").is_none());
    }
}
