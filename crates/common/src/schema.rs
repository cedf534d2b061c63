//! Declarative structural contracts for response bodies
//!
//! A [`Schema`] is a tree describing the expected JSON shape. Checking a value
//! walks the whole tree and collects every violation with its path, so a single
//! failed assertion shows everything that is wrong with a payload.

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Expected shape of a JSON value
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    String {
        min_len: Option<usize>,
        allowed: Option<Vec<String>>,
    },
    Number {
        integer: bool,
        minimum: Option<f64>,
    },
    Boolean,
    Null,
    Array {
        items: Box<Schema>,
        min_items: Option<usize>,
    },
    Object {
        fields: Vec<Field>,
    },
    /// The inner schema, or JSON null
    Nullable(Box<Schema>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    pub required: bool,
}

impl Schema {
    pub fn string() -> Self {
        Schema::String {
            min_len: None,
            allowed: None,
        }
    }

    pub fn number() -> Self {
        Schema::Number {
            integer: false,
            minimum: None,
        }
    }

    pub fn integer() -> Self {
        Schema::Number {
            integer: true,
            minimum: None,
        }
    }

    pub fn boolean() -> Self {
        Schema::Boolean
    }

    pub fn null() -> Self {
        Schema::Null
    }

    pub fn array(items: Schema) -> Self {
        Schema::Array {
            items: Box::new(items),
            min_items: None,
        }
    }

    pub fn object() -> Self {
        Schema::Object { fields: Vec::new() }
    }

    pub fn nullable(self) -> Self {
        Schema::Nullable(Box::new(self))
    }

    /// Minimum character count (strings only)
    pub fn min_len(self, n: usize) -> Self {
        match self {
            Schema::String { allowed, .. } => Schema::String {
                min_len: Some(n),
                allowed,
            },
            other => other,
        }
    }

    /// Restrict a string to a fixed set of values
    pub fn one_of(self, values: &[&str]) -> Self {
        match self {
            Schema::String { min_len, .. } => Schema::String {
                min_len,
                allowed: Some(values.iter().map(|v| v.to_string()).collect()),
            },
            other => other,
        }
    }

    /// Inclusive lower bound (numbers only)
    pub fn minimum(self, min: f64) -> Self {
        match self {
            Schema::Number { integer, .. } => Schema::Number {
                integer,
                minimum: Some(min),
            },
            other => other,
        }
    }

    /// Minimum element count (arrays only)
    pub fn min_items(self, n: usize) -> Self {
        match self {
            Schema::Array { items, .. } => Schema::Array {
                items,
                min_items: Some(n),
            },
            other => other,
        }
    }

    pub fn required(self, name: &str, schema: Schema) -> Self {
        self.field(name, schema, true)
    }

    pub fn optional(self, name: &str, schema: Schema) -> Self {
        self.field(name, schema, false)
    }

    fn field(self, name: &str, schema: Schema, required: bool) -> Self {
        match self {
            Schema::Object { mut fields } => {
                fields.push(Field {
                    name: name.to_string(),
                    schema,
                    required,
                });
                Schema::Object { fields }
            }
            other => other,
        }
    }

    /// Check a value, reporting every violation found
    pub fn check(&self, value: &Value) -> Result<(), ValidationError> {
        let mut violations = Vec::new();
        self.walk(value, "", &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations })
        }
    }

    fn walk(&self, value: &Value, path: &str, out: &mut Vec<Violation>) {
        match (self, value) {
            (Schema::Nullable(_), Value::Null) => {}
            (Schema::Nullable(inner), other) => inner.walk(other, path, out),

            (Schema::String { min_len, allowed }, Value::String(s)) => {
                let len = s.chars().count();
                if let Some(min) = min_len {
                    if len < *min {
                        out.push(Violation::new(
                            path,
                            ViolationKind::TooShort { min: *min, actual: len },
                        ));
                    }
                }
                if let Some(allowed) = allowed {
                    if !allowed.iter().any(|a| a == s) {
                        out.push(Violation::new(
                            path,
                            ViolationKind::NotAllowed {
                                value: s.clone(),
                                allowed: allowed.clone(),
                            },
                        ));
                    }
                }
            }

            (Schema::Number { integer, minimum }, Value::Number(n)) => {
                if *integer && !(n.is_i64() || n.is_u64()) {
                    out.push(Violation::new(path, ViolationKind::NotInteger));
                }
                if let (Some(min), Some(actual)) = (minimum, n.as_f64()) {
                    if actual < *min {
                        out.push(Violation::new(
                            path,
                            ViolationKind::BelowMinimum { min: *min, actual },
                        ));
                    }
                }
            }

            (Schema::Boolean, Value::Bool(_)) | (Schema::Null, Value::Null) => {}

            (Schema::Array { items, min_items }, Value::Array(elements)) => {
                if let Some(min) = min_items {
                    if elements.len() < *min {
                        out.push(Violation::new(
                            path,
                            ViolationKind::TooFewItems {
                                min: *min,
                                actual: elements.len(),
                            },
                        ));
                    }
                }
                for (i, element) in elements.iter().enumerate() {
                    items.walk(element, &format!("{}/{}", path, i), out);
                }
            }

            (Schema::Object { fields }, Value::Object(map)) => {
                for field in fields {
                    let field_path = format!("{}/{}", path, field.name);
                    match map.get(&field.name) {
                        Some(v) => field.schema.walk(v, &field_path, out),
                        None if field.required => {
                            out.push(Violation::new(&field_path, ViolationKind::MissingField))
                        }
                        None => {}
                    }
                }
            }

            (expected, actual) => out.push(Violation::new(
                path,
                ViolationKind::WrongType {
                    expected: expected.type_name(),
                    actual: json_type_name(actual),
                },
            )),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Schema::String { .. } => "string",
            Schema::Number { integer: true, .. } => "integer",
            Schema::Number { .. } => "number",
            Schema::Boolean => "boolean",
            Schema::Null => "null",
            Schema::Array { .. } => "array",
            Schema::Object { .. } => "object",
            Schema::Nullable(inner) => inner.type_name(),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check a value and decode it into its typed form
pub fn validate<T: DeserializeOwned>(schema: &Schema, value: &Value) -> Result<T, ValidationError> {
    schema.check(value)?;
    serde_json::from_value(value.clone()).map_err(|e| ValidationError {
        violations: vec![Violation::new("", ViolationKind::Undecodable(e.to_string()))],
    })
}

// ============================================================================
// Violations
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ViolationKind {
    MissingField,
    WrongType {
        expected: &'static str,
        actual: &'static str,
    },
    TooShort {
        min: usize,
        actual: usize,
    },
    BelowMinimum {
        min: f64,
        actual: f64,
    },
    NotInteger,
    TooFewItems {
        min: usize,
        actual: usize,
    },
    NotAllowed {
        value: String,
        allowed: Vec<String>,
    },
    Undecodable(String),
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationKind::MissingField => write!(f, "missing required field"),
            ViolationKind::WrongType { expected, actual } => {
                write!(f, "expected {}, got {}", expected, actual)
            }
            ViolationKind::TooShort { min, actual } => {
                write!(f, "string shorter than {} ({} chars)", min, actual)
            }
            ViolationKind::BelowMinimum { min, actual } => {
                write!(f, "{} is below minimum {}", actual, min)
            }
            ViolationKind::NotInteger => write!(f, "expected an integer"),
            ViolationKind::TooFewItems { min, actual } => {
                write!(f, "expected at least {} items, got {}", min, actual)
            }
            ViolationKind::NotAllowed { value, allowed } => {
                write!(f, "{:?} is not one of {:?}", value, allowed)
            }
            ViolationKind::Undecodable(reason) => write!(f, "cannot decode: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Pointer-style location, `""` for the root
    pub path: String,
    pub kind: ViolationKind,
}

impl Violation {
    fn new(path: &str, kind: ViolationKind) -> Self {
        Self {
            path: path.to_string(),
            kind,
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{}: {}", path, self.kind)
    }
}

/// All violations found while checking one value
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{} violation(s): {}", .violations.len(), join_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn has_violation_at(&self, path: &str) -> bool {
        self.violations.iter().any(|v| v.path == path)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Built-in contracts
// ============================================================================

static BOOK: Lazy<Schema> = Lazy::new(|| {
    Schema::object()
        .required("isbn", Schema::string().min_len(5))
        .required("title", Schema::string())
        .optional("subTitle", Schema::string())
        .required("author", Schema::string())
        .required("publish_date", Schema::string())
        .required("publisher", Schema::string())
        .required("pages", Schema::integer().minimum(0.0))
        .required("description", Schema::string())
        .required("website", Schema::string())
});

static BOOK_LIST: Lazy<Schema> = Lazy::new(|| {
    Schema::object().required("books", Schema::array(BOOK.clone()).min_items(1))
});

static ACCOUNT: Lazy<Schema> = Lazy::new(|| {
    Schema::object()
        .required("userId", Schema::string().min_len(1))
        .required("username", Schema::string().min_len(1))
        .required("books", Schema::array(BOOK.clone()))
});

static CREATED_ACCOUNT: Lazy<Schema> = Lazy::new(|| {
    Schema::object()
        .required("userID", Schema::string().min_len(1))
        .required("username", Schema::string().min_len(1))
        .required("books", Schema::array(BOOK.clone()))
});

static TOKEN_ENVELOPE: Lazy<Schema> = Lazy::new(|| {
    Schema::object()
        .required("token", Schema::string().nullable())
        .required("expires", Schema::string().nullable())
        .required("status", Schema::string().one_of(&["Success", "Failed"]))
        .required("result", Schema::string())
});

static ADDED_BOOKS: Lazy<Schema> = Lazy::new(|| {
    Schema::object().required(
        "books",
        Schema::array(Schema::object().required("isbn", Schema::string().min_len(5))),
    )
});

pub fn book() -> &'static Schema {
    &BOOK
}

/// Catalog listing; must hold at least one book
pub fn book_list() -> &'static Schema {
    &BOOK_LIST
}

pub fn account() -> &'static Schema {
    &ACCOUNT
}

pub fn created_account() -> &'static Schema {
    &CREATED_ACCOUNT
}

pub fn token_envelope() -> &'static Schema {
    &TOKEN_ENVELOPE
}

pub fn added_books() -> &'static Schema {
    &ADDED_BOOKS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuthToken, Book};
    use serde_json::json;
    use test_case::test_case;

    fn sample_book() -> Value {
        json!({
            "isbn": "9781449325862",
            "title": "Git Pocket Guide",
            "subTitle": "A Working Introduction",
            "author": "Richard E. Silverman",
            "publish_date": "2020-06-04T08:48:39.000Z",
            "publisher": "O'Reilly Media",
            "pages": 234,
            "description": "This pocket guide is the perfect on-the-job companion to Git.",
            "website": "http://chimera.labs.oreilly.com/books/1230000000561/index.html"
        })
    }

    #[test]
    fn test_valid_book_decodes() {
        let book: Book = validate(book(), &sample_book()).unwrap();
        assert_eq!(book.pages, 234);
        assert_eq!(book.sub_title.as_deref(), Some("A Working Introduction"));
    }

    #[test]
    fn test_reports_all_violations() {
        let mut value = sample_book();
        value["isbn"] = json!("123");
        value["pages"] = json!(-5);
        value.as_object_mut().unwrap().remove("title");

        let err = book().check(&value).unwrap_err();
        assert_eq!(err.violations.len(), 3);
        assert!(err.has_violation_at("/isbn"));
        assert!(err.has_violation_at("/pages"));
        assert!(err.has_violation_at("/title"));
    }

    #[test_case(json!(234.5), ViolationKind::NotInteger ; "fractional pages")]
    #[test_case(json!("234"), ViolationKind::WrongType { expected: "integer", actual: "string" } ; "string pages")]
    fn test_pages_typing(pages: Value, expected: ViolationKind) {
        let mut value = sample_book();
        value["pages"] = pages;
        let err = book().check(&value).unwrap_err();
        assert_eq!(err.violations[0].kind, expected);
        assert_eq!(err.violations[0].path, "/pages");
    }

    #[test]
    fn test_subtitle_is_optional() {
        let mut value = sample_book();
        value.as_object_mut().unwrap().remove("subTitle");
        assert!(book().check(&value).is_ok());
    }

    #[test]
    fn test_empty_book_list_rejected() {
        let err = book_list().check(&json!({ "books": [] })).unwrap_err();
        assert!(matches!(
            err.violations[0].kind,
            ViolationKind::TooFewItems { min: 1, actual: 0 }
        ));
    }

    #[test]
    fn test_nested_paths() {
        let mut bad = sample_book();
        bad["website"] = json!(null);
        let err = book_list()
            .check(&json!({ "books": [sample_book(), bad] }))
            .unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].path, "/books/1/website");
    }

    #[test]
    fn test_token_envelope_allows_null_token() {
        let value = json!({
            "token": null,
            "expires": null,
            "status": "Failed",
            "result": "User authorization failed."
        });
        let token: AuthToken = validate(token_envelope(), &value).unwrap();
        assert!(!token.is_success());

        let bogus = json!({ "token": null, "expires": null, "status": "Maybe", "result": "" });
        assert!(token_envelope().check(&bogus).is_err());
    }

    #[test]
    fn test_root_type_mismatch() {
        let err = account().check(&json!([1, 2])).unwrap_err();
        assert_eq!(err.violations[0].path, "");
        assert!(err.to_string().contains("expected object, got array"));
    }
}
