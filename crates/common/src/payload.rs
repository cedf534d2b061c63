//! Test input generation
//!
//! Valid identities are unique per process (timestamp, random suffix and a
//! process-wide sequence); everything else is a fixed, ordered catalog.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::Credentials;

/// Default size of `large_payload`
pub const DEFAULT_LARGE_PAYLOAD_SIZE: usize = 10_000;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Category of a generated input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadClass {
    Valid,
    Empty,
    Oversized,
    SqlInjection,
    Xss,
    Unicode,
    SpecialCharacters,
    NullLike,
    NumericEdge,
    BooleanLike,
}

impl PayloadClass {
    pub const ALL: [PayloadClass; 10] = [
        PayloadClass::Valid,
        PayloadClass::Empty,
        PayloadClass::Oversized,
        PayloadClass::SqlInjection,
        PayloadClass::Xss,
        PayloadClass::Unicode,
        PayloadClass::SpecialCharacters,
        PayloadClass::NullLike,
        PayloadClass::NumericEdge,
        PayloadClass::BooleanLike,
    ];

    /// Whether a well-behaved API must refuse this input as an identity
    pub fn is_hostile(&self) -> bool {
        matches!(
            self,
            PayloadClass::SqlInjection | PayloadClass::Xss | PayloadClass::Oversized
        )
    }
}

impl std::fmt::Display for PayloadClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PayloadClass::Valid => "valid",
            PayloadClass::Empty => "empty",
            PayloadClass::Oversized => "oversized",
            PayloadClass::SqlInjection => "sql-injection",
            PayloadClass::Xss => "xss",
            PayloadClass::Unicode => "unicode",
            PayloadClass::SpecialCharacters => "special-characters",
            PayloadClass::NullLike => "null-like",
            PayloadClass::NumericEdge => "numeric-edge",
            PayloadClass::BooleanLike => "boolean-like",
        };
        write!(f, "{}", name)
    }
}

/// A generated value that may not be a string.
///
/// `Absent` means the field is left out of the request body entirely.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Null,
    Absent,
}

impl PayloadValue {
    /// JSON form of the value, `None` for `Absent`.
    ///
    /// JSON has no NaN or infinities, so those go out as their textual spelling.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        use serde_json::Value;

        match self {
            PayloadValue::Text(s) => Some(Value::String(s.clone())),
            PayloadValue::Number(n) => Some(number_to_json(*n)),
            PayloadValue::Bool(b) => Some(Value::Bool(*b)),
            PayloadValue::Null => Some(Value::Null),
            PayloadValue::Absent => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PayloadValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    use serde_json::Value;

    if n.is_nan() {
        return Value::String("NaN".to_string());
    }
    if n.is_infinite() {
        let spelling = if n > 0.0 { "Infinity" } else { "-Infinity" };
        return Value::String(spelling.to_string());
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A catalog entry tagged with its class
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub class: PayloadClass,
    pub value: PayloadValue,
}

impl Payload {
    fn text(class: PayloadClass, value: impl Into<String>) -> Self {
        Self {
            class,
            value: PayloadValue::Text(value.into()),
        }
    }

    fn of(class: PayloadClass, value: PayloadValue) -> Self {
        Self { class, value }
    }
}

// ============================================================================
// Unique identities
// ============================================================================

/// Uniform selection from `[A-Za-z0-9]`
pub fn random_string(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

fn unix_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// `testuser_<millis>_<5 alnum><seq>`
pub fn valid_username() -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("testuser_{}_{}{}", unix_millis(), random_string(5), seq)
}

/// Satisfies the remote policy: upper, lower, digit, symbol, length ≥ 8
pub fn valid_password() -> String {
    format!("TestPass123!{}", unix_millis())
}

pub fn unique_credentials() -> Credentials {
    Credentials::new(valid_username(), valid_password())
}

// ============================================================================
// Fixed catalogs
// ============================================================================

pub fn sql_injection_payloads() -> &'static [&'static str] {
    &[
        "'; DROP TABLE users; --",
        "' OR '1'='1",
        "' OR 1=1 --",
        "' UNION SELECT * FROM users --",
        "admin'--",
        "admin' #",
        "admin'/*",
        "' or 1=1#",
        "' or 1=1--",
        "') or '1'='1--",
        "') or ('1'='1--",
    ]
}

pub fn xss_payloads() -> &'static [&'static str] {
    &[
        "<script>alert('XSS')</script>",
        "<img src=x onerror=alert('XSS')>",
        "javascript:alert('XSS')",
        "<svg onload=alert('XSS')>",
        "<iframe src=javascript:alert('XSS')></iframe>",
        "<body onload=alert('XSS')>",
        "<input onfocus=alert('XSS') autofocus>",
        "<select onfocus=alert('XSS') autofocus>",
        "<textarea onfocus=alert('XSS') autofocus>",
        "<keygen onfocus=alert('XSS') autofocus>",
    ]
}

pub fn large_payload(size: usize) -> String {
    "A".repeat(size)
}

pub fn unicode_payload() -> &'static str {
    "测试用户名αβγδεζηθικλμνξοπρστυφχψω🚀🎉💻🔥"
}

pub fn special_characters_payload() -> &'static str {
    "!@#$%^&*()_+-=[]{}|;':,.<>?/~`"
}

pub fn null_payloads() -> Vec<PayloadValue> {
    vec![
        PayloadValue::Null,
        PayloadValue::Absent,
        PayloadValue::Text("null".to_string()),
        PayloadValue::Text("undefined".to_string()),
        PayloadValue::Text("NULL".to_string()),
        PayloadValue::Text("UNDEFINED".to_string()),
    ]
}

pub fn boolean_payloads() -> Vec<PayloadValue> {
    vec![
        PayloadValue::Bool(true),
        PayloadValue::Bool(false),
        PayloadValue::Text("true".to_string()),
        PayloadValue::Text("false".to_string()),
        PayloadValue::Text("TRUE".to_string()),
        PayloadValue::Text("FALSE".to_string()),
        PayloadValue::Number(1.0),
        PayloadValue::Number(0.0),
    ]
}

pub fn numeric_payloads() -> Vec<PayloadValue> {
    vec![
        PayloadValue::Number(0.0),
        PayloadValue::Number(-1.0),
        PayloadValue::Number(1.0),
        PayloadValue::Number(1e30),
        PayloadValue::Number(-1e30),
        PayloadValue::Number(3.14159),
        PayloadValue::Number(-3.14159),
        PayloadValue::Number(MAX_SAFE_INTEGER),
        PayloadValue::Number(-MAX_SAFE_INTEGER),
        PayloadValue::Number(f64::INFINITY),
        PayloadValue::Number(f64::NEG_INFINITY),
        PayloadValue::Number(f64::NAN),
    ]
}

pub fn invalid_usernames() -> Vec<String> {
    vec![
        String::new(),
        "a".to_string(),
        "ab".to_string(),
        "user with spaces".to_string(),
        "user@domain.com".to_string(),
        "1234567890".repeat(12),
        "user#test".to_string(),
        "user$test".to_string(),
    ]
}

pub fn invalid_passwords() -> &'static [&'static str] {
    &[
        "",
        "123",
        "password",
        "PASSWORD",
        "12345678",
        "Password",
        "Password123",
        "password123!",
        "PASSWORD123!",
    ]
}

/// ISBNs present in the public catalog
pub fn test_book_isbns() -> &'static [&'static str] {
    &[
        "9781449325862",
        "9781449331818",
        "9781449337711",
        "9781449365035",
        "9781491904244",
        "9781491950296",
        "9781593275846",
        "9781593277574",
    ]
}

pub fn invalid_isbns() -> &'static [&'static str] {
    &[
        "",
        "123",
        "12345678901234567890",
        "invalid-isbn",
        "978-1-449-32586-2",
        // Checksum is not verified remotely, so this one is only "unknown".
        "9781449325863",
        "abcdefghijklm",
        "!@#$%^&*()",
    ]
}

/// Addresses a sign-up form must flag as malformed
pub fn invalid_emails() -> &'static [&'static str] {
    &["abc", "abc@", "abc@c", "abc@a.", "test", "test.@s.com", "test@t"]
}

/// Every catalog entry for a class, in catalog order
pub fn payloads(class: PayloadClass) -> Vec<Payload> {
    match class {
        PayloadClass::Valid => vec![Payload::text(class, valid_username())],
        PayloadClass::Empty => vec![Payload::text(class, "")],
        PayloadClass::Oversized => vec![Payload::text(
            class,
            large_payload(DEFAULT_LARGE_PAYLOAD_SIZE),
        )],
        PayloadClass::SqlInjection => sql_injection_payloads()
            .iter()
            .map(|p| Payload::text(class, *p))
            .collect(),
        PayloadClass::Xss => xss_payloads()
            .iter()
            .map(|p| Payload::text(class, *p))
            .collect(),
        PayloadClass::Unicode => vec![Payload::text(class, unicode_payload())],
        PayloadClass::SpecialCharacters => {
            vec![Payload::text(class, special_characters_payload())]
        }
        PayloadClass::NullLike => null_payloads()
            .into_iter()
            .map(|v| Payload::of(class, v))
            .collect(),
        PayloadClass::NumericEdge => numeric_payloads()
            .into_iter()
            .map(|v| Payload::of(class, v))
            .collect(),
        PayloadClass::BooleanLike => boolean_payloads()
            .into_iter()
            .map(|v| Payload::of(class, v))
            .collect(),
    }
}
