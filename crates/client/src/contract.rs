//! Documented status codes per remote operation
//!
//! Every endpoint's status table lives here as data. The client looks up the
//! answer it got and either decodes the body or turns it into a classified
//! [`Error`]; anything not in the table is a contract violation.

use apiprobe_common::{body_snippet, Error};

/// What a documented status means for the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Rejected,
    Unauthorized,
    NotFound,
    Conflict,
}

/// A remote operation with a fixed request shape and status table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAccount,
    IssueToken,
    IsAuthorized,
    FetchAccount,
    DeleteAccount,
    ListCatalog,
    FetchBook,
    AddBooks,
    RemoveBook,
    RemoveAllBooks,
    ReplaceBook,
}

use Outcome::*;

const CREATE_ACCOUNT: &[(u16, Outcome)] = &[
    (201, Success),
    (400, Rejected),
    (406, Conflict),
    (409, Conflict),
    (415, Rejected),
];
const ISSUE_TOKEN: &[(u16, Outcome)] = &[(200, Success), (400, Rejected)];
const IS_AUTHORIZED: &[(u16, Outcome)] = &[(200, Success), (400, Rejected), (404, NotFound)];
const FETCH_ACCOUNT: &[(u16, Outcome)] = &[
    (200, Success),
    (400, Rejected),
    (401, Unauthorized),
    (404, NotFound),
];
const DELETE_ACCOUNT: &[(u16, Outcome)] = &[
    (200, Success),
    (204, Success),
    (401, Unauthorized),
    (404, NotFound),
];
const LIST_CATALOG: &[(u16, Outcome)] = &[(200, Success)];
const FETCH_BOOK: &[(u16, Outcome)] = &[(200, Success), (400, NotFound), (404, NotFound)];
const ADD_BOOKS: &[(u16, Outcome)] = &[
    (201, Success),
    (400, Rejected),
    (401, Unauthorized),
    (404, NotFound),
    (409, Conflict),
];
const REMOVE_BOOKS: &[(u16, Outcome)] = &[
    (200, Success),
    (204, Success),
    (400, Rejected),
    (401, Unauthorized),
    (404, NotFound),
];
const REPLACE_BOOK: &[(u16, Outcome)] = &[
    (200, Success),
    (400, Rejected),
    (401, Unauthorized),
    (404, NotFound),
];

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateAccount => "create_account",
            Operation::IssueToken => "issue_token",
            Operation::IsAuthorized => "is_authorized",
            Operation::FetchAccount => "fetch_account",
            Operation::DeleteAccount => "delete_account",
            Operation::ListCatalog => "list_catalog",
            Operation::FetchBook => "fetch_book",
            Operation::AddBooks => "add_books",
            Operation::RemoveBook => "remove_book",
            Operation::RemoveAllBooks => "remove_all_books",
            Operation::ReplaceBook => "replace_book",
        }
    }

    /// Kind of resource named in `NotFound` / `Conflict`
    pub fn resource_kind(&self) -> &'static str {
        match self {
            Operation::CreateAccount
            | Operation::IssueToken
            | Operation::IsAuthorized
            | Operation::FetchAccount
            | Operation::DeleteAccount => "user",
            Operation::ListCatalog
            | Operation::FetchBook
            | Operation::AddBooks
            | Operation::RemoveBook
            | Operation::ReplaceBook => "book",
            Operation::RemoveAllBooks => "collection",
        }
    }

    pub fn statuses(&self) -> &'static [(u16, Outcome)] {
        match self {
            Operation::CreateAccount => CREATE_ACCOUNT,
            Operation::IssueToken => ISSUE_TOKEN,
            Operation::IsAuthorized => IS_AUTHORIZED,
            Operation::FetchAccount => FETCH_ACCOUNT,
            Operation::DeleteAccount => DELETE_ACCOUNT,
            Operation::ListCatalog => LIST_CATALOG,
            Operation::FetchBook => FETCH_BOOK,
            Operation::AddBooks => ADD_BOOKS,
            Operation::RemoveBook | Operation::RemoveAllBooks => REMOVE_BOOKS,
            Operation::ReplaceBook => REPLACE_BOOK,
        }
    }

    pub fn documented(&self) -> Vec<u16> {
        self.statuses().iter().map(|(s, _)| *s).collect()
    }

    pub fn classify(&self, status: u16) -> Option<Outcome> {
        self.statuses()
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, outcome)| *outcome)
    }

    /// Build the failure for a non-success answer.
    ///
    /// `subject` is the id the request was about (user id, ISBN) and ends up in
    /// `NotFound` / `Conflict`.
    pub fn failure(&self, status: u16, subject: &str, body: &str) -> Error {
        let operation = self.name().to_string();
        match self.classify(status) {
            Some(Rejected) => Error::Rejected {
                operation,
                status,
                body: body_snippet(body),
            },
            Some(Unauthorized) => Error::Unauthorized {
                operation,
                status,
                body: body_snippet(body),
            },
            Some(NotFound) => Error::NotFound {
                kind: self.resource_kind().to_string(),
                id: subject.to_string(),
                status,
            },
            Some(Conflict) => Error::Conflict {
                kind: self.resource_kind().to_string(),
                id: subject.to_string(),
                status,
            },
            Some(Success) | None => self.violation(status, body),
        }
    }

    /// Undocumented status, or a success body that does not decode
    pub fn violation(&self, status: u16, body: &str) -> Error {
        Error::ContractViolation {
            operation: self.name().to_string(),
            status,
            expected: self.documented(),
            body: body_snippet(body),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Operation::CreateAccount, 201, Some(Success))]
    #[test_case(Operation::CreateAccount, 406, Some(Conflict))]
    #[test_case(Operation::CreateAccount, 415, Some(Rejected))]
    #[test_case(Operation::CreateAccount, 500, None)]
    #[test_case(Operation::FetchBook, 400, Some(NotFound))]
    #[test_case(Operation::DeleteAccount, 204, Some(Success))]
    #[test_case(Operation::ListCatalog, 404, None)]
    #[test_case(Operation::AddBooks, 401, Some(Unauthorized))]
    fn test_classify(op: Operation, status: u16, expected: Option<Outcome>) {
        assert_eq!(op.classify(status), expected);
    }

    #[test]
    fn test_every_operation_has_a_success_status() {
        let all = [
            Operation::CreateAccount,
            Operation::IssueToken,
            Operation::IsAuthorized,
            Operation::FetchAccount,
            Operation::DeleteAccount,
            Operation::ListCatalog,
            Operation::FetchBook,
            Operation::AddBooks,
            Operation::RemoveBook,
            Operation::RemoveAllBooks,
            Operation::ReplaceBook,
        ];
        for op in all {
            assert!(
                op.statuses().iter().any(|(_, o)| *o == Success),
                "{} has no success status",
                op
            );
        }
    }

    #[test]
    fn test_failure_mapping() {
        let err = Operation::FetchBook.failure(400, "123", r#"{"code":"1205"}"#);
        assert!(matches!(err, Error::NotFound { ref id, status: 400, .. } if id == "123"));

        let err = Operation::ListCatalog.failure(502, "", "bad gateway");
        match err {
            Error::ContractViolation {
                status, expected, body, ..
            } => {
                assert_eq!(status, 502);
                assert_eq!(expected, vec![200]);
                assert_eq!(body, "bad gateway");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
