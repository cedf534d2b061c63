//! Named scenarios and the assertions they share

use apiprobe_common::{body_snippet, Error};
use futures::future::BoxFuture;

use crate::context::{Fixture, ScenarioContext};
use crate::error::{E2eError, E2eResult};

pub type ScenarioFn = for<'a> fn(&'a mut ScenarioContext) -> BoxFuture<'a, E2eResult<()>>;

/// One named check with an expected outcome
#[derive(Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub group: &'static str,
    pub tags: &'static [&'static str],
    pub fixture: Fixture,
    pub run: ScenarioFn,
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("group", &self.group)
            .field("fixture", &self.fixture)
            .finish()
    }
}

impl Scenario {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag)
    }
}

/// Which scenarios a run includes
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub group: Option<String>,
    pub name: Option<String>,
    pub tag: Option<String>,
}

impl Selection {
    pub fn matches(&self, scenario: &Scenario) -> bool {
        self.group.as_deref().map_or(true, |g| scenario.group == g)
            && self.name.as_deref().map_or(true, |n| scenario.name.contains(n))
            && self.tag.as_deref().map_or(true, |t| scenario.has_tag(t))
    }
}

/// Every scenario, account group first
pub fn all() -> Vec<Scenario> {
    let mut scenarios = crate::scenarios::account::scenarios();
    scenarios.extend(crate::scenarios::bookstore::scenarios());
    scenarios
}

pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> E2eResult<()> {
    if condition {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(message()))
    }
}

pub fn ensure_eq<T>(actual: T, expected: T, what: &str) -> E2eResult<()>
where
    T: PartialEq + std::fmt::Debug,
{
    ensure(actual == expected, || {
        format!("{}: expected {:?}, got {:?}", what, expected, actual)
    })
}

/// The call must fail with one of `allowed`; returns the status seen
pub fn expect_rejection<T: std::fmt::Debug>(
    result: apiprobe_common::Result<T>,
    allowed: &[u16],
    what: &str,
) -> E2eResult<u16> {
    match result {
        Ok(value) => Err(E2eError::AssertionFailed(format!(
            "{}: expected one of {:?}, call succeeded with {}",
            what,
            allowed,
            body_snippet(&format!("{:?}", value))
        ))),
        Err(e) => match e.status() {
            Some(status) if allowed.contains(&status) => Ok(status),
            _ => Err(unexpected(what, allowed, e)),
        },
    }
}

fn unexpected(what: &str, allowed: &[u16], e: Error) -> E2eError {
    E2eError::AssertionFailed(format!("{}: expected one of {:?}, got {}", what, allowed, e))
}

/// A raw response must carry one of `allowed`
pub fn expect_status(
    response: &apiprobe_client::ApiResponse,
    allowed: &[u16],
    what: &str,
) -> E2eResult<()> {
    ensure(allowed.contains(&response.status), || {
        format!(
            "{}: expected one of {:?}, got {}: {}",
            what,
            allowed,
            response.status,
            body_snippet(&response.body)
        )
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_scenario_names_are_unique() {
        let scenarios = all();
        let names: HashSet<_> = scenarios.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), scenarios.len());
    }

    #[test]
    fn test_groups_are_known() {
        for s in all() {
            assert!(matches!(s.group, "account" | "bookstore"), "{}", s.name);
        }
    }

    #[test]
    fn test_selection_filters() {
        let scenarios = all();
        let account = Selection {
            group: Some("account".into()),
            ..Selection::default()
        };
        assert!(scenarios.iter().filter(|s| account.matches(s)).all(|s| s.group == "account"));

        let security = Selection {
            tag: Some("security".into()),
            ..Selection::default()
        };
        assert!(scenarios.iter().any(|s| security.matches(s)));
        assert!(scenarios.iter().all(|s| Selection::default().matches(s)));
    }

    #[test]
    fn test_expect_rejection() {
        let err: apiprobe_common::Result<()> = Err(Error::Unauthorized {
            operation: "fetch_account".into(),
            status: 401,
            body: String::new(),
        });
        assert_eq!(expect_rejection(err, &[401, 404], "fetch").unwrap(), 401);

        let ok: apiprobe_common::Result<u8> = Ok(1);
        assert!(expect_rejection(ok, &[400], "create").is_err());

        let timeout: apiprobe_common::Result<()> = Err(Error::Timeout {
            operation: "x".into(),
            millis: 5,
        });
        assert!(expect_rejection(timeout, &[400], "x").is_err());
    }
}
