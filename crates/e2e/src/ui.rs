//! UI runner: executes browser specs and reports them like API scenarios

use std::collections::HashMap;
use std::time::Instant;

use apiprobe_common::config::SaasConfig;
use tracing::{debug, error, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::playwright::{PlaywrightConfig, PlaywrightHandle};
use crate::runner::{CaseResult, SuiteReport};
use crate::spec::TestSpec;

const GROUP: &str = "ui";

pub struct UiRunner {
    playwright: PlaywrightConfig,
    vars: HashMap<String, String>,
}

impl UiRunner {
    /// Point Playwright at the SaaS product and bind its credentials
    pub fn new(mut playwright: PlaywrightConfig, saas: &SaasConfig) -> Self {
        playwright.base_url = saas.base_url.clone();
        Self {
            playwright,
            vars: variables(saas),
        }
    }

    pub fn vars(&self) -> &HashMap<String, String> {
        &self.vars
    }

    /// Run `specs` in order. Without Playwright every spec is skipped.
    pub async fn run(&self, specs: &[TestSpec]) -> E2eResult<SuiteReport> {
        let start = Instant::now();
        info!("Running {} UI spec(s) against {}...", specs.len(), self.playwright.base_url);

        let handle = match PlaywrightHandle::new(self.playwright.clone()).await {
            Ok(handle) => Some(handle),
            Err(E2eError::PlaywrightNotFound) => {
                warn!("{}; skipping UI specs", E2eError::PlaywrightNotFound);
                None
            }
            Err(e) => return Err(e),
        };

        let mut results = Vec::with_capacity(specs.len());
        for spec in specs {
            let result = match &handle {
                None => CaseResult::skipped(&spec.name, GROUP, "playwright not installed"),
                Some(handle) => self.run_spec(handle, spec).await,
            };
            results.push(result);
        }

        let report = SuiteReport::from_results(results, start.elapsed().as_millis() as u64);
        info!(
            "UI Results: {} passed, {} failed, {} skipped ({} ms)",
            report.passed, report.failed, report.skipped, report.duration_ms
        );
        Ok(report)
    }

    async fn run_spec(&self, handle: &PlaywrightHandle, spec: &TestSpec) -> CaseResult {
        let missing = spec.missing_vars(&self.vars);
        if !missing.is_empty() {
            info!("- {} skipped, unset: {}", spec.name, missing.join(", "));
            return CaseResult::skipped(
                &spec.name,
                GROUP,
                format!("unset variables: {}", missing.join(", ")),
            );
        }

        let start = Instant::now();
        debug!("Running UI spec: {}", spec.name);
        let outcome = match spec.bind(&self.vars) {
            Ok(bound) => handle.run_spec(&bound).await,
            Err(e) => Err(e),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(steps) => match steps.iter().find(|s| !s.success) {
                None => {
                    info!("✓ {}::{} ({} ms)", GROUP, spec.name, duration_ms);
                    CaseResult {
                        steps,
                        ..CaseResult::passed(&spec.name, GROUP, duration_ms)
                    }
                }
                Some(failed) => {
                    let err = E2eError::StepFailed {
                        step: failed.name.clone(),
                        reason: failed.error.clone().unwrap_or_else(|| "unknown error".to_string()),
                    };
                    error!("✗ {}::{} - {}", GROUP, spec.name, err);
                    CaseResult {
                        steps,
                        ..CaseResult::failed(&spec.name, GROUP, duration_ms, &err)
                    }
                }
            },
            Err(e) => {
                error!("✗ {}::{} - {}", GROUP, spec.name, e);
                CaseResult::failed(&spec.name, GROUP, duration_ms, &e)
            }
        }
    }
}

/// Variables UI specs may reference
fn variables(saas: &SaasConfig) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    if let Some(user) = &saas.known_user {
        vars.insert("known_email".to_string(), user.email.clone());
        vars.insert("known_password".to_string(), user.password.clone());
    }
    if let Some(user) = &saas.incomplete_user {
        vars.insert("incomplete_email".to_string(), user.email.clone());
        vars.insert("incomplete_password".to_string(), user.password.clone());
    }
    vars.insert(
        "signup_email".to_string(),
        format!("test@work{}.com", chrono::Utc::now().timestamp_millis()),
    );
    vars
}

#[cfg(test)]
mod tests {
    use apiprobe_common::UiCredentials;

    use super::*;
    use crate::pages::SignInPage;

    fn saas(known: bool) -> SaasConfig {
        SaasConfig {
            known_user: known.then(|| UiCredentials {
                email: "qa@work1.com".to_string(),
                password: "Secret#123".to_string(),
            }),
            ..SaasConfig::default()
        }
    }

    #[test]
    fn test_variables_follow_configured_users() {
        let runner = UiRunner::new(PlaywrightConfig::default(), &saas(true));
        assert_eq!(runner.vars()["known_email"], "qa@work1.com");
        assert!(!runner.vars().contains_key("incomplete_email"));
        assert!(runner.vars()["signup_email"].starts_with("test@work"));

        let anonymous = UiRunner::new(PlaywrightConfig::default(), &saas(false));
        assert!(!SignInPage::wrong_password().missing_vars(anonymous.vars()).is_empty());
        assert!(SignInPage::structure().missing_vars(anonymous.vars()).is_empty());
    }

    #[test]
    fn test_base_url_comes_from_saas_config() {
        let config = SaasConfig {
            base_url: "https://staging.example.com".to_string(),
            ..SaasConfig::default()
        };
        let runner = UiRunner::new(PlaywrightConfig::default(), &config);
        assert_eq!(runner.playwright.base_url, "https://staging.example.com");
    }
}
