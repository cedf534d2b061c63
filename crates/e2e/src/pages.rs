//! Page objects for the SaaS sign-up and sign-in forms
//!
//! Each page owns its selectors and user-facing messages and turns its flows
//! into [`TestSpec`]s. Credentials are never baked in: flows that need a real
//! account reference `{{known_email}}` style variables and list them in
//! `requires`, so they are skipped when the run has none configured.

use apiprobe_common::payload;

use crate::spec::{AttributeAssertion, TestSpec, TestStep};

const NAVIGATION_TIMEOUT_MS: u64 = 10_000;

/// Sign-up form at `/sign-up`
pub struct SignUpPage;

impl SignUpPage {
    pub const PATH: &'static str = "/sign-up";

    pub const HEADING: &'static str = r#"h2:has-text("Apply for Ramp")"#;
    pub const EMAIL: &'static str = r#"input[type="email"]"#;
    pub const FIRST_NAME: &'static str = "label:First name";
    pub const LAST_NAME: &'static str = "label:Last name";
    /// Found by label so it still matches once the toggle makes it a text input
    pub const PASSWORD: &'static str = "label:Password";
    pub const PASSWORD_TOGGLE: &'static str = r#"button[aria-label*="password" i]"#;
    pub const SUBMIT: &'static str = r#"button[type="submit"], button:has-text("Sign up"), button:has-text("Create account"), button:has-text("Start application")"#;
    pub const ERRORS: &'static str = r#"[role="alert"], .error, .invalid, [aria-invalid="true"]"#;
    pub const RULE_FAILED_ICON: &'static str = ".RyuIconSvg--x-square";
    pub const RULE_PASSED_ICON: &'static str = ".RyuIconSvg--check-square";
    pub const FIRST_NAME_TOOLTIP_ICON: &'static str = ".RyuIconSvg--info >> nth=0";
    pub const LAST_NAME_TOOLTIP_ICON: &'static str = ".RyuIconSvg--info >> nth=1";
    pub const TOOLTIP: &'static str = ".RyuScreenReaderOnly-dlAmnY";
    /// Prefilled e-mail field on the sign-in page after a completed sign-up
    pub const HANDOFF_EMAIL: &'static str = ".RyuInputBaseInputRoot-dNhEFm";

    pub const EMAIL_REQUIRED: &'static str = "Enter an email address";
    pub const FIRST_NAME_REQUIRED: &'static str = "First name is required";
    pub const LAST_NAME_REQUIRED: &'static str = "Last name is required";
    pub const EMAIL_INVALID: &'static str = "Invalid email address";
    pub const FIRST_NAME_HINT: &'static str =
        "Your legal first name as listed on a driver's license, passport, etc";
    pub const LAST_NAME_HINT: &'static str =
        "Your legal last name as listed on a driver's license, passport, etc";

    /// Number of password rules shown under the form
    pub const RULE_COUNT: usize = 5;

    pub const PERSONAL_DOMAINS: &'static [&'static str] = &["outlook.com", "gmail.com"];

    pub const STRONG_PASSWORD: &'static str = "TestPassword123!";
    pub const TOGGLE_PASSWORD: &'static str = "Test@password123";

    fn open() -> TestStep {
        TestStep::Navigate {
            url: Self::PATH.to_string(),
            wait_for_selector: Some(Self::EMAIL.to_string()),
        }
    }

    pub fn personal_email_message(domain: &str) -> String {
        format!("Enter a valid business email (not {})", domain)
    }

    fn fill_form(email: &str, password: &str) -> Vec<TestStep> {
        vec![
            fill(Self::EMAIL, email),
            fill(Self::FIRST_NAME, "John"),
            fill(Self::LAST_NAME, "Doe"),
            fill(Self::PASSWORD, password),
        ]
    }

    pub fn structure() -> TestSpec {
        TestSpec::new("signup-structure", "Heading and every required field are shown")
            .tagged(&["ui", "signup", "smoke"])
            .steps([
                Self::open(),
                visible(Self::HEADING),
                visible(Self::EMAIL),
                visible(Self::FIRST_NAME),
                visible(Self::LAST_NAME),
                visible(Self::PASSWORD),
                visible(Self::SUBMIT),
            ])
    }

    pub fn empty_submit() -> TestSpec {
        TestSpec::new("signup-empty-submit", "Submitting an empty form flags every field")
            .tagged(&["ui", "signup", "validation"])
            .steps([
                Self::open(),
                click(Self::SUBMIT),
                visible(Self::ERRORS),
                text(Self::EMAIL_REQUIRED),
                text(Self::FIRST_NAME_REQUIRED),
                text(Self::LAST_NAME_REQUIRED),
                count(Self::RULE_FAILED_ICON, Self::RULE_COUNT),
            ])
    }

    pub fn malformed_emails() -> TestSpec {
        let mut steps = vec![Self::open()];
        for email in payload::invalid_emails() {
            steps.push(TestStep::Fill {
                selector: Self::EMAIL.to_string(),
                value: email.to_string(),
                clear_first: true,
            });
            steps.push(TestStep::Blur {
                selector: Self::EMAIL.to_string(),
            });
            steps.push(text(Self::EMAIL_INVALID));
        }
        TestSpec::new("signup-malformed-emails", "Malformed e-mail addresses are refused")
            .tagged(&["ui", "signup", "validation"])
            .steps(steps)
    }

    pub fn personal_emails() -> TestSpec {
        let mut steps = vec![Self::open()];
        for domain in Self::PERSONAL_DOMAINS {
            steps.push(TestStep::Fill {
                selector: Self::EMAIL.to_string(),
                value: format!("test@{}", domain),
                clear_first: true,
            });
            steps.push(TestStep::Blur {
                selector: Self::EMAIL.to_string(),
            });
            steps.push(text(&Self::personal_email_message(domain)));
        }
        TestSpec::new("signup-personal-emails", "Free mail domains are not business e-mail")
            .tagged(&["ui", "signup", "validation"])
            .steps(steps)
    }

    pub fn password_rules() -> TestSpec {
        TestSpec::new("signup-password-rules", "A strong password satisfies every rule")
            .tagged(&["ui", "signup", "validation"])
            .steps([
                Self::open(),
                fill(Self::PASSWORD, Self::STRONG_PASSWORD),
                count(Self::RULE_PASSED_ICON, Self::RULE_COUNT),
            ])
    }

    pub fn password_toggle() -> TestSpec {
        TestSpec::new("signup-password-toggle", "The eye toggle reveals and hides the password")
            .tagged(&["ui", "signup"])
            .steps([
                Self::open(),
                TestStep::Type {
                    selector: Self::PASSWORD.to_string(),
                    text: Self::TOGGLE_PASSWORD.to_string(),
                    delay_ms: None,
                },
                input_type(Self::PASSWORD, "password"),
                click(Self::PASSWORD_TOGGLE),
                input_type(Self::PASSWORD, "text"),
                Check {
                    value: Some(Self::TOGGLE_PASSWORD.to_string()),
                    ..Check::default()
                }
                .on(Self::PASSWORD),
                click(Self::PASSWORD_TOGGLE),
                input_type(Self::PASSWORD, "password"),
            ])
    }

    pub fn name_tooltips() -> TestSpec {
        TestSpec::new("signup-name-tooltips", "Name fields explain which name is expected")
            .tagged(&["ui", "signup"])
            .steps([
                Self::open(),
                TestStep::Hover {
                    selector: Self::FIRST_NAME_TOOLTIP_ICON.to_string(),
                },
                contains(Self::TOOLTIP, Self::FIRST_NAME_HINT),
                TestStep::Hover {
                    selector: Self::LAST_NAME_TOOLTIP_ICON.to_string(),
                },
                contains(Self::TOOLTIP, Self::LAST_NAME_HINT),
            ])
    }

    /// Completes a real application; the e-mail comes from `{{signup_email}}`
    pub fn complete_application() -> TestSpec {
        let mut steps = vec![Self::open()];
        steps.extend(Self::fill_form("{{signup_email}}", Self::STRONG_PASSWORD));
        steps.push(count(Self::RULE_PASSED_ICON, Self::RULE_COUNT));
        steps.push(click(Self::SUBMIT));
        steps.push(TestStep::AssertUrl {
            equals: None,
            contains: Some(SignInPage::PATH.to_string()),
            timeout_ms: NAVIGATION_TIMEOUT_MS,
        });
        steps.push(
            Check {
                visible: Some(true),
                enabled: Some(false),
                value: Some("{{signup_email}}".to_string()),
                timeout_ms: Some(NAVIGATION_TIMEOUT_MS),
                ..Check::default()
            }
            .on(Self::HANDOFF_EMAIL),
        );
        TestSpec::new(
            "signup-complete-application",
            "A valid application hands off to sign-in with the e-mail locked",
        )
        .tagged(&["ui", "signup", "mutating"])
        .requiring(&["signup_email"])
        .steps(steps)
    }

    pub fn specs() -> Vec<TestSpec> {
        vec![
            Self::structure(),
            Self::empty_submit(),
            Self::malformed_emails(),
            Self::personal_emails(),
            Self::password_rules(),
            Self::password_toggle(),
            Self::name_tooltips(),
            Self::complete_application(),
        ]
    }
}

/// Sign-in form at `/sign-in`
pub struct SignInPage;

impl SignInPage {
    pub const PATH: &'static str = "/sign-in";
    pub const MFA_PATH: &'static str = "/sign-in/mfa";

    pub const EMAIL: &'static str = r#"input[type="email"], input[name="email"]"#;
    pub const PASSWORD: &'static str = r#"input[type="password"], input[name="password"]"#;
    pub const SUBMIT: &'static str = "data-test-id=sign-in-input-email-submit";
    pub const USE_DIFFERENT_EMAIL: &'static str = "data-test-id=use-a-different-email-link";
    pub const SIGN_UP_LINK: &'static str = "data-test-id=sign-up-link";
    pub const ERRORS: &'static str = r#"[role="alert"], .error, .invalid, .notification"#;
    pub const GOOGLE: &'static str = r#"button:has-text("Sign in with Google")"#;
    pub const EMAIL_LINK: &'static str = r#"button:has-text("Email me a link")"#;
    pub const RESET_LINK: &'static str = "text:Reset password";
    pub const VERIFICATION_CODE: &'static str = r#"input[autocomplete="one-time-code"], input[inputmode="numeric"]"#;
    pub const BACK_TO_LOGIN: &'static str = r#"button:has-text("Back to login")"#;

    pub const VERIFY_ACCOUNT: &'static str = "Verify your account";
    pub const WRONG_PASSWORD: &'static str =
        "We do not recognize this email password combination. Try again or reset your password.";
    pub const BAD_CODE: &'static str = "This verification code is invalid or has expired.";
    pub const FORGOT_PASSWORD: &'static str = "Forgot password?";
    pub const RESET_PROMPT: &'static str =
        "Enter the email associated with your Ramp account to receive a password reset link.";
    pub const RESET_SENT: &'static str = "Reset link sent!";

    pub const WRONG_PASSWORD_INPUT: &'static str = "SenhaIncorreta@123";
    pub const BAD_CODE_INPUT: &'static str = "000000";

    fn open() -> TestStep {
        TestStep::Navigate {
            url: Self::PATH.to_string(),
            wait_for_selector: Some(Self::EMAIL.to_string()),
        }
    }

    /// E-mail first, then the password the form reveals
    fn sign_in(email: &str, password: &str) -> Vec<TestStep> {
        vec![
            fill(Self::EMAIL, email),
            click(Self::SUBMIT),
            fill(Self::PASSWORD, password),
            TestStep::Press {
                selector: Some(Self::PASSWORD.to_string()),
                key: "Enter".to_string(),
            },
        ]
    }

    pub fn reset_message(email: &str) -> String {
        format!(
            "If {} is associated with a Ramp account, we'll send a link and instructions to reset your password.",
            email
        )
    }

    pub fn structure() -> TestSpec {
        TestSpec::new("signin-structure", "E-mail field, submit and sign-up link are shown")
            .tagged(&["ui", "signin", "smoke"])
            .steps([
                Self::open(),
                visible(Self::EMAIL),
                visible(Self::SUBMIT),
                visible(Self::SIGN_UP_LINK),
            ])
    }

    pub fn known_user_needs_verification() -> TestSpec {
        let mut steps = vec![Self::open()];
        steps.extend(Self::sign_in("{{known_email}}", "{{known_password}}"));
        steps.push(text_within(Self::VERIFY_ACCOUNT, NAVIGATION_TIMEOUT_MS));
        TestSpec::new("signin-known-user-mfa", "Valid credentials lead to account verification")
            .tagged(&["ui", "signin"])
            .requiring(&["known_email", "known_password"])
            .steps(steps)
    }

    pub fn wrong_password() -> TestSpec {
        let mut steps = vec![Self::open()];
        steps.extend(Self::sign_in("{{known_email}}", Self::WRONG_PASSWORD_INPUT));
        steps.push(text_within(Self::WRONG_PASSWORD, NAVIGATION_TIMEOUT_MS));
        TestSpec::new("signin-wrong-password", "A wrong password is refused with a hint")
            .tagged(&["ui", "signin", "validation"])
            .requiring(&["known_email"])
            .steps(steps)
    }

    fn incomplete_user_to_mfa() -> Vec<TestStep> {
        let mut steps = vec![Self::open()];
        steps.extend(Self::sign_in("{{incomplete_email}}", "{{incomplete_password}}"));
        steps.push(text_within(Self::VERIFY_ACCOUNT, NAVIGATION_TIMEOUT_MS));
        steps.push(TestStep::AssertUrl {
            equals: None,
            contains: Some(Self::MFA_PATH.to_string()),
            timeout_ms: NAVIGATION_TIMEOUT_MS,
        });
        steps
    }

    pub fn incomplete_user_redirected() -> TestSpec {
        TestSpec::new("signin-incomplete-user-mfa", "Unfinished onboarding lands on the MFA page")
            .tagged(&["ui", "signin"])
            .requiring(&["incomplete_email", "incomplete_password"])
            .steps(Self::incomplete_user_to_mfa())
    }

    pub fn invalid_verification_code() -> TestSpec {
        let mut steps = Self::incomplete_user_to_mfa();
        steps.push(fill(Self::VERIFICATION_CODE, Self::BAD_CODE_INPUT));
        steps.push(text_within(Self::BAD_CODE, NAVIGATION_TIMEOUT_MS));
        TestSpec::new("signin-invalid-code", "A wrong verification code is refused")
            .tagged(&["ui", "signin", "validation"])
            .requiring(&["incomplete_email", "incomplete_password"])
            .steps(steps)
    }

    pub fn password_reset() -> TestSpec {
        TestSpec::new("signin-password-reset", "Reset password sends a link and offers a way back")
            .tagged(&["ui", "signin"])
            .requiring(&["known_email"])
            .steps([
                Self::open(),
                fill(Self::EMAIL, "{{known_email}}"),
                click(Self::SUBMIT),
                click(Self::RESET_LINK),
                text(Self::FORGOT_PASSWORD),
                text(Self::RESET_PROMPT),
                click(Self::RESET_LINK),
                text_within(Self::RESET_SENT, NAVIGATION_TIMEOUT_MS),
                text(&Self::reset_message("{{known_email}}")),
                Check {
                    visible: Some(true),
                    timeout_ms: Some(15_000),
                    ..Check::default()
                }
                .on(Self::BACK_TO_LOGIN),
            ])
    }

    pub fn specs() -> Vec<TestSpec> {
        vec![
            Self::structure(),
            Self::known_user_needs_verification(),
            Self::wrong_password(),
            Self::incomplete_user_redirected(),
            Self::invalid_verification_code(),
            Self::password_reset(),
        ]
    }
}

/// Every page-object flow, sign-up first
pub fn all_specs() -> Vec<TestSpec> {
    let mut specs = SignUpPage::specs();
    specs.extend(SignInPage::specs());
    specs
}

fn fill(selector: &str, value: &str) -> TestStep {
    TestStep::Fill {
        selector: selector.to_string(),
        value: value.to_string(),
        clear_first: false,
    }
}

fn click(selector: &str) -> TestStep {
    TestStep::Click {
        selector: selector.to_string(),
        timeout_ms: None,
    }
}

fn text(text: &str) -> TestStep {
    TestStep::AssertText {
        text: text.to_string(),
        timeout_ms: None,
    }
}

fn text_within(text: &str, timeout_ms: u64) -> TestStep {
    TestStep::AssertText {
        text: text.to_string(),
        timeout_ms: Some(timeout_ms),
    }
}

/// Expectations for one element; unset fields are not checked
#[derive(Default)]
struct Check {
    visible: Option<bool>,
    enabled: Option<bool>,
    text_contains: Option<String>,
    value: Option<String>,
    attribute: Option<AttributeAssertion>,
    count: Option<usize>,
    timeout_ms: Option<u64>,
}

impl Check {
    fn on(self, selector: &str) -> TestStep {
        TestStep::Assert {
            selector: selector.to_string(),
            visible: self.visible,
            enabled: self.enabled,
            text: None,
            text_contains: self.text_contains,
            value: self.value,
            attribute: self.attribute,
            count: self.count,
            timeout_ms: self.timeout_ms,
        }
    }
}

fn visible(selector: &str) -> TestStep {
    Check {
        visible: Some(true),
        ..Check::default()
    }
    .on(selector)
}

fn contains(selector: &str, fragment: &str) -> TestStep {
    Check {
        text_contains: Some(fragment.to_string()),
        ..Check::default()
    }
    .on(selector)
}

fn count(selector: &str, n: usize) -> TestStep {
    Check {
        count: Some(n),
        ..Check::default()
    }
    .on(selector)
}

fn input_type(selector: &str, kind: &str) -> TestStep {
    Check {
        attribute: Some(AttributeAssertion {
            name: "type".to_string(),
            value: Some(kind.to_string()),
            contains: None,
        }),
        timeout_ms: Some(NAVIGATION_TIMEOUT_MS),
        ..Check::default()
    }
    .on(selector)
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;

    #[test]
    fn test_spec_names_are_unique() {
        let specs = all_specs();
        let names: HashSet<_> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), specs.len());
        assert!(specs.iter().all(|s| !s.steps.is_empty()));
    }

    #[test]
    fn test_credentials_are_never_baked_in() {
        for spec in all_specs() {
            let yaml = serde_yaml::to_string(&spec.steps).unwrap();
            for var in ["known_email", "known_password", "incomplete_email", "incomplete_password", "signup_email"] {
                if yaml.contains(&format!("{{{{{}}}}}", var)) {
                    assert!(spec.requires.iter().any(|r| r == var), "{} uses {}", spec.name, var);
                }
            }
        }
    }

    #[test]
    fn test_specs_without_vars_bind_to_themselves() {
        let spec = SignUpPage::empty_submit();
        assert!(spec.requires.is_empty());
        let bound = spec.bind(&HashMap::new()).unwrap();
        assert_eq!(bound.steps, spec.steps);
    }

    #[test]
    fn test_reset_message_is_bound() {
        let vars = HashMap::from([("known_email".to_string(), "qa@work1.com".to_string())]);
        let bound = SignInPage::password_reset().bind(&vars).unwrap();
        let expected = SignInPage::reset_message("qa@work1.com");
        assert!(bound.steps.iter().any(|s| matches!(
            s,
            TestStep::AssertText { text, .. } if *text == expected
        )));
    }

    #[test]
    fn test_every_malformed_email_is_checked() {
        let spec = SignUpPage::malformed_emails();
        let checks = spec
            .steps
            .iter()
            .filter(|s| matches!(s, TestStep::AssertText { text, .. } if text == SignUpPage::EMAIL_INVALID))
            .count();
        assert_eq!(checks, payload::invalid_emails().len());
        assert!(spec.steps.iter().any(|s| matches!(
            s,
            TestStep::Fill { value, .. } if value == "test.@s.com"
        )));
    }
}
