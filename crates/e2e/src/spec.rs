//! Declarative YAML test specification for browser flows
//!
//! Selectors are plain Playwright selectors, plus two prefixes the script
//! generator understands: `label:<text>` resolves through `getByLabel` and
//! `text:<text>` through `getByText`. String fields may reference variables
//! as `{{name}}`; a spec lists the ones it cannot run without in `requires`.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{E2eError, E2eResult};

/// A complete test specification parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    /// Unique name for this test
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering tests
    #[serde(default)]
    pub tags: Vec<String>,

    /// Variables that must be bound before the spec can run
    #[serde(default)]
    pub requires: Vec<String>,

    /// Viewport size for the browser
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,

    /// Steps to execute in order
    pub steps: Vec<TestStep>,
}

fn default_viewport() -> Viewport {
    Viewport {
        width: 1280,
        height: 720,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// A single step in a test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Navigate to a URL (relative to base)
    Navigate {
        url: String,
        #[serde(default)]
        wait_for_selector: Option<String>,
    },

    /// Click an element
    Click {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Fill an input field
    Fill {
        selector: String,
        value: String,
        #[serde(default)]
        clear_first: bool,
    },

    /// Type text with keyboard simulation
    Type {
        selector: String,
        text: String,
        #[serde(default)]
        delay_ms: Option<u64>,
    },

    /// Press a key
    Press {
        #[serde(default)]
        selector: Option<String>,
        key: String,
    },

    /// Wait for an element to reach a state
    Wait {
        selector: String,
        #[serde(default = "default_wait_timeout")]
        timeout_ms: u64,
        #[serde(default)]
        state: WaitState,
    },

    /// Wait for a fixed amount of time (use sparingly)
    Sleep { ms: u64 },

    /// Assert something about an element
    Assert {
        selector: String,
        #[serde(default)]
        visible: Option<bool>,
        #[serde(default)]
        enabled: Option<bool>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        text_contains: Option<String>,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        attribute: Option<AttributeAssertion>,
        #[serde(default)]
        count: Option<usize>,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Assert that some text is visible anywhere on the page
    AssertText {
        text: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Assert the current URL, exactly or by substring
    AssertUrl {
        #[serde(default)]
        equals: Option<String>,
        #[serde(default)]
        contains: Option<String>,
        #[serde(default = "default_wait_timeout")]
        timeout_ms: u64,
    },

    /// Take a screenshot
    Screenshot {
        name: String,
        #[serde(default)]
        selector: Option<String>,
        #[serde(default)]
        full_page: bool,
    },

    /// Hover over an element
    Hover { selector: String },

    /// Focus an element
    Focus { selector: String },

    /// Move focus away from an element, triggering its validation
    Blur { selector: String },

    /// Log a message (for debugging)
    Log { message: String },
}

fn default_wait_timeout() -> u64 {
    5000
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeAssertion {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub contains: Option<String>,
}

impl TestStep {
    /// Short label used in logs and step results
    pub fn name(&self) -> String {
        match self {
            TestStep::Navigate { url, .. } => format!("navigate:{}", url),
            TestStep::Click { selector, .. } => format!("click:{}", selector),
            TestStep::Fill { selector, .. } => format!("fill:{}", selector),
            TestStep::Type { selector, .. } => format!("type:{}", selector),
            TestStep::Press { key, .. } => format!("press:{}", key),
            TestStep::Wait { selector, .. } => format!("wait:{}", selector),
            TestStep::Sleep { ms } => format!("sleep:{}ms", ms),
            TestStep::Assert { selector, .. } => format!("assert:{}", selector),
            TestStep::AssertText { text, .. } => format!("assert_text:{}", truncate(text, 40)),
            TestStep::AssertUrl { equals, contains, .. } => format!(
                "assert_url:{}",
                equals.as_deref().or(contains.as_deref()).unwrap_or("")
            ),
            TestStep::Screenshot { name, .. } => format!("screenshot:{}", name),
            TestStep::Hover { selector } => format!("hover:{}", selector),
            TestStep::Focus { selector } => format!("focus:{}", selector),
            TestStep::Blur { selector } => format!("blur:{}", selector),
            TestStep::Log { message } => format!("log:{}", truncate(message, 30)),
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

impl TestSpec {
    /// A spec built in code, with the default viewport
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tags: Vec::new(),
            requires: Vec::new(),
            viewport: default_viewport(),
            steps: Vec::new(),
        }
    }

    pub fn tagged(mut self, tags: &[&str]) -> Self {
        self.tags.extend(tags.iter().map(|t| t.to_string()));
        self
    }

    pub fn requiring(mut self, vars: &[&str]) -> Self {
        self.requires.extend(vars.iter().map(|v| v.to_string()));
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = TestStep>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Parse a test spec from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        if spec.steps.is_empty() {
            return Err(E2eError::SpecParse(format!("{}: no steps", spec.name)));
        }
        Ok(spec)
    }

    /// Parse a test spec from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all test specs from a directory, sorted by name
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            specs.push(Self::from_file(entry.path())?);
        }

        specs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(specs)
    }

    /// Filter specs by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs
            .iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }

    /// Names listed in `requires` that `vars` does not bind
    pub fn missing_vars(&self, vars: &HashMap<String, String>) -> Vec<String> {
        self.requires
            .iter()
            .filter(|name| !vars.contains_key(*name))
            .cloned()
            .collect()
    }

    /// Replace `{{name}}` in every string field of every step
    pub fn bind(&self, vars: &HashMap<String, String>) -> E2eResult<Self> {
        let missing = self.missing_vars(vars);
        if !missing.is_empty() {
            return Err(E2eError::SpecParse(format!(
                "{}: unbound variables {}",
                self.name,
                missing.join(", ")
            )));
        }

        let mut steps = serde_json::to_value(&self.steps)?;
        substitute(&mut steps, vars);

        Ok(Self {
            steps: serde_json::from_value(steps)?,
            ..self.clone()
        })
    }
}

fn substitute(value: &mut Value, vars: &HashMap<String, String>) {
    match value {
        Value::String(s) if s.contains("{{") => {
            for (name, bound) in vars {
                *s = s.replace(&format!("{{{{{}}}}}", name), bound);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| substitute(v, vars)),
        Value::Object(fields) => fields.values_mut().for_each(|v| substitute(v, vars)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_spec() {
        let yaml = r#"
name: sign-in-wrong-password
description: Wrong password shows the combination error
tags:
  - sign-in
  - smoke
requires:
  - known_email
steps:
  - action: navigate
    url: /sign-in
    wait_for_selector: 'input[type="email"]'
  - action: fill
    selector: 'input[type="email"]'
    value: '{{known_email}}'
  - action: assert_text
    text: We do not recognize this email password combination.
"#;
        let spec = TestSpec::from_yaml(yaml).unwrap();
        assert_eq!(spec.name, "sign-in-wrong-password");
        assert_eq!(spec.steps.len(), 3);
        assert_eq!(spec.viewport.width, 1280);
        assert_eq!(TestSpec::filter_by_tag(&[spec], "smoke").len(), 1);
    }

    #[test]
    fn test_empty_steps_rejected() {
        let err = TestSpec::from_yaml("name: nothing\nsteps: []\n").unwrap_err();
        assert!(matches!(err, E2eError::SpecParse(_)));
    }

    #[test]
    fn test_bind_substitutes_nested_strings() {
        let yaml = r#"
name: bind
requires: [email]
steps:
  - action: fill
    selector: 'input[type="email"]'
    value: '{{email}}'
  - action: assert
    selector: 'input[type="email"]'
    value: '{{email}}'
    enabled: false
"#;
        let spec = TestSpec::from_yaml(yaml).unwrap();
        assert!(spec.bind(&HashMap::new()).is_err());

        let vars = HashMap::from([("email".to_string(), "qa@work1.com".to_string())]);
        let bound = spec.bind(&vars).unwrap();
        assert_eq!(
            bound.steps[0],
            TestStep::Fill {
                selector: r#"input[type="email"]"#.to_string(),
                value: "qa@work1.com".to_string(),
                clear_first: false,
            }
        );
        match &bound.steps[1] {
            TestStep::Assert { value, enabled, .. } => {
                assert_eq!(value.as_deref(), Some("qa@work1.com"));
                assert_eq!(*enabled, Some(false));
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_step_names_truncate_on_char_boundary() {
        let step = TestStep::Log {
            message: "ééééééééééééééééééééééééééééééééééé".to_string(),
        };
        assert_eq!(step.name().chars().count(), "log:".len() + 30);
    }

    #[test]
    fn test_shipped_specs_parse() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("specs");
        let specs = TestSpec::load_all(&dir).unwrap();
        assert!(!specs.is_empty());

        let built: Vec<String> = crate::pages::all_specs().into_iter().map(|s| s.name).collect();
        for spec in &specs {
            assert!(!built.contains(&spec.name), "{} shadows a page-object spec", spec.name);
            assert!(spec.tags.iter().any(|t| t == "ui"), "{}", spec.name);
        }
        assert_eq!(TestSpec::filter_by_tag(&specs, "smoke").len(), 1);
    }
}
