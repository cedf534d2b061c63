//! Suite configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::UiCredentials;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Account and Catalog API target
    pub bookstore: BookstoreConfig,

    /// SaaS UI target
    pub saas: SaasConfig,

    /// Scenario runner settings
    pub runner: RunnerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookstoreConfig {
    /// Base URL of the remote API
    pub base_url: String,

    /// Per-request bound in milliseconds
    pub request_timeout_ms: u64,

    /// Catalog listing slower than this fails the performance scenario
    pub slow_threshold_ms: u64,
}

impl Default for BookstoreConfig {
    fn default() -> Self {
        Self {
            base_url: "https://demoqa.com".to_string(),
            request_timeout_ms: 10_000,
            slow_threshold_ms: 1_500,
        }
    }
}

impl BookstoreConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn slow_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_threshold_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SaasConfig {
    pub base_url: String,

    /// Account with MFA enabled, used by sign-in checks
    pub known_user: Option<UiCredentials>,

    /// Account whose onboarding is unfinished
    pub incomplete_user: Option<UiCredentials>,
}

impl Default for SaasConfig {
    fn default() -> Self {
        Self {
            base_url: "https://app.ramp.com".to_string(),
            known_user: None,
            incomplete_user: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Scenario groups run concurrently up to this many
    pub workers: usize,

    /// Where result files are written
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            output_dir: PathBuf::from("test-results"),
        }
    }
}

impl ProbeConfig {
    /// Load configuration from file, falling back to defaults when it is missing
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| {
                Error::InvalidConfig(format!("{}: {}", path.display(), e))
            })?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply `APIPROBE_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("APIPROBE_BASE_URL") {
            self.bookstore.base_url = url;
        }
        if let Some(ms) = lookup("APIPROBE_TIMEOUT_MS") {
            self.bookstore.request_timeout_ms = parse_number("APIPROBE_TIMEOUT_MS", &ms)?;
        }
        if let Some(url) = lookup("APIPROBE_SAAS_URL") {
            self.saas.base_url = url;
        }
        if let (Some(email), Some(password)) = (
            lookup("APIPROBE_SAAS_EMAIL"),
            lookup("APIPROBE_SAAS_PASSWORD"),
        ) {
            self.saas.known_user = Some(UiCredentials { email, password });
        }
        if let Some(workers) = lookup("APIPROBE_WORKERS") {
            self.runner.workers = parse_number("APIPROBE_WORKERS", &workers)?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("bookstore.base_url", &self.bookstore.base_url),
            ("saas.base_url", &self.saas.base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::InvalidConfig(format!(
                    "{} must be an http(s) URL, got {:?}",
                    name, url
                )));
            }
        }
        if self.bookstore.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "bookstore.request_timeout_ms must be positive".to_string(),
            ));
        }
        if self.runner.workers == 0 {
            return Err(Error::InvalidConfig(
                "runner.workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Path of the JSON results file
    pub fn results_path(&self) -> PathBuf {
        self.runner.output_dir.join("scenario-results.json")
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("{} is not a valid number: {:?}", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProbeConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.bookstore.base_url, "https://demoqa.com");
        assert_eq!(config.bookstore.request_timeout_ms, 10_000);
        assert_eq!(config.runner.workers, 2);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apiprobe.toml");
        std::fs::write(
            &path,
            "[bookstore]\nbase_url = \"http://127.0.0.1:8080\"\n\n[runner]\nworkers = 4\n",
        )
        .unwrap();

        let config = ProbeConfig::load(&path).unwrap();
        assert_eq!(config.bookstore.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.bookstore.slow_threshold_ms, 1_500);
        assert_eq!(config.runner.workers, 4);
        assert_eq!(config.saas.base_url, "https://app.ramp.com");
    }

    #[test]
    fn test_malformed_file_is_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apiprobe.toml");
        std::fs::write(&path, "[bookstore\n").unwrap();
        assert!(matches!(
            ProbeConfig::load(&path),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("APIPROBE_BASE_URL", "http://localhost:9000"),
            ("APIPROBE_TIMEOUT_MS", "250"),
            ("APIPROBE_SAAS_EMAIL", "qa@example.com"),
            ("APIPROBE_SAAS_PASSWORD", "secret"),
        ]
        .into_iter()
        .collect();

        let mut config = ProbeConfig::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.bookstore.base_url, "http://localhost:9000");
        assert_eq!(config.bookstore.request_timeout(), Duration::from_millis(250));
        assert_eq!(
            config.saas.known_user.as_ref().map(|u| u.email.as_str()),
            Some("qa@example.com")
        );
    }

    #[test]
    fn test_bad_env_values_rejected() {
        let mut config = ProbeConfig::default();
        let err = config
            .apply_overrides(|k| (k == "APIPROBE_WORKERS").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let mut config = ProbeConfig::default();
        let err = config
            .apply_overrides(|k| (k == "APIPROBE_BASE_URL").then(|| "demoqa.com".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("bookstore.base_url"));
    }
}
