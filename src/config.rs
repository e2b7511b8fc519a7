//! Suite configuration: target deployment, browser, auth, policies.

use crate::params::{self, ParamDef, Params};
use crate::{Error, Result};
use fareflow_pages::results::FlightChoice;
use fareflow_pages::PaymentDetails;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Top-level suite configuration, loaded from YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct SuiteConfig {
    /// Name of this suite, for reports.
    pub name: String,

    /// Base URL of the booking deployment under test.
    pub base_url: String,

    /// Parameter declarations for `${var}` substitution.
    #[serde(default)]
    pub params: HashMap<String, ParamDef>,

    #[serde(default)]
    pub browser: BrowserSettings,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub screenshots: ScreenshotSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub timeouts: Timeouts,

    /// Which fare to pick from each results list.
    #[serde(default)]
    pub selection: FlightChoice,

    #[serde(default)]
    pub contact: ContactSettings,

    #[serde(default)]
    pub payment: PaymentDetails,
}

impl SuiteConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse_with_params(&content, &Params::new())
    }

    pub fn load_with_params<P: AsRef<Path>>(path: P, params: &Params) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse_with_params(&content, params)
    }

    pub fn parse(yaml: &str) -> Result<Self> {
        Self::parse_with_params(yaml, &Params::new())
    }

    /// Parse with `${var}` substitution applied across the whole tree.
    pub fn parse_with_params(yaml: &str, params: &Params) -> Result<Self> {
        // First pass: pull the param declarations out of the raw tree so
        // defaults apply during substitution.
        let mut value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        let defs: HashMap<String, ParamDef> = value
            .get("params")
            .and_then(|v| serde_yaml::from_value(v.clone()).ok())
            .unwrap_or_default();

        params::substitute_value(&mut value, params, &defs)?;

        let config: SuiteConfig = serde_yaml::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Config("name is required".into()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "base_url '{}' is not an http(s) URL",
                self.base_url
            )));
        }
        if self.retry.attempts == 0 {
            return Err(Error::Config("retry.attempts must be at least 1".into()));
        }
        match self.auth.mode {
            AuthMode::None => {}
            AuthMode::Sso => {
                if self.auth.username.is_none() || self.auth.password.is_none() {
                    return Err(Error::Config(
                        "auth.mode sso needs auth.username and auth.password".into(),
                    ));
                }
            }
            AuthMode::Cookies => {
                if self.auth.cookies_file.is_none() {
                    return Err(Error::Config("auth.mode cookies needs auth.cookies_file".into()));
                }
            }
        }
        Ok(())
    }
}

/// Browser launch settings.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BrowserSettings {
    #[serde(default)]
    pub headless: bool,
    pub proxy: Option<String>,
    pub user_agent: Option<String>,
    pub viewport: Option<Viewport>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// How the suite gets past the corporate SSO gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Deployment has auth disabled (local stacks).
    #[default]
    None,
    /// Inject a saved cookie jar; fall back to SSO when stale and
    /// credentials are present.
    Cookies,
    /// Always drive the interactive SSO form.
    Sso,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthSettings {
    #[serde(default)]
    pub mode: AuthMode,
    pub username: Option<String>,
    pub password: Option<String>,
    pub cookies_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScreenshotSettings {
    #[serde(default = "ScreenshotSettings::default_dir")]
    pub dir: PathBuf,
    #[serde(default = "ScreenshotSettings::default_on_failure")]
    pub on_failure: bool,
}

impl ScreenshotSettings {
    fn default_dir() -> PathBuf {
        PathBuf::from("screenshots")
    }
    fn default_on_failure() -> bool {
        true
    }
}

impl Default for ScreenshotSettings {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
            on_failure: Self::default_on_failure(),
        }
    }
}

/// Per-scenario retry. Each attempt re-navigates from the search form.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "RetrySettings::default_attempts")]
    pub attempts: u32,
    #[serde(default = "RetrySettings::default_delay_ms")]
    pub delay_ms: u64,
}

impl RetrySettings {
    fn default_attempts() -> u32 {
        2
    }
    fn default_delay_ms() -> u64 {
        1_500
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: Self::default_attempts(),
            delay_ms: Self::default_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Timeouts {
    #[serde(default = "Timeouts::default_navigation_ms")]
    pub navigation_ms: u64,
    #[serde(default = "Timeouts::default_element_ms")]
    pub element_ms: u64,
    /// Fare searches fan out to the pricing backends; give them room.
    #[serde(default = "Timeouts::default_results_ms")]
    pub results_ms: u64,
    #[serde(default = "Timeouts::default_confirmation_ms")]
    pub confirmation_ms: u64,
}

impl Timeouts {
    fn default_navigation_ms() -> u64 {
        30_000
    }
    fn default_element_ms() -> u64 {
        10_000
    }
    fn default_results_ms() -> u64 {
        45_000
    }
    fn default_confirmation_ms() -> u64 {
        60_000
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation_ms: Self::default_navigation_ms(),
            element_ms: Self::default_element_ms(),
            results_ms: Self::default_results_ms(),
            confirmation_ms: Self::default_confirmation_ms(),
        }
    }
}

/// Contact block typed into the passenger form.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactSettings {
    #[serde(default = "ContactSettings::default_email")]
    pub email: String,
    #[serde(default = "ContactSettings::default_phone")]
    pub phone: String,
}

impl ContactSettings {
    fn default_email() -> String {
        "qa-bookings@example-air.com".into()
    }
    fn default_phone() -> String {
        "+43 1 555 0100".into()
    }
}

impl Default for ContactSettings {
    fn default() -> Self {
        Self {
            email: Self::default_email(),
            phone: Self::default_phone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let yaml = r#"
name: "Smoke"
base_url: "https://booking.staging.example-air.com"
"#;
        let config = SuiteConfig::parse(yaml).unwrap();
        assert_eq!(config.name, "Smoke");
        assert!(!config.browser.headless);
        assert_eq!(config.auth.mode, AuthMode::None);
        assert_eq!(config.retry.attempts, 2);
        assert_eq!(config.timeouts.results_ms, 45_000);
        assert!(config.screenshots.on_failure);
        assert_eq!(config.selection, FlightChoice::First);
    }

    #[test]
    fn parses_browser_and_selection() {
        let yaml = r#"
name: "Nightly"
base_url: "https://booking.example-air.com"
browser:
  headless: true
  viewport:
    width: 1440
    height: 900
  user_agent: "fareflow-ci"
selection: cheapest
"#;
        let config = SuiteConfig::parse(yaml).unwrap();
        assert!(config.browser.headless);
        let viewport = config.browser.viewport.unwrap();
        assert_eq!((viewport.width, viewport.height), (1440, 900));
        assert_eq!(config.browser.user_agent.as_deref(), Some("fareflow-ci"));
        assert_eq!(config.selection, FlightChoice::Cheapest);
    }

    #[test]
    fn sso_mode_requires_credentials() {
        let yaml = r#"
name: "Nightly"
base_url: "https://booking.example-air.com"
auth:
  mode: sso
  username: "qa-bot@example-air.com"
"#;
        let err = SuiteConfig::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("auth.username and auth.password"));
    }

    #[test]
    fn cookies_mode_requires_jar_path() {
        let yaml = r#"
name: "Nightly"
base_url: "https://booking.example-air.com"
auth:
  mode: cookies
"#;
        let err = SuiteConfig::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("cookies_file"));
    }

    #[test]
    fn rejects_non_http_base_url() {
        let yaml = r#"
name: "Broken"
base_url: "booking.example-air.com"
"#;
        assert!(SuiteConfig::parse(yaml).is_err());
    }

    #[test]
    fn rejects_zero_retry_attempts() {
        let yaml = r#"
name: "Broken"
base_url: "https://booking.example-air.com"
retry:
  attempts: 0
  delay_ms: 100
"#;
        let err = SuiteConfig::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn substitutes_declared_params() {
        let yaml = r#"
name: "Env suite"
params:
  env:
    default: "staging"
  password:
    required: true
base_url: "https://booking.${env}.example-air.com"
auth:
  mode: sso
  username: "qa-bot@example-air.com"
  password: "${password}"
"#;
        let params = Params::new().set("password", "hunter2");
        let config = SuiteConfig::parse_with_params(yaml, &params).unwrap();
        assert_eq!(config.base_url, "https://booking.staging.example-air.com");
        assert_eq!(config.auth.password.as_deref(), Some("hunter2"));

        let err = SuiteConfig::parse(yaml).unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn payment_section_overrides_defaults() {
        let yaml = r#"
name: "Cards"
base_url: "https://booking.example-air.com"
payment:
  holder: "S SANDBOX"
"#;
        let config = SuiteConfig::parse(yaml).unwrap();
        assert_eq!(config.payment.holder, "S SANDBOX");
        assert_eq!(config.payment.card_number, "4111111111111111");
    }
}
