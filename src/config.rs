//! Harvester configuration
//!
//! A single explicit value handed to every component at construction.
//! Loadable from YAML or JSON, overridable from the command line.

use crate::error::{Error, Result};
use crate::http::MAX_SERVER_ERROR_RETRIES;
use crate::pagination::PageFormat;
use crate::types::OptionStringExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.sketchfab.com/v3";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete harvester configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Base URL for relative endpoints
    pub base_url: String,

    /// Static API credential, sent as `Authorization: <scheme> <token>`
    pub api_token: Option<String>,

    /// Authorization scheme (e.g. "Token", "Bearer")
    pub auth_scheme: String,

    /// Client identification sent with every request
    pub user_agent: String,

    /// Minimum spacing between requests, also the backoff base (seconds)
    pub request_delay_secs: f64,

    /// Retry budget for throttled (429) requests
    pub max_retries: u32,

    /// Retry budget for 5xx responses (at most 3)
    pub server_error_retries: u32,

    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// Response layout
    pub page: PageFormat,

    /// Checkpoint settings
    pub checkpoint: CheckpointConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: None,
            auth_scheme: "Token".to_string(),
            user_agent: format!("pagewise/{}", env!("CARGO_PKG_VERSION")),
            request_delay_secs: 2.0,
            max_retries: 5,
            server_error_retries: MAX_SERVER_ERROR_RETRIES,
            timeout_secs: 30,
            page: PageFormat::default(),
            checkpoint: CheckpointConfig::default(),
        }
    }
}

impl HarvestConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config file; `.json` is parsed as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config: Self = if is_json {
            serde_json::from_str(&contents)?
        } else {
            serde_yaml::from_str(&contents)?
        };

        Ok(config.normalized())
    }

    /// Parse a YAML (or JSON, which is valid YAML) document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config.normalized())
    }

    fn normalized(mut self) -> Self {
        self.api_token = self.api_token.none_if_empty();
        self
    }

    /// Check every value the components rely on
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid_value(
                "base_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        if self.request_delay_secs < 0.0
            || Duration::try_from_secs_f64(self.request_delay_secs).is_err()
        {
            return Err(Error::invalid_value(
                "request_delay_secs",
                "must be a non-negative number of seconds",
            ));
        }

        if self.server_error_retries > MAX_SERVER_ERROR_RETRIES {
            return Err(Error::invalid_value(
                "server_error_retries",
                format!("must be at most {MAX_SERVER_ERROR_RETRIES}"),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(Error::invalid_value("timeout_secs", "must be positive"));
        }

        if self.checkpoint.every == Some(0) {
            return Err(Error::invalid_value("checkpoint.every", "must be positive"));
        }

        self.page.validate()
    }

    /// Request spacing as a duration
    pub fn request_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.request_delay_secs.max(0.0)).unwrap_or(Duration::ZERO)
    }

    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether a credential will be attached
    pub fn is_authenticated(&self) -> bool {
        self.api_token.is_some()
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the API token
    #[must_use]
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = token.into().none_if_empty();
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Set the request delay in seconds
    #[must_use]
    pub fn with_request_delay(mut self, secs: f64) -> Self {
        self.request_delay_secs = secs;
        self
    }

    /// Set the throttling retry budget
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the response layout
    #[must_use]
    pub fn with_page_format(mut self, page: PageFormat) -> Self {
        self.page = page;
        self
    }

    /// Write checkpoints to one fixed file
    #[must_use]
    pub fn with_checkpoint_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint.path = Some(path.into());
        self
    }

    /// Directory for generated checkpoint names
    #[must_use]
    pub fn with_checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint.dir = dir.into();
        self
    }

    /// Checkpoint every `n` collected items
    #[must_use]
    pub fn with_checkpoint_every(mut self, n: usize) -> Self {
        self.checkpoint.every = Some(n);
        self
    }
}

// ============================================================================
// Checkpoint Config
// ============================================================================

/// Where and how often checkpoints are written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Fixed checkpoint file, overwritten on every save
    pub path: Option<PathBuf>,

    /// Directory for timestamped checkpoint files when `path` is unset
    pub dir: PathBuf,

    /// Save a checkpoint each time this many more items have been collected
    pub every: Option<usize>,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            path: None,
            dir: PathBuf::from("."),
            every: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::ContinuationStyle;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = HarvestConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.request_delay(), Duration::from_secs(2));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.server_error_retries, 3);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(!config.is_authenticated());
        assert!(config.user_agent.starts_with("pagewise/"));
        config.validate().unwrap();
    }

    #[test]
    fn test_builder() {
        let config = HarvestConfig::new()
            .with_base_url("http://localhost:8080")
            .with_api_token("abc")
            .with_request_delay(0.5)
            .with_max_retries(2)
            .with_checkpoint_path("run.json")
            .with_checkpoint_every(25);

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.api_token.as_deref(), Some("abc"));
        assert_eq!(config.request_delay(), Duration::from_millis(500));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.checkpoint.path, Some(PathBuf::from("run.json")));
        assert_eq!(config.checkpoint.every, Some(25));
    }

    #[test]
    fn test_empty_token_means_unauthenticated() {
        let config = HarvestConfig::new().with_api_token("   ");
        assert!(!config.is_authenticated());

        let config = HarvestConfig::from_yaml_str("api_token: \"\"").unwrap();
        assert!(!config.is_authenticated());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
base_url: https://api.example.com/v1
api_token: secret
auth_scheme: Bearer
request_delay_secs: 3.0
max_retries: 8
page:
  items_path: data.items
  continuation_path: meta.cursor
  continuation:
    type: cursor_param
    param: cursor
checkpoint:
  path: search_checkpoint.json
  every: 100
"#;
        let config = HarvestConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.base_url, "https://api.example.com/v1");
        assert_eq!(config.auth_scheme, "Bearer");
        assert_eq!(config.max_retries, 8);
        assert_eq!(config.server_error_retries, 3);
        assert_eq!(config.page.items_path, "data.items");
        assert_eq!(
            config.page.continuation,
            ContinuationStyle::CursorParam {
                param: "cursor".to_string()
            }
        );
        assert_eq!(config.checkpoint.every, Some(100));
        assert_eq!(config.checkpoint.dir, PathBuf::from("."));
        config.validate().unwrap();
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"request_delay_secs": 1.0, "checkpoint": {"dir": "out"}}"#,
        )
        .unwrap();

        let config = HarvestConfig::from_file(&path).unwrap();
        assert_eq!(config.request_delay(), Duration::from_secs(1));
        assert_eq!(config.checkpoint.dir, PathBuf::from("out"));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_missing_file() {
        let err = HarvestConfig::from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_validation_failures() {
        let bad = HarvestConfig::new().with_base_url("not a url");
        assert!(matches!(bad.validate(), Err(Error::InvalidUrl(_))));

        let bad = HarvestConfig::new().with_base_url("ftp://example.com");
        assert!(matches!(
            bad.validate(),
            Err(Error::InvalidConfigValue { .. })
        ));

        let bad = HarvestConfig::new().with_request_delay(-1.0);
        assert!(bad.validate().is_err());

        let bad = HarvestConfig::new().with_request_delay(f64::NAN);
        assert!(bad.validate().is_err());

        let bad = HarvestConfig::new().with_request_delay(1e30);
        assert!(matches!(
            bad.validate(),
            Err(Error::InvalidConfigValue { .. })
        ));
        assert_eq!(bad.request_delay(), Duration::ZERO);

        let bad = HarvestConfig::new().with_request_delay(f64::INFINITY);
        assert!(bad.validate().is_err());

        let mut bad = HarvestConfig::new();
        bad.server_error_retries = 4;
        assert!(bad.validate().is_err());

        let mut bad = HarvestConfig::new();
        bad.timeout_secs = 0;
        assert!(bad.validate().is_err());

        let bad = HarvestConfig::new().with_checkpoint_every(0);
        assert!(bad.validate().is_err());
    }
}
