use std::path::PathBuf;
use std::time::Duration;

/// Default API origin for local development.
pub const DEFAULT_API_URL: &str = "http://localhost:3000";
/// Default deployment stage appended to the API origin.
pub const DEFAULT_API_STAGE: &str = "prod";
/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Default location of the persisted session.
pub const DEFAULT_SESSION_FILE: &str = ".groupbuy/session.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a valid {expected}, got {value:?}")]
    InvalidValue {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// API origin without the stage, e.g. `https://abc.execute-api.aws.com`.
    pub api_url: String,
    /// Deployment stage path segment (default: `prod`).
    pub api_stage: String,
    pub request_timeout_secs: u64,
    pub session_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            api_stage: DEFAULT_API_STAGE.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                  |
    /// |------------------------|--------------------------|
    /// | `API_URL`              | `http://localhost:3000`  |
    /// | `API_STAGE`            | `prod`                   |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                     |
    /// | `SESSION_FILE`         | `.groupbuy/session.json` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading from `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_url = lookup("API_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.api_url);
        if reqwest::Url::parse(&api_url).is_err() {
            return Err(ConfigError::InvalidValue {
                var: "API_URL",
                expected: "URL",
                value: api_url,
            });
        }

        let api_stage = lookup("API_STAGE")
            .map(|v| v.trim().trim_matches('/').to_string())
            .unwrap_or(defaults.api_stage);

        let request_timeout_secs = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    var: "REQUEST_TIMEOUT_SECS",
                    expected: "u64",
                    value: raw,
                })?,
            None => defaults.request_timeout_secs,
        };

        let session_file = lookup("SESSION_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.session_file);

        Ok(Self {
            api_url,
            api_stage,
            request_timeout_secs,
            session_file,
        })
    }

    /// API origin joined with the stage, without a trailing slash.
    pub fn base_url(&self) -> String {
        let origin = self.api_url.trim_end_matches('/');
        if self.api_stage.is_empty() {
            origin.to_string()
        } else {
            format!("{origin}/{}", self.api_stage)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
