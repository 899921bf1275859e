use groupbuy_client::{ApiError, ConfigError, SessionStoreError};
use groupbuy_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Session store error: {0}")]
    Store(#[from] SessionStoreError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("Not logged in")]
    NotLoggedIn,

    /// The current role does not grant the requested view or action.
    #[error("Not permitted: {0}")]
    NotPermitted(&'static str),
}

impl DashboardError {
    /// Whether the user has to log in (again) to continue.
    pub fn needs_login(&self) -> bool {
        match self {
            Self::NotLoggedIn => true,
            Self::Api(ApiError::Unauthorized { .. }) => true,
            Self::Core(e) => e.is_unauthorized(),
            _ => false,
        }
    }

    /// Message suitable for printing to the user.
    pub fn user_message(&self) -> String {
        match self {
            _ if self.needs_login() => "Please log in again.".to_string(),
            Self::Core(e) => e.user_message(),
            Self::NotPermitted(what) => format!("Your account cannot {what}."),
            other => other.to_string(),
        }
    }
}
