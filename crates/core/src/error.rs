use crate::types::DbId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Message suitable for a user-facing notification.
    ///
    /// Validation messages are shown verbatim; everything else collapses
    /// to a generic retry hint.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::NotFound { entity, .. } => format!("{entity} not found"),
            Self::Unauthorized(_) => "Please log in again.".to_string(),
            Self::Forbidden(_) => "You do not have permission to do that.".to_string(),
            Self::Internal(_) => "Something went wrong. Please try again.".to_string(),
        }
    }

    /// Whether the error means the session is no longer valid.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_is_shown_verbatim() {
        let err = CoreError::Validation("Please select a deadline".into());
        assert_eq!(err.user_message(), "Please select a deadline");
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let err = CoreError::Internal("connection reset by peer".into());
        assert!(!err.user_message().contains("connection reset"));
    }

    #[test]
    fn not_found_display_includes_entity_and_id() {
        let err = CoreError::NotFound {
            entity: "Product",
            id: 42,
        };
        assert_eq!(err.to_string(), "Entity not found: Product with id 42");
        assert_eq!(err.user_message(), "Product not found");
    }

    #[test]
    fn unauthorized_is_detected() {
        assert!(CoreError::Unauthorized("expired".into()).is_unauthorized());
        assert!(!CoreError::Forbidden("company only".into()).is_unauthorized());
    }
}
