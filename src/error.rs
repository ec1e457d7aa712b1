//! Error types for the helpdesk routing layer
//!
//! Each variant maps to one failure category so callers can distinguish
//! recoverable paths (classification, retrieval) from session-lifecycle
//! errors that must be handled by the transport layer.

use thiserror::Error;

/// Main error type for helpdesk operations
#[derive(Error, Debug)]
pub enum HelpdeskError {
    /// Session is past its inactivity timeout and has been removed
    #[error("Session {session_id} has expired")]
    SessionExpired { session_id: String },

    /// No session exists under the given id
    #[error("Session {session_id} not found")]
    SessionNotFound { session_id: String },

    /// Session reached its configured maximum number of turns
    #[error("Session {session_id} has reached its maximum size limit ({max_turns} turns)")]
    SessionFull {
        session_id: String,
        max_turns: usize,
    },

    /// Session id is empty or otherwise malformed
    #[error("Invalid session id: {session_id:?}")]
    InvalidSessionId { session_id: String },

    /// Intent classification failed (provider unreachable or invalid output)
    #[error("Classification error: {0}")]
    Classification(String),

    /// Retriever unavailable or a retrieval call failed
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Completion provider failed during answer synthesis
    #[error("Generation error: {0}")]
    Generation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for helpdesk operations
pub type Result<T> = std::result::Result<T, HelpdeskError>;

impl From<reqwest::Error> for HelpdeskError {
    fn from(e: reqwest::Error) -> Self {
        HelpdeskError::Generation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = HelpdeskError::SessionExpired {
            session_id: "abc-123".to_string(),
        };
        assert_eq!(error.to_string(), "Session abc-123 has expired");

        let full = HelpdeskError::SessionFull {
            session_id: "abc-123".to_string(),
            max_turns: 1000,
        };
        assert!(full.to_string().contains("1000 turns"));

        let retrieval = HelpdeskError::Retrieval("store offline".to_string());
        assert_eq!(retrieval.to_string(), "Retrieval error: store offline");
    }

    #[test]
    fn test_session_variants_are_distinct() {
        let expired = HelpdeskError::SessionExpired {
            session_id: "s".to_string(),
        };
        let missing = HelpdeskError::SessionNotFound {
            session_id: "s".to_string(),
        };
        assert!(matches!(expired, HelpdeskError::SessionExpired { .. }));
        assert!(matches!(missing, HelpdeskError::SessionNotFound { .. }));
    }
}
