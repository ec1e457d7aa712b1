//! Application settings
//!
//! Settings can be constructed from environment variables or built in code.
//! Defaults follow the production deployment values: 1 hour response TTL,
//! 2 hour billing document TTL, 30 minute technical document TTL, 24 hour
//! session inactivity timeout and 1000 turns per session.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{HelpdeskError, Result};

/// Application settings for the helpdesk stack
#[derive(Debug, Clone)]
pub struct Settings {
    /// API key for the completion provider
    pub openai_api_key: String,

    /// Model identifier for answer generation and classification
    pub openai_model: String,

    /// Base URL of the OpenAI-compatible endpoint
    pub openai_base_url: String,

    /// Directory containing the static policy documents
    pub policy_docs_dir: PathBuf,

    /// TTL for cached final responses (billing only)
    pub response_ttl: Duration,

    /// TTL for cached billing retrieval results
    pub billing_document_ttl: Duration,

    /// TTL for cached technical retrieval results
    pub technical_document_ttl: Duration,

    /// Number of documents retrieved per billing query
    pub billing_retrieval_k: usize,

    /// Number of documents retrieved per technical query
    pub technical_retrieval_k: usize,

    /// Inactivity timeout before a session expires
    pub session_timeout: Duration,

    /// Maximum number of turns per session
    pub max_session_turns: usize,

    /// Interval between background cleanup sweeps
    pub maintenance_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            policy_docs_dir: PathBuf::from("./data/policy"),
            response_ttl: Duration::from_secs(3600),
            billing_document_ttl: Duration::from_secs(7200),
            technical_document_ttl: Duration::from_secs(1800),
            billing_retrieval_k: 4,
            technical_retrieval_k: 5,
            session_timeout: Duration::from_secs(24 * 3600),
            max_session_turns: 1000,
            maintenance_interval: Duration::from_secs(3600),
        }
    }
}

impl Settings {
    /// Load settings from environment variables, falling back to defaults
    /// for everything except the API key.
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();

        settings.openai_api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| HelpdeskError::Config("OPENAI_API_KEY is not set".to_string()))?;

        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            settings.openai_model = model;
        }
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            settings.openai_base_url = base_url;
        }
        if let Ok(dir) = std::env::var("POLICY_DOCS_DIR") {
            settings.policy_docs_dir = PathBuf::from(dir);
        }
        if let Ok(hours) = std::env::var("SESSION_TIMEOUT_HOURS") {
            let hours: u64 = hours
                .parse()
                .map_err(|_| HelpdeskError::Config("SESSION_TIMEOUT_HOURS must be an integer".to_string()))?;
            settings.session_timeout = Duration::from_secs(hours * 3600);
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.openai_api_key.trim().is_empty() {
            return Err(HelpdeskError::Config(
                "completion provider API key is empty".to_string(),
            ));
        }
        if self.max_session_turns == 0 {
            return Err(HelpdeskError::Config(
                "max_session_turns must be greater than 0".to_string(),
            ));
        }
        if self.billing_retrieval_k == 0 || self.technical_retrieval_k == 0 {
            return Err(HelpdeskError::Config(
                "retrieval k must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.response_ttl, Duration::from_secs(3600));
        assert_eq!(settings.billing_document_ttl, Duration::from_secs(7200));
        assert_eq!(settings.technical_document_ttl, Duration::from_secs(1800));
        assert_eq!(settings.billing_retrieval_k, 4);
        assert_eq!(settings.technical_retrieval_k, 5);
        assert_eq!(settings.max_session_turns, 1000);
    }

    #[test]
    fn test_validate_rejects_empty_api_key() {
        let settings = Settings::default();
        assert!(matches!(
            settings.validate(),
            Err(HelpdeskError::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let settings = Settings {
            openai_api_key: "key".to_string(),
            max_session_turns: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        let settings = Settings {
            openai_api_key: "key".to_string(),
            billing_retrieval_k: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
