//! Intent classification
//!
//! One completion call maps a customer query to a support domain. Any
//! unrecognized label or provider failure falls back to the technical
//! domain — the broadest, lowest-risk bucket for misclassified queries —
//! so classification never surfaces an error.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::llm::{ChatMessage, CompletionProvider};

/// Support domain handling a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainKind {
    Billing,
    Technical,
    Policy,
}

impl DomainKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainKind::Billing => "billing",
            DomainKind::Technical => "technical",
            DomainKind::Policy => "policy",
        }
    }

    /// Parse a classifier label after trim and lowercase normalization.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "billing" => Some(DomainKind::Billing),
            "technical" => Some(DomainKind::Technical),
            "policy" => Some(DomainKind::Policy),
            _ => None,
        }
    }
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const ROUTING_PROMPT: &str = "You are a routing assistant for a customer service system.
Analyze the following customer query and determine which department should handle it.

Departments:
- billing: Questions about pricing, invoices, payments, refunds, billing cycles
- technical: Questions about product features, bugs, troubleshooting, how-to questions
- policy: Questions about terms of service, privacy policy, legal compliance, account policies

Customer Query: {query}

Respond with ONLY one word: billing, technical, or policy";

/// Classifies queries into support domains
#[derive(Clone)]
pub struct IntentRouter {
    provider: Arc<dyn CompletionProvider>,
}

impl IntentRouter {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Classify a query. Falls back to [`DomainKind::Technical`] on any
    /// provider failure or unrecognized label; never returns an error.
    pub async fn classify(&self, query: &str) -> DomainKind {
        let prompt = ROUTING_PROMPT.replace("{query}", query);
        let messages = [ChatMessage::user(prompt)];

        match self.provider.complete(&messages).await {
            Ok(output) => match DomainKind::from_label(&output) {
                Some(kind) => {
                    debug!(domain = %kind, "classified query");
                    kind
                }
                None => {
                    warn!(output = %output.trim(), "unrecognized intent label, defaulting to technical");
                    DomainKind::Technical
                }
            },
            Err(e) => {
                warn!(error = %e, "intent classification failed, defaulting to technical");
                DomainKind::Technical
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HelpdeskError, Result};
    use crate::llm::TokenStream;
    use async_trait::async_trait;

    struct FixedProvider {
        reply: Result<String>,
    }

    impl FixedProvider {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(HelpdeskError::Generation("provider down".to_string())),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for FixedProvider {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            match &self.reply {
                Ok(s) => Ok(s.clone()),
                Err(e) => Err(HelpdeskError::Generation(e.to_string())),
            }
        }

        fn stream_complete(&self, _messages: Vec<ChatMessage>) -> TokenStream {
            Box::pin(futures::stream::empty())
        }
    }

    #[test]
    fn test_from_label_normalizes() {
        assert_eq!(DomainKind::from_label("  Billing \n"), Some(DomainKind::Billing));
        assert_eq!(DomainKind::from_label("POLICY"), Some(DomainKind::Policy));
        assert_eq!(DomainKind::from_label("refund"), None);
        assert_eq!(DomainKind::from_label(""), None);
    }

    #[tokio::test]
    async fn test_classify_recognized_labels() {
        for (reply, expected) in [
            ("billing", DomainKind::Billing),
            ("Technical", DomainKind::Technical),
            (" policy ", DomainKind::Policy),
        ] {
            let router = IntentRouter::new(Arc::new(FixedProvider::ok(reply)));
            assert_eq!(router.classify("some query").await, expected);
        }
    }

    #[tokio::test]
    async fn test_classify_defaults_on_unrecognized_label() {
        let router = IntentRouter::new(Arc::new(FixedProvider::ok("refund")));
        assert_eq!(router.classify("query").await, DomainKind::Technical);

        let router = IntentRouter::new(Arc::new(FixedProvider::ok("")));
        assert_eq!(router.classify("query").await, DomainKind::Technical);
    }

    #[tokio::test]
    async fn test_classify_defaults_on_provider_error() {
        let router = IntentRouter::new(Arc::new(FixedProvider::failing()));
        assert_eq!(router.classify("query").await, DomainKind::Technical);
    }
}
