//! Policy support service, preloaded context
//!
//! Policy documents are small and stable, so the whole corpus rides in the
//! system prompt. No retrieval, no response cache, no per-query variance
//! beyond the prompt itself.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;

use crate::docs::StaticContextStore;
use crate::domains::{build_messages, DomainService};
use crate::error::Result;
use crate::llm::{ChatMessage, CompletionProvider, TokenStream};
use crate::router::DomainKind;
use crate::session::Turn;

const SYSTEM_PROMPT: &str = "You are a policy and compliance support agent.
Use the following policy documents to answer the customer's question.

Guidelines:
- Provide accurate information based on the policies
- Quote specific sections when relevant
- Be clear and professional
- If information isn't in the policies, say so clearly
- For legal questions, remind users to consult legal counsel for specific advice

Policy Documents:
{context}";

pub struct PolicyService {
    provider: Arc<dyn CompletionProvider>,
    context_store: Arc<StaticContextStore>,
    history_window: usize,
}

impl PolicyService {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        context_store: Arc<StaticContextStore>,
    ) -> Self {
        Self {
            provider,
            context_store,
            history_window: 3,
        }
    }

    /// Re-read the policy directory, replacing the in-memory context.
    /// Subsequent queries pick up the new documents immediately.
    pub fn reload_documents(&self) {
        self.context_store.reload();
    }

    fn messages_for(&self, history: &[Turn], query: &str) -> Vec<ChatMessage> {
        let system_prompt = SYSTEM_PROMPT.replace("{context}", &self.context_store.context());
        build_messages(&system_prompt, history, self.history_window, query)
    }
}

#[async_trait]
impl DomainService for PolicyService {
    fn kind(&self) -> DomainKind {
        DomainKind::Policy
    }

    async fn answer(&self, query: &str, _session_id: &str, history: &[Turn]) -> Result<String> {
        let messages = self.messages_for(history, query);
        self.provider.complete(&messages).await
    }

    fn stream(&self, query: &str, _session_id: &str, history: &[Turn]) -> TokenStream {
        let messages = self.messages_for(history, query);
        let provider = self.provider.clone();

        Box::pin(async_stream::stream! {
            let mut inner = provider.stream_complete(messages);
            while let Some(item) = inner.next().await {
                yield item;
            }
        })
    }
}
