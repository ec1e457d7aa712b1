//! Billing support service, hybrid retrieval plus response caching
//!
//! Retrieves pricing and invoice documents like the technical service, but
//! with a longer document TTL (pricing changes less often) and a response
//! cache for history-free queries. A request that carries conversation
//! history is context-dependent, so it never reads or writes the response
//! cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::domains::{build_messages, format_sources, DomainService};
use crate::error::Result;
use crate::llm::{ChatMessage, CompletionProvider, TokenStream};
use crate::retrieval::Retriever;
use crate::router::DomainKind;
use crate::session::Turn;

const COLLECTION: &str = "billing";
const FALLBACK_CONTEXT: &str = "Billing documentation not yet indexed.";

const SYSTEM_PROMPT: &str = "You are a helpful billing support agent.
Use the following billing documentation to answer the customer's question.

Guidelines:
- Provide clear, accurate pricing information
- Explain billing cycles and payment methods
- Help with invoice questions
- Be transparent about costs and fees

Billing Documentation:
{context}";

pub struct BillingService {
    provider: Arc<dyn CompletionProvider>,
    retriever: Option<Arc<dyn Retriever>>,
    cache: Arc<TtlCache>,
    retrieval_k: usize,
    document_ttl: Duration,
    response_ttl: Duration,
    history_window: usize,
}

impl BillingService {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        retriever: Option<Arc<dyn Retriever>>,
        cache: Arc<TtlCache>,
    ) -> Self {
        if retriever.is_none() {
            warn!("billing retriever not available, answers fall back to empty context");
        }
        Self {
            provider,
            retriever,
            cache,
            retrieval_k: 4,
            // Pricing changes less often than technical docs
            document_ttl: Duration::from_secs(7200),
            response_ttl: Duration::from_secs(3600),
            history_window: 3,
        }
    }

    pub fn with_retrieval_k(mut self, k: usize) -> Self {
        self.retrieval_k = k;
        self
    }

    pub fn with_document_ttl(mut self, ttl: Duration) -> Self {
        self.document_ttl = ttl;
        self
    }

    pub fn with_response_ttl(mut self, ttl: Duration) -> Self {
        self.response_ttl = ttl;
        self
    }

    /// Retrieve billing context, consulting the document cache first.
    /// A missing retriever or a failed retrieval degrades to the fallback
    /// context instead of failing the request.
    async fn assemble_context(&self, query: &str) -> String {
        let Some(retriever) = &self.retriever else {
            return FALLBACK_CONTEXT.to_string();
        };

        if let Some(docs) = self.cache.get_documents(query, COLLECTION, self.retrieval_k).await {
            let context = format_sources(&docs, false);
            return if context.is_empty() {
                FALLBACK_CONTEXT.to_string()
            } else {
                context
            };
        }

        match retriever.query(query, self.retrieval_k).await {
            Ok(docs) => {
                self.cache
                    .set_documents(query, COLLECTION, self.retrieval_k, docs.clone(), self.document_ttl)
                    .await;
                let context = format_sources(&docs, false);
                if context.is_empty() {
                    FALLBACK_CONTEXT.to_string()
                } else {
                    context
                }
            }
            Err(e) => {
                warn!(error = %e, "could not retrieve billing documents");
                FALLBACK_CONTEXT.to_string()
            }
        }
    }

    fn messages_for(&self, context: &str, history: &[Turn], query: &str) -> Vec<ChatMessage> {
        let system_prompt = SYSTEM_PROMPT.replace("{context}", context);
        build_messages(&system_prompt, history, self.history_window, query)
    }
}

#[async_trait]
impl DomainService for BillingService {
    fn kind(&self) -> DomainKind {
        DomainKind::Billing
    }

    async fn answer(&self, query: &str, session_id: &str, history: &[Turn]) -> Result<String> {
        // A request with history is context-dependent: skip the response
        // cache entirely, both read and write.
        if history.is_empty() {
            if let Some(cached) = self
                .cache
                .get_query_response(query, session_id, COLLECTION)
                .await
            {
                debug!(session_id, "response cache hit for billing query");
                return Ok(cached);
            }
        }

        let context = self.assemble_context(query).await;
        let messages = self.messages_for(&context, history, query);
        let response = self.provider.complete(&messages).await?;

        if history.is_empty() {
            self.cache
                .set_query_response(query, session_id, COLLECTION, &response, self.response_ttl)
                .await;
        }

        Ok(response)
    }

    fn stream(&self, query: &str, session_id: &str, history: &[Turn]) -> TokenStream {
        let query = query.to_string();
        let session_id = session_id.to_string();
        let history = history.to_vec();
        let provider = self.provider.clone();
        let retriever = self.retriever.clone();
        let cache = self.cache.clone();
        let retrieval_k = self.retrieval_k;
        let document_ttl = self.document_ttl;
        let response_ttl = self.response_ttl;
        let history_window = self.history_window;

        Box::pin(async_stream::stream! {
            let context = match &retriever {
                None => FALLBACK_CONTEXT.to_string(),
                Some(retriever) => {
                    let docs = match cache.get_documents(&query, COLLECTION, retrieval_k).await {
                        Some(docs) => Some(docs),
                        None => match retriever.query(&query, retrieval_k).await {
                            Ok(docs) => {
                                cache
                                    .set_documents(&query, COLLECTION, retrieval_k, docs.clone(), document_ttl)
                                    .await;
                                Some(docs)
                            }
                            Err(e) => {
                                warn!(error = %e, "could not retrieve billing documents");
                                None
                            }
                        },
                    };
                    match docs {
                        Some(docs) if !docs.is_empty() => format_sources(&docs, false),
                        _ => FALLBACK_CONTEXT.to_string(),
                    }
                }
            };

            let system_prompt = SYSTEM_PROMPT.replace("{context}", &context);
            let messages = build_messages(&system_prompt, &history, history_window, &query);

            let mut full_response = String::new();
            let mut inner = provider.stream_complete(messages);
            while let Some(item) = inner.next().await {
                match item {
                    Ok(chunk) => {
                        full_response.push_str(&chunk);
                        yield Ok(chunk);
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            // Same policy as the synchronous path: cache only history-free
            // responses, and only after a clean stream completion.
            if history.is_empty() && !full_response.is_empty() {
                cache
                    .set_query_response(&query, &session_id, COLLECTION, &full_response, response_ttl)
                    .await;
            }
        })
    }
}
