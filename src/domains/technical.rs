//! Technical support service, pure retrieval
//!
//! Every query retrieves fresh documents from the knowledge base; final
//! responses are never cached because technical information changes often.
//! Only the retrieved document set is cached, with a short TTL, to avoid
//! duplicate retrieval latency.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::warn;

use crate::cache::TtlCache;
use crate::domains::{build_messages, format_sources, DomainService};
use crate::error::{HelpdeskError, Result};
use crate::llm::{ChatMessage, CompletionProvider, TokenStream};
use crate::retrieval::Retriever;
use crate::router::DomainKind;
use crate::session::Turn;

const COLLECTION: &str = "technical";
const NO_DOCS_CONTEXT: &str = "No relevant technical documentation found.";

const SYSTEM_PROMPT: &str = "You are a knowledgeable technical support agent.
Use the following technical documentation, bug reports, and forum posts to help the customer.

Guidelines:
- Provide step-by-step troubleshooting when appropriate
- Reference specific error codes or messages if mentioned
- Suggest workarounds for known issues
- Be clear about what is a confirmed bug vs. expected behavior
- Cite which source (by number) you're using if helpful

Technical Knowledge Base:
{context}";

pub struct TechnicalService {
    provider: Arc<dyn CompletionProvider>,
    retriever: Option<Arc<dyn Retriever>>,
    cache: Arc<TtlCache>,
    retrieval_k: usize,
    document_ttl: Duration,
    history_window: usize,
}

impl TechnicalService {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        retriever: Option<Arc<dyn Retriever>>,
        cache: Arc<TtlCache>,
    ) -> Self {
        Self {
            provider,
            retriever,
            cache,
            retrieval_k: 5,
            // Short TTL, technical docs churn
            document_ttl: Duration::from_secs(1800),
            // Technical issues need more disambiguating context
            history_window: 4,
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

    fn require_retriever(&self) -> Result<Arc<dyn Retriever>> {
        self.retriever.clone().ok_or_else(|| {
            HelpdeskError::Retrieval(
                "technical retriever not configured; run data ingestion first".to_string(),
            )
        })
    }

    /// Retrieve context documents, consulting the document cache first.
    /// Retrieval failure degrades to an explicit no-documentation context.
    async fn assemble_context(&self, retriever: &Arc<dyn Retriever>, query: &str) -> String {
        if let Some(docs) = self.cache.get_documents(query, COLLECTION, self.retrieval_k).await {
            let context = format_sources(&docs, true);
            return if context.is_empty() {
                NO_DOCS_CONTEXT.to_string()
            } else {
                context
            };
        }

        match retriever.query(query, self.retrieval_k).await {
            Ok(docs) => {
                self.cache
                    .set_documents(query, COLLECTION, self.retrieval_k, docs.clone(), self.document_ttl)
                    .await;
                let context = format_sources(&docs, true);
                if context.is_empty() {
                    NO_DOCS_CONTEXT.to_string()
                } else {
                    context
                }
            }
            Err(e) => {
                warn!(error = %e, "could not retrieve technical documents");
                NO_DOCS_CONTEXT.to_string()
            }
        }
    }

    fn messages_for(&self, context: &str, history: &[Turn], query: &str) -> Vec<ChatMessage> {
        let system_prompt = SYSTEM_PROMPT.replace("{context}", context);
        build_messages(&system_prompt, history, self.history_window, query)
    }
}

#[async_trait]
impl DomainService for TechnicalService {
    fn kind(&self) -> DomainKind {
        DomainKind::Technical
    }

    async fn answer(&self, query: &str, _session_id: &str, history: &[Turn]) -> Result<String> {
        let retriever = self.require_retriever()?;
        let context = self.assemble_context(&retriever, query).await;
        let messages = self.messages_for(&context, history, query);
        self.provider.complete(&messages).await
    }

    fn stream(&self, query: &str, _session_id: &str, history: &[Turn]) -> TokenStream {
        let query = query.to_string();
        let history = history.to_vec();
        let provider = self.provider.clone();
        let retriever = self.require_retriever();
        let cache = self.cache.clone();
        let retrieval_k = self.retrieval_k;
        let document_ttl = self.document_ttl;
        let history_window = self.history_window;

        Box::pin(async_stream::stream! {
            let retriever = match retriever {
                Ok(retriever) => retriever,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let context = match cache.get_documents(&query, COLLECTION, retrieval_k).await {
                Some(docs) => format_sources(&docs, true),
                None => match retriever.query(&query, retrieval_k).await {
                    Ok(docs) => {
                        cache
                            .set_documents(&query, COLLECTION, retrieval_k, docs.clone(), document_ttl)
                            .await;
                        format_sources(&docs, true)
                    }
                    Err(e) => {
                        warn!(error = %e, "could not retrieve technical documents");
                        String::new()
                    }
                },
            };
            let context = if context.is_empty() {
                NO_DOCS_CONTEXT.to_string()
            } else {
                context
            };

            let system_prompt = SYSTEM_PROMPT.replace("{context}", &context);
            let messages = build_messages(&system_prompt, &history, history_window, &query);

            let mut inner = provider.stream_complete(messages);
            while let Some(item) = inner.next().await {
                yield item;
            }
        })
    }
}
