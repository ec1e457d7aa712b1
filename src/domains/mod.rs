//! Domain specialist services
//!
//! Three services share one interface and differ only in retrieval and
//! caching policy: technical is pure retrieval (always fresh documents,
//! responses never cached), policy is pure static context (no retrieval,
//! no caching), and billing is hybrid (retrieval plus response caching for
//! history-free queries).

pub mod billing;
pub mod policy;
pub mod technical;

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::{ChatMessage, TokenStream};
use crate::retrieval::DocSnippet;
use crate::router::DomainKind;
use crate::session::{Role, Turn};

pub use billing::BillingService;
pub use policy::PolicyService;
pub use technical::TechnicalService;

/// A domain specialist producing answers for one support domain
#[async_trait]
pub trait DomainService: Send + Sync {
    fn kind(&self) -> DomainKind;

    /// Produce a full response for a query given optional history.
    async fn answer(&self, query: &str, session_id: &str, history: &[Turn]) -> Result<String>;

    /// Open a token stream for a query. The stream is finite and ends when
    /// generation completes; errors surface as one `Err` item.
    fn stream(&self, query: &str, session_id: &str, history: &[Turn]) -> TokenStream;
}

/// Format retrieved documents as numbered, source-annotated context.
pub(crate) fn format_sources(docs: &[DocSnippet], include_type: bool) -> String {
    docs.iter()
        .enumerate()
        .map(|(i, doc)| {
            let n = i + 1;
            let source = &doc.metadata.source;
            if include_type {
                let doc_type = doc.metadata.doc_type.as_deref().unwrap_or("document");
                format!("[Source {n} - {doc_type} from {source}]\n{}", doc.page_content)
            } else {
                format!("[Source {n} - {source}]\n{}", doc.page_content)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Assemble the provider message list: system instruction, the last
/// `window` history turns, then the query as the final user turn.
pub(crate) fn build_messages(
    system_prompt: &str,
    history: &[Turn],
    window: usize,
    query: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(window + 2);
    messages.push(ChatMessage::system(system_prompt));

    let start = history.len().saturating_sub(window);
    for turn in &history[start..] {
        messages.push(match turn.role {
            Role::User => ChatMessage::user(turn.content.clone()),
            Role::Assistant => ChatMessage::assistant(turn.content.clone()),
        });
    }

    messages.push(ChatMessage::user(query));
    messages
}
