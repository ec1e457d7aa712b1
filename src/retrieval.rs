//! Similarity-retrieval contract
//!
//! The vector search backend is an external collaborator; the routing layer
//! only depends on this narrow interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Metadata attached to a retrieved document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocMetadata {
    /// Where the document came from (file name, ticket id, URL)
    pub source: String,
    /// Optional kind of document (bug report, forum post, manual page)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
}

/// One document returned by a similarity query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocSnippet {
    pub page_content: String,
    pub metadata: DocMetadata,
}

impl DocSnippet {
    pub fn new(page_content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: DocMetadata {
                source: source.into(),
                doc_type: None,
            },
        }
    }

    pub fn with_doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.metadata.doc_type = Some(doc_type.into());
        self
    }
}

/// Similarity search over an embedded document collection.
///
/// `query` returns up to `k` documents ordered by relevance. An empty result
/// is valid; implementations must not be assumed infallible.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn query(&self, text: &str, k: usize) -> Result<Vec<DocSnippet>>;
}
