//! Shared test doubles for the completion provider and retriever contracts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use helpdesk::error::{HelpdeskError, Result};
use helpdesk::llm::{ChatMessage, CompletionProvider, TokenStream};
use helpdesk::retrieval::{DocSnippet, Retriever};

/// Completion provider replaying a scripted reply queue.
///
/// Each call (completion or stream) consumes the next reply. Streaming
/// replies are split into word chunks to exercise multi-fragment paths.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
    completion_calls: AtomicUsize,
    stream_calls: AtomicUsize,
}

enum ScriptedReply {
    Text(String),
    Failure(String),
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            completion_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
        }
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Text(text.to_string()));
        self
    }

    pub fn failure(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Failure(message.to_string()));
        self
    }

    pub fn completion_calls(&self) -> usize {
        self.completion_calls.load(Ordering::SeqCst)
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    fn next_reply(&self) -> ScriptedReply {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ScriptedReply::Failure("script exhausted".to_string()))
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        self.completion_calls.fetch_add(1, Ordering::SeqCst);
        match self.next_reply() {
            ScriptedReply::Text(text) => Ok(text),
            ScriptedReply::Failure(message) => Err(HelpdeskError::Generation(message)),
        }
    }

    fn stream_complete(&self, _messages: Vec<ChatMessage>) -> TokenStream {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        match self.next_reply() {
            ScriptedReply::Text(text) => {
                let chunks: Vec<Result<String>> = text
                    .split_inclusive(' ')
                    .map(|chunk| Ok(chunk.to_string()))
                    .collect();
                Box::pin(futures::stream::iter(chunks))
            }
            ScriptedReply::Failure(message) => Box::pin(futures::stream::iter(vec![Err(
                HelpdeskError::Generation(message),
            )])),
        }
    }
}

/// Retriever serving a fixed document set and counting calls.
pub struct StaticRetriever {
    docs: Vec<DocSnippet>,
    calls: AtomicUsize,
}

impl StaticRetriever {
    pub fn new(docs: Vec<DocSnippet>) -> Self {
        Self {
            docs,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn query(&self, _text: &str, k: usize) -> Result<Vec<DocSnippet>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.docs.iter().take(k).cloned().collect())
    }
}

/// Retriever that always fails.
pub struct FailingRetriever;

#[async_trait]
impl Retriever for FailingRetriever {
    async fn query(&self, _text: &str, _k: usize) -> Result<Vec<DocSnippet>> {
        Err(HelpdeskError::Retrieval("vector store offline".to_string()))
    }
}
