//! # Helpdesk
//!
//! A customer-support query pipeline that routes each message to one of
//! three specialist domains, each with its own retrieval and caching
//! strategy.
//!
//! ## Features
//!
//! - Intent classification with a safe default domain on any failure
//! - Per-domain caching policy: pure retrieval (technical), static
//!   context (policy), hybrid with response caching (billing)
//! - Sharded TTL cache with hit/miss statistics
//! - In-memory session store with inactivity expiry and turn caps
//! - Equivalent synchronous and streaming response paths
//! - Background expiry sweeps with clean shutdown
//!
//! ## Quick start
//!
//! ```no_run
//! use helpdesk::config::Settings;
//! use helpdesk::dispatch::ServiceStack;
//!
//! #[tokio::main]
//! async fn main() -> helpdesk::Result<()> {
//!     let settings = Settings::from_env()?;
//!     let stack = ServiceStack::from_settings(&settings, None, None)?;
//!
//!     let outcome = stack.process("Why was I charged twice?", None).await?;
//!     println!("[{}] {}", outcome.domain, outcome.response);
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming
//!
//! ```no_run
//! use futures::StreamExt;
//! use helpdesk::config::Settings;
//! use helpdesk::dispatch::ServiceStack;
//!
//! #[tokio::main]
//! async fn main() -> helpdesk::Result<()> {
//!     let settings = Settings::from_env()?;
//!     let stack = ServiceStack::from_settings(&settings, None, None)?;
//!
//!     let mut fragments = stack
//!         .stream_process("How do I reset my password?", None)
//!         .await?;
//!     while let Some(fragment) = fragments.next().await {
//!         print!("{}", fragment.content);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod docs;
pub mod domains;
pub mod error;
pub mod llm;
pub mod maintenance;
pub mod retrieval;
pub mod router;
pub mod session;

// Re-export main types for convenience
pub use cache::{CacheEntry, CacheStats, CacheValue, TtlCache};
pub use config::Settings;
pub use dispatch::{DispatchOutcome, Dispatcher, ServiceStack, StreamFragment};
pub use docs::StaticContextStore;
pub use domains::{BillingService, DomainService, PolicyService, TechnicalService};
pub use error::{HelpdeskError, Result};
pub use llm::{ChatMessage, ChatRole, CompletionProvider, OpenAiProvider, TokenStream};
pub use retrieval::{DocMetadata, DocSnippet, Retriever};
pub use router::{DomainKind, IntentRouter};
pub use session::{Role, SessionConfig, SessionInfo, SessionStore, Turn};
