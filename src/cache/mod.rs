//! TTL cache for LLM responses and retrieval results
//!
//! Two logical namespaces share one store: `query_response` for cached
//! final answers and `vector_store` for cached retrieval results. Keys are
//! deterministic digests, so clearing one namespace never affects the other.

pub mod entry;
pub mod key;
pub mod store;

pub use entry::{CacheEntry, CacheValue};
pub use key::{cache_key, PURPOSE_QUERY_RESPONSE, PURPOSE_VECTOR_STORE};
pub use store::{CacheStats, TtlCache};
