//! Conversation session store
//!
//! Sessions hold the per-conversation turn log, expire after a period of
//! inactivity (default 24 hours) and are capped at a maximum number of
//! turns (default 1000). The store is shared across concurrent requests
//! behind a single `RwLock`; callers are expected to serialize turns within
//! one session, and the coarse lock is the current scalability ceiling —
//! sharding by session id is the next step if contention shows up.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{HelpdeskError, Result};

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A conversation session
#[derive(Debug, Clone)]
struct Session {
    id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    turns: Vec<Turn>,
}

impl Session {
    fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            updated_at: now,
            turns: Vec::new(),
        }
    }

    fn is_expired(&self, timeout: Duration) -> bool {
        let timeout = chrono::Duration::from_std(timeout)
            .unwrap_or_else(|_| chrono::Duration::hours(24));
        Utc::now() > self.updated_at + timeout
    }
}

/// Session metadata without the full turn log
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub turn_count: usize,
}

/// Configuration for the session store
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Inactivity timeout before a session expires
    pub inactivity_timeout: Duration,
    /// Maximum number of turns per session
    pub max_turns: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: Duration::from_secs(24 * 3600),
            max_turns: 1000,
        }
    }
}

/// In-memory store of conversation sessions
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    config: SessionConfig,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    fn validate_id(session_id: &str) -> Result<()> {
        if session_id.trim().is_empty() {
            return Err(HelpdeskError::InvalidSessionId {
                session_id: session_id.to_string(),
            });
        }
        Ok(())
    }

    /// Get an existing live session or create a new one.
    ///
    /// Client-supplied ids are honored: a missing session is created under
    /// the given id, and an expired one is deleted and recreated fresh
    /// under the same id. Without an id a new UUID session is created.
    pub async fn get_or_create(&self, session_id: Option<&str>) -> Result<String> {
        self.sweep_expired().await;

        if let Some(id) = session_id {
            Self::validate_id(id)?;
        }

        let mut sessions = self.sessions.write().await;

        if let Some(id) = session_id {
            match sessions.get(id) {
                Some(session) if session.is_expired(self.config.inactivity_timeout) => {
                    info!(session_id = id, "session expired, creating fresh session");
                    sessions.remove(id);
                }
                Some(_) => return Ok(id.to_string()),
                None => {}
            }
        }

        let new_id = session_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        sessions.insert(new_id.clone(), Session::new(&new_id));
        debug!(session_id = %new_id, "created new session");
        Ok(new_id)
    }

    /// Get the conversation history for a session.
    pub async fn history(&self, session_id: &str) -> Result<Vec<Turn>> {
        Self::validate_id(session_id)?;

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get(session_id)
            .ok_or_else(|| HelpdeskError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;

        if session.is_expired(self.config.inactivity_timeout) {
            info!(session_id, "session expired");
            sessions.remove(session_id);
            return Err(HelpdeskError::SessionExpired {
                session_id: session_id.to_string(),
            });
        }

        Ok(session.turns.clone())
    }

    /// Append a turn to a session, creating the session if absent.
    pub async fn add_message(
        &self,
        session_id: &str,
        role: Role,
        content: impl Into<String>,
    ) -> Result<()> {
        Self::validate_id(session_id)?;

        let mut sessions = self.sessions.write().await;

        if let Some(session) = sessions.get(session_id) {
            if session.is_expired(self.config.inactivity_timeout) {
                info!(session_id, "session expired during message add");
                sessions.remove(session_id);
                return Err(HelpdeskError::SessionExpired {
                    session_id: session_id.to_string(),
                });
            }
        } else {
            debug!(session_id, "creating session on first message");
            sessions.insert(session_id.to_string(), Session::new(session_id));
        }

        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| HelpdeskError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;

        if session.turns.len() >= self.config.max_turns {
            warn!(session_id, "session reached maximum size limit");
            return Err(HelpdeskError::SessionFull {
                session_id: session_id.to_string(),
                max_turns: self.config.max_turns,
            });
        }

        session.turns.push(Turn::new(role, content));
        session.updated_at = Utc::now();
        Ok(())
    }

    /// Delete a session. Idempotent.
    pub async fn delete(&self, session_id: &str) -> Result<()> {
        Self::validate_id(session_id)?;
        let mut sessions = self.sessions.write().await;
        if sessions.remove(session_id).is_some() {
            info!(session_id, "deleted session");
        }
        Ok(())
    }

    /// Clear a session's turn log, keeping the session alive. Idempotent.
    pub async fn clear_messages(&self, session_id: &str) -> Result<()> {
        Self::validate_id(session_id)?;
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(session_id) {
            session.turns.clear();
            session.updated_at = Utc::now();
            info!(session_id, "cleared session messages");
        }
        Ok(())
    }

    /// Session metadata without the turn log, or None if absent.
    pub async fn session_info(&self, session_id: &str) -> Option<SessionInfo> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(|session| SessionInfo {
            id: session.id.clone(),
            created_at: session.created_at,
            updated_at: session.updated_at,
            turn_count: session.turns.len(),
        })
    }

    /// Ids of all live sessions.
    pub async fn active_sessions(&self) -> Vec<String> {
        self.sweep_expired().await;
        let sessions = self.sessions.read().await;
        sessions.keys().cloned().collect()
    }

    /// Remove all expired sessions, returning the number removed.
    pub async fn sweep_expired(&self) -> usize {
        let timeout = self.config.inactivity_timeout;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(timeout));
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "swept expired sessions");
        }
        removed
    }
}
