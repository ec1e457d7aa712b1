//! Query dispatch
//!
//! The dispatcher binds the intent router to the three domain services.
//! Classification happens once per request on the latest user message, then
//! the full request is forwarded to exactly one service. Domain failures
//! are converted into customer-facing apology text, so a dispatched request
//! always produces a well-formed response.

use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::cache::TtlCache;
use crate::config::Settings;
use crate::docs::StaticContextStore;
use crate::domains::{BillingService, DomainService, PolicyService, TechnicalService};
use crate::error::Result;
use crate::llm::{CompletionProvider, OpenAiProvider};
use crate::retrieval::Retriever;
use crate::router::{DomainKind, IntentRouter};
use crate::session::{Role, SessionConfig, SessionStore, Turn};

/// Result of a dispatched request
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub domain: DomainKind,
    pub response: String,
    pub session_id: String,
}

/// Phase of one request's trip through the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Routing,
    Billing,
    Technical,
    Policy,
    Done,
}

impl DispatchPhase {
    fn for_domain(kind: DomainKind) -> Self {
        match kind {
            DomainKind::Billing => DispatchPhase::Billing,
            DomainKind::Technical => DispatchPhase::Technical,
            DomainKind::Policy => DispatchPhase::Policy,
        }
    }
}

/// Per-request working state, discarded when the request completes.
/// `turns` carries the prior history plus the new query as its final user
/// turn; the answering service sees everything before that final turn.
#[derive(Debug)]
struct DispatchState {
    turns: Vec<Turn>,
    session_id: String,
    next_domain: Option<DomainKind>,
    current_domain: Option<DomainKind>,
    response: Option<String>,
}

impl DispatchState {
    fn new(message: &str, session_id: &str, mut history: Vec<Turn>) -> Self {
        history.push(Turn::user(message));
        Self {
            turns: history,
            session_id: session_id.to_string(),
            next_domain: None,
            current_domain: None,
            response: None,
        }
    }

    fn last_user_message(&self) -> &str {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.role == Role::User)
            .map(|turn| turn.content.as_str())
            .unwrap_or_default()
    }

    fn prior_history(&self) -> &[Turn] {
        &self.turns[..self.turns.len().saturating_sub(1)]
    }
}

/// One chunk of a streamed response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamFragment {
    pub domain: DomainKind,
    pub content: String,
    pub is_final: bool,
}

fn sync_apology(domain: DomainKind) -> String {
    format!(
        "I apologize, but I encountered an error processing your {domain} question. \
         Please try rephrasing your question."
    )
}

const STREAM_APOLOGY: &str = "I apologize, but I encountered an error. Please try again.";

/// Routes each request to one domain service
pub struct Dispatcher {
    router: IntentRouter,
    billing: Arc<dyn DomainService>,
    technical: Arc<dyn DomainService>,
    policy: Arc<dyn DomainService>,
}

impl Dispatcher {
    pub fn new(
        router: IntentRouter,
        billing: Arc<dyn DomainService>,
        technical: Arc<dyn DomainService>,
        policy: Arc<dyn DomainService>,
    ) -> Self {
        Self {
            router,
            billing,
            technical,
            policy,
        }
    }

    fn service_for(&self, kind: DomainKind) -> Arc<dyn DomainService> {
        match kind {
            DomainKind::Billing => self.billing.clone(),
            DomainKind::Technical => self.technical.clone(),
            DomainKind::Policy => self.policy.clone(),
        }
    }

    /// Advance the request one phase. Routing classifies the last user
    /// turn; a domain phase produces the response (apology on failure) and
    /// appends it as an assistant turn.
    async fn step(&self, phase: DispatchPhase, state: &mut DispatchState) -> DispatchPhase {
        match phase {
            DispatchPhase::Routing => {
                let domain = self.router.classify(state.last_user_message()).await;
                state.next_domain = Some(domain);
                DispatchPhase::for_domain(domain)
            }
            DispatchPhase::Billing | DispatchPhase::Technical | DispatchPhase::Policy => {
                let domain = state.next_domain.unwrap_or(DomainKind::Technical);
                state.current_domain = Some(domain);

                let service = self.service_for(domain);
                let query = state.last_user_message().to_string();
                let response = match service
                    .answer(&query, &state.session_id, state.prior_history())
                    .await
                {
                    Ok(response) => response,
                    Err(e) => {
                        error!(%domain, error = %e, "domain service failed");
                        sync_apology(domain)
                    }
                };
                state.turns.push(Turn::assistant(&response));
                state.response = Some(response);
                DispatchPhase::Done
            }
            DispatchPhase::Done => DispatchPhase::Done,
        }
    }

    /// Classify and answer one message. The supplied history is the turn
    /// log prior to this message; the service sees only that history, never
    /// the message twice. Domain failures surface as apology text, not as
    /// errors.
    #[instrument(skip(self, message, history))]
    pub async fn process(
        &self,
        message: &str,
        session_id: &str,
        history: Vec<Turn>,
    ) -> DispatchOutcome {
        let mut state = DispatchState::new(message, session_id, history);
        let mut phase = DispatchPhase::Routing;
        while phase != DispatchPhase::Done {
            phase = self.step(phase, &mut state).await;
        }

        let domain = state.current_domain.unwrap_or(DomainKind::Technical);
        info!(%domain, session_id, "dispatched query");

        DispatchOutcome {
            domain,
            response: state.response.unwrap_or_default(),
            session_id: state.session_id,
        }
    }

    /// Classify and stream one message. The stream yields content fragments
    /// and always ends with exactly one fragment marked `is_final`, even
    /// after a mid-stream failure (which is reported as apology content).
    /// Dropping the stream cancels generation.
    pub fn stream_process(
        &self,
        message: &str,
        session_id: &str,
        history: Vec<Turn>,
    ) -> BoxStream<'static, StreamFragment> {
        let message = message.to_string();
        let session_id = session_id.to_string();
        let router = self.router.clone();
        let billing = self.billing.clone();
        let technical = self.technical.clone();
        let policy = self.policy.clone();

        Box::pin(async_stream::stream! {
            let domain = router.classify(&message).await;
            info!(%domain, session_id = %session_id, "dispatching streamed query");

            let service = match domain {
                DomainKind::Billing => billing,
                DomainKind::Technical => technical,
                DomainKind::Policy => policy,
            };

            let mut inner = service.stream(&message, &session_id, &history);
            while let Some(item) = inner.next().await {
                match item {
                    Ok(content) => {
                        yield StreamFragment {
                            domain,
                            content,
                            is_final: false,
                        };
                    }
                    Err(e) => {
                        error!(%domain, error = %e, "domain stream failed");
                        yield StreamFragment {
                            domain,
                            content: STREAM_APOLOGY.to_string(),
                            is_final: false,
                        };
                        break;
                    }
                }
            }

            yield StreamFragment {
                domain,
                content: String::new(),
                is_final: true,
            };
        })
    }
}

/// Fully wired request pipeline: sessions, cache, router, domain services.
///
/// Owns the session bookkeeping around each dispatched message so callers
/// hand in raw messages and optional session ids.
pub struct ServiceStack {
    pub dispatcher: Dispatcher,
    pub cache: Arc<TtlCache>,
    pub sessions: Arc<SessionStore>,
    pub policy_docs: Arc<StaticContextStore>,
}

impl ServiceStack {
    /// Wire the full pipeline from settings. Retrievers are optional; a
    /// domain without one degrades per its own policy.
    pub fn from_settings(
        settings: &Settings,
        billing_retriever: Option<Arc<dyn Retriever>>,
        technical_retriever: Option<Arc<dyn Retriever>>,
    ) -> Result<Self> {
        settings.validate()?;
        let provider: Arc<dyn CompletionProvider> =
            Arc::new(OpenAiProvider::from_settings(settings));
        Ok(Self::with_provider(
            settings,
            provider,
            billing_retriever,
            technical_retriever,
        ))
    }

    /// Wire the pipeline over an already-constructed provider.
    pub fn with_provider(
        settings: &Settings,
        provider: Arc<dyn CompletionProvider>,
        billing_retriever: Option<Arc<dyn Retriever>>,
        technical_retriever: Option<Arc<dyn Retriever>>,
    ) -> Self {
        let cache = Arc::new(TtlCache::new());
        let sessions = Arc::new(SessionStore::with_config(SessionConfig {
            inactivity_timeout: settings.session_timeout,
            max_turns: settings.max_session_turns,
        }));
        let policy_docs = Arc::new(StaticContextStore::load(&settings.policy_docs_dir));

        let billing = BillingService::new(provider.clone(), billing_retriever, cache.clone())
            .with_retrieval_k(settings.billing_retrieval_k)
            .with_document_ttl(settings.billing_document_ttl)
            .with_response_ttl(settings.response_ttl);
        let technical = TechnicalService::new(provider.clone(), technical_retriever, cache.clone())
            .with_retrieval_k(settings.technical_retrieval_k)
            .with_document_ttl(settings.technical_document_ttl);
        let policy = PolicyService::new(provider.clone(), policy_docs.clone());

        let dispatcher = Dispatcher::new(
            IntentRouter::new(provider),
            Arc::new(billing),
            Arc::new(technical),
            Arc::new(policy),
        );

        Self {
            dispatcher,
            cache,
            sessions,
            policy_docs,
        }
    }

    /// Handle one chat message end to end: resolve the session, record the
    /// user turn, dispatch, record the assistant turn. Session failures
    /// (invalid id, full session) propagate; domain failures do not.
    pub async fn process(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<DispatchOutcome> {
        let session_id = self.sessions.get_or_create(session_id).await?;
        let history = self.sessions.history(&session_id).await?;
        self.sessions
            .add_message(&session_id, Role::User, message)
            .await?;

        let outcome = self.dispatcher.process(message, &session_id, history).await;

        self.sessions
            .add_message(&session_id, Role::Assistant, &outcome.response)
            .await?;

        Ok(outcome)
    }

    /// Streaming counterpart of [`ServiceStack::process`]: resolve the
    /// session, record the user turn, relay fragments, and record the
    /// accumulated response once the terminal fragment arrives. A stream
    /// dropped before its terminal fragment records no assistant turn.
    pub async fn stream_process(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<BoxStream<'static, StreamFragment>> {
        let session_id = self.sessions.get_or_create(session_id).await?;
        let history = self.sessions.history(&session_id).await?;
        self.sessions
            .add_message(&session_id, Role::User, message)
            .await?;

        let sessions = self.sessions.clone();
        let mut inner = self.dispatcher.stream_process(message, &session_id, history);

        Ok(Box::pin(async_stream::stream! {
            let mut full_response = String::new();
            while let Some(fragment) = inner.next().await {
                if fragment.is_final {
                    if let Err(e) = sessions
                        .add_message(&session_id, Role::Assistant, &full_response)
                        .await
                    {
                        warn!(session_id = %session_id, error = %e, "could not record streamed response");
                    }
                } else {
                    full_response.push_str(&fragment.content);
                }
                yield fragment;
            }
        }))
    }
}
