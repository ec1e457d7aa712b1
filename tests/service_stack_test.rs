//! End-to-end tests for the wired pipeline
//!
//! Verifies session bookkeeping around dispatch: turn recording order,
//! history windows, and error propagation at the stack boundary.

mod common;

use std::sync::Arc;

use futures::StreamExt;
use helpdesk::config::Settings;
use helpdesk::dispatch::ServiceStack;
use helpdesk::error::HelpdeskError;
use helpdesk::retrieval::DocSnippet;
use helpdesk::router::DomainKind;
use helpdesk::session::Role;

use common::{ScriptedProvider, StaticRetriever};

fn test_settings() -> Settings {
    Settings {
        openai_api_key: "test-key".to_string(),
        policy_docs_dir: "/nonexistent/policy/docs".into(),
        ..Settings::default()
    }
}

fn build_stack(provider: ScriptedProvider) -> (ServiceStack, Arc<ScriptedProvider>) {
    let provider = Arc::new(provider);
    let retriever = Arc::new(StaticRetriever::new(vec![DocSnippet::new(
        "Pro plan costs $49/month.",
        "pricing.md",
    )]));
    let stack = ServiceStack::with_provider(
        &test_settings(),
        provider.clone(),
        Some(retriever.clone()),
        Some(retriever),
    );
    (stack, provider)
}

#[tokio::test]
async fn test_process_records_both_turns() {
    let (stack, _) = build_stack(
        ScriptedProvider::new()
            .reply("billing")
            .reply("$49 per month."),
    );

    let outcome = stack.process("How much is the Pro plan?", None).await.unwrap();
    assert_eq!(outcome.domain, DomainKind::Billing);
    assert_eq!(outcome.response, "$49 per month.");

    let history = stack.sessions.history(&outcome.session_id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content, "How much is the Pro plan?");
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].content, "$49 per month.");
}

#[tokio::test]
async fn test_followup_reuses_session_and_carries_history() {
    let (stack, provider) = build_stack(
        ScriptedProvider::new()
            .reply("billing")
            .reply("$49 per month.")
            .reply("billing")
            .reply("Yes, annual billing saves 20%."),
    );

    let first = stack.process("How much is the Pro plan?", None).await.unwrap();
    let second = stack
        .process("Is there an annual discount?", Some(&first.session_id))
        .await
        .unwrap();

    assert_eq!(second.session_id, first.session_id);
    let history = stack.sessions.history(&first.session_id).await.unwrap();
    assert_eq!(history.len(), 4);

    // The follow-up carried history, so it bypassed the response cache
    assert_eq!(provider.completion_calls(), 4);
}

#[tokio::test]
async fn test_generation_failure_still_produces_conversation_turns() {
    let (stack, _) = build_stack(
        ScriptedProvider::new()
            .reply("billing")
            .failure("provider down"),
    );

    let outcome = stack.process("How much is the Pro plan?", None).await.unwrap();
    assert!(outcome.response.contains("I apologize"));

    // The apology is recorded as the assistant turn, keeping continuity
    let history = stack.sessions.history(&outcome.session_id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, outcome.response);
}

#[tokio::test]
async fn test_stream_process_records_both_turns() {
    let (stack, _) = build_stack(
        ScriptedProvider::new()
            .reply("billing")
            .reply("$49 per month, billed monthly."),
    );

    let mut fragments = stack
        .stream_process("How much is the Pro plan?", None)
        .await
        .unwrap();

    let mut assembled = String::new();
    let mut finals = 0;
    while let Some(fragment) = fragments.next().await {
        assert_eq!(fragment.domain, DomainKind::Billing);
        if fragment.is_final {
            finals += 1;
        } else {
            assembled.push_str(&fragment.content);
        }
    }
    assert_eq!(finals, 1);
    assert_eq!(assembled, "$49 per month, billed monthly.");

    // Both turns were persisted, so a follow-up sees the full exchange
    let active = stack.sessions.active_sessions().await;
    assert_eq!(active.len(), 1);
    let history = stack.sessions.history(&active[0]).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content, "How much is the Pro plan?");
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].content, "$49 per month, billed monthly.");
}

#[tokio::test]
async fn test_stream_process_reuses_session_and_carries_history() {
    let (stack, provider) = build_stack(
        ScriptedProvider::new()
            .reply("billing")
            .reply("$49 per month.")
            .reply("billing")
            .reply("Yes, annual billing saves 20%."),
    );

    let first = stack.process("How much is the Pro plan?", None).await.unwrap();

    let mut fragments = stack
        .stream_process("Is there an annual discount?", Some(&first.session_id))
        .await
        .unwrap();
    while fragments.next().await.is_some() {}

    let history = stack.sessions.history(&first.session_id).await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[3].content, "Yes, annual billing saves 20%.");
    assert_eq!(provider.stream_calls(), 1);
}

#[tokio::test]
async fn test_stream_process_rejects_invalid_session_id() {
    let (stack, _) = build_stack(ScriptedProvider::new());
    let err = stack.stream_process("hello", Some("  ")).await.err().unwrap();
    assert!(matches!(err, HelpdeskError::InvalidSessionId { .. }));
}

#[tokio::test]
async fn test_stream_process_records_apology_on_failure() {
    let (stack, _) = build_stack(
        ScriptedProvider::new()
            .reply("billing")
            .failure("provider down"),
    );

    let mut fragments = stack
        .stream_process("How much is the Pro plan?", None)
        .await
        .unwrap();
    while fragments.next().await.is_some() {}

    let active = stack.sessions.active_sessions().await;
    let history = stack.sessions.history(&active[0]).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[1].content.contains("I apologize"));
}

#[tokio::test]
async fn test_invalid_session_id_propagates() {
    let (stack, _) = build_stack(ScriptedProvider::new());
    let err = stack.process("hello", Some("  ")).await.unwrap_err();
    assert!(matches!(err, HelpdeskError::InvalidSessionId { .. }));
}

#[tokio::test]
async fn test_from_settings_rejects_missing_api_key() {
    let settings = Settings {
        openai_api_key: String::new(),
        ..Settings::default()
    };
    let err = ServiceStack::from_settings(&settings, None, None).err().unwrap();
    assert!(matches!(err, HelpdeskError::Config(_)));
}
