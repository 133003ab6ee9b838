//! End-to-end heal-and-retry flows against captured DOM snapshots

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use soulbrowser_resilience::action_gate::{Severity, ValidationContext};
use soulbrowser_resilience::action_locator::{
    DomQueryable, ElementHandle, LocatorError, LocatorStrategy, Rect, SnapshotDom, Viewport,
};
use soulbrowser_resilience::memory_center::{ErrorCategory, ErrorContext, Fix};
use soulbrowser_resilience::{
    HealSource, OperationError, OperationRequest, Orchestrator, ResilienceConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn checkout_page() -> SnapshotDom {
    SnapshotDom::new(Viewport::default())
        .with(
            ElementHandle::new("", "input")
                .with_attr("id", "email")
                .with_attr("name", "customer_email")
                .with_attr("type", "email")
                .with_visible(true),
            Some(Rect::new(100.0, 200.0, 300.0, 32.0)),
        )
        .with(
            ElementHandle::new("", "button")
                .with_attr("id", "checkout-submit")
                .with_attr("class", "btn btn-primary")
                .with_text("Submit")
                .with_visible(true),
            Some(Rect::new(100.0, 260.0, 120.0, 40.0)),
        )
        .with(
            ElementHandle::new("", "a")
                .with_attr("href", "/help")
                .with_text("Help")
                .with_visible(true),
            None,
        )
}

/// Click driver over a snapshot: succeeds when the selector resolves
async fn click(dom: &SnapshotDom, selector: Option<String>) -> Result<Value, OperationError> {
    let selector = selector.ok_or_else(|| OperationError::new("click needs a selector"))?;
    match dom.query_one(&selector).await? {
        Some(handle) => Ok(json!({
            "success": true,
            "clicked": handle.selector(),
            "changed": true,
        })),
        None => Err(OperationError::new(format!("Element not found: {selector}"))),
    }
}

fn submit_request(selector: &str) -> OperationRequest {
    OperationRequest::new("click")
        .with_selector(selector)
        .with_last_known_text("Submit")
        .with_url("https://shop.test/checkout?session=abc123#pay")
}

#[tokio::test]
async fn broken_selector_is_healed_and_learned() -> Result<()> {
    let orchestrator = Orchestrator::new(&ResilienceConfig::default())?;
    let dom = checkout_page();
    let page = &dom;

    let outcome = orchestrator
        .execute(
            &submit_request("#submit-old"),
            Some(page),
            &CancellationToken::new(),
            move |selector| click(page, selector),
        )
        .await;

    assert!(outcome.is_success());
    assert!(outcome.healed());
    let provenance = outcome.provenance().expect("provenance");
    assert_eq!(provenance.original_selector, "#submit-old");
    assert_eq!(provenance.healed_selector, "#checkout-submit");
    match &provenance.source {
        HealSource::Healer { confidence, .. } => assert!(*confidence >= 0.8),
        other => panic!("unexpected source {other:?}"),
    }
    assert_eq!(outcome.result().and_then(|r| r.get("healed")), Some(&json!(true)));

    let validation = outcome.validation().expect("validation");
    assert!(validation.valid);
    assert_eq!(validation.score, 90);
    assert!(outcome
        .issue_report()
        .expect("issue report")
        .iter()
        .any(|issue| issue.issue_type == "healed_selector"));

    let patterns = orchestrator.learner().patterns();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].fix.after.as_deref(), Some("#checkout-submit"));
    assert_eq!(provenance.pattern_id.as_deref(), Some(patterns[0].id.as_str()));

    let records = orchestrator.collector().recent(10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].category, ErrorCategory::SelectorNotFound);
    assert!(records[0].resolved);
    assert_eq!(records[0].fix_ref.as_deref(), Some(patterns[0].id.as_str()));
    assert_eq!(
        records[0].context.url.as_deref(),
        Some("https://shop.test/checkout")
    );
    Ok(())
}

#[tokio::test]
async fn repeated_failure_reuses_learned_fix() -> Result<()> {
    let orchestrator = Orchestrator::new(&ResilienceConfig::default())?;
    let dom = checkout_page();
    let page = &dom;
    let request = submit_request("#submit-old");

    for _ in 0..2 {
        let outcome = orchestrator
            .execute(&request, Some(page), &CancellationToken::new(), move |selector| {
                click(page, selector)
            })
            .await;
        assert!(outcome.healed());
    }

    let patterns = orchestrator.learner().patterns();
    assert_eq!(patterns.len(), 1);
    let metrics = &patterns[0].metrics;
    assert_eq!(metrics.times_matched, 1);
    assert_eq!(metrics.times_successful, 1);
    assert!((metrics.confidence - 0.9).abs() < 1e-9);

    let stats = orchestrator.stats();
    assert_eq!(stats.execution.healed, 2);
    assert_eq!(stats.execution.by_tool["click"].succeeded, 2);
    assert_eq!(stats.errors.resolved_errors, 2);
    Ok(())
}

#[tokio::test]
async fn second_run_prefers_the_learned_pattern() -> Result<()> {
    let orchestrator = Orchestrator::new(&ResilienceConfig::default())?;
    let dom = checkout_page();
    let page = &dom;
    let request = submit_request("#submit-old");

    orchestrator
        .execute(&request, Some(page), &CancellationToken::new(), move |s| click(page, s))
        .await;
    let outcome = orchestrator
        .execute(&request, Some(page), &CancellationToken::new(), move |s| click(page, s))
        .await;

    let provenance = outcome.provenance().expect("provenance");
    assert!(matches!(
        provenance.source,
        HealSource::LearnedPattern { .. }
    ));
    Ok(())
}

#[tokio::test]
async fn unrecoverable_failure_carries_a_diagnostic() -> Result<()> {
    let orchestrator = Orchestrator::new(&ResilienceConfig::default())?;
    let dom = checkout_page();
    let page = &dom;
    let request = OperationRequest::new("click").with_selector("#totally-gone");

    let first = orchestrator
        .execute(&request, Some(page), &CancellationToken::new(), move |s| click(page, s))
        .await;
    let diagnostic = first.diagnostic().expect("diagnostic");
    assert_eq!(diagnostic.category, ErrorCategory::SelectorNotFound);
    assert!(diagnostic.heal_attempted);
    assert!(diagnostic.candidates.is_empty());
    assert!(diagnostic.retried_selector.is_none());
    assert!(!diagnostic.seen_before);
    assert!(!diagnostic.likely_causes.is_empty());
    assert_eq!(
        first.error().map(|err| err.message.as_str()),
        Some("Element not found: #totally-gone")
    );

    let second = orchestrator
        .execute(&request, Some(page), &CancellationToken::new(), move |s| click(page, s))
        .await;
    let diagnostic = second.diagnostic().expect("diagnostic");
    assert!(diagnostic.seen_before);
    assert_eq!(diagnostic.similar_count, 1);
    assert_eq!(orchestrator.stats().execution.failed, 2);
    Ok(())
}

#[tokio::test]
async fn failed_retry_lowers_pattern_confidence() -> Result<()> {
    let orchestrator = Orchestrator::new(&ResilienceConfig::default())?;
    let dom = checkout_page();

    let seeded = orchestrator.collector().capture(
        "click",
        "Element not found: #pay-old",
        None,
        &ErrorContext::new().with_selector("#pay-old"),
    );
    let pattern = orchestrator
        .learner()
        .learn(&seeded, Fix::selector_substitution("#pay-old", "#checkout-submit"));

    let calls = AtomicUsize::new(0);
    let counter = &calls;
    let request = OperationRequest::new("click").with_selector("#pay-old");
    let outcome = orchestrator
        .execute(&request, Some(&dom), &CancellationToken::new(), move |_| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(OperationError::new("Element not found: #pay-old"))
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let diagnostic = outcome.diagnostic().expect("diagnostic");
    assert!(diagnostic.seen_before);
    assert!(diagnostic.suggested_fix.is_some());
    assert_eq!(diagnostic.retried_selector.as_deref(), Some("#checkout-submit"));
    assert!(diagnostic.retry_error.is_some());

    let updated = orchestrator.learner().get(&pattern.id).expect("pattern");
    assert_eq!(updated.metrics.times_matched, 1);
    assert_eq!(updated.metrics.times_successful, 0);
    assert!((updated.metrics.confidence - 0.4).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn cancellation_aborts_the_retry() -> Result<()> {
    let orchestrator = Orchestrator::new(&ResilienceConfig::default())?;
    let dom = checkout_page();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let calls = AtomicUsize::new(0);
    let counter = &calls;
    let outcome = orchestrator
        .execute(&submit_request("#submit-old"), Some(&dom), &cancel, move |selector| {
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) > 0 {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                }
                Err(OperationError::new(format!(
                    "Element not found: {}",
                    selector.unwrap_or_default()
                )))
            }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let diagnostic = outcome.diagnostic().expect("diagnostic");
    assert!(diagnostic.cancelled);
    assert!(orchestrator.learner().is_empty());
    assert_eq!(orchestrator.stats().execution.cancelled, 1);
    Ok(())
}

#[tokio::test]
async fn already_cancelled_skips_healing() -> Result<()> {
    let orchestrator = Orchestrator::new(&ResilienceConfig::default())?;
    let dom = checkout_page();
    let page = &dom;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = orchestrator
        .execute(&submit_request("#submit-old"), Some(page), &cancel, move |s| click(page, s))
        .await;
    let diagnostic = outcome.diagnostic().expect("diagnostic");
    assert!(diagnostic.cancelled);
    assert!(!diagnostic.heal_attempted);
    Ok(())
}

struct DetachedDom;

#[async_trait]
impl DomQueryable for DetachedDom {
    async fn query_one(&self, _selector: &str) -> Result<Option<ElementHandle>, LocatorError> {
        Err(LocatorError::Query("target closed".into()))
    }

    async fn query_all(&self, _selector: &str) -> Result<Vec<ElementHandle>, LocatorError> {
        Err(LocatorError::Query("target closed".into()))
    }

    async fn evaluate(&self, _script: &str, _args: Vec<Value>) -> Result<Value, LocatorError> {
        Err(LocatorError::Query("target closed".into()))
    }

    async fn bounding_box(&self, _handle: &ElementHandle) -> Result<Option<Rect>, LocatorError> {
        Ok(None)
    }
}

#[tokio::test]
async fn page_errors_during_heal_are_contained() -> Result<()> {
    let orchestrator = Orchestrator::new(&ResilienceConfig::default())?;
    let dom = DetachedDom;
    let outcome = orchestrator
        .execute(
            &submit_request("#submit-old"),
            Some(&dom),
            &CancellationToken::new(),
            |_| async { Err(OperationError::new("Element not found: #submit-old")) },
        )
        .await;

    let diagnostic = outcome.diagnostic().expect("diagnostic");
    assert!(diagnostic.heal_attempted);
    assert!(diagnostic.candidates.is_empty());
    assert_eq!(
        outcome.error().map(|err| err.message.as_str()),
        Some("Element not found: #submit-old")
    );
    Ok(())
}

#[tokio::test]
async fn stores_survive_a_restart() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = ResilienceConfig {
        storage_dir: Some(dir.path().to_path_buf()),
        ..ResilienceConfig::default()
    };
    let dom = checkout_page();
    let page = &dom;
    let request = submit_request("#submit-old");

    {
        let orchestrator = Orchestrator::new(&config)?;
        let outcome = orchestrator
            .execute(&request, Some(page), &CancellationToken::new(), move |s| click(page, s))
            .await;
        assert!(outcome.healed());
    }
    assert!(dir.path().join("error-history.json").exists());
    assert!(dir.path().join("patterns.json").exists());

    let reopened = Orchestrator::new(&config)?;
    assert_eq!(reopened.collector().len(), 1);
    assert_eq!(reopened.learner().len(), 1);

    let outcome = reopened
        .execute(&request, Some(page), &CancellationToken::new(), move |s| click(page, s))
        .await;
    assert!(matches!(
        outcome.provenance().map(|p| &p.source),
        Some(HealSource::LearnedPattern { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn successful_results_are_scored() -> Result<()> {
    let orchestrator = Orchestrator::new(&ResilienceConfig::default())?;

    let outcome = orchestrator
        .execute(
            &OperationRequest::new("get_content"),
            None,
            &CancellationToken::new(),
            |_| async { Ok(json!({"success": true, "content": ""})) },
        )
        .await;
    let validation = outcome.validation().expect("validation");
    assert!(validation.score <= 20);
    assert!(!validation.valid);

    let navigation = orchestrator.validate(
        "navigate",
        &json!({"success": true, "url": "https://x/404", "title": "404 Not Found"}),
        &json!({}),
        &ValidationContext::new().with_previous_url("https://x/"),
    );
    assert!(!navigation.valid);
    assert!(navigation
        .issues
        .iter()
        .any(|issue| issue.issue_type == "error_page" && issue.severity == Severity::Error));

    let stats = orchestrator.stats();
    assert_eq!(stats.validation.total_validations, 2);
    Ok(())
}

fn account_page() -> SnapshotDom {
    SnapshotDom::new(Viewport::default())
        .with(
            ElementHandle::new("", "button")
                .with_attr("id", "login-new")
                .with_text("Log in")
                .with_visible(true),
            None,
        )
        .with(
            ElementHandle::new("", "a")
                .with_attr("id", "cart-new")
                .with_attr("href", "/cart")
                .with_text("Cart")
                .with_visible(true),
            None,
        )
}

#[tokio::test]
async fn fix_learned_for_another_selector_is_not_applied_blindly() -> Result<()> {
    let orchestrator = Orchestrator::new(&ResilienceConfig::default())?;
    let dom = account_page();
    let page = &dom;

    let login = OperationRequest::new("click")
        .with_selector("#login-old")
        .with_last_known_text("Log in");
    let first = orchestrator
        .execute(&login, Some(page), &CancellationToken::new(), move |s| click(page, s))
        .await;
    assert_eq!(
        first.provenance().map(|p| p.healed_selector.as_str()),
        Some("#login-new")
    );
    let login_pattern = orchestrator.learner().patterns()[0].clone();

    let cart = OperationRequest::new("click")
        .with_selector("#cart-old")
        .with_last_known_text("Cart");
    let second = orchestrator
        .execute(&cart, Some(page), &CancellationToken::new(), move |s| click(page, s))
        .await;

    let provenance = second.provenance().expect("provenance");
    assert_eq!(provenance.healed_selector, "#cart-new");
    assert!(matches!(provenance.source, HealSource::Healer { .. }));
    assert_eq!(
        second.result().and_then(|r| r.get("clicked")),
        Some(&json!("#cart-new"))
    );

    let untouched = orchestrator
        .learner()
        .get(&login_pattern.id)
        .expect("login pattern");
    assert_eq!(untouched.metrics, login_pattern.metrics);
    assert_eq!(orchestrator.learner().len(), 2);
    Ok(())
}

#[tokio::test]
async fn heals_by_text_when_the_id_changed_completely() -> Result<()> {
    let orchestrator = Orchestrator::new(&ResilienceConfig::default())?;
    let dom = account_page();
    let page = &dom;

    let request = OperationRequest::new("click")
        .with_selector("#x7f3a9")
        .with_last_known_text("Log in");
    let outcome = orchestrator
        .execute(&request, Some(page), &CancellationToken::new(), move |s| click(page, s))
        .await;

    let provenance = outcome.provenance().expect("provenance");
    assert_eq!(provenance.healed_selector, "#login-new");
    match &provenance.source {
        HealSource::Healer { strategy, confidence } => {
            assert_eq!(*strategy, LocatorStrategy::TextContent);
            assert!((confidence - 0.8).abs() < 1e-9);
        }
        other => panic!("unexpected source {other:?}"),
    }
    Ok(())
}
