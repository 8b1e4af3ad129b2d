// tests/preview_relay.rs

mod common;
use crate::common::builders::{matching_refresh, mismatched_refresh};
use crate::common::{
    FailingTokenSource, RecordingWebhook, StaticTokenSource, TestResult, init_tracing, settle,
    with_timeout,
};

use serde_json::json;
use tokio::time::{Duration, sleep};

use gatsby_helper::content::{EntityId, SiteId};
use gatsby_helper::preview::{
    DATA_SOURCE_HEADER, PREVIEW_SOURCE_HEADER, PreviewEvent, PreviewInstall, PreviewTarget,
    PreviewWebhook, RefreshEvent, RelayHandle, RelayStatus, spawn_relay,
};

const DEBOUNCE: Duration = Duration::from_millis(300);
// Comfortably past one debounce window.
const SETTLE: Duration = Duration::from_millis(350);

fn blog_install() -> PreviewInstall {
    PreviewInstall {
        target: PreviewTarget {
            entity_id: EntityId(42),
            type_name: "entry_blogPost".to_string(),
            site_id: SiteId(1),
        },
        webhook: PreviewWebhook {
            url: "https://preview.example.com/__refresh".to_string(),
            data_source: "craft-source-1".to_string(),
        },
    }
}

fn relay_with(backend: &RecordingWebhook, token: &str) -> RelayHandle {
    spawn_relay(
        blog_install(),
        DEBOUNCE,
        backend.clone(),
        StaticTokenSource::new(token),
    )
}

async fn refresh(handle: &RelayHandle, event: RefreshEvent) -> TestResult {
    handle.send(PreviewEvent::BeforeUpdateIframe(event)).await?;
    sleep(SETTLE).await;
    settle().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn matching_refresh_sends_tokenized_update() -> TestResult {
    init_tracing();
    let backend = RecordingWebhook::new();
    let handle = relay_with(&backend, "tok-1");

    refresh(&handle, matching_refresh("/blog/my-post")).await?;

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.url, "https://preview.example.com/__refresh");
    assert_eq!(
        request.body,
        Some(json!({
            "operation": "update",
            "typeName": "entry_blogPost",
            "id": 42,
            "siteId": 1,
            "token": "tok-1",
        }))
    );
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(request.header(PREVIEW_SOURCE_HEADER), Some("Craft CMS"));
    assert_eq!(request.header(DATA_SOURCE_HEADER), Some("craft-source-1"));

    assert_eq!(
        handle.status(),
        RelayStatus::Watching {
            entity_id: EntityId(42)
        }
    );
    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn path_mismatch_sends_nothing_but_keeps_session() -> TestResult {
    init_tracing();
    let backend = RecordingWebhook::new();
    let handle = relay_with(&backend, "tok-1");

    refresh(&handle, mismatched_refresh()).await?;

    assert_eq!(backend.count(), 0);
    assert_eq!(
        handle.status(),
        RelayStatus::Watching {
            entity_id: EntityId(42)
        }
    );

    // A later matching refresh still reports the original target.
    refresh(&handle, matching_refresh("/blog/a")).await?;
    let bodies = backend.bodies();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["id"], 42);
    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn malformed_url_is_skipped() -> TestResult {
    let backend = RecordingWebhook::new();
    let handle = relay_with(&backend, "tok-1");

    refresh(
        &handle,
        RefreshEvent {
            preview_target_url: "not a url".to_string(),
            editor_preview_url: "https://site.example.com/blog".to_string(),
        },
    )
    .await?;

    assert_eq!(backend.count(), 0);
    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn refresh_burst_is_debounced_to_one_call() -> TestResult {
    let backend = RecordingWebhook::new();
    let handle = relay_with(&backend, "tok-1");

    for _ in 0..5 {
        handle
            .send(PreviewEvent::BeforeUpdateIframe(matching_refresh("/blog/a")))
            .await?;
        sleep(Duration::from_millis(100)).await;
    }
    settle().await;
    assert_eq!(backend.count(), 0, "window keeps being reset");

    sleep(SETTLE).await;
    settle().await;
    assert_eq!(backend.count(), 1);
    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn only_the_latest_refresh_in_a_burst_is_evaluated() -> TestResult {
    let backend = RecordingWebhook::new();
    let handle = relay_with(&backend, "tok-1");

    handle
        .send(PreviewEvent::BeforeUpdateIframe(matching_refresh("/blog/a")))
        .await?;
    refresh(&handle, mismatched_refresh()).await?;

    assert_eq!(backend.count(), 0);
    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn close_after_watching_sends_tokenless_update() -> TestResult {
    init_tracing();
    let backend = RecordingWebhook::new();
    let handle = relay_with(&backend, "tok-1");

    refresh(&handle, matching_refresh("/blog/a")).await?;
    handle.send(PreviewEvent::BeforeClose).await?;
    sleep(SETTLE).await;
    settle().await;

    let bodies = backend.bodies();
    assert_eq!(bodies.len(), 2);
    assert_eq!(
        bodies[1],
        json!({
            "operation": "update",
            "typeName": "entry_blogPost",
            "id": 42,
            "siteId": 1,
        })
    );
    assert_eq!(handle.status(), RelayStatus::Idle);
    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unload_after_mismatch_still_reports_close() -> TestResult {
    let backend = RecordingWebhook::new();
    let handle = relay_with(&backend, "tok-1");

    refresh(&handle, mismatched_refresh()).await?;
    handle.send(PreviewEvent::WindowUnload).await?;
    sleep(SETTLE).await;
    settle().await;

    let bodies = backend.bodies();
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].get("token").is_none());
    assert_eq!(handle.status(), RelayStatus::Idle);
    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn close_while_idle_sends_nothing() -> TestResult {
    let backend = RecordingWebhook::new();
    let handle = relay_with(&backend, "tok-1");

    handle.send(PreviewEvent::BeforeClose).await?;
    handle.send(PreviewEvent::WindowUnload).await?;
    sleep(SETTLE).await;
    settle().await;

    assert_eq!(backend.count(), 0);
    assert_eq!(handle.status(), RelayStatus::Idle);
    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn new_session_after_close_fetches_a_token_again() -> TestResult {
    let backend = RecordingWebhook::new();
    let handle = relay_with(&backend, "tok-1");

    refresh(&handle, matching_refresh("/blog/a")).await?;
    handle.send(PreviewEvent::BeforeClose).await?;
    sleep(SETTLE).await;
    refresh(&handle, matching_refresh("/blog/a")).await?;

    let bodies = backend.bodies();
    assert_eq!(bodies.len(), 3);
    assert_eq!(bodies[2]["token"], "tok-1");
    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn token_failure_skips_the_notification() -> TestResult {
    init_tracing();
    let backend = RecordingWebhook::new();
    let handle = spawn_relay(blog_install(), DEBOUNCE, backend.clone(), FailingTokenSource);

    refresh(&handle, matching_refresh("/blog/a")).await?;

    assert_eq!(backend.count(), 0);
    assert_eq!(
        handle.status(),
        RelayStatus::Watching {
            entity_id: EntityId(42)
        }
    );
    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn empty_token_skips_the_notification() -> TestResult {
    let backend = RecordingWebhook::new();
    let handle = relay_with(&backend, "");

    refresh(&handle, matching_refresh("/blog/a")).await?;

    assert_eq!(backend.count(), 0);
    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn webhook_failure_returns_to_watching() -> TestResult {
    let backend = RecordingWebhook::failing();
    let handle = relay_with(&backend, "tok-1");

    refresh(&handle, matching_refresh("/blog/a")).await?;
    assert_eq!(backend.count(), 1);
    assert_eq!(
        handle.status(),
        RelayStatus::Watching {
            entity_id: EntityId(42)
        }
    );

    backend.fail_all(false);
    refresh(&handle, matching_refresh("/blog/a")).await?;
    assert_eq!(backend.count(), 2);
    handle.shutdown().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_discards_pending_events() -> TestResult {
    let backend = RecordingWebhook::new();
    let handle = relay_with(&backend, "tok-1");

    handle
        .send(PreviewEvent::BeforeUpdateIframe(matching_refresh("/blog/a")))
        .await?;
    with_timeout(handle.shutdown()).await;
    sleep(SETTLE).await;

    assert_eq!(backend.count(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_flushes_a_pending_unload() -> TestResult {
    init_tracing();
    let backend = RecordingWebhook::new();
    let handle = relay_with(&backend, "tok-1");

    refresh(&handle, matching_refresh("/blog/my-post")).await?;
    handle.send(PreviewEvent::WindowUnload).await?;
    with_timeout(handle.shutdown()).await;

    let bodies = backend.bodies();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0]["token"], "tok-1");
    assert_eq!(
        bodies[1],
        json!({
            "operation": "update",
            "typeName": "entry_blogPost",
            "id": 42,
            "siteId": 1,
        })
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_with_refresh_and_close_pending_only_sends_the_close() -> TestResult {
    let backend = RecordingWebhook::new();
    let handle = relay_with(&backend, "tok-1");

    refresh(&handle, matching_refresh("/blog/my-post")).await?;
    handle
        .send(PreviewEvent::BeforeUpdateIframe(matching_refresh("/blog/my-post")))
        .await?;
    handle.send(PreviewEvent::BeforeClose).await?;
    with_timeout(handle.shutdown()).await;

    let bodies = backend.bodies();
    assert_eq!(bodies.len(), 2);
    assert!(bodies[1].get("token").is_none());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn try_send_drops_events_while_the_relay_is_busy() -> TestResult {
    let backend = RecordingWebhook::slow(Duration::from_secs(10));
    let handle = relay_with(&backend, "tok-1");

    refresh(&handle, matching_refresh("/blog/my-post")).await?;
    assert_eq!(backend.count(), 1, "first call is in flight");

    let accepted = (0..200)
        .filter(|_| handle.try_send(PreviewEvent::BeforeUpdateIframe(matching_refresh("/blog/my-post"))))
        .count();
    assert!(accepted < 200, "queue is bounded while a call is in flight");
    assert!(accepted > 0);

    handle.shutdown().await;
    Ok(())
}
