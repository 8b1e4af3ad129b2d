// tests/build_trigger.rs

mod common;
use crate::common::builders::{ConfigFileBuilder, EntityBuilder};
use crate::common::{RecordingWebhook, TestResult, init_tracing, settle, with_timeout};

use tokio::time::{Duration, sleep};

use gatsby_helper::builds::{BuildTrigger, BuildTriggerOptions};
use gatsby_helper::content::canonical_of;
use gatsby_helper::deltas::DeltaTracker;
use gatsby_helper::dispatch::EventDispatcher;

const HOOK: &str = "https://api.netlify.example/build_hooks/abc";

fn options(window_ms: u64) -> BuildTriggerOptions {
    BuildTriggerOptions {
        webhook_url: HOOK.to_string(),
        coalesce_window: Duration::from_millis(window_ms),
    }
}

#[tokio::test(start_paused = true)]
async fn burst_inside_window_fires_once() -> TestResult {
    init_tracing();
    let backend = RecordingWebhook::new();
    let (trigger, _task) = BuildTrigger::spawn(options(2_000), backend.clone());

    let entry = EntityBuilder::new(1, "entry_blogPost").build();
    for _ in 0..5 {
        assert!(trigger.notify_mutation(&entry, canonical_of(&entry)));
        sleep(Duration::from_millis(100)).await;
    }
    settle().await;
    assert_eq!(backend.count(), 0, "window still open");

    sleep(Duration::from_millis(2_000)).await;
    settle().await;

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, HOOK);
    assert!(requests[0].body.is_none(), "rebuild signal carries no body");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn separate_windows_fire_separately() -> TestResult {
    let backend = RecordingWebhook::new();
    let (trigger, _task) = BuildTrigger::spawn(options(500), backend.clone());
    let entry = EntityBuilder::new(1, "entry_blogPost").build();

    trigger.notify_mutation(&entry, &entry);
    sleep(Duration::from_millis(600)).await;
    settle().await;
    trigger.notify_mutation(&entry, &entry);
    sleep(Duration::from_millis(600)).await;
    settle().await;

    assert_eq!(backend.count(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn zero_window_fires_per_trigger() -> TestResult {
    let backend = RecordingWebhook::new();
    let (trigger, _task) = BuildTrigger::spawn(options(0), backend.clone());
    let entry = EntityBuilder::new(1, "entry_blogPost").build();

    for _ in 0..3 {
        trigger.notify_mutation(&entry, &entry);
    }
    settle().await;

    assert_eq!(backend.count(), 3);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn variant_roots_never_trigger() -> TestResult {
    let backend = RecordingWebhook::new();
    let (trigger, _task) = BuildTrigger::spawn(options(0), backend.clone());

    let draft = EntityBuilder::new(2, "entry_blogPost").draft_of(1).build();
    let block = EntityBuilder::new(3, "matrixBlock_body")
        .owned_by(EntityBuilder::new(4, "entry_blogPost").revision_of(1).build())
        .build();

    assert!(!trigger.notify_mutation(&draft, canonical_of(&draft)));
    assert!(!trigger.notify_mutation(&block, canonical_of(&block)));
    settle().await;

    assert_eq!(backend.count(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn webhook_failures_stay_inside_the_task() -> TestResult {
    init_tracing();
    let backend = RecordingWebhook::failing();
    let (trigger, _task) = BuildTrigger::spawn(options(100), backend.clone());
    let entry = EntityBuilder::new(1, "entry_blogPost").build();

    assert!(trigger.notify_mutation(&entry, &entry));
    sleep(Duration::from_millis(200)).await;
    settle().await;

    assert!(trigger.notify_mutation(&entry, &entry), "task still accepts triggers");
    sleep(Duration::from_millis(200)).await;
    settle().await;

    assert_eq!(backend.count(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn dropping_the_last_handle_flushes_the_window() -> TestResult {
    let backend = RecordingWebhook::new();
    let (trigger, task) = BuildTrigger::spawn(options(10_000), backend.clone());
    let entry = EntityBuilder::new(1, "entry_blogPost").build();

    let clone = trigger.clone();
    trigger.notify_mutation(&entry, &entry);
    clone.notify_mutation(&entry, &entry);
    drop(trigger);
    drop(clone);

    with_timeout(task).await?;
    assert_eq!(backend.count(), 1);
    Ok(())
}

#[test]
fn disabled_trigger_reports_nothing_queued() {
    let trigger = BuildTrigger::disabled();
    let entry = EntityBuilder::new(1, "entry_blogPost").build();

    assert!(!trigger.is_enabled());
    assert!(!trigger.notify_mutation(&entry, &entry));
}

#[tokio::test(start_paused = true)]
async fn dispatcher_routes_saves_and_deletes() -> TestResult {
    init_tracing();
    let backend = RecordingWebhook::new();
    let (builds, _task) = BuildTrigger::spawn(options(0), backend.clone());
    let cfg = ConfigFileBuilder::new().build_webhook(HOOK).build();
    let dispatcher = EventDispatcher::new(
        DeltaTracker::in_memory(),
        builds,
        EventDispatcher::preview_webhook_from(&cfg),
    );

    let entry = EntityBuilder::new(1, "entry_blogPost").build();
    let draft = EntityBuilder::new(2, "entry_blogPost").draft_of(1).build();

    dispatcher.after_save(&entry);
    dispatcher.after_save(&draft);
    dispatcher.after_delete(&entry);
    dispatcher.after_delete(&draft);
    settle().await;

    assert_eq!(backend.count(), 2, "one for the save, one for the delete");
    let deleted = dispatcher.deltas().list_since(chrono::DateTime::<chrono::Utc>::UNIX_EPOCH)?;
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].id, entry.id);
    assert!(EventDispatcher::preview_webhook_from(&cfg).is_none());
    Ok(())
}
