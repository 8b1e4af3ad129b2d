// src/builds/coalescer.rs

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::builds::RebuildTrigger;
use crate::content::ContentEntity;
use crate::webhook::{WebhookBackend, WebhookRequest};

/// Settings for the background rebuild task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTriggerOptions {
    pub webhook_url: String,
    /// Triggers arriving within this window of the first one are merged.
    /// `Duration::ZERO` fires once per trigger.
    pub coalesce_window: Duration,
}

/// Cheap, cloneable front-end to the rebuild task.
///
/// `notify_mutation` never blocks and never fails: it only enqueues a
/// trigger. The HTTP call happens on the background task spawned by
/// [`BuildTrigger::spawn`], which exits once every clone has been dropped
/// (flushing a pending window first).
#[derive(Debug, Clone)]
pub struct BuildTrigger {
    tx: Option<mpsc::UnboundedSender<RebuildTrigger>>,
}

impl BuildTrigger {
    /// A trigger that drops everything (no build webhook configured).
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Spawn the background task and return the front-end plus its handle.
    pub fn spawn<B>(options: BuildTriggerOptions, backend: B) -> (Self, JoinHandle<()>)
    where
        B: WebhookBackend + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<RebuildTrigger>();
        let handle = tokio::spawn(run_coalescer(rx, options, backend));
        (Self { tx: Some(tx) }, handle)
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Schedule a rebuild for a mutation of `entity`, whose root is `root`.
    ///
    /// Drafts, revisions and anything rooted in one are discarded. Returns
    /// `true` if a trigger was enqueued.
    pub fn notify_mutation(&self, entity: &ContentEntity, root: &ContentEntity) -> bool {
        if entity.is_variant() || root.is_variant() {
            debug!(
                id = %entity.id,
                root_id = %root.id,
                "entity or its root is a draft or revision; not triggering a build"
            );
            return false;
        }

        let Some(tx) = &self.tx else {
            debug!(id = %entity.id, "no build webhook configured; skipping trigger");
            return false;
        };

        match tx.send(RebuildTrigger::now()) {
            Ok(()) => {
                debug!(id = %entity.id, type_name = %entity.type_name, "rebuild trigger queued");
                true
            }
            Err(_) => {
                warn!(id = %entity.id, "rebuild task has stopped; dropping trigger");
                false
            }
        }
    }
}

/// Background loop: wait for a trigger, hold the window open, fire once.
async fn run_coalescer<B: WebhookBackend>(
    mut rx: mpsc::UnboundedReceiver<RebuildTrigger>,
    options: BuildTriggerOptions,
    backend: B,
) {
    info!(
        url = %options.webhook_url,
        window_ms = options.coalesce_window.as_millis() as u64,
        "rebuild trigger task started"
    );

    while let Some(first) = rx.recv().await {
        let mut merged = 1usize;
        let mut closed = false;

        if !options.coalesce_window.is_zero() {
            let deadline = Instant::now() + options.coalesce_window;
            loop {
                tokio::select! {
                    next = rx.recv() => match next {
                        Some(_) => merged += 1,
                        None => {
                            closed = true;
                            break;
                        }
                    },
                    _ = tokio::time::sleep_until(deadline) => break,
                }
            }
        }

        fire(&backend, &options.webhook_url, first, merged).await;

        if closed {
            break;
        }
    }

    info!("rebuild trigger task finished (channel closed)");
}

async fn fire<B: WebhookBackend>(
    backend: &B,
    url: &str,
    first: RebuildTrigger,
    merged: usize,
) {
    debug!(merged, first_requested_at = %first.requested_at, "firing rebuild webhook");
    match backend.post(WebhookRequest::signal(url)).await {
        Ok(()) => info!(merged, "rebuild webhook triggered"),
        Err(err) => warn!(error = %err, merged, "rebuild webhook failed"),
    }
}
