// src/preview/relay.rs

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::content::EntityId;
use crate::errors::{GatsbyHelperError, Result};
use crate::preview::core::{RefreshDecision, RelayCore, RelayState, SkipReason};
use crate::preview::debounce::Debouncer;
use crate::preview::token::PreviewTokenSource;
use crate::preview::{
    CloseReason, DATA_SOURCE_HEADER, PREVIEW_SOURCE_HEADER, PREVIEW_UPDATE_SOURCE, PreviewEvent,
    PreviewInstall, PreviewPayload, PreviewWebhook, RefreshEvent,
};
use crate::webhook::{WebhookBackend, WebhookRequest};

/// Observable relay state, published after every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStatus {
    Idle,
    Watching { entity_id: EntityId },
    Notifying { entity_id: EntityId },
}

impl From<&RelayState> for RelayStatus {
    fn from(state: &RelayState) -> Self {
        match state {
            RelayState::Idle => RelayStatus::Idle,
            RelayState::Watching(s) => RelayStatus::Watching {
                entity_id: s.watched_entity_id,
            },
            RelayState::Notifying(s) => RelayStatus::Notifying {
                entity_id: s.watched_entity_id,
            },
        }
    }
}

/// Owner's handle on a running relay.
///
/// Dropping the handle (or calling [`RelayHandle::shutdown`]) tears the
/// relay down. A pending close/unload is delivered first; a pending refresh
/// is discarded.
#[derive(Debug)]
pub struct RelayHandle {
    events: mpsc::Sender<PreviewEvent>,
    status: watch::Receiver<RelayStatus>,
    task: JoinHandle<()>,
}

impl RelayHandle {
    /// Forward a preview-surface event to the relay.
    pub async fn send(&self, event: PreviewEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| GatsbyHelperError::Other(anyhow::anyhow!("preview relay has stopped")))
    }

    /// Forward an event without waiting for queue space.
    ///
    /// Returns `false` when the relay is busy and its queue is full, or when
    /// it has stopped.
    pub fn try_send(&self, event: PreviewEvent) -> bool {
        self.events.try_send(event).is_ok()
    }

    pub fn status(&self) -> RelayStatus {
        *self.status.borrow()
    }

    /// Stop the relay and wait for its task to exit.
    pub async fn shutdown(self) {
        let RelayHandle { events, task, .. } = self;
        drop(events);
        if let Err(err) = task.await {
            warn!(error = %err, "preview relay task ended abnormally");
        }
    }
}

/// Spawn a relay for `install`.
///
/// `debounce` is the quiescence window applied to refresh events and,
/// separately, to close/unload events.
pub fn spawn_relay<B, T>(
    install: PreviewInstall,
    debounce: Duration,
    backend: B,
    tokens: T,
) -> RelayHandle
where
    B: WebhookBackend + 'static,
    T: PreviewTokenSource + 'static,
{
    let (events_tx, events_rx) = mpsc::channel::<PreviewEvent>(64);
    let (status_tx, status_rx) = watch::channel(RelayStatus::Idle);

    let relay = PreviewRelay {
        core: RelayCore::new(install.target),
        webhook: install.webhook,
        backend,
        tokens,
        events: events_rx,
        status: status_tx,
        refresh: Debouncer::new(debounce),
        close: Debouncer::new(debounce),
    };

    let task = tokio::spawn(relay.run());

    RelayHandle {
        events: events_tx,
        status: status_rx,
        task,
    }
}

/// Async shell around [`RelayCore`].
///
/// Runs as one task: the only suspension points are the debounce timers, the
/// token fetch and the webhook call.
struct PreviewRelay<B, T> {
    core: RelayCore,
    webhook: PreviewWebhook,
    backend: B,
    tokens: T,
    events: mpsc::Receiver<PreviewEvent>,
    status: watch::Sender<RelayStatus>,
    refresh: Debouncer<RefreshEvent>,
    close: Debouncer<CloseReason>,
}

impl<B: WebhookBackend, T: PreviewTokenSource> PreviewRelay<B, T> {
    async fn run(mut self) {
        info!(
            entity_id = %self.core.target().entity_id,
            type_name = %self.core.target().type_name,
            "applying preview webhook relay"
        );

        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(PreviewEvent::BeforeUpdateIframe(refresh)) => {
                        debug!(?refresh, "beforeUpdateIframe");
                        self.refresh.push(refresh);
                    }
                    Some(PreviewEvent::BeforeClose) => self.close.push(CloseReason::PreviewClosed),
                    Some(PreviewEvent::WindowUnload) => self.close.push(CloseReason::WindowUnload),
                    None => {
                        if self.refresh.cancel().is_some() {
                            debug!("relay torn down with a pending refresh; discarding it");
                        }
                        if let Some(reason) = self.close.cancel() {
                            self.handle_close(reason).await;
                        }
                        break;
                    }
                },
                refresh = self.refresh.ready() => self.handle_refresh(refresh).await,
                reason = self.close.ready() => self.handle_close(reason).await,
            }
        }

        info!("preview relay stopped");
    }

    fn publish(&self) {
        self.status.send_replace(RelayStatus::from(self.core.state()));
    }

    async fn handle_refresh(&mut self, refresh: RefreshEvent) {
        let decision = self.core.begin_refresh(&refresh);
        self.publish();

        match decision {
            RefreshDecision::Notify => {}
            RefreshDecision::Skipped(SkipReason::PathMismatch {
                target_path,
                editor_path,
            }) => {
                warn!(
                    %target_path,
                    %editor_path,
                    "Preview URL is not the same as the current preview URL, not triggering a build"
                );
                return;
            }
            RefreshDecision::Skipped(SkipReason::MalformedUrl { url, reason }) => {
                error!(%url, %reason, "Preview URL is not a valid URL, not triggering a build");
                return;
            }
            RefreshDecision::Skipped(SkipReason::Busy) => {
                debug!("notification already in progress; skipping refresh");
                return;
            }
        }

        let token = match self.tokens.preview_token().await {
            Ok(token) if !token.is_empty() => token,
            Ok(_) => {
                error!("preview token source returned an empty token; skipping notification");
                self.core.abort_notify();
                self.publish();
                return;
            }
            Err(err) => {
                error!(error = %err, "failed to obtain preview token; skipping notification");
                self.core.abort_notify();
                self.publish();
                return;
            }
        };

        if let Some(payload) = self.core.attach_token(token) {
            self.deliver(payload).await;
        }
        self.core.finish_notify();
        self.publish();
    }

    async fn handle_close(&mut self, reason: CloseReason) {
        match self.core.close() {
            Some(payload) => {
                debug!(?reason, "preview session ended");
                self.publish();
                self.deliver(payload).await;
            }
            None => debug!(?reason, "close received while idle; nothing to report"),
        }
    }

    async fn deliver(&self, payload: PreviewPayload) {
        let id = payload.id;
        let with_token = payload.token.is_some();

        let body = match serde_json::to_value(&payload) {
            Ok(body) => body,
            Err(err) => {
                error!(error = %err, "failed to encode preview payload");
                return;
            }
        };

        let request = preview_request(&self.webhook, body);
        match self.backend.post(request).await {
            Ok(()) => info!(%id, with_token, "preview webhook notified"),
            Err(err) => warn!(%id, error = %err, "preview webhook call failed"),
        }
    }
}

/// Build the outbound request for a preview payload.
pub fn preview_request(webhook: &PreviewWebhook, body: serde_json::Value) -> WebhookRequest {
    WebhookRequest {
        url: webhook.url.clone(),
        headers: vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            (PREVIEW_SOURCE_HEADER.to_string(), PREVIEW_UPDATE_SOURCE.to_string()),
            (DATA_SOURCE_HEADER.to_string(), webhook.data_source.clone()),
        ],
        body: Some(body),
    }
}
