// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::deltas::DeltaQuery;
use crate::dispatch::EventDispatcher;
use crate::engine::{LifecycleEvent, RuntimeEvent, RuntimeOutput};
use crate::errors::Result;
use crate::preview::{PreviewEvent, PreviewTokenSource, RefreshEvent, RelayHandle, spawn_relay};
use crate::webhook::WebhookBackend;

/// Drives the dispatcher and the preview relay from `RuntimeEvent`s.
///
/// At most one relay receives events at a time. Registering a new preview
/// target retires the previous relay in the background so its final
/// close notification can still go out; retired relays are awaited on exit.
///
/// Preview events are handed to the relay without waiting, so a slow
/// preview endpoint never holds up saves, deletes or delta queries.
pub struct Runtime<B, S, W> {
    dispatcher: EventDispatcher,
    query: DeltaQuery,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    preview_backend: B,
    tokens: Arc<S>,
    preview_debounce: Duration,
    relay: Option<RelayHandle>,
    retiring: JoinSet<()>,
    out: W,
}

impl<B, S, W> fmt::Debug for Runtime<B, S, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("dispatcher", &self.dispatcher)
            .field("preview_debounce", &self.preview_debounce)
            .field("relay", &self.relay)
            .finish_non_exhaustive()
    }
}

impl<B, S, W> Runtime<B, S, W>
where
    B: WebhookBackend + Clone + 'static,
    S: PreviewTokenSource + 'static,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        dispatcher: EventDispatcher,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        preview_backend: B,
        tokens: Arc<S>,
        preview_debounce: Duration,
        out: W,
    ) -> Self {
        let query = DeltaQuery::new(dispatcher.deltas().clone());
        Self {
            dispatcher,
            query,
            event_rx,
            preview_backend,
            tokens,
            preview_debounce,
            relay: None,
            retiring: JoinSet::new(),
            out,
        }
    }

    /// Main event loop. Returns when input closes or shutdown is requested.
    pub async fn run(mut self) -> Result<()> {
        info!("gatsby-helper runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            match event {
                RuntimeEvent::Lifecycle(lifecycle) => self.handle_lifecycle(lifecycle).await?,
                RuntimeEvent::InputClosed => {
                    info!("lifecycle input closed; stopping runtime");
                    break;
                }
                RuntimeEvent::ShutdownRequested => {
                    info!("shutdown requested; stopping runtime");
                    break;
                }
            }
        }

        if let Some(relay) = self.relay.take() {
            relay.shutdown().await;
        }
        while let Some(res) = self.retiring.join_next().await {
            if let Err(err) = res {
                warn!(error = %err, "retired preview relay ended abnormally");
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    async fn handle_lifecycle(&mut self, event: LifecycleEvent) -> Result<()> {
        match event {
            LifecycleEvent::AfterSave { entity } => self.dispatcher.after_save(&entity),
            LifecycleEvent::AfterDelete { entity } => self.dispatcher.after_delete(&entity),
            LifecycleEvent::RegisterPreviewTargets { entity } => {
                match self.dispatcher.register_preview_targets(&entity) {
                    Some(install) => {
                        if let Some(previous) = self.relay.take() {
                            info!("superseding previous preview relay");
                            self.retiring.spawn(previous.shutdown());
                        }
                        self.relay = Some(spawn_relay(
                            install.clone(),
                            self.preview_debounce,
                            self.preview_backend.clone(),
                            Arc::clone(&self.tokens),
                        ));
                        self.emit(&RuntimeOutput::PreviewInstalled { install }).await?;
                    }
                    None => {
                        self.emit(&RuntimeOutput::PreviewDisabled {
                            entity_id: entity.canonical_id(),
                        })
                        .await?;
                    }
                }
            }
            LifecycleEvent::PreviewRefresh {
                preview_target_url,
                editor_preview_url,
            } => {
                self.forward(PreviewEvent::BeforeUpdateIframe(RefreshEvent {
                    preview_target_url,
                    editor_preview_url,
                }));
            }
            LifecycleEvent::PreviewClose => self.forward(PreviewEvent::BeforeClose),
            LifecycleEvent::WindowUnload => self.forward(PreviewEvent::WindowUnload),
            LifecycleEvent::NodesDeletedSince { since } => {
                let output = match self.query.nodes_deleted_since(&since) {
                    Ok(nodes) => RuntimeOutput::NodesDeleted { since, nodes },
                    Err(err) => {
                        warn!(%since, error = %err, "delta query failed");
                        RuntimeOutput::QueryFailed {
                            since,
                            error: err.to_string(),
                        }
                    }
                };
                self.emit(&output).await?;
            }
        }
        Ok(())
    }

    fn forward(&self, event: PreviewEvent) {
        let Some(relay) = &self.relay else {
            debug!(?event, "no preview relay installed; ignoring preview event");
            return;
        };
        if !relay.try_send(event) {
            warn!("preview relay is busy or stopped; preview event dropped");
        }
    }

    async fn emit(&mut self, output: &RuntimeOutput) -> Result<()> {
        let mut line = serde_json::to_vec(output)?;
        line.push(b'\n');
        self.out.write_all(&line).await?;
        self.out.flush().await?;
        Ok(())
    }
}
