use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gatsby_helper::errors::{GatsbyHelperError, Result};
use gatsby_helper::preview::PreviewTokenSource;
use gatsby_helper::webhook::{WebhookBackend, WebhookRequest};

/// A fake webhook backend that:
/// - records every request it is handed
/// - succeeds, or fails every call after `fail_all(true)`
/// - optionally takes `delay` to answer, like a slow endpoint.
///
/// Clones share the same recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingWebhook {
    requests: Arc<Mutex<Vec<WebhookRequest>>>,
    failing: Arc<AtomicBool>,
    delay: Duration,
}

impl RecordingWebhook {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose calls are recorded but always fail.
    pub fn failing() -> Self {
        let backend = Self::default();
        backend.fail_all(true);
        backend
    }

    /// A backend that records each request, then waits `delay` before answering.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn fail_all(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<WebhookRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// JSON bodies of the recorded requests, in order.
    pub fn bodies(&self) -> Vec<serde_json::Value> {
        self.requests()
            .into_iter()
            .filter_map(|r| r.body)
            .collect()
    }
}

impl WebhookBackend for RecordingWebhook {
    fn post(
        &self,
        request: WebhookRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let requests = Arc::clone(&self.requests);
        let failing = self.failing.load(Ordering::SeqCst);
        let delay = self.delay;

        Box::pin(async move {
            requests.lock().unwrap().push(request);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if failing {
                return Err(GatsbyHelperError::Webhook(
                    "endpoint responded with status 500: fake failure".to_string(),
                ));
            }
            Ok(())
        })
    }
}

/// Token source that always hands out the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenSource(pub String);

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl PreviewTokenSource for StaticTokenSource {
    fn preview_token(&self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        let token = self.0.clone();
        Box::pin(async move { Ok(token) })
    }
}

/// Token source whose every call fails.
#[derive(Debug, Clone, Default)]
pub struct FailingTokenSource;

impl PreviewTokenSource for FailingTokenSource {
    fn preview_token(&self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        Box::pin(async { Err(GatsbyHelperError::Other(anyhow::anyhow!("token service unavailable"))) })
    }
}
