// src/webhook/backend.rs

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::debug;

use crate::errors::{GatsbyHelperError, Result};

/// A single outbound `POST`.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookRequest {
    pub url: String,
    /// Extra headers, in the order they should be sent.
    pub headers: Vec<(String, String)>,
    /// JSON body. `None` sends an empty signal-only request.
    pub body: Option<Value>,
}

impl WebhookRequest {
    /// Body-less request, as used for rebuild triggers.
    pub fn signal(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Trait abstracting how webhook calls are performed.
///
/// Production code uses [`ReqwestWebhookBackend`]; tests provide their own
/// implementation that records requests.
pub trait WebhookBackend: Send + Sync {
    /// Send the request. Any non-2xx response must be reported as an error.
    fn post(
        &self,
        request: WebhookRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Webhook backend built on a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestWebhookBackend {
    client: reqwest::Client,
}

impl ReqwestWebhookBackend {
    /// Build a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gatsby-helper/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    fn header_map(request: &WebhookRequest) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                GatsbyHelperError::Webhook(format!("invalid header name '{name}': {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                GatsbyHelperError::Webhook(format!("invalid value for header '{name}': {e}"))
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

impl WebhookBackend for ReqwestWebhookBackend {
    fn post(
        &self,
        request: WebhookRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut headers = Self::header_map(&request)?;
            let mut builder = self.client.post(&request.url);

            if let Some(body) = &request.body {
                headers
                    .entry(CONTENT_TYPE)
                    .or_insert(HeaderValue::from_static("application/json"));
                builder = builder.body(serde_json::to_vec(body)?);
            }

            let resp = builder.headers(headers).send().await?;
            let status = resp.status();
            check_response(resp).await?;
            debug!(url = %request.url, %status, "webhook delivered");
            Ok(())
        })
    }
}

/// Turn any non-2xx response into [`GatsbyHelperError::Webhook`].
async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(GatsbyHelperError::Webhook(format!(
            "endpoint responded with status {status}: {body}"
        )));
    }
    Ok(resp)
}
