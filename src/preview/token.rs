// src/preview/token.rs

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::errors::Result;

/// Supplies the short-lived token that lets the pipeline fetch draft content.
pub trait PreviewTokenSource: Send + Sync {
    fn preview_token(&self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>>;
}

impl<S: PreviewTokenSource + ?Sized> PreviewTokenSource for Arc<S> {
    fn preview_token(&self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        (**self).preview_token()
    }
}

/// Mints random tokens and reuses each one until it expires, the way an
/// editor session caches its preview token.
#[derive(Debug)]
pub struct IssuedTokenSource {
    ttl: Duration,
    current: Mutex<Option<(String, Instant)>>,
}

impl IssuedTokenSource {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            current: Mutex::new(None),
        }
    }

    fn issue(&self) -> Result<String> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| anyhow::anyhow!("preview token mutex poisoned"))?;

        let now = Instant::now();
        if let Some((token, expires_at)) = current.as_ref() {
            if *expires_at > now {
                return Ok(token.clone());
            }
        }

        let token = Uuid::new_v4().simple().to_string();
        debug!(ttl_secs = self.ttl.as_secs(), "minted new preview token");
        *current = Some((token.clone(), now + self.ttl));
        Ok(token)
    }
}

impl PreviewTokenSource for IssuedTokenSource {
    fn preview_token(&self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        Box::pin(async move { self.issue() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn token_is_reused_until_expiry() {
        let source = IssuedTokenSource::new(Duration::from_secs(60));

        let first = source.preview_token().await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        let second = source.preview_token().await.unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());

        tokio::time::advance(Duration::from_secs(31)).await;
        let third = source.preview_token().await.unwrap();
        assert_ne!(first, third);
    }
}
