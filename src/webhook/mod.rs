// src/webhook/mod.rs

//! Outbound webhook layer.
//!
//! Both the rebuild trigger and the preview relay talk to a
//! [`WebhookBackend`] instead of an HTTP client directly, so tests can swap
//! in a recording fake while production uses [`ReqwestWebhookBackend`].

pub mod backend;

pub use backend::{ReqwestWebhookBackend, WebhookBackend, WebhookRequest};
