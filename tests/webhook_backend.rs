// tests/webhook_backend.rs

mod common;
use crate::common::{TestResult, init_tracing};

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gatsby_helper::errors::GatsbyHelperError;
use gatsby_helper::preview::PreviewWebhook;
use gatsby_helper::preview::relay::preview_request;
use gatsby_helper::webhook::{ReqwestWebhookBackend, WebhookBackend, WebhookRequest};

fn backend() -> ReqwestWebhookBackend {
    ReqwestWebhookBackend::new(Duration::from_secs(5)).expect("client builds")
}

#[tokio::test]
async fn preview_request_carries_headers_and_json_body() -> TestResult {
    init_tracing();
    let server = MockServer::start().await;
    let body = json!({
        "operation": "update",
        "typeName": "entry_blogPost",
        "id": 42,
        "siteId": 1,
        "token": "tok-1",
    });

    Mock::given(method("POST"))
        .and(path("/__refresh"))
        .and(header("content-type", "application/json"))
        .and(header("x-preview-update-source", "Craft CMS"))
        .and(header("x-gatsby-cloud-data-source", "craft-source-1"))
        .and(body_json(body.clone()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let webhook = PreviewWebhook {
        url: format!("{}/__refresh", server.uri()),
        data_source: "craft-source-1".to_string(),
    };
    backend().post(preview_request(&webhook, body)).await?;
    Ok(())
}

#[tokio::test]
async fn signal_request_posts_without_body() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/build_hooks/abc"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    backend()
        .post(WebhookRequest::signal(format!("{}/build_hooks/abc", server.uri())))
        .await?;

    let received = server.received_requests().await.unwrap_or_default();
    assert_eq!(received.len(), 1);
    assert!(received[0].body.is_empty());
    Ok(())
}

#[tokio::test]
async fn non_success_status_is_an_error() -> TestResult {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = backend()
        .post(WebhookRequest::signal(format!("{}/hook", server.uri())))
        .await;

    match result {
        Err(GatsbyHelperError::Webhook(msg)) => {
            assert!(msg.contains("500"), "unexpected message: {msg}");
            assert!(msg.contains("boom"));
        }
        other => panic!("expected Webhook error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn unreachable_endpoint_is_an_error() {
    // Nothing listens on port 9 of the loopback interface in CI.
    let result = ReqwestWebhookBackend::new(Duration::from_millis(500))
        .expect("client builds")
        .post(WebhookRequest::signal("http://127.0.0.1:9/hook"))
        .await;

    assert!(matches!(result, Err(GatsbyHelperError::Webhook(_))));
}
