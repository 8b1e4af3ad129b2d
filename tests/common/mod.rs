#![allow(dead_code)]

pub use gatsby_helper_test_utils::builders;
pub use gatsby_helper_test_utils::fake_webhook::{
    FailingTokenSource, RecordingWebhook, StaticTokenSource,
};
pub use gatsby_helper_test_utils::{init_tracing, settle, with_timeout};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
