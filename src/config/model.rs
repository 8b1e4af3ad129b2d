// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::DeltaStorageMode;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [settings]
/// build_webhook_url = "$GATSBY_BUILD_WEBHOOK"
/// preview_webhook_url = "https://preview.example.com/__refresh"
/// gatsby_cloud_data_source = "${GATSBY_DATA_SOURCE}"
///
/// [builds]
/// coalesce_window_ms = 2000
///
/// [preview]
/// debounce_ms = 300
///
/// [deltas]
/// storage = "file"
/// retention_days = 30
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub builds: BuildsSection,

    #[serde(default)]
    pub preview: PreviewSection,

    #[serde(default)]
    pub deltas: DeltasSection,
}

/// `[settings]` section: the plugin settings owned by the content store.
///
/// Values may reference environment variables; see [`crate::config::env`].
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct Settings {
    /// Rebuild webhook. Empty disables build triggers.
    #[serde(default)]
    pub build_webhook_url: String,

    /// Preview webhook. Empty means the live preview relay is never installed.
    #[serde(default)]
    pub preview_webhook_url: String,

    /// Sent as `x-gatsby-cloud-data-source` on preview notifications.
    #[serde(default)]
    pub gatsby_cloud_data_source: String,
}

/// `[builds]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BuildsSection {
    /// Merge window for rebuild triggers. `0` fires once per trigger.
    #[serde(default)]
    pub coalesce_window_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for BuildsSection {
    fn default() -> Self {
        Self {
            coalesce_window_ms: 0,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// `[preview]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PreviewSection {
    /// Quiescence window applied to refresh and close events.
    #[serde(default = "default_preview_debounce_ms")]
    pub debounce_ms: u64,

    /// How long a minted preview token is reused.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for PreviewSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_preview_debounce_ms(),
            token_ttl_secs: default_token_ttl_secs(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// `[deltas]` section.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct DeltasSection {
    #[serde(default)]
    pub storage: DeltaStorageMode,

    /// Directory under which `.gatsby-helper/` is created in file mode.
    ///
    /// Defaults to the directory containing the config file.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Records older than this are pruned at startup. `None` keeps everything.
    #[serde(default)]
    pub retention_days: Option<u32>,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_preview_debounce_ms() -> u64 {
    300
}

fn default_token_ttl_secs() -> u64 {
    3_600
}

/// Validated configuration with environment references expanded.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`) or
/// [`ConfigFile::from_raw_with_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub settings: Settings,
    pub builds: BuildsSection,
    pub preview: PreviewSection,
    pub deltas: DeltasSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        settings: Settings,
        builds: BuildsSection,
        preview: PreviewSection,
        deltas: DeltasSection,
    ) -> Self {
        Self {
            settings,
            builds,
            preview,
            deltas,
        }
    }

    /// Whether build triggers are enabled.
    pub fn builds_enabled(&self) -> bool {
        !self.settings.build_webhook_url.is_empty()
    }

    /// Whether the live preview relay will be installed.
    pub fn preview_enabled(&self) -> bool {
        !self.settings.preview_webhook_url.is_empty()
    }
}
