// src/config/validate.rs

use reqwest::Url;

use crate::config::env::expand_env_with;
use crate::config::model::{ConfigFile, RawConfigFile, Settings};
use crate::errors::{GatsbyHelperError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = GatsbyHelperError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ConfigFile::from_raw_with_env(raw, |name| std::env::var(name).ok())
    }
}

impl ConfigFile {
    /// Expand settings with the given variable lookup, then validate.
    pub fn from_raw_with_env<F>(raw: RawConfigFile, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = Settings {
            build_webhook_url: expand_env_with(&raw.settings.build_webhook_url, &lookup),
            preview_webhook_url: expand_env_with(&raw.settings.preview_webhook_url, &lookup),
            gatsby_cloud_data_source: expand_env_with(
                &raw.settings.gatsby_cloud_data_source,
                &lookup,
            ),
        };

        let cfg = ConfigFile::new_unchecked(settings, raw.builds, raw.preview, raw.deltas);
        validate_config(&cfg)?;
        Ok(cfg)
    }
}

/// Check an already-expanded configuration.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    validate_webhook_url("build_webhook_url", &cfg.settings.build_webhook_url)?;
    validate_webhook_url("preview_webhook_url", &cfg.settings.preview_webhook_url)?;
    validate_timing(cfg)?;
    Ok(())
}

fn validate_webhook_url(field: &str, value: &str) -> Result<()> {
    // Empty means "disabled", not an error.
    if value.is_empty() {
        return Ok(());
    }

    let url = Url::parse(value).map_err(|e| {
        GatsbyHelperError::ConfigError(format!(
            "[settings].{field} is not a valid URL ('{value}'): {e}"
        ))
    })?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(GatsbyHelperError::ConfigError(format!(
            "[settings].{field} must use http or https (got '{other}')"
        ))),
    }
}

fn validate_timing(cfg: &ConfigFile) -> Result<()> {
    if cfg.preview.debounce_ms == 0 {
        return Err(GatsbyHelperError::ConfigError(
            "[preview].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.preview.request_timeout_ms == 0 {
        return Err(GatsbyHelperError::ConfigError(
            "[preview].request_timeout_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.builds.request_timeout_ms == 0 {
        return Err(GatsbyHelperError::ConfigError(
            "[builds].request_timeout_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.preview.token_ttl_secs == 0 {
        return Err(GatsbyHelperError::ConfigError(
            "[preview].token_ttl_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}
