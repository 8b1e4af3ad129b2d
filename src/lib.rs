// src/lib.rs

pub mod builds;
pub mod cli;
pub mod config;
pub mod content;
pub mod deltas;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod preview;
pub mod types;
pub mod webhook;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::builds::{BuildTrigger, BuildTriggerOptions};
use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::config::loader::load_and_validate;
use crate::deltas::{DeltaTracker, open_store};
use crate::dispatch::EventDispatcher;
use crate::engine::{Runtime, RuntimeEvent, spawn_line_reader};
use crate::preview::IssuedTokenSource;
use crate::webhook::ReqwestWebhookBackend;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - delta store + tracker (with retention pruning)
/// - rebuild trigger task
/// - dispatcher + sidecar runtime
/// - stdin reader and Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    // Deletion tracking.
    let delta_root = cfg
        .deltas
        .root
        .clone()
        .unwrap_or_else(|| config_root_dir(&config_path));
    let tracker = DeltaTracker::new(open_store(cfg.deltas.storage, &delta_root));
    if let Some(days) = cfg.deltas.retention_days {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));
        match tracker.prune_before(cutoff) {
            Ok(removed) => info!(removed, retention_days = days, "applied delta retention"),
            Err(err) => warn!(error = %err, "failed to prune expired deletion records"),
        }
    }

    // Rebuild trigger (optional).
    let (builds, build_task) = if cfg.builds_enabled() {
        let backend =
            ReqwestWebhookBackend::new(Duration::from_millis(cfg.builds.request_timeout_ms))?;
        let options = BuildTriggerOptions {
            webhook_url: cfg.settings.build_webhook_url.clone(),
            coalesce_window: Duration::from_millis(cfg.builds.coalesce_window_ms),
        };
        let (trigger, task) = BuildTrigger::spawn(options, backend);
        (trigger, Some(task))
    } else {
        info!("build_webhook_url is empty; rebuild triggers disabled");
        (BuildTrigger::disabled(), None)
    };

    let dispatcher =
        EventDispatcher::new(tracker, builds, EventDispatcher::preview_webhook_from(&cfg));

    let preview_backend =
        ReqwestWebhookBackend::new(Duration::from_millis(cfg.preview.request_timeout_ms))?;
    let tokens = Arc::new(IssuedTokenSource::new(Duration::from_secs(
        cfg.preview.token_ttl_secs,
    )));

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let _reader = spawn_line_reader(tokio::io::stdin(), rt_tx.clone());

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }
    drop(rt_tx);

    let runtime = Runtime::new(
        dispatcher,
        rt_rx,
        preview_backend,
        tokens,
        Duration::from_millis(cfg.preview.debounce_ms),
        tokio::io::stdout(),
    );
    runtime.run().await?;

    // The runtime owned the last BuildTrigger; its task now flushes and exits.
    if let Some(task) = build_task {
        if let Err(err) = task.await {
            warn!(error = %err, "rebuild trigger task ended abnormally");
        }
    }

    Ok(())
}

/// Directory that relative delta paths are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "conf/GatsbyHelper.toml"),
///   we use that directory.
/// - If it's just a bare filename, we fall back to the current working
///   directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn enabled(flag: bool) -> &'static str {
    if flag { "enabled" } else { "disabled" }
}

/// Simple dry-run output: print the resolved settings.
fn print_dry_run(cfg: &ConfigFile) {
    println!("gatsby-helper dry-run");
    println!("  builds: {}", enabled(cfg.builds_enabled()));
    if cfg.builds_enabled() {
        println!("    build_webhook_url = {}", cfg.settings.build_webhook_url);
        println!("    coalesce_window_ms = {}", cfg.builds.coalesce_window_ms);
        println!("    request_timeout_ms = {}", cfg.builds.request_timeout_ms);
    }
    println!("  preview: {}", enabled(cfg.preview_enabled()));
    if cfg.preview_enabled() {
        println!("    preview_webhook_url = {}", cfg.settings.preview_webhook_url);
        println!(
            "    gatsby_cloud_data_source = {}",
            cfg.settings.gatsby_cloud_data_source
        );
        println!("    debounce_ms = {}", cfg.preview.debounce_ms);
        println!("    token_ttl_secs = {}", cfg.preview.token_ttl_secs);
    }
    println!("  deltas.storage = {:?}", cfg.deltas.storage);
    if let Some(days) = cfg.deltas.retention_days {
        println!("  deltas.retention_days = {days}");
    }
}
