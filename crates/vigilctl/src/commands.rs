//! Command implementations for vigilctl

use crate::client::DaemonClient;
use crate::output;
use crate::progress::AuditProgressBar;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vigil_shared::api::ItemsQuery;
use vigil_shared::{AuditEvent, AuditResult, Category, ModuleStatus, Severity};
use vigild::{AuditOrchestrator, Config};

/// Exit code when any module ended broken or missing
pub const EXIT_UNHEALTHY: u8 = 2;

/// Overrides applied on top of the loaded config for a local audit
#[derive(Debug, Default, Clone)]
pub struct AuditOptions {
    pub config: Option<PathBuf>,
    pub base_url: Option<String>,
    pub seed: Option<u64>,
    pub concurrency: Option<usize>,
    pub no_repair: bool,
    pub json: bool,
}

/// Filters for listing diagnostic items
#[derive(Debug, Default, Clone)]
pub struct ReportFilter {
    pub category: Option<Category>,
    pub status: Option<ModuleStatus>,
    pub severity: Option<Severity>,
}

impl From<ReportFilter> for ItemsQuery {
    fn from(filter: ReportFilter) -> Self {
        ItemsQuery {
            category: filter.category,
            status: filter.status,
            severity: filter.severity,
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_path(path),
        None => Ok(Config::load()),
    }
}

/// Apply command-line overrides to a loaded config
pub fn apply_overrides(mut config: Config, opts: &AuditOptions) -> Config {
    if let Some(base_url) = &opts.base_url {
        config.probe.base_url = base_url.clone();
    }
    if let Some(seed) = opts.seed {
        config.probe.seed = Some(seed);
    }
    if let Some(concurrency) = opts.concurrency {
        config.audit.concurrency = concurrency;
    }
    if opts.no_repair {
        config.repair.enabled = false;
    }
    config
}

pub fn exit_code_for(result: &AuditResult) -> ExitCode {
    if result.summary().has_failures() {
        ExitCode::from(EXIT_UNHEALTHY)
    } else {
        ExitCode::SUCCESS
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run one audit in-process, without a daemon
pub async fn audit(opts: AuditOptions) -> Result<ExitCode> {
    let config = apply_overrides(load_config(opts.config.as_deref())?, &opts);
    let orchestrator = AuditOrchestrator::from_config(&config)?;
    debug!("Auditing against {}", config.probe.base_url);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let bar = AuditProgressBar::new(!opts.json);
    let (tx, mut rx) = mpsc::unbounded_channel::<AuditEvent>();

    let run = async {
        let result = orchestrator.run_with(Some(&tx), &cancel).await;
        drop(tx);
        result
    };
    let watch = async {
        while let Some(event) = rx.recv().await {
            bar.observe(&event);
        }
    };
    let (result, _) = tokio::join!(run, watch);
    bar.finish();

    let result = result.context("Audit could not run")?;
    if opts.json {
        print_json(&result)?;
    } else {
        output::display_result(&result);
    }
    Ok(exit_code_for(&result))
}

pub async fn modules(config: Option<PathBuf>, client: Option<DaemonClient>, json: bool) -> Result<ExitCode> {
    let modules = match client {
        Some(client) => client.modules().await?.modules,
        None => {
            let config = load_config(config.as_deref())?;
            AuditOrchestrator::from_config(&config)?
                .source()
                .list_modules()
                .context("Module catalog unavailable")?
        }
    };

    if json {
        print_json(&modules)?;
    } else {
        output::display_modules(&modules);
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn status(client: &DaemonClient, json: bool) -> Result<ExitCode> {
    let health = client.health().await?;
    let progress = client.progress().await?;

    if json {
        print_json(&serde_json::json!({ "health": health, "progress": progress }))?;
        return Ok(ExitCode::SUCCESS);
    }

    println!();
    println!(
        "vigild v{} at {} (up {}s)",
        health.version,
        client.base_url(),
        health.uptime_seconds
    );
    match (&progress.run_id, &progress.progress) {
        (Some(run_id), Some(p)) if progress.running => output::display_note(&format!(
            "Audit {} running: {}/{} ({}%)",
            run_id, p.completed, p.total, p.percent
        )),
        (Some(run_id), _) if progress.running => {
            output::display_note(&format!("Audit {} starting", run_id))
        }
        _ => {}
    }
    if let Some(error) = &progress.last_error {
        output::display_error(&format!("Last audit failed: {}", error));
    }

    match (&health.summary, &health.recovery) {
        (Some(summary), recovery) => {
            output::display_summary(summary);
            if let Some(recovery) = recovery {
                output::display_recovery(recovery);
            }
            println!();
            Ok(if summary.has_failures() {
                ExitCode::from(EXIT_UNHEALTHY)
            } else {
                ExitCode::SUCCESS
            })
        }
        (None, _) => {
            output::display_note("No audit has completed yet");
            Ok(ExitCode::SUCCESS)
        }
    }
}

pub async fn report(client: &DaemonClient, filter: ReportFilter, json: bool) -> Result<ExitCode> {
    let filtered = filter.category.is_some() || filter.status.is_some() || filter.severity.is_some();

    if !filtered {
        let Some(result) = client.latest().await? else {
            output::display_note("No audit has completed yet");
            return Ok(ExitCode::SUCCESS);
        };
        if json {
            print_json(&result)?;
        } else {
            output::display_result(&result);
        }
        return Ok(exit_code_for(&result));
    }

    let response = client.items(&filter.into()).await?;
    if json {
        print_json(&response)?;
    } else if response.run_id.is_none() {
        output::display_note("No audit has completed yet");
    } else if response.items.is_empty() {
        output::display_note("No modules match the given filters");
    } else {
        println!();
        output::display_items(&response.items);
        println!();
    }
    Ok(ExitCode::SUCCESS)
}

/// Ask the daemon for an audit, optionally waiting for it to finish
pub async fn run(client: &DaemonClient, wait: bool, json: bool) -> Result<ExitCode> {
    let started = client.run_audit().await?;
    if !wait {
        if json {
            print_json(&started)?;
        } else {
            output::display_success(&format!("Audit {} started", started.run_id));
        }
        return Ok(ExitCode::SUCCESS);
    }

    let bar = AuditProgressBar::new(!json);
    loop {
        let progress = client.progress().await?;
        if let Some(p) = progress.progress.as_ref().filter(|p| p.run_id == started.run_id) {
            bar.update(p);
        }
        if progress.run_id != Some(started.run_id) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    bar.finish();

    match client.latest().await? {
        Some(result) if result.run_id == started.run_id => {
            if json {
                print_json(&result)?;
            } else {
                output::display_result(&result);
            }
            Ok(exit_code_for(&result))
        }
        _ => {
            let progress = client.progress().await?;
            let reason = progress
                .last_error
                .unwrap_or_else(|| "result not available".to_string());
            output::display_error(&format!("Audit {} did not complete: {}", started.run_id, reason));
            Ok(ExitCode::FAILURE)
        }
    }
}

pub async fn cancel(client: &DaemonClient) -> Result<ExitCode> {
    if client.cancel().await?.cancelled {
        output::display_success("Cancellation requested");
    } else {
        output::display_note("No audit is running");
    }
    Ok(ExitCode::SUCCESS)
}

/// Write a default config file
pub fn init(path: &Path, force: bool) -> Result<ExitCode> {
    if path.exists() && !force {
        output::display_error(&format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
        return Ok(ExitCode::FAILURE);
    }
    Config::save_default(path)?;
    output::display_success(&format!("Wrote default config to {}", path.display()));
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_config_values() {
        let opts = AuditOptions {
            base_url: Some("http://staging:3000".to_string()),
            seed: Some(9),
            concurrency: Some(4),
            no_repair: true,
            ..Default::default()
        };
        let config = apply_overrides(Config::default(), &opts);
        assert_eq!(config.probe.base_url, "http://staging:3000");
        assert_eq!(config.probe.seed, Some(9));
        assert_eq!(config.audit.concurrency, 4);
        assert!(!config.repair.enabled);
    }

    #[test]
    fn test_no_overrides_keep_defaults() {
        let config = apply_overrides(Config::default(), &AuditOptions::default());
        assert_eq!(config.audit.concurrency, 1);
        assert!(config.repair.enabled);
        assert_eq!(config.probe.seed, None);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(init(&path, false).unwrap(), ExitCode::SUCCESS);
        assert!(Config::load_from_path(&path).is_ok());
        assert_eq!(init(&path, false).unwrap(), ExitCode::FAILURE);
        assert_eq!(init(&path, true).unwrap(), ExitCode::SUCCESS);
    }
}
