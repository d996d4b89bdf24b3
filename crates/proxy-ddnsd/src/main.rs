// # proxy-ddns - one-shot DNS reconciliation
//
// Thin integration layer: load the configuration, set up logging, wire the
// components together and run the RunController once. All reconciliation
// logic lives in proxy-ddns-core.
//
// ## Configuration
//
// The config file is looked up in this order:
// 1. First command-line argument
// 2. `PROXY_DDNS_CONFIG`
// 3. `config.json` next to the executable
//
// Environment overrides:
// - `PROXY_DDNS_LOG_LEVEL`: replaces `log_level` from the file
// - `PROXY_DDNS_MODE=dry-run`: list records but fake every mutation and
//   write no state
// - `RUST_LOG`: full tracing filter, wins over any level
//
// ## Example
//
// ```bash
// # crontab: every five minutes
// */5 * * * * /opt/proxy-ddns/proxy-ddns /opt/proxy-ddns/config.json
//
// PROXY_DDNS_MODE=dry-run proxy-ddns ./config.json
// ```

mod logging;

use anyhow::{Context, Result};
use proxy_ddns_core::engine::{ReconcileEvent, Reconciler, ReconcilerSettings};
use proxy_ddns_core::{DdnsConfig, FileStateStore, RunController, RunOutcome};
use proxy_ddns_ip_http::HttpIpSource;
use proxy_ddns_provider_cloudflare::CloudflareProvider;
use proxy_ddns_source_mysql::MySqlDomainSource;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

const CONFIG_ENV: &str = "PROXY_DDNS_CONFIG";
const LOG_LEVEL_ENV: &str = "PROXY_DDNS_LOG_LEVEL";
const MODE_ENV: &str = "PROXY_DDNS_MODE";
const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Exit codes for different termination scenarios
///
/// - 0: Run completed (individual record failures are only logged)
/// - 1: Configuration or startup error
/// - 2: Fatal run error
/// - 3: Another run holds the lock
/// - 130: Interrupted by SIGINT/SIGTERM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
    AlreadyRunning = 3,
    Interrupted = 130,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Pick the config file location
fn resolve_config_path(
    arg: Option<OsString>,
    env_path: Option<OsString>,
    exe: Option<PathBuf>,
) -> PathBuf {
    if let Some(path) = arg.or(env_path).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }

    exe.as_deref()
        .and_then(Path::parent)
        .map(|dir| dir.join(DEFAULT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

fn is_dry_run(mode: Option<&str>) -> bool {
    mode.is_some_and(|m| m.trim().eq_ignore_ascii_case("dry-run"))
}

/// Load the file and apply environment overrides
fn load_config(path: &Path) -> Result<DdnsConfig> {
    let mut config = DdnsConfig::load(path)?;

    if let Ok(level) = env::var(LOG_LEVEL_ENV)
        && !level.trim().is_empty()
    {
        config.log_level = level.trim().to_string();
        config
            .validate()
            .with_context(|| format!("Invalid {}", LOG_LEVEL_ENV))?;
    }

    Ok(config)
}

fn main() -> ExitCode {
    let config_path = resolve_config_path(
        env::args_os().nth(1),
        env::var_os(CONFIG_ENV),
        env::current_exe().ok(),
    );

    let config = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let _log_guard = match logging::init(&config.log_level, &config.paths.log_file) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let dry_run = is_dry_run(env::var(MODE_ENV).ok().as_deref());

    info!("Starting proxy-ddns");
    info!("Configuration loaded from {}", config_path.display());
    info!("Managing {} zone(s)", config.provider.zones.len());

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run(config, dry_run)).into()
}

/// Build every component from the configuration
fn build_controller(
    config: &DdnsConfig,
    dry_run: bool,
) -> Result<(RunController, mpsc::Receiver<ReconcileEvent>)> {
    let ip_source =
        HttpIpSource::from_config(&config.ip_source).context("Failed to create IP source")?;
    let domain_source = MySqlDomainSource::new(&config.database);
    let state_store = FileStateStore::new(&config.paths.last_hosts_file, &config.paths.ip_file);
    let provider = CloudflareProvider::from_config(config, dry_run)
        .context("Failed to create Cloudflare provider")?;

    let (reconciler, events) = Reconciler::new(
        Box::new(provider),
        ReconcilerSettings::from_config(config),
    );

    let controller = RunController::new(
        Box::new(ip_source),
        Box::new(domain_source),
        Box::new(state_store),
        reconciler,
        config.provider.zones.clone(),
        &config.paths.lock_file,
    )
    .with_persist_state(!dry_run);

    Ok((controller, events))
}

async fn run(config: DdnsConfig, dry_run: bool) -> DdnsExitCode {
    let (controller, events) = match build_controller(&config, dry_run) {
        Ok(parts) => parts,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return DdnsExitCode::ConfigError;
        }
    };

    tokio::spawn(trace_events(events));

    tokio::select! {
        result = controller.run() => match result {
            Ok(RunOutcome::Completed(report)) => {
                info!("Run complete: {}", report);
                DdnsExitCode::CleanShutdown
            }
            Ok(RunOutcome::AlreadyRunning { owner }) => {
                match owner {
                    Some(pid) => info!("Another instance is running (PID {}), exiting", pid),
                    None => info!("Another instance is running, exiting"),
                }
                DdnsExitCode::AlreadyRunning
            }
            Err(e) => {
                error!("Run failed: {}", e);
                DdnsExitCode::RuntimeError
            }
        },
        signal = shutdown_signal() => {
            warn!("Received {}, abandoning run", signal);
            DdnsExitCode::Interrupted
        }
    }
}

/// Forward reconcile events to the debug log
async fn trace_events(mut events: mpsc::Receiver<ReconcileEvent>) {
    while let Some(event) = events.recv().await {
        debug!("Reconcile event: {:?}", event);
    }
}

/// Wait for SIGTERM or SIGINT
///
/// A handler that cannot be installed is logged and never fires; the run
/// itself is not affected.
#[cfg(unix)]
async fn shutdown_signal() -> &'static str {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!("Failed to setup SIGTERM handler: {}", e);
            return ctrl_c().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        name = ctrl_c() => name,
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "SIGINT",
        Err(e) => {
            warn!("Failed to wait for CTRL-C: {}", e);
            std::future::pending().await
        }
    }
}
