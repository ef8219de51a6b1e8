//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use feedrelay_core::{CycleReport, ProviderOutcome, Service, check_config};
use feedrelay_shared::{
    AppConfig, config_file_path, init_config, load_config_from, resolve_config_path,
};
use feedrelay_storage::open_seen_store;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// feedrelay: poll news feeds, enrich, dedupe, and fan out to sinks.
#[derive(Parser)]
#[command(
    name = "feedrelay",
    version,
    about = "Poll news feeds, enrich links with page metadata, and deliver new items to webhooks and queues.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ./feedrelay.toml, then ~/.feedrelay/feedrelay.toml).
    #[arg(short, long, global = true, env = "FEEDRELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the service: crawl on an interval and sweep the seen store, until Ctrl-C.
    Run,

    /// Run a single crawl cycle and print a per-provider summary.
    Once,

    /// Load the config and build every sink without publishing anything.
    Validate,

    /// Remove expired records from the seen store.
    Sweep,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a starter config file.
    Init,
    /// Show resolved configuration with secrets masked.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "feedrelay=info",
        1 => "feedrelay=debug",
        _ => "feedrelay=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run => cmd_run(config_path).await,
        Command::Once => cmd_once(config_path).await,
        Command::Validate => cmd_validate(config_path).await,
        Command::Sweep => cmd_sweep(config_path).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn load(explicit: Option<&Path>) -> Result<AppConfig> {
    let path = resolve_config_path(explicit)?;
    info!(path = %path.display(), "loading config");
    Ok(load_config_from(&path)?)
}

/// Token cancelled on Ctrl-C.
fn shutdown_on_ctrl_c() -> CancellationToken {
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown requested"),
            Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
        }
        token.cancel();
    });
    shutdown
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config_path: Option<&Path>) -> Result<()> {
    let service = Service::build(load(config_path)?).await?;
    let shutdown = shutdown_on_ctrl_c();
    service.scheduler().run(shutdown).await;
    Ok(())
}

async fn cmd_once(config_path: Option<&Path>) -> Result<()> {
    let service = Service::build(load(config_path)?).await?;
    let shutdown = shutdown_on_ctrl_c();
    let report = service.scheduler().run_cycle_with_deadline(&shutdown).await;
    print_report(&report);

    if !report.providers.is_empty() && report.failed_providers() == report.providers.len() {
        return Err(eyre!("every provider failed"));
    }
    Ok(())
}

fn print_report(report: &CycleReport) {
    println!(
        "{:<24} {:<8} {:>7} {:>6} {:>9} {:>8} {:>6} {:>8}",
        "PROVIDER", "OUTCOME", "FETCHED", "DUPES", "PUBLISHED", "FAILURES", "MARKED", "DEFERRED"
    );
    for p in &report.providers {
        let outcome = match p.outcome {
            ProviderOutcome::Done => "done",
            ProviderOutcome::Failed => "failed",
            ProviderOutcome::Skipped => "skipped",
        };
        println!(
            "{:<24} {:<8} {:>7} {:>6} {:>9} {:>8} {:>6} {:>8}",
            p.provider_id,
            outcome,
            p.fetched,
            p.duplicates,
            p.published,
            p.delivery_failures,
            p.marked,
            p.deferred
        );
        if let Some(error) = &p.error {
            println!("  error: {error}");
        }
    }
    println!(
        "\n{} published in {:.1}s{}",
        report.published(),
        report.elapsed.as_secs_f64(),
        if report.cancelled { " (cancelled)" } else { "" }
    );
}

async fn cmd_validate(config_path: Option<&Path>) -> Result<()> {
    let config = load(config_path)?;
    let problems = check_config(&config).await?;

    println!(
        "{} provider(s), {} sink(s) enabled",
        config.enabled_providers().len(),
        config.enabled_sinks().len()
    );
    if problems.is_empty() {
        println!("Config OK");
        return Ok(());
    }
    for problem in &problems {
        println!("  - {problem}");
    }
    Err(eyre!("{} problem(s) found", problems.len()))
}

async fn cmd_sweep(config_path: Option<&Path>) -> Result<()> {
    let config = load(config_path)?;
    let store = open_seen_store(&config.dedupe).await?;
    let removed = store.sweep_expired(config.dedupe.ttl()).await?;
    println!("Removed {removed} expired record(s)");
    Ok(())
}

fn cmd_config_init(config_path: Option<&Path>) -> Result<()> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => config_file_path()?,
    };
    let path = init_config(&path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load(config_path)?;
    let toml_str = toml::to_string_pretty(&config.redacted())?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["feedrelay", "once", "-vv", "--config", "x.toml"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config.as_deref(), Some(Path::new("x.toml")));
        assert!(matches!(cli.command, Command::Once));
    }

    #[test]
    fn parses_config_subcommands() {
        let cli = Cli::try_parse_from(["feedrelay", "config", "show", "--log-format", "json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Show
            }
        ));
        assert!(matches!(cli.log_format, LogFormat::Json));
    }
}
