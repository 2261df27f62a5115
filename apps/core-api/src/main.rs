use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use booking::BookingModule;
use core_api::config::{AppConfig, HostConfig};
use core_api::{logging, serve, signals};
use tokio_util::sync::CancellationToken;

const DEFAULT_CONFIG: &str = "config/config.yaml";

/// Voyago Core API - booking service
#[derive(Parser)]
#[command(name = "core-api")]
#[command(about = "Voyago Core API - booking service")]
#[command(version)]
struct Cli {
    /// Path to configuration file (defaults to config/config.yaml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address override, e.g. 0.0.0.0:8080
    #[arg(short, long)]
    bind: Option<String>,

    /// Print effective configuration (JSON) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory SQLite database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = cli.config.as_deref()
        && !path.is_file()
    {
        anyhow::bail!("config file does not exist: {}", path.display());
    }
    let path = cli
        .config
        .clone()
        .or_else(|| Some(PathBuf::from(DEFAULT_CONFIG)).filter(|p| p.is_file()));

    // defaults -> YAML -> module overlay -> env (APP__*) -> CLI overrides
    let mut config = HostConfig::load(path.as_deref(), &[BookingModule::NAME])?;
    for cfg in config.all_mut() {
        apply_cli_overrides(cfg, &cli);
    }

    logging::init(&config.global.logging, cli.verbose);
    tracing::info!(
        app = %config.global.app.name,
        env = %config.global.app.env,
        version = %config.global.app.version,
        overlays = ?config.modules.keys().collect::<Vec<_>>(),
        config = %path.as_deref().map_or_else(|| "<defaults>".into(), Path::to_string_lossy),
        "Core API starting"
    );

    if cli.print_config {
        println!("{}", render(&config)?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
    }
}

fn apply_cli_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(bind) = &cli.bind {
        config.server.bind_addr.clone_from(bind);
    }
    if cli.mock {
        "sqlite::memory:".clone_into(&mut config.database.dsn);
        config.database.pool.max_conns = Some(1);
        config.database.migrate = true;
    }
}

fn redacted(config: &AppConfig) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(config)?;
    if let Some(dsn) = value.pointer_mut("/database/dsn") {
        *dsn = corekit_db::redact_dsn(&config.database.dsn).into();
    }
    Ok(value)
}

fn render(config: &HostConfig) -> Result<String> {
    let mut value = redacted(&config.global)?;
    if !config.modules.is_empty() {
        let modules = config
            .modules
            .iter()
            .map(|(name, cfg)| Ok((name.clone(), redacted(cfg)?)))
            .collect::<Result<serde_json::Map<_, _>>>()?;
        value["modules"] = modules.into();
    }
    Ok(serde_json::to_string_pretty(&value)?)
}

fn check_config(config: &HostConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    corekit_db::DbHandle::detect(&config.global.database.dsn)?;
    for (name, cfg) in &config.modules {
        corekit_db::DbHandle::detect(&cfg.database.dsn)
            .with_context(|| format!("module '{name}'"))?;
    }
    let bind = &config.global.server.bind_addr;
    bind.parse::<std::net::SocketAddr>()
        .with_context(|| format!("invalid server.bind_addr '{bind}'"))?;
    println!("Configuration is valid");
    println!("{}", render(config)?);
    Ok(())
}

async fn run_server(config: HostConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    tokio::spawn(signals::cancel_on_signal(cancel.clone()));
    serve(&config, &cancel).await
}
