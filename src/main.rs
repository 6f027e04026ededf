//! surreal-bridge - batch SurrealDB queries shaped into columnar tables.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::Serialize;
use surreal_bridge::cli::{batch_source, Cli, Command};
use surreal_bridge::config::Config;
use surreal_bridge::connection::QueryContext;
use surreal_bridge::datasource::Datasource;
use surreal_bridge::health::{HealthCheckResult, HealthStatus};
use surreal_bridge::logging;
use surreal_bridge::query::QueryDataRequest;
use surreal_bridge::secrets::SecretStorage;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    // Missing .env is fine
    let _ = dotenvy::dotenv();

    logging::init(cli.log_target());

    if let Err(e) = run(cli).await {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;

    match cli.command {
        Command::Query { ref file, pretty } => {
            let request = read_batch(batch_source(file.as_ref()))?;
            run_batch(&config, request, pretty).await
        }
        Command::Health => run_health(&config).await,
        Command::StorePassword { ref password } => store_password(&config, password.clone()),
    }
}

/// Builds the effective configuration with precedence:
/// 1. CLI arguments (highest)
/// 2. Config file
/// 3. Environment variables
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    config.connection.merge(&cli.to_connection_config());
    config.connection.apply_env_defaults();
    Ok(config)
}

async fn connect(config: &Config) -> anyhow::Result<Datasource> {
    let mut config = config.clone();
    SecretStorage::new().resolve_password(&mut config.connection);
    Datasource::connect(&config)
        .await
        .with_context(|| format!("connecting to {}", config.connection.display_string()))
}

fn read_batch(file: Option<&PathBuf>) -> anyhow::Result<QueryDataRequest> {
    let text = match file {
        Some(path) => read_file(path)?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading batch from stdin")?;
            text
        }
    };
    serde_json::from_str(&text).context("parsing query batch")
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

async fn run_batch(config: &Config, request: QueryDataRequest, pretty: bool) -> anyhow::Result<()> {
    let datasource = connect(config).await?;

    let ctx = QueryContext::background();
    let on_interrupt = ctx.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling pending queries");
            on_interrupt.cancel();
        }
    });

    let batch = datasource.query_data(&ctx, request).await;
    watcher.abort();

    print_json(&batch, pretty)?;
    if let Err(e) = datasource.dispose().await {
        warn!("Failed to close connection: {e}");
    }

    info!(
        "{} of {} queries succeeded",
        batch.len() - batch.failed_count(),
        batch.len()
    );
    Ok(())
}

async fn run_health(config: &Config) -> anyhow::Result<()> {
    let result = match connect(config).await {
        Ok(datasource) => {
            let result = datasource.check_health().await;
            if let Err(e) = datasource.dispose().await {
                warn!("Failed to close connection: {e}");
            }
            result
        }
        Err(e) => HealthCheckResult {
            status: HealthStatus::Error,
            message: format!("error while checking database health: {e:#}"),
        },
    };

    print_json(&result, true)?;
    if !result.is_ok() {
        bail!("health check failed");
    }
    Ok(())
}

fn store_password(config: &Config, password: Option<String>) -> anyhow::Result<()> {
    let key = SecretStorage::connection_password_key(&config.connection)
        .context("--username and --endpoint are required to store a password")?;

    let password = match password {
        Some(password) => password,
        None => {
            let mut line = String::new();
            std::io::stdin()
                .read_line(&mut line)
                .context("reading password from stdin")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if password.is_empty() {
        bail!("password is empty");
    }

    SecretStorage::new().store(&key, &password)?;
    println!("Password stored for {key}");
    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let json = match pretty {
        true => serde_json::to_string_pretty(value),
        false => serde_json::to_string(value),
    };
    let json = json.context("serializing output")?;
    println!("{json}");
    Ok(())
}
