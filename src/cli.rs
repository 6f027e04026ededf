//! Command-line argument parsing for surreal-bridge.

use crate::config::ConnectionConfig;
use crate::logging::LogTarget;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Run batches of SurrealQL queries and print columnar results as JSON.
#[derive(Parser, Debug)]
#[command(name = "surreal-bridge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Server endpoint (e.g., http://localhost:8000 or ws://localhost:8000/rpc)
    #[arg(short = 'e', long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Namespace to use
    #[arg(short = 'n', long, global = true, value_name = "NS")]
    pub namespace: Option<String>,

    /// Database to use
    #[arg(short = 'd', long, global = true, value_name = "DB")]
    pub database: Option<String>,

    /// User to sign in as
    #[arg(short = 'u', long, global = true, value_name = "USER")]
    pub username: Option<String>,

    /// Write logs to a file instead of stderr (default location if no path is given)
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<Option<PathBuf>>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run a query batch read from FILE (or stdin) and print the responses
    Query {
        /// Batch file in `{"queries": [...]}` form; "-" or omitted reads stdin
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Check that the server is reachable and accepts queries
    Health,

    /// Save the connection password in the OS keyring
    StorePassword {
        /// Password to store; read from stdin when omitted
        #[arg(long, env = "SURREAL_PASS", hide_env_values = true)]
        password: Option<String>,
    },
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Converts CLI arguments to a ConnectionConfig.
    ///
    /// Unset flags stay `None` so they can be filled from the config file
    /// and environment.
    pub fn to_connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            endpoint: self.endpoint.clone(),
            namespace: self.namespace.clone(),
            database: self.database.clone(),
            username: self.username.clone(),
            password: None,
        }
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::Config::default_path)
    }

    /// Where logs should go, from `--log-file`.
    pub fn log_target(&self) -> LogTarget {
        LogTarget::from_flag(self.log_file.clone())
    }
}

/// Returns the batch file to read, or None for stdin.
pub fn batch_source(file: Option<&PathBuf>) -> Option<&PathBuf> {
    file.filter(|path| path.as_os_str() != "-")
}
