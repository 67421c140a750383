//! Configuration handling for the db-bridge CLI.
//!
//! This module provides configuration via CLI arguments and environment
//! variables, plus decoding of the JSON arguments taken by the DDL commands.

use crate::error::{BridgeError, BridgeResult};
use crate::models::{AlterOperation, ColumnDescriptor, ConnectOptions};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration for the db-bridge CLI.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "db-bridge",
    about = "Uniform schema introspection and DDL across MongoDB, PostgreSQL, MySQL and SQL Server",
    version,
    author
)]
pub struct Config {
    /// Connection string (URL, or ODBC style for SQL Server)
    #[arg(
        short = 'c',
        long = "connection",
        value_name = "CONNECTION",
        env = "DB_BRIDGE_CONNECTION",
        hide_env_values = true
    )]
    pub connection: String,

    /// Connection timeout in seconds (0 leaves it to the driver)
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "DB_BRIDGE_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = DEFAULT_LOG_LEVEL, env = "DB_BRIDGE_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "DB_BRIDGE_JSON_LOGS")]
    pub json_logs: bool,

    /// Pretty-print JSON results
    #[arg(long)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Operation to run against the connection.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Print the engine detected from the connection string (no I/O)
    Classify,
    /// Open and close a session
    TestConnection,
    /// Print the normalized schema of every table or collection
    Schema {
        /// Also write the schema JSON to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Create a database
    CreateDatabase { name: String },
    /// Create a table from a JSON array of column descriptors
    CreateTable {
        name: String,
        /// JSON array, or @path to a file holding it
        #[arg(long, value_name = "JSON")]
        columns: String,
    },
    /// Apply a JSON array of alter operations in order
    AlterTable {
        name: String,
        /// JSON array, or @path to a file holding it
        #[arg(long, value_name = "JSON")]
        operations: String,
    },
    /// Drop a table if it exists
    DropTable { name: String },
    /// Print one page of rows
    TableData {
        name: String,
        #[arg(long)]
        limit: Option<u64>,
        #[arg(long)]
        offset: Option<u64>,
    },
}

impl Command {
    /// Subcommand name as typed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Classify => "classify",
            Self::TestConnection => "test-connection",
            Self::Schema { .. } => "schema",
            Self::CreateDatabase { .. } => "create-database",
            Self::CreateTable { .. } => "create-table",
            Self::AlterTable { .. } => "alter-table",
            Self::DropTable { .. } => "drop-table",
            Self::TableData { .. } => "table-data",
        }
    }
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the connection timeout as a Duration. `None` when disabled.
    pub fn connect_timeout_duration(&self) -> Option<Duration> {
        (self.connect_timeout > 0).then(|| Duration::from_secs(self.connect_timeout))
    }

    /// Options handed to every adapter connect.
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            connect_timeout: self.connect_timeout_duration(),
        }
    }
}

/// Read a JSON argument, inline or from `@path`.
fn read_json_arg<T: DeserializeOwned>(what: &str, raw: &str) -> BridgeResult<T> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            BridgeError::validation(format!("cannot read {} from '{}': {}", what, path, e))
        })?,
        None => raw.to_string(),
    };
    serde_json::from_str(&text)
        .map_err(|e| BridgeError::validation(format!("invalid {} JSON: {}", what, e)))
}

/// Decode the `--columns` argument.
pub fn parse_columns(raw: &str) -> BridgeResult<Vec<ColumnDescriptor>> {
    read_json_arg("columns", raw)
}

/// Decode the `--operations` argument.
pub fn parse_operations(raw: &str) -> BridgeResult<Vec<AlterOperation>> {
    read_json_arg("operations", raw)
}
