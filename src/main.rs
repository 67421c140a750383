//! db-bridge - Main entry point.
//!
//! Runs one bridge operation per invocation. Results are printed as JSON on
//! stdout; logs and failures go to stderr.

use db_bridge::config::{Command, Config, parse_columns, parse_operations};
use db_bridge::error::{BridgeError, BridgeResult};
use db_bridge::models::EngineTag;
use db_bridge::Bridge;
use serde::Serialize;
use serde_json::json;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn render<T: Serialize>(value: &T, pretty: bool) -> BridgeResult<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    rendered.map_err(|e| BridgeError::validation(format!("cannot serialize result: {}", e)))
}

async fn run(config: &Config) -> BridgeResult<String> {
    let bridge = Bridge::new(config.connect_options());
    let cs = config.connection.as_str();

    match &config.command {
        Command::Classify => {
            let engine = EngineTag::classify(cs);
            render(&json!({ "engine": engine, "name": engine.display_name() }), config.pretty)
        }
        Command::TestConnection => {
            let engine = bridge.test_connection(cs).await?;
            render(&json!({ "success": true, "engine": engine }), config.pretty)
        }
        Command::Schema { output } => {
            let schema = bridge.fetch_schema(cs).await?;
            let rendered = render(&schema, config.pretty)?;
            if let Some(path) = output {
                std::fs::write(path, &rendered).map_err(|e| {
                    BridgeError::validation(format!(
                        "cannot write schema to '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
                info!(path = %path.display(), tables = schema.len(), "Schema written");
            }
            Ok(rendered)
        }
        Command::CreateDatabase { name } => {
            bridge.create_database(cs, name).await?;
            render(&json!({ "success": true }), config.pretty)
        }
        Command::CreateTable { name, columns } => {
            let columns = parse_columns(columns)?;
            bridge.create_table(cs, name, &columns).await?;
            render(&json!({ "success": true }), config.pretty)
        }
        Command::AlterTable { name, operations } => {
            let operations = parse_operations(operations)?;
            bridge.alter_table(cs, name, &operations).await?;
            render(&json!({ "success": true }), config.pretty)
        }
        Command::DropTable { name } => {
            bridge.drop_table(cs, name).await?;
            render(&json!({ "success": true }), config.pretty)
        }
        Command::TableData {
            name,
            limit,
            offset,
        } => {
            let page = bridge.table_data(cs, name, *limit, *offset).await?;
            render(&page, config.pretty)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse configuration from command line and environment
    let config = Config::parse_args();

    // Initialize logging
    init_tracing(&config);

    info!(
        command = config.command.name(),
        "Starting db-bridge v{}",
        env!("CARGO_PKG_VERSION")
    );

    match run(&config).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.to_json());
            ExitCode::FAILURE
        }
    }
}
