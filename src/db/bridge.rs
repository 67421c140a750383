//! Connect-act-close facade.
//!
//! Every call takes a connection string, classifies it, resolves the adapter,
//! validates all inputs, connects, runs one operation and closes the session.
//! Nothing survives the call.

use crate::db::adapter::{Adapter, Connection};
use crate::db::guard::{Identifier, TableName, validate_columns, validate_operations};
use crate::db::registry::{self, SUPPORTED_FORMS};
use crate::error::{BridgeError, BridgeResult, connection_suggestion};
use crate::models::{
    AlterOperation, ColumnDescriptor, ConnectOptions, DEFAULT_PAGE_LIMIT, EngineTag,
    MAX_PAGE_LIMIT, SchemaDescriptor, TablePage,
};
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct Bridge {
    options: ConnectOptions,
}

impl Bridge {
    pub fn new(options: ConnectOptions) -> Self {
        Self { options }
    }

    /// Classify and resolve; unknown engines fail before any I/O.
    fn adapter_for(connection_string: &str) -> BridgeResult<Box<dyn Adapter>> {
        let engine = EngineTag::classify(connection_string);
        registry::resolve(engine).ok_or_else(|| {
            BridgeError::connection(
                "Unrecognized connection string",
                format!("Use one of: {}", SUPPORTED_FORMS),
            )
        })
    }

    async fn open(
        &self,
        adapter: &dyn Adapter,
        connection_string: &str,
    ) -> BridgeResult<Box<dyn Connection>> {
        let connect = adapter.connect(connection_string, &self.options);
        match self.options.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, connect).await.map_err(|_| {
                BridgeError::connection(
                    format!("Connection timed out after {}s", limit.as_secs_f64()),
                    connection_suggestion(adapter.engine(), "timed out"),
                )
            })?,
            None => connect.await,
        }
    }

    /// Close the session and hand back the operation's result. A close
    /// failure only surfaces when the operation itself succeeded.
    async fn finish<T>(
        engine: EngineTag,
        operation: &'static str,
        conn: Box<dyn Connection>,
        result: BridgeResult<T>,
    ) -> BridgeResult<T> {
        let closed = conn.close().await;
        match (&result, closed) {
            (Ok(_), Err(e)) => {
                warn!(engine = %engine, operation, error = %e, "Failed to close connection");
            }
            (Err(e), Err(close_err)) => {
                warn!(
                    engine = %engine,
                    operation,
                    error = %close_err,
                    "Failed to close connection after error"
                );
                warn!(engine = %engine, operation, error = %e, "Operation failed");
            }
            (Err(e), Ok(())) => {
                warn!(engine = %engine, operation, error = %e, "Operation failed");
            }
            (Ok(_), Ok(())) => {
                info!(engine = %engine, operation, "Operation completed");
            }
        }
        result
    }

    /// Open and close a session, returning the detected engine.
    pub async fn test_connection(&self, connection_string: &str) -> BridgeResult<EngineTag> {
        let adapter = Self::adapter_for(connection_string)?;
        let engine = adapter.engine();
        info!(engine = %engine, operation = "test_connection", "Operation started");

        let conn = self.open(adapter.as_ref(), connection_string).await?;
        Self::finish(engine, "test_connection", conn, Ok(engine)).await
    }

    pub async fn fetch_schema(&self, connection_string: &str) -> BridgeResult<SchemaDescriptor> {
        let adapter = Self::adapter_for(connection_string)?;
        let engine = adapter.engine();
        info!(engine = %engine, operation = "fetch_schema", "Operation started");

        let mut conn = self.open(adapter.as_ref(), connection_string).await?;
        let result = conn.fetch_schema().await;
        Self::finish(engine, "fetch_schema", conn, result).await
    }

    pub async fn create_database(&self, connection_string: &str, name: &str) -> BridgeResult<()> {
        let adapter = Self::adapter_for(connection_string)?;
        let engine = adapter.engine();
        let name = Identifier::parse("database name", name)?;
        info!(engine = %engine, operation = "create_database", object = %name, "Operation started");

        let mut conn = self.open(adapter.as_ref(), connection_string).await?;
        let result = conn.create_database(&name).await;
        Self::finish(engine, "create_database", conn, result).await
    }

    pub async fn create_table(
        &self,
        connection_string: &str,
        table: &str,
        columns: &[ColumnDescriptor],
    ) -> BridgeResult<()> {
        let adapter = Self::adapter_for(connection_string)?;
        let engine = adapter.engine();
        let table = TableName::bare(table)?;
        let columns = validate_columns(columns, engine)?;
        info!(
            engine = %engine,
            operation = "create_table",
            object = %table,
            columns = columns.len(),
            "Operation started"
        );

        let mut conn = self.open(adapter.as_ref(), connection_string).await?;
        let result = conn.create_table(&table, &columns).await;
        Self::finish(engine, "create_table", conn, result).await
    }

    pub async fn alter_table(
        &self,
        connection_string: &str,
        table: &str,
        operations: &[AlterOperation],
    ) -> BridgeResult<()> {
        let adapter = Self::adapter_for(connection_string)?;
        let engine = adapter.engine();
        let table = TableName::qualified(table)?;
        let operations = validate_operations(operations, engine)?;
        info!(
            engine = %engine,
            operation = "alter_table",
            object = %table,
            operations = operations.len(),
            "Operation started"
        );

        let mut conn = self.open(adapter.as_ref(), connection_string).await?;
        let result = conn.alter_table(&table, &operations).await;
        Self::finish(engine, "alter_table", conn, result).await
    }

    pub async fn drop_table(&self, connection_string: &str, table: &str) -> BridgeResult<()> {
        let adapter = Self::adapter_for(connection_string)?;
        let engine = adapter.engine();
        let table = TableName::qualified(table)?;
        info!(engine = %engine, operation = "drop_table", object = %table, "Operation started");

        let mut conn = self.open(adapter.as_ref(), connection_string).await?;
        let result = conn.drop_table(&table).await;
        Self::finish(engine, "drop_table", conn, result).await
    }

    /// One page of rows. `limit` defaults to 100 and must be in `1..=1000`.
    pub async fn table_data(
        &self,
        connection_string: &str,
        table: &str,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> BridgeResult<TablePage> {
        let adapter = Self::adapter_for(connection_string)?;
        let engine = adapter.engine();
        let table = TableName::qualified(table)?;
        let limit = validate_limit(limit)?;
        let offset = offset.unwrap_or(0);
        info!(
            engine = %engine,
            operation = "table_data",
            object = %table,
            limit,
            offset,
            "Operation started"
        );

        let mut conn = self.open(adapter.as_ref(), connection_string).await?;
        let result = conn.table_data(&table, limit, offset).await;
        Self::finish(engine, "table_data", conn, result).await
    }
}

/// Resolve the page size, rejecting values outside `1..=MAX_PAGE_LIMIT`.
pub fn validate_limit(limit: Option<u64>) -> BridgeResult<u64> {
    match limit.unwrap_or(DEFAULT_PAGE_LIMIT) {
        l @ 1..=MAX_PAGE_LIMIT => Ok(l),
        other => Err(BridgeError::query(
            format!("limit {} is out of range", other),
            None,
            format!("Use a limit between 1 and {}", MAX_PAGE_LIMIT),
        )),
    }
}
