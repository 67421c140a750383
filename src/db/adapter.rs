//! Adapter and connection contracts shared by every engine.
//!
//! An [`Adapter`] opens an authenticated session from a connection string.
//! The returned [`Connection`] carries out exactly the operations exposed by
//! the facade and is closed once the operation finishes, whatever its outcome.

use crate::db::guard::{AlterSpec, ColumnSpec, Identifier, TableName};
use crate::error::BridgeResult;
use crate::models::{ConnectOptions, EngineTag, SchemaDescriptor, TablePage};
use async_trait::async_trait;
use futures_util::future::BoxFuture;

/// Entry point for one engine.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Engine handled by this adapter. Also selects the expression dialect used
    /// to validate native types and defaults before connecting.
    fn engine(&self) -> EngineTag;

    /// Open and verify a session.
    async fn connect(
        &self,
        connection_string: &str,
        options: &ConnectOptions,
    ) -> BridgeResult<Box<dyn Connection>>;
}

/// An open, authenticated session. Inputs are always validated beforehand.
#[async_trait]
pub trait Connection: Send {
    /// Canonical schema of every table or collection visible to the session.
    async fn fetch_schema(&mut self) -> BridgeResult<SchemaDescriptor>;

    async fn create_database(&mut self, name: &Identifier) -> BridgeResult<()>;

    async fn create_table(&mut self, table: &TableName, columns: &[ColumnSpec])
    -> BridgeResult<()>;

    /// Apply operations in order. Atomic where the engine supports
    /// transactional DDL; otherwise stops at the first failure.
    async fn alter_table(&mut self, table: &TableName, operations: &[AlterSpec])
    -> BridgeResult<()>;

    /// Idempotent: dropping a missing table succeeds.
    async fn drop_table(&mut self, table: &TableName) -> BridgeResult<()>;

    async fn table_data(
        &mut self,
        table: &TableName,
        limit: u64,
        offset: u64,
    ) -> BridgeResult<TablePage>;

    /// Release the session.
    fn close(self: Box<Self>) -> BoxFuture<'static, BridgeResult<()>>;
}
