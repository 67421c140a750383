//! Data models for the database bridge.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod page;
pub mod schema;

// Re-export commonly used types
pub use connection::{ConnectOptions, EngineTag, masked_connection_string};
pub use page::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, PageColumn, Row, TablePage};
pub use schema::{
    AlterOperation, ColumnDescriptor, ForeignKey, RawAlterOperation, SchemaDescriptor,
    TableSchema,
};
