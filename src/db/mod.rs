//! Database abstraction layer.
//!
//! This module provides engine plumbing behind one contract:
//! - Adapter and connection traits, plus the engine registry
//! - Input sanitization for names and native expressions
//! - DDL translation per SQL dialect
//! - One adapter per engine (MongoDB, PostgreSQL, MySQL, SQL Server)
//! - The connect-act-close facade used by callers

pub mod adapter;
pub mod bridge;
pub mod ddl;
pub mod guard;
pub mod mongo;
pub mod mysql;
pub mod postgres;
pub mod registry;
pub mod sqlserver;
pub mod types;

pub use adapter::{Adapter, Connection};
pub use bridge::Bridge;
pub use ddl::{DdlTranslator, MySqlDdl, PostgresDdl, SqlServerDdl};
pub use guard::{AlterSpec, ColumnSpec, Identifier, TableName};
pub use registry::resolve;

use crate::error::BridgeError;

/// Quote a name read back from a catalog. Such names are trusted but may
/// contain any character, so the closing quote is doubled.
pub(crate) fn quote_catalog_ident(name: &str, open: char, close: char) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push(open);
    for c in name.chars() {
        if c == close {
            quoted.push(close);
        }
        quoted.push(c);
    }
    quoted.push(close);
    quoted
}

pub(crate) fn table_not_found(table: &TableName) -> BridgeError {
    BridgeError::query(
        format!("table '{}' not found", table),
        None,
        "Check the table name against fetch_schema output",
    )
}
