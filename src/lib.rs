//! db-bridge library
//!
//! This library provides one operation contract over MongoDB, PostgreSQL,
//! MySQL and SQL Server: connect, introspect schema, create databases and
//! tables, alter and drop tables, and page through rows.

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::Config;
pub use db::Bridge;
pub use error::{BridgeError, BridgeResult};
pub use models::EngineTag;
