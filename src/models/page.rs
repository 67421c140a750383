//! Table data page models.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default page size.
pub const DEFAULT_PAGE_LIMIT: u64 = 100;

/// Maximum allowed page size.
pub const MAX_PAGE_LIMIT: u64 = 1000;

/// A JSON object keyed by column name.
pub type Row = serde_json::Map<String, JsonValue>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub native_type: String,
}

impl PageColumn {
    pub fn new(name: impl Into<String>, native_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native_type: native_type.into(),
        }
    }
}

/// One page of rows plus the numbers needed to fetch the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePage {
    #[serde(rename = "data")]
    pub rows: Vec<Row>,
    pub columns: Vec<PageColumn>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
    pub has_more: bool,
}

impl TablePage {
    /// Build a page; `has_more` is derived as `offset + limit < total`.
    pub fn new(rows: Vec<Row>, columns: Vec<PageColumn>, total: u64, limit: u64, offset: u64) -> Self {
        Self {
            rows,
            columns,
            total,
            limit,
            offset,
            has_more: offset.saturating_add(limit) < total,
        }
    }
}
