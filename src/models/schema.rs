//! Schema-related data models.
//!
//! This module defines the canonical schema shape every adapter produces and
//! the engine-agnostic descriptors used to create and alter tables.

use crate::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Engine-agnostic column description, used by create and by add/modify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub name: String,
    /// Native type expression, e.g. `VARCHAR(255)` or `int`
    #[serde(rename = "type")]
    pub native_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

fn default_nullable() -> bool {
    true
}

impl ColumnDescriptor {
    /// Create a nullable, non-key column.
    pub fn new(name: impl Into<String>, native_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native_type: native_type.into(),
            nullable: true,
            is_primary_key: false,
            auto_increment: false,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// One step of an ALTER TABLE request. Exactly one variant per instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAlterOperation", into = "RawAlterOperation")]
pub enum AlterOperation {
    Add(ColumnDescriptor),
    Modify(ColumnDescriptor),
    Drop(String),
    Rename {
        old_name: String,
        new_name: String,
        native_type: String,
    },
}

impl AlterOperation {
    /// Short lowercase label, matching the wire tag.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Modify(_) => "modify",
            Self::Drop(_) => "drop",
            Self::Rename { .. } => "rename",
        }
    }
}

/// Wire form of an alter operation: a `type` tag plus optional payload fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawAlterOperation {
    #[serde(rename = "type", default)]
    pub op_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<ColumnDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_type: Option<String>,
}

impl TryFrom<RawAlterOperation> for AlterOperation {
    type Error = BridgeError;

    fn try_from(raw: RawAlterOperation) -> Result<Self, Self::Error> {
        let tag = raw
            .op_type
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .ok_or_else(|| BridgeError::validation("alter operation is missing its 'type' tag"))?;

        let only = |allowed: &[&str]| -> Result<(), BridgeError> {
            let present = [
                ("column", raw.column.is_some()),
                ("columnName", raw.column_name.is_some()),
                ("oldName", raw.old_name.is_some()),
                ("newName", raw.new_name.is_some()),
                ("newType", raw.new_type.is_some()),
            ];
            for (field, is_set) in present {
                if is_set && !allowed.contains(&field) {
                    return Err(BridgeError::validation(format!(
                        "alter operation '{}' does not accept field '{}'",
                        tag, field
                    )));
                }
            }
            Ok(())
        };

        match tag.as_str() {
            "add" | "modify" => {
                only(&["column"])?;
                let column = raw.column.clone().ok_or_else(|| {
                    BridgeError::validation(format!("alter operation '{}' requires 'column'", tag))
                })?;
                Ok(if tag == "add" {
                    Self::Add(column)
                } else {
                    Self::Modify(column)
                })
            }
            "drop" => {
                only(&["columnName"])?;
                let name = raw.column_name.clone().ok_or_else(|| {
                    BridgeError::validation("alter operation 'drop' requires 'columnName'")
                })?;
                Ok(Self::Drop(name))
            }
            "rename" => {
                only(&["column", "oldName", "newName", "newType"])?;
                let old_name = raw.old_name.clone().ok_or_else(|| {
                    BridgeError::validation("alter operation 'rename' requires 'oldName'")
                })?;
                let new_name = raw.new_name.clone().ok_or_else(|| {
                    BridgeError::validation("alter operation 'rename' requires 'newName'")
                })?;
                let native_type = match (raw.new_type.clone(), raw.column.clone()) {
                    (Some(t), None) => t,
                    (None, Some(c)) => c.native_type,
                    (Some(_), Some(_)) => {
                        return Err(BridgeError::validation(
                            "alter operation 'rename' takes its type from either 'newType' or 'column.type', not both",
                        ));
                    }
                    (None, None) => {
                        return Err(BridgeError::validation(
                            "alter operation 'rename' requires a type in 'newType' or 'column.type'",
                        ));
                    }
                };
                Ok(Self::Rename {
                    old_name,
                    new_name,
                    native_type,
                })
            }
            other => Err(BridgeError::validation(format!(
                "unknown alter operation type '{}'",
                other
            ))),
        }
    }
}

impl From<AlterOperation> for RawAlterOperation {
    fn from(op: AlterOperation) -> Self {
        let tag = Some(op.label().to_string());
        match op {
            AlterOperation::Add(column) | AlterOperation::Modify(column) => Self {
                op_type: tag,
                column: Some(column),
                ..Default::default()
            },
            AlterOperation::Drop(name) => Self {
                op_type: tag,
                column_name: Some(name),
                ..Default::default()
            },
            AlterOperation::Rename {
                old_name,
                new_name,
                native_type,
            } => Self {
                op_type: tag,
                old_name: Some(old_name),
                new_name: Some(new_name),
                new_type: Some(native_type),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
}

impl ForeignKey {
    pub fn new(
        column: impl Into<String>,
        ref_table: impl Into<String>,
        ref_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            ref_table: ref_table.into(),
            ref_column: ref_column.into(),
        }
    }
}

/// Canonical per-table schema, identical in shape for every engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<String>,
    pub column_types: HashMap<String, String>,
    pub nullable: HashMap<String, bool>,
    pub primary_keys: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub row_count: i64,
}

impl TableSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a column in discovery order. Repeats of a known name are ignored.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        native_type: impl Into<String>,
        nullable: bool,
    ) {
        let name = name.into();
        if self.column_types.contains_key(&name) {
            return;
        }
        self.column_types.insert(name.clone(), native_type.into());
        self.nullable.insert(name.clone(), nullable);
        self.columns.push(name);
    }

    /// Record a primary key column, keeping discovery order without repeats.
    pub fn push_primary_key(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.primary_keys.contains(&name) {
            self.primary_keys.push(name);
        }
    }

    pub fn push_foreign_key(&mut self, fk: ForeignKey) {
        self.foreign_keys.push(fk);
    }

    /// Missing row-count data counts as zero.
    pub fn with_row_count(mut self, row_count: Option<i64>) -> Self {
        self.row_count = row_count.unwrap_or(0).max(0);
        self
    }
}

/// Qualified table or collection name -> schema. Key format is engine specific:
/// `schema.table` for PostgreSQL and SQL Server, bare names for MySQL and MongoDB.
pub type SchemaDescriptor = BTreeMap<String, TableSchema>;
