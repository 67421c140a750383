//! Input sanitization for everything interpolated into native statements.
//!
//! Names go through one identifier rule (`[A-Za-z0-9_]`, 1 to 128 chars).
//! Native type and default expressions are parsed as a single column
//! definition with the engine's SQL dialect and must not carry anything
//! beyond the type and the optional default. MongoDB type names follow the
//! identifier rule since they never reach a SQL parser.
//!
//! Adapters only ever receive the validated types from this module.

use crate::error::{BridgeError, BridgeResult};
use crate::models::{AlterOperation, ColumnDescriptor, EngineTag};
use sqlparser::ast::{ColumnOption, Statement};
use sqlparser::dialect::{Dialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;
use std::collections::HashSet;

/// Longest accepted identifier (SQL Server's limit; PostgreSQL truncates at 63).
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Sequences rejected anywhere in a type or default expression.
const FORBIDDEN_SEQUENCES: &[&str] = &[";", "--", "/*", "*/"];

/// A name that passed the identifier rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Validate `raw` as an identifier; `what` names it in the error message.
    pub fn parse(what: &str, raw: &str) -> BridgeResult<Self> {
        if raw.is_empty() {
            return Err(BridgeError::validation(format!("{} cannot be empty", what)));
        }
        if raw.len() > MAX_IDENTIFIER_LEN {
            return Err(BridgeError::validation(format!(
                "{} '{}' exceeds {} characters",
                what, raw, MAX_IDENTIFIER_LEN
            )));
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(BridgeError::validation(format!(
                "{} '{}' contains invalid characters: only letters, digits and underscore are allowed",
                what, raw
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Table or collection name with an optional schema qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    pub schema: Option<Identifier>,
    pub name: Identifier,
}

impl TableName {
    /// Unqualified name only (used by create).
    pub fn bare(raw: &str) -> BridgeResult<Self> {
        Ok(Self {
            schema: None,
            name: Identifier::parse("table name", raw)?,
        })
    }

    /// `table` or `schema.table`, so keys from fetch_schema can be passed back.
    pub fn qualified(raw: &str) -> BridgeResult<Self> {
        match raw.split_once('.') {
            Some((schema, name)) => Ok(Self {
                schema: Some(Identifier::parse("schema name", schema)?),
                name: Identifier::parse("table name", name)?,
            }),
            None => Self::bare(raw),
        }
    }

    /// Schema qualifier, falling back to the engine's default schema.
    pub fn schema_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.schema.as_ref().map(|s| s.as_str()).unwrap_or(default)
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A column descriptor whose name, type and default passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: Identifier,
    pub native_type: String,
    pub nullable: bool,
    pub is_primary_key: bool,
    pub auto_increment: bool,
    pub default: Option<String>,
}

impl ColumnSpec {
    pub fn validate(column: &ColumnDescriptor, engine: EngineTag) -> BridgeResult<Self> {
        let name = Identifier::parse("column name", &column.name)?;
        let native_type = column.native_type.trim().to_string();
        let default = column
            .default
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from);

        validate_expressions(engine, &native_type, default.as_deref())
            .map_err(|e| e.context(format!("column '{}'", name)))?;

        Ok(Self {
            name,
            native_type,
            nullable: column.nullable,
            is_primary_key: column.is_primary_key,
            auto_increment: column.auto_increment,
            default,
        })
    }
}

/// A validated alter operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterSpec {
    Add(ColumnSpec),
    Modify(ColumnSpec),
    Drop(Identifier),
    Rename {
        old_name: Identifier,
        new_name: Identifier,
        native_type: String,
    },
}

impl AlterSpec {
    pub fn validate(op: &AlterOperation, engine: EngineTag) -> BridgeResult<Self> {
        match op {
            AlterOperation::Add(col) => Ok(Self::Add(ColumnSpec::validate(col, engine)?)),
            AlterOperation::Modify(col) => Ok(Self::Modify(ColumnSpec::validate(col, engine)?)),
            AlterOperation::Drop(name) => Ok(Self::Drop(Identifier::parse("column name", name)?)),
            AlterOperation::Rename {
                old_name,
                new_name,
                native_type,
            } => {
                let native_type = native_type.trim().to_string();
                validate_expressions(engine, &native_type, None)?;
                Ok(Self::Rename {
                    old_name: Identifier::parse("column name", old_name)?,
                    new_name: Identifier::parse("column name", new_name)?,
                    native_type,
                })
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Modify(_) => "modify",
            Self::Drop(_) => "drop",
            Self::Rename { .. } => "rename",
        }
    }
}

/// Validate the column list of a create request.
pub fn validate_columns(
    columns: &[ColumnDescriptor],
    engine: EngineTag,
) -> BridgeResult<Vec<ColumnSpec>> {
    if columns.is_empty() {
        return Err(BridgeError::validation(
            "a table needs at least one column",
        ));
    }

    let mut seen = HashSet::new();
    columns
        .iter()
        .map(|col| {
            let spec = ColumnSpec::validate(col, engine)?;
            if !seen.insert(spec.name.as_str().to_lowercase()) {
                return Err(BridgeError::validation(format!(
                    "duplicate column name '{}'",
                    spec.name
                )));
            }
            Ok(spec)
        })
        .collect()
}

/// Validate the operation list of an alter request, keeping its order.
pub fn validate_operations(
    operations: &[AlterOperation],
    engine: EngineTag,
) -> BridgeResult<Vec<AlterSpec>> {
    if operations.is_empty() {
        return Err(BridgeError::validation(
            "alter_table needs at least one operation",
        ));
    }

    operations
        .iter()
        .enumerate()
        .map(|(idx, op)| {
            AlterSpec::validate(op, engine)
                .map_err(|e| e.context(format!("operation {} ({})", idx + 1, op.label())))
        })
        .collect()
}

// =============================================================================
// Expression Validation
// =============================================================================

fn dialect_for(engine: EngineTag) -> Box<dyn Dialect> {
    match engine {
        EngineTag::RelationalA => Box::new(PostgreSqlDialect {}),
        EngineTag::RelationalB => Box::new(MySqlDialect {}),
        EngineTag::RelationalC => Box::new(MsSqlDialect {}),
        _ => Box::new(GenericDialect {}),
    }
}

/// Validate a native type and an optional default expression for `engine`.
pub fn validate_expressions(
    engine: EngineTag,
    native_type: &str,
    default: Option<&str>,
) -> BridgeResult<()> {
    if native_type.is_empty() {
        return Err(BridgeError::validation("column type cannot be empty"));
    }

    for expr in std::iter::once(native_type).chain(default) {
        if let Some(seq) = FORBIDDEN_SEQUENCES.iter().find(|s| expr.contains(**s)) {
            return Err(BridgeError::validation(format!(
                "expression '{}' contains forbidden sequence '{}'",
                expr, seq
            )));
        }
        if expr.chars().any(char::is_control) {
            return Err(BridgeError::validation(format!(
                "expression '{}' contains control characters",
                expr.escape_default()
            )));
        }
    }

    if engine == EngineTag::Document {
        // Document defaults are parsed into BSON values, never interpolated.
        Identifier::parse("column type", native_type)?;
        return Ok(());
    }

    let probe = match default {
        Some(d) => format!("CREATE TABLE probe_table (probe_column {} DEFAULT {})", native_type, d),
        None => format!("CREATE TABLE probe_table (probe_column {})", native_type),
    };

    let dialect = dialect_for(engine);
    let statements = Parser::parse_sql(dialect.as_ref(), &probe).map_err(|e| {
        BridgeError::validation(format!(
            "invalid type or default expression '{}': {}",
            native_type, e
        ))
    })?;

    let [Statement::CreateTable(create)] = statements.as_slice() else {
        return Err(BridgeError::validation(format!(
            "type expression '{}' must describe exactly one column",
            native_type
        )));
    };

    if create.columns.len() != 1 || !create.constraints.is_empty() {
        return Err(BridgeError::validation(format!(
            "type expression '{}' must describe exactly one column",
            native_type
        )));
    }

    let extra_options = create.columns[0]
        .options
        .iter()
        .filter(|opt| !matches!(opt.option, ColumnOption::Default(_)))
        .count();
    let defaults = create.columns[0].options.len() - extra_options;
    if extra_options > 0 || defaults != usize::from(default.is_some()) {
        return Err(BridgeError::validation(format!(
            "type expression '{}' may only name a type; constraints and defaults have their own fields",
            native_type
        )));
    }

    Ok(())
}
