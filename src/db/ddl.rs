//! DDL statement generation for the SQL engines.
//!
//! Translators are pure: they turn validated descriptors into statement
//! strings and never touch a connection. Every interpolated name has passed
//! the identifier rule and every type or default passed expression validation,
//! so quoting here only guards against keyword clashes.

use crate::db::guard::{AlterSpec, ColumnSpec, Identifier, TableName};

/// Engine-specific statement generation.
pub trait DdlTranslator {
    /// Quote a single identifier.
    fn quote(&self, ident: &str) -> String;

    /// Column definition used by CREATE TABLE, ADD and MODIFY.
    fn column_definition(&self, column: &ColumnSpec) -> String;

    /// Statements for one alter operation, in execution order.
    fn alter_statements(&self, table: &TableName, op: &AlterSpec) -> Vec<String>;

    fn qualified(&self, table: &TableName) -> String {
        match &table.schema {
            Some(schema) => format!(
                "{}.{}",
                self.quote(schema.as_str()),
                self.quote(table.name.as_str())
            ),
            None => self.quote(table.name.as_str()),
        }
    }

    fn create_database(&self, name: &Identifier) -> String {
        format!("CREATE DATABASE {}", self.quote(name.as_str()))
    }

    /// CREATE TABLE with a table-level primary key. Auto-increment columns
    /// always join the key.
    fn create_table(&self, table: &TableName, columns: &[ColumnSpec]) -> String {
        let mut definitions: Vec<String> =
            columns.iter().map(|c| self.column_definition(c)).collect();

        let keys: Vec<String> = columns
            .iter()
            .filter(|c| c.is_primary_key || c.auto_increment)
            .map(|c| self.quote(c.name.as_str()))
            .collect();
        if !keys.is_empty() {
            definitions.push(format!("PRIMARY KEY ({})", keys.join(", ")));
        }

        format!(
            "CREATE TABLE {} ({})",
            self.qualified(table),
            definitions.join(", ")
        )
    }

    fn drop_table(&self, table: &TableName) -> String {
        format!("DROP TABLE IF EXISTS {}", self.qualified(table))
    }
}

/// Column definition for ADD, with an inline key when requested.
fn added_column<T: DdlTranslator + ?Sized>(translator: &T, column: &ColumnSpec) -> String {
    let definition = translator.column_definition(column);
    if column.is_primary_key || column.auto_increment {
        format!("{} PRIMARY KEY", definition)
    } else {
        definition
    }
}

// =============================================================================
// PostgreSQL
// =============================================================================

pub struct PostgresDdl;

impl DdlTranslator for PostgresDdl {
    fn quote(&self, ident: &str) -> String {
        format!("\"{}\"", ident)
    }

    fn column_definition(&self, column: &ColumnSpec) -> String {
        let name = self.quote(column.name.as_str());
        if column.auto_increment {
            return format!("{} SERIAL", name);
        }

        let mut def = format!("{} {}", name, column.native_type);
        if !column.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            def.push_str(&format!(" DEFAULT {}", default));
        }
        def
    }

    fn alter_statements(&self, table: &TableName, op: &AlterSpec) -> Vec<String> {
        let prefix = format!("ALTER TABLE {}", self.qualified(table));
        match op {
            AlterSpec::Add(column) => {
                vec![format!("{} ADD COLUMN {}", prefix, added_column(self, column))]
            }
            AlterSpec::Modify(column) => {
                let name = self.quote(column.name.as_str());
                let retype = format!(
                    "{} ALTER COLUMN {} TYPE {}",
                    prefix,
                    name,
                    serial_storage_type(&column.native_type)
                );
                // The sequence default backs the auto-increment and stays put.
                if column.auto_increment {
                    return vec![
                        retype,
                        format!("{} ALTER COLUMN {} SET NOT NULL", prefix, name),
                    ];
                }

                let nullability = if column.nullable {
                    "DROP NOT NULL"
                } else {
                    "SET NOT NULL"
                };
                let default = match &column.default {
                    Some(d) => format!("SET DEFAULT {}", d),
                    None => "DROP DEFAULT".to_string(),
                };
                vec![
                    retype,
                    format!("{} ALTER COLUMN {} {}", prefix, name, nullability),
                    format!("{} ALTER COLUMN {} {}", prefix, name, default),
                ]
            }
            AlterSpec::Drop(name) => {
                vec![format!("{} DROP COLUMN {}", prefix, self.quote(name.as_str()))]
            }
            AlterSpec::Rename {
                old_name, new_name, ..
            } => vec![format!(
                "{} RENAME COLUMN {} TO {}",
                prefix,
                self.quote(old_name.as_str()),
                self.quote(new_name.as_str())
            )],
        }
    }
}

/// `SERIAL` and friends are not real types and cannot appear in `ALTER
/// COLUMN ... TYPE`; map them to the integer type they create.
fn serial_storage_type(native_type: &str) -> &str {
    match native_type.to_ascii_uppercase().as_str() {
        "SMALLSERIAL" | "SERIAL2" => "SMALLINT",
        "SERIAL" | "SERIAL4" => "INTEGER",
        "BIGSERIAL" | "SERIAL8" => "BIGINT",
        _ => native_type,
    }
}

// =============================================================================
// MySQL
// =============================================================================

pub struct MySqlDdl;

impl DdlTranslator for MySqlDdl {
    fn quote(&self, ident: &str) -> String {
        format!("`{}`", ident)
    }

    fn column_definition(&self, column: &ColumnSpec) -> String {
        let mut def = format!("{} {}", self.quote(column.name.as_str()), column.native_type);
        if column.auto_increment {
            def.push_str(" NOT NULL AUTO_INCREMENT");
            return def;
        }

        def.push_str(if column.nullable { " NULL" } else { " NOT NULL" });
        if let Some(default) = &column.default {
            def.push_str(&format!(" DEFAULT {}", default));
        }
        def
    }

    fn alter_statements(&self, table: &TableName, op: &AlterSpec) -> Vec<String> {
        let prefix = format!("ALTER TABLE {}", self.qualified(table));
        let statement = match op {
            AlterSpec::Add(column) => {
                format!("{} ADD COLUMN {}", prefix, added_column(self, column))
            }
            AlterSpec::Modify(column) => format!(
                "{} MODIFY COLUMN {}",
                prefix,
                self.column_definition(column)
            ),
            AlterSpec::Drop(name) => {
                format!("{} DROP COLUMN {}", prefix, self.quote(name.as_str()))
            }
            AlterSpec::Rename {
                old_name,
                new_name,
                native_type,
            } => format!(
                "{} CHANGE COLUMN {} {} {}",
                prefix,
                self.quote(old_name.as_str()),
                self.quote(new_name.as_str()),
                native_type
            ),
        };
        vec![statement]
    }
}

// =============================================================================
// SQL Server
// =============================================================================

pub struct SqlServerDdl;

impl DdlTranslator for SqlServerDdl {
    fn quote(&self, ident: &str) -> String {
        format!("[{}]", ident)
    }

    fn column_definition(&self, column: &ColumnSpec) -> String {
        let name = self.quote(column.name.as_str());
        if column.auto_increment {
            return format!("{} INT IDENTITY(1,1) NOT NULL", name);
        }

        let mut def = format!("{} {}", name, column.native_type);
        if let Some(default) = &column.default {
            def.push_str(&format!(" DEFAULT {}", default));
        }
        def.push_str(if column.nullable { " NULL" } else { " NOT NULL" });
        def
    }

    fn alter_statements(&self, table: &TableName, op: &AlterSpec) -> Vec<String> {
        let qualified = self.qualified(table);
        let prefix = format!("ALTER TABLE {}", qualified);
        match op {
            AlterSpec::Add(column) => {
                vec![format!("{} ADD {}", prefix, added_column(self, column))]
            }
            AlterSpec::Modify(column) => {
                let name = self.quote(column.name.as_str());
                let nullability = if column.nullable && !column.auto_increment {
                    "NULL"
                } else {
                    "NOT NULL"
                };
                let mut statements = vec![format!(
                    "{} ALTER COLUMN {} {} {}",
                    prefix, name, column.native_type, nullability
                )];
                if column.auto_increment {
                    return statements;
                }
                if let Some(default) = &column.default {
                    statements.push(format!("{} ADD DEFAULT {} FOR {}", prefix, default, name));
                }
                statements
            }
            AlterSpec::Drop(name) => {
                vec![format!("{} DROP COLUMN {}", prefix, self.quote(name.as_str()))]
            }
            AlterSpec::Rename {
                old_name, new_name, ..
            } => vec![format!(
                "EXEC sp_rename '{}.{}', '{}', 'COLUMN'",
                table, old_name, new_name
            )],
        }
    }
}
