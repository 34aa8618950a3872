//! Schema descriptor
//!
//! The store keeps exactly one relation with three columns. The descriptor
//! names that relation and its columns; the table name also names the files
//! the engine keeps on disk.

use std::fmt;

/// Role a column plays in the relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    /// Engine-assigned, monotonically increasing ordering token
    RowId,
    /// Raw key bytes, unique
    Key,
    /// Serialized value bytes
    Value,
}

/// A single column: its name and role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub role: ColumnRole,
}

/// Names and roles of the store relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    table: String,
    columns: [Column; 3],
}

impl Schema {
    /// Default relation name
    pub const DEFAULT_TABLE: &'static str = "keyvaluestore";

    /// Create a schema with the default column names (`rowid`, `key`, `value`)
    pub fn new(table: impl Into<String>) -> Self {
        Self::with_columns(table, "rowid", "key", "value")
    }

    /// Create a schema with custom column names
    pub fn with_columns(
        table: impl Into<String>,
        row_id: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            columns: [
                Column { name: row_id.into(), role: ColumnRole::RowId },
                Column { name: key.into(), role: ColumnRole::Key },
                Column { name: value.into(), role: ColumnRole::Value },
            ],
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// All columns in storage order (row id, key, value)
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Name of the column with the given role
    pub fn column(&self, role: ColumnRole) -> &str {
        match role {
            ColumnRole::RowId => &self.columns[0].name,
            ColumnRole::Key => &self.columns[1].name,
            ColumnRole::Value => &self.columns[2].name,
        }
    }

    /// File name of the write-ahead log for this relation
    pub fn wal_file_name(&self) -> String {
        format!("{}.wal", self.table)
    }

    /// File name of the checkpointed table file for this relation
    pub fn table_file_name(&self) -> String {
        format!("{}.tbl", self.table)
    }

    /// Check the descriptor can be used to name files on disk
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.table.is_empty() {
            return Err("table name must not be empty".to_string());
        }
        if self
            .table
            .chars()
            .any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        {
            return Err(format!(
                "table name {:?} may only contain ASCII letters, digits, '_' and '-'",
                self.table
            ));
        }
        for column in &self.columns {
            if column.name.is_empty() {
                return Err(format!("{:?} column name must not be empty", column.role));
            }
        }
        Ok(())
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TABLE)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.table)?;
        for (i, column) in self.columns().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&column.name)?;
        }
        f.write_str(")")
    }
}
