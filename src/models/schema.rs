//! Raw records reported by a catalog provider, before any comment decoding.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TableSchema {
    pub table_name: String,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub default: Option<String>,
    pub comment: Option<String>,
    /// Engine specific annotations such as a non-default collation or `auto_increment`.
    pub options: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IndexSchema {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ForeignKeySchema {
    pub name: String,
    pub constrained_columns: Vec<String>,
    pub referred_table: String,
    pub referred_columns: Vec<String>,
}

impl ForeignKeySchema {
    /// The `table.column` this key points at for one of its constrained columns.
    pub fn reference_for(&self, column: &str) -> Option<String> {
        let position = self.constrained_columns.iter().position(|c| c == column)?;
        let referred = self
            .referred_columns
            .get(position)
            .or_else(|| self.referred_columns.first())?;
        Some(format!("{}.{}", self.referred_table, referred))
    }
}
