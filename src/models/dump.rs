//! The schema dump: a plain, serializable snapshot of one catalog pass.
//!
//! Nothing in here holds a connection. A dump can be written to YAML,
//! loaded back and rendered without touching the database again.

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DbError;

/// Column attributes every table starts with, in display order.
pub const BASE_FIELDS: [&str; 5] = ["name", "type", "nullable", "pkey", "default"];

/// Ordered set of column attribute keys with append-if-absent semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct FieldSet(Vec<String>);

impl FieldSet {
    pub fn base() -> Self {
        FieldSet(BASE_FIELDS.iter().map(|f| f.to_string()).collect())
    }

    /// Appends `field` unless already present. Returns whether it was added.
    pub fn insert(&mut self, field: &str) -> bool {
        if self.contains(field) {
            return false;
        }
        self.0.push(field.to_string());
        true
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|f| f == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for FieldSet {
    fn default() -> Self {
        Self::base()
    }
}

impl From<Vec<String>> for FieldSet {
    fn from(fields: Vec<String>) -> Self {
        let mut set = FieldSet(Vec::with_capacity(fields.len()));
        for field in &fields {
            set.insert(field);
        }
        set
    }
}

impl From<FieldSet> for Vec<String> {
    fn from(set: FieldSet) -> Self {
        set.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDump {
    pub name: String,
    pub tables: Vec<TableRecord>,
}

impl SchemaDump {
    pub fn to_yaml(&self) -> Result<String, DbError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, DbError> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    pub name: String,
    pub comment: String,
    pub fields: FieldSet,
    pub columns: Vec<ColumnRecord>,
    pub indexes: Vec<IndexRecord>,
    pub foreign_keys: Vec<ForeignKeyRecord>,
}

impl TableRecord {
    pub fn new(name: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: comment.into(),
            fields: FieldSet::base(),
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    /// The reflected value. Documents show the negation as "not null".
    pub nullable: bool,
    pub pkey: bool,
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fkey: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Keys merged in from a JSON column comment.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ColumnRecord {
    pub fn new(
        name: impl Into<String>,
        data_type: impl Into<String>,
        nullable: bool,
        pkey: bool,
        default: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            pkey,
            default,
            fkey: None,
            description: None,
            extra: BTreeMap::new(),
        }
    }

    /// Merge one key from a JSON comment into the record.
    ///
    /// Built-in attributes are overridden when the value has a usable type;
    /// anything else lands in `extra`.
    pub fn merge_field(&mut self, key: &str, value: Value) {
        match (key, value) {
            ("name", Value::String(s)) => self.name = s,
            ("type", Value::String(s)) => self.data_type = s,
            ("nullable", Value::Bool(b)) => self.nullable = b,
            ("pkey", Value::Bool(b)) => self.pkey = b,
            ("default", Value::String(s)) => self.default = Some(s),
            ("default", Value::Null) => self.default = None,
            ("fkey", value) => self.fkey = Some(value_text(value)),
            ("description", value) => self.description = Some(value_text(value)),
            (key @ ("name" | "type" | "nullable" | "pkey" | "default"), value) => {
                warn!(
                    "column {}: ignoring comment value {} for built-in field {}",
                    self.name, value, key
                );
            }
            (key, value) => {
                self.extra.insert(key.to_string(), value);
            }
        }
    }

    /// Raw value of a field, or `None` when the column does not carry it.
    pub fn get(&self, field: &str) -> Option<Value> {
        match field {
            "name" => Some(Value::String(self.name.clone())),
            "type" => Some(Value::String(self.data_type.clone())),
            "nullable" => Some(Value::Bool(self.nullable)),
            "pkey" => Some(Value::Bool(self.pkey)),
            "default" => self.default.clone().map(Value::String),
            "fkey" => self.fkey.clone().map(Value::String),
            "description" => self.description.clone().map(Value::String),
            other => self.extra.get(other).cloned(),
        }
    }
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub name: String,
    pub unique: bool,
    pub column_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyRecord {
    pub name: String,
    pub constrained_columns: Vec<String>,
    pub referred_table: String,
    pub referred_columns: Vec<String>,
}
