// src/schema/types.rs

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// Hive column types used in the external table definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HiveType {
    String,
    Int,
    Float,
}

impl HiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HiveType::String => "string",
            HiveType::Int => "int",
            HiveType::Float => "float",
        }
    }

    /// Parse a type string as the catalog reports it back.
    pub fn parse(ty: &str) -> Option<Self> {
        match ty.trim().to_ascii_lowercase().as_str() {
            "string" => Some(HiveType::String),
            "int" | "integer" => Some(HiveType::Int),
            "float" => Some(HiveType::Float),
            _ => None,
        }
    }
}

impl fmt::Display for HiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single column of an external table.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Eq, Hash)]
pub struct Column {
    pub name: String,
    pub ty: HiveType,
    pub comment: String,
}

impl Column {
    pub fn new(name: &str, ty: HiveType, comment: &str) -> Self {
        Self {
            name: name.to_string(),
            ty,
            comment: comment.to_string(),
        }
    }
}

/// Serializer/deserializer block of a table's storage descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerdeSpec {
    pub library: String,
    pub parameters: BTreeMap<String, String>,
}

/// Everything the catalog needs to expose a CSV prefix in object storage as a table.
///
/// The column list is the only contract between the headerless CSV files and
/// the query engine, so the same value is used to cast, write and register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub description: String,
    pub location: String,
    pub columns: Vec<Column>,
    pub input_format: String,
    pub output_format: String,
    pub serde: SerdeSpec,
    pub table_type: String,
    pub parameters: BTreeMap<String, String>,
}

impl TableSpec {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Name as the catalog stores it. Glue folds table names to lowercase.
    pub fn catalog_name(&self) -> String {
        self.name.to_lowercase()
    }
}
