pub mod arrow;
pub mod tables;
pub mod types;

pub use self::arrow::{build_arrow_schema, map_to_arrow_type, verify_batch, verify_columns};
pub use tables::{aggregate_table, raw_table};
pub use types::{Column, HiveType, SerdeSpec, TableSpec};
