// src/process/mod.rs

pub mod aggregate;
pub mod load;
pub mod transform;
pub mod utils;
pub mod write;

pub use aggregate::{summarize, Totals};
pub use load::read_csv;
pub use transform::{coerce, filter_contains, project};
pub use write::{to_csv_bytes, write_headerless_csv};
