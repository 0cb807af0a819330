// src/fetch/mod.rs

/// Module for downloading the source dataset
pub mod dataset;

pub use dataset::fetch_csv;
