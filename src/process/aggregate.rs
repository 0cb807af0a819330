// src/process/aggregate.rs

use anyhow::{anyhow, bail, Context, Result};
use arrow::{
    array::{ArrayRef, Float64Array, Int64Array},
    compute::sum_checked,
    record_batch::RecordBatch,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::schema::{
    build_arrow_schema,
    tables::{ACTIVE, CONFIRMED, DEATHS, RECOVERED},
    verify_batch, TableSpec,
};

/// Column totals over the filtered observations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Totals {
    pub confirmed: i64,
    pub deaths: i64,
    pub recovered: i64,
    pub active: i64,
    pub letality: f64,
}

/// Sum of an integer column. Nulls are skipped; overflow is an error.
pub fn column_sum(batch: &RecordBatch, name: &str) -> Result<i64> {
    let idx = batch.schema().index_of(name)?;
    let values = batch
        .column(idx)
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| anyhow!("column {} is not an integer column", name))?;
    let total = sum_checked(values).with_context(|| format!("summing {}", name))?;
    Ok(total.unwrap_or(0))
}

/// Deaths as a percentage of confirmed cases.
pub fn letality(deaths: i64, confirmed: i64) -> Result<f64> {
    if confirmed <= 0 {
        bail!("letality is undefined with {} confirmed cases", confirmed);
    }
    Ok(deaths as f64 / confirmed as f64 * 100.0)
}

pub fn totals(batch: &RecordBatch) -> Result<Totals> {
    let confirmed = column_sum(batch, CONFIRMED)?;
    let deaths = column_sum(batch, DEATHS)?;
    Ok(Totals {
        confirmed,
        deaths,
        recovered: column_sum(batch, RECOVERED)?,
        active: column_sum(batch, ACTIVE)?,
        letality: letality(deaths, confirmed)?,
    })
}

/// Collapse the coerced observations into the one-row aggregate table.
#[instrument(level = "info", skip(batch, spec), fields(rows = batch.num_rows()))]
pub fn summarize(batch: &RecordBatch, spec: &TableSpec) -> Result<(RecordBatch, Totals)> {
    let t = totals(batch)?;
    info!(
        confirmed = t.confirmed,
        deaths = t.deaths,
        recovered = t.recovered,
        active = t.active,
        letality = t.letality,
        "aggregated"
    );

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(vec![t.confirmed])),
        Arc::new(Int64Array::from(vec![t.deaths])),
        Arc::new(Int64Array::from(vec![t.recovered])),
        Arc::new(Int64Array::from(vec![t.active])),
        Arc::new(Float64Array::from(vec![t.letality])),
    ];
    let out = RecordBatch::try_new(build_arrow_schema(&spec.columns), columns)
        .context("building aggregate batch")?;
    verify_batch(spec, &out)?;
    Ok((out, t))
}
