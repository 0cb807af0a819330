// src/process/transform.rs

use anyhow::{anyhow, bail, Context, Result};
use arrow::{
    array::{
        Array, ArrayRef, BooleanArray, Float64Array, Float64Builder, Int64Array, Int64Builder,
        StringArray, StringBuilder,
    },
    compute::filter_record_batch,
    datatypes::DataType,
    record_batch::RecordBatch,
};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::process::utils::{clean_str, string_column};
use crate::schema::{build_arrow_schema, Column, HiveType, TableSpec};

/// Keep only `names`, in that order.
pub fn project(batch: &RecordBatch, names: &[&str]) -> Result<RecordBatch> {
    let schema = batch.schema();
    let indices = names
        .iter()
        .map(|name| {
            schema
                .index_of(name)
                .with_context(|| format!("column {} missing from dataset", name))
        })
        .collect::<Result<Vec<_>>>()?;
    batch.project(&indices).context("projecting columns")
}

/// Keep the rows whose `column` contains `needle` (case-sensitive). Nulls never match.
#[instrument(level = "debug", skip(batch), fields(rows = batch.num_rows()))]
pub fn filter_contains(batch: &RecordBatch, column: &str, needle: &str) -> Result<RecordBatch> {
    let values = string_column(batch, column)?;
    let mask = BooleanArray::from(
        values
            .iter()
            .map(|v| v.map_or(false, |s| s.contains(needle)))
            .collect::<Vec<bool>>(),
    );
    let out = filter_record_batch(batch, &mask).context("filtering rows")?;
    debug!(kept = out.num_rows(), "filtered");
    Ok(out)
}

/// Cast every column to the type its table column declares.
///
/// Accepts text columns as loaded, or columns that are already cast, so
/// coercing twice gives the same batch as coercing once.
#[instrument(
    level = "debug",
    skip(batch, spec),
    fields(table = %spec.name, rows = batch.num_rows())
)]
pub fn coerce(batch: &RecordBatch, spec: &TableSpec) -> Result<RecordBatch> {
    let schema = batch.schema();
    if schema.fields().len() != spec.columns.len() {
        bail!(
            "cannot coerce {} columns into table {} with {} columns",
            schema.fields().len(),
            spec.name,
            spec.columns.len()
        );
    }

    let mut out = Vec::with_capacity(batch.num_columns());
    for ((arr, field), col) in batch
        .columns()
        .iter()
        .zip(schema.fields())
        .zip(&spec.columns)
    {
        if field.name() != &col.name {
            bail!(
                "column {} is out of order for table {}, found {}",
                col.name,
                spec.name,
                field.name()
            );
        }
        let cast = match col.ty {
            HiveType::String => to_lower_text(arr, col)?,
            HiveType::Int => to_int(arr, col)?,
            HiveType::Float => to_float(arr, col)?,
        };
        debug!(column = %col.name, ty = %col.ty, "coerced");
        out.push(cast);
    }

    RecordBatch::try_new(build_arrow_schema(&spec.columns), out).map_err(Into::into)
}

fn to_lower_text(arr: &ArrayRef, col: &Column) -> Result<ArrayRef> {
    let sarr = arr
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| anyhow!("column {} is {:?}, expected text", col.name, arr.data_type()))?;
    let mut b = StringBuilder::with_capacity(sarr.len(), sarr.value_data().len());
    for opt in sarr.iter() {
        b.append_option(opt.map(str::to_lowercase));
    }
    Ok(Arc::new(b.finish()))
}

fn to_int(arr: &ArrayRef, col: &Column) -> Result<ArrayRef> {
    match arr.data_type() {
        DataType::Int64 => Ok(arr.clone()),
        DataType::Utf8 => {
            let sarr = arr
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| anyhow!("column {} is not text", col.name))?;
            let mut b = Int64Builder::with_capacity(sarr.len());
            for (row, opt) in sarr.iter().enumerate() {
                let raw = opt.ok_or_else(|| {
                    anyhow!("column {} row {}: missing integer value", col.name, row)
                })?;
                let v = parse_int(raw)
                    .with_context(|| format!("column {} row {}", col.name, row))?;
                b.append_value(v);
            }
            Ok(Arc::new(b.finish()))
        }
        DataType::Float64 => {
            let farr = arr
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| anyhow!("column {} is not Float64", col.name))?;
            let mut b = Int64Builder::with_capacity(farr.len());
            for (row, opt) in farr.iter().enumerate() {
                let f = opt.ok_or_else(|| {
                    anyhow!("column {} row {}: missing integer value", col.name, row)
                })?;
                let v = truncate(f).with_context(|| format!("column {} row {}", col.name, row))?;
                b.append_value(v);
            }
            Ok(Arc::new(b.finish()))
        }
        other => bail!("column {} is {:?}, cannot cast to int", col.name, other),
    }
}

fn to_float(arr: &ArrayRef, col: &Column) -> Result<ArrayRef> {
    match arr.data_type() {
        DataType::Float64 => Ok(arr.clone()),
        DataType::Utf8 => {
            let sarr = arr
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| anyhow!("column {} is not text", col.name))?;
            let mut b = Float64Builder::with_capacity(sarr.len());
            for (row, opt) in sarr.iter().enumerate() {
                let cleaned = opt.map(clean_str).filter(|s| !s.is_empty());
                let v = match cleaned {
                    Some(s) => Some(s.parse::<f64>().with_context(|| {
                        format!("column {} row {}: {:?} is not a number", col.name, row, s)
                    })?),
                    None => None,
                };
                b.append_option(v);
            }
            Ok(Arc::new(b.finish()))
        }
        DataType::Int64 => {
            let iarr = arr
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| anyhow!("column {} is not Int64", col.name))?;
            Ok(Arc::new(
                iarr.iter().map(|v| v.map(|i| i as f64)).collect::<Float64Array>(),
            ))
        }
        other => bail!("column {} is {:?}, cannot cast to float", col.name, other),
    }
}

/// Parse an integer cell. Float text such as `12.0` is truncated toward zero.
pub fn parse_int(raw: &str) -> Result<i64> {
    let s = clean_str(raw);
    if let Ok(v) = s.parse::<i64>() {
        return Ok(v);
    }
    let f: f64 = s
        .parse()
        .map_err(|_| anyhow!("{:?} is not an integer", s))?;
    truncate(f)
}

fn truncate(f: f64) -> Result<i64> {
    if !f.is_finite() || f >= i64::MAX as f64 || f < i64::MIN as f64 {
        bail!("{} does not fit an integer", f);
    }
    Ok(f.trunc() as i64)
}
