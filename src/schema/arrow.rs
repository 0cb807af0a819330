// src/schema/arrow.rs

use anyhow::{bail, Result};
use arrow::{
    datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema},
    record_batch::RecordBatch,
};
use std::sync::Arc;

use super::types::{Column, HiveType, TableSpec};

/// Map a Hive column type onto the Arrow type the batch carries before writing.
///
/// - string → Utf8
/// - int    → Int64 (sums are computed over these, the CSV text is the same)
/// - float  → Float64
pub fn map_to_arrow_type(ty: HiveType) -> DataType {
    match ty {
        HiveType::String => DataType::Utf8,
        HiveType::Int => DataType::Int64,
        HiveType::Float => DataType::Float64,
    }
}

/// Build an ArrowSchema (inside an Arc) from a slice of table `Column`s.
pub fn build_arrow_schema(cols: &[Column]) -> Arc<ArrowSchema> {
    let fields: Vec<ArrowField> = cols
        .iter()
        .map(|col| ArrowField::new(&col.name, map_to_arrow_type(col.ty), true))
        .collect();

    Arc::new(ArrowSchema::new(fields))
}

/// Fail unless `batch` has exactly the columns of `spec`, in order, with the mapped types.
pub fn verify_batch(spec: &TableSpec, batch: &RecordBatch) -> Result<()> {
    let schema = batch.schema();
    if schema.fields().len() != spec.columns.len() {
        bail!(
            "table {} expects {} columns, batch has {}",
            spec.name,
            spec.columns.len(),
            schema.fields().len()
        );
    }
    for (pos, (field, col)) in schema.fields().iter().zip(&spec.columns).enumerate() {
        if field.name() != &col.name {
            bail!(
                "table {} column {} is {}, batch has {}",
                spec.name,
                pos,
                col.name,
                field.name()
            );
        }
        let expected = map_to_arrow_type(col.ty);
        if field.data_type() != &expected {
            bail!(
                "table {} column {} expects {:?}, batch has {:?}",
                spec.name,
                col.name,
                expected,
                field.data_type()
            );
        }
    }
    Ok(())
}

/// Compare a column list read back from the catalog against the registered one.
/// Names compare case-insensitively since the catalog lowercases them.
pub fn verify_columns(table: &str, expected: &[Column], actual: &[Column]) -> Result<()> {
    if expected.len() != actual.len() {
        bail!(
            "catalog table {} has {} columns, expected {}",
            table,
            actual.len(),
            expected.len()
        );
    }
    for (pos, (want, got)) in expected.iter().zip(actual).enumerate() {
        if !want.name.eq_ignore_ascii_case(&got.name) || want.ty != got.ty {
            bail!(
                "catalog table {} column {} is {} {}, expected {} {}",
                table,
                pos,
                got.name,
                got.ty,
                want.name,
                want.ty
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tables::{aggregate_table, raw_table};
    use arrow::array::{ArrayRef, Float64Array, Int64Array};

    #[test]
    fn schema_maps_hive_types() {
        let spec = raw_table("t", "d", "s3://b/");
        let schema = build_arrow_schema(&spec.columns);
        assert_eq!(schema.field(0).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(2).data_type(), &DataType::Int64);
        assert_eq!(schema.field(7).data_type(), &DataType::Float64);
        assert!(schema.fields().iter().all(|f| f.is_nullable()));
    }

    #[test]
    fn verify_batch_rejects_reordered_columns() -> Result<()> {
        let spec = aggregate_table("aggregation", "d", "s3://agg/");
        let ints = |v: i64| Arc::new(Int64Array::from(vec![v])) as ArrayRef;
        let columns = vec![
            ints(35),
            ints(3),
            ints(1),
            ints(2),
            Arc::new(Float64Array::from(vec![8.5])) as ArrayRef,
        ];

        let good = RecordBatch::try_new(build_arrow_schema(&spec.columns), columns.clone())?;
        verify_batch(&spec, &good)?;

        let mut swapped = spec.columns.clone();
        swapped.swap(0, 1);
        let bad = RecordBatch::try_new(build_arrow_schema(&swapped), columns)?;
        let err = verify_batch(&spec, &bad).unwrap_err();
        assert!(err.to_string().contains("column 0"), "{err}");
        Ok(())
    }

    #[test]
    fn verify_columns_ignores_catalog_case_folding() {
        let spec = raw_table("t", "d", "s3://b/");
        let lowered: Vec<Column> = spec
            .columns
            .iter()
            .map(|c| Column::new(&c.name.to_lowercase(), c.ty, &c.comment))
            .collect();
        assert!(verify_columns("t", &spec.columns, &lowered).is_ok());

        let mut retyped = lowered.clone();
        retyped[2].ty = HiveType::String;
        assert!(verify_columns("t", &spec.columns, &retyped).is_err());
    }
}
