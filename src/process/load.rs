// src/process/load.rs

use anyhow::{anyhow, bail, Context, Result};
use arrow::{
    compute::concat_batches,
    csv::{reader::Format, ReaderBuilder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::{io::Cursor, sync::Arc};
use tracing::{debug, instrument};

use crate::process::utils::clean_str;

const BATCH_SIZE: usize = 8192;

/// Column names from the first record of a CSV document, quoting honoured.
pub fn parse_header(text: &str) -> Result<Vec<String>> {
    let body = text.trim_start_matches('\u{feff}');
    let first = body
        .lines()
        .next()
        .ok_or_else(|| anyhow!("dataset is empty"))?;
    if first.trim().is_empty() {
        bail!("dataset header line is blank");
    }

    let (schema, _) = Format::default()
        .with_header(true)
        .infer_schema(Cursor::new(body.as_bytes()), Some(0))
        .context("reading CSV header")?;
    Ok(schema.fields().iter().map(|f| clean_str(f.name())).collect())
}

/// Load a CSV document with a header row into a single all-text batch.
///
/// No type inference happens here; casts are applied after the projection
/// so that unused columns with odd values cannot fail the load.
#[instrument(level = "debug", skip(text), fields(bytes = text.len()))]
pub fn read_csv(text: &str) -> Result<RecordBatch> {
    let headers = parse_header(text)?;
    let fields: Vec<Field> = headers
        .iter()
        .map(|n| Field::new(n, DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let body = text.trim_start_matches('\u{feff}');
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_batch_size(BATCH_SIZE)
        .build(Cursor::new(body.as_bytes()))
        .context("creating CSV reader")?;

    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("reading CSV batches")?;
    let batch = concat_batches(&schema, &batches).context("concatenating CSV batches")?;

    debug!(
        columns = batch.num_columns(),
        rows = batch.num_rows(),
        "loaded dataset"
    );
    Ok(batch)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::process::utils::string_rows;

    /// Trimmed excerpt of a JHU daily report, including a quoted key with commas.
    pub(crate) const SAMPLE: &str = "\
FIPS,Admin2,Province_State,Country_Region,Last_Update,Lat,Long_,Confirmed,Deaths,Recovered,Active,Combined_Key,Incidence_Rate,Case-Fatality_Ratio
,,Acre,Brazil,2020-06-19 04:33:32,-9.0238,-70.812,8127,211,3796,4120,\"Acre, Brazil\",921.5163,2.5963
,,Sao Paulo,Brazil,2020-06-19 04:33:32,-23.5505,-46.6333,181460,10694,33712,137054,\"Sao Paulo, Brazil\",395.1875,5.8933
,,Ontario,Canada,2020-06-19 04:33:32,51.2538,-85.3232,32744,2550,27242,2952,\"Ontario, Canada\",222.6,7.787
,,,Germany,2020-06-19 04:33:32,51.165691,10.451526,188534,8872,173100,6562,Germany,225.0255,4.7058
";

    #[test]
    fn header_is_cleaned() -> Result<()> {
        let headers = parse_header("\u{feff}FIPS, \"Admin2\" ,Country_Region\r\n1,2,3\n")?;
        assert_eq!(headers, vec!["FIPS", "Admin2", "Country_Region"]);
        assert!(parse_header("").is_err());
        assert!(parse_header("\n1,2\n").is_err());
        Ok(())
    }

    #[test]
    fn quoted_header_keeps_its_comma() -> Result<()> {
        let headers = parse_header("\"Province, State\",Country_Region\n\"Acre, BR\",Brazil\n")?;
        assert_eq!(headers, vec!["Province, State", "Country_Region"]);

        let batch = read_csv("\"Province, State\",Country_Region\n\"Acre, BR\",Brazil\n")?;
        assert_eq!(batch.num_columns(), 2);
        assert_eq!(batch.schema().field(1).name(), "Country_Region");
        let rows = string_rows(&batch)?;
        assert_eq!(rows[0][1].as_deref(), Some("Brazil"));
        Ok(())
    }

    #[test]
    fn read_csv_keeps_every_column_as_text() -> Result<()> {
        let batch = read_csv(SAMPLE)?;
        assert_eq!(batch.num_rows(), 4);
        assert_eq!(batch.num_columns(), 14);
        assert!(batch
            .schema()
            .fields()
            .iter()
            .all(|f| f.data_type() == &DataType::Utf8));

        let rows = string_rows(&batch)?;
        let key = batch.schema().index_of("Combined_Key")?;
        assert_eq!(rows[0][key].as_deref(), Some("Acre, Brazil"));
        let province = batch.schema().index_of("Province_State")?;
        assert!(rows[3][province].as_deref().unwrap_or("").is_empty());
        Ok(())
    }

    #[test]
    fn header_only_yields_empty_batch() -> Result<()> {
        let batch = read_csv("a,b\n")?;
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 2);
        Ok(())
    }
}
