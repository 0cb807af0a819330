// src/schema/tables.rs

use std::collections::BTreeMap;

use super::types::{Column, HiveType, SerdeSpec, TableSpec};

pub const INPUT_FORMAT: &str = "org.apache.hadoop.mapred.TextInputFormat";
pub const OUTPUT_FORMAT: &str = "org.apache.hadoop.hive.ql.io.HiveIgnoreKeyTextOutputFormat";
pub const CSV_SERDE: &str = "org.apache.hadoop.hive.serde2.OpenCSVSerde";
pub const EXTERNAL_TABLE: &str = "EXTERNAL_TABLE";

pub const SEPARATOR_CHAR: u8 = b',';
pub const ESCAPE_CHAR: u8 = b'\\';
pub const QUOTE_CHAR: u8 = b'"';

// Source dataset columns kept by the projection.
pub const PROVINCE_STATE: &str = "Province_State";
pub const COUNTRY_REGION: &str = "Country_Region";
pub const CONFIRMED: &str = "Confirmed";
pub const DEATHS: &str = "Deaths";
pub const RECOVERED: &str = "Recovered";
pub const ACTIVE: &str = "Active";
pub const INCIDENCE_RATE: &str = "Incidence_Rate";
pub const CASE_FATALITY_RATIO: &str = "Case-Fatality_Ratio";

// Derived by the aggregation.
pub const LETALITY: &str = "Letality";

/// OpenCSVSerde configured with the writer's separator and escape characters.
pub fn csv_serde() -> SerdeSpec {
    let mut parameters = BTreeMap::new();
    parameters.insert("escapeChar".to_string(), (ESCAPE_CHAR as char).to_string());
    parameters.insert(
        "separatorChar".to_string(),
        (SEPARATOR_CHAR as char).to_string(),
    );
    parameters.insert("serialization.format".to_string(), "1".to_string());
    SerdeSpec {
        library: CSV_SERDE.to_string(),
        parameters,
    }
}

fn external_csv_table(
    name: &str,
    description: &str,
    location: &str,
    columns: Vec<Column>,
) -> TableSpec {
    let mut parameters = BTreeMap::new();
    parameters.insert("classification".to_string(), "csv".to_string());
    TableSpec {
        name: name.to_string(),
        description: description.to_string(),
        location: location.to_string(),
        columns,
        input_format: INPUT_FORMAT.to_string(),
        output_format: OUTPUT_FORMAT.to_string(),
        serde: csv_serde(),
        table_type: EXTERNAL_TABLE.to_string(),
        parameters,
    }
}

/// Per-region observations after projection, filter and casts.
pub fn raw_table(name: &str, description: &str, location: &str) -> TableSpec {
    external_csv_table(
        name,
        description,
        location,
        vec![
            Column::new(PROVINCE_STATE, HiveType::String, "Name of the State"),
            Column::new(COUNTRY_REGION, HiveType::String, "Name of the Country"),
            Column::new(CONFIRMED, HiveType::Int, "Number of confirmed cases"),
            Column::new(DEATHS, HiveType::Int, "Number of deaths cases"),
            Column::new(RECOVERED, HiveType::Int, "Number of recovered cases"),
            Column::new(ACTIVE, HiveType::Int, "Number of active cases"),
            Column::new(INCIDENCE_RATE, HiveType::Float, "Rate of incidence"),
            Column::new(
                CASE_FATALITY_RATIO,
                HiveType::Float,
                "Percentage of letal case",
            ),
        ],
    )
}

/// Single-row totals over the raw table plus the letality percentage.
pub fn aggregate_table(name: &str, description: &str, location: &str) -> TableSpec {
    external_csv_table(
        name,
        description,
        location,
        vec![
            Column::new(CONFIRMED, HiveType::Int, "Total number of confirmed cases"),
            Column::new(DEATHS, HiveType::Int, "Total number of deaths cases"),
            Column::new(RECOVERED, HiveType::Int, "Total number of recovered cases"),
            Column::new(ACTIVE, HiveType::Int, "Total number of active cases"),
            Column::new(LETALITY, HiveType::Float, "Letality in percent"),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_table_columns_follow_projection_order() {
        let spec = raw_table("Covid Data", "desc", "s3://bucket/covid-data/");
        assert_eq!(
            spec.column_names(),
            vec![
                PROVINCE_STATE,
                COUNTRY_REGION,
                CONFIRMED,
                DEATHS,
                RECOVERED,
                ACTIVE,
                INCIDENCE_RATE,
                CASE_FATALITY_RATIO
            ]
        );
        assert_eq!(spec.catalog_name(), "covid data");
        assert_eq!(spec.table_type, EXTERNAL_TABLE);
        assert_eq!(spec.parameters.get("classification").unwrap(), "csv");
    }

    #[test]
    fn serde_matches_writer_delimiters() {
        let serde = csv_serde();
        assert_eq!(serde.library, CSV_SERDE);
        assert_eq!(serde.parameters["separatorChar"], ",");
        assert_eq!(serde.parameters["escapeChar"], "\\");
        assert_eq!(serde.parameters["serialization.format"], "1");
    }

    #[test]
    fn aggregate_table_ends_with_letality() {
        let spec = aggregate_table("aggregation", "desc", "s3://agg/");
        let last = spec.columns.last().unwrap();
        assert_eq!(last.name, LETALITY);
        assert_eq!(last.ty, HiveType::Float);
        assert_eq!(spec.columns.len(), 5);
    }
}
