// src/cloud/glue.rs

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_glue::{
    types::{Column as GlueColumn, DatabaseInput, SerDeInfo, StorageDescriptor, TableInput},
    Client,
};
use tracing::{debug, info, instrument, warn};

use super::{Catalog, TableAction};
use crate::schema::{Column, HiveType, TableSpec};

/// Glue Data Catalog scoped to one account.
pub struct GlueCatalog {
    client: Client,
    catalog_id: String,
}

impl GlueCatalog {
    pub fn new(client: Client, catalog_id: String) -> Self {
        Self { client, catalog_id }
    }
}

/// Translate a `TableSpec` into the Glue request shape.
pub fn table_input(spec: &TableSpec) -> Result<TableInput> {
    let columns = spec
        .columns
        .iter()
        .map(|c| {
            GlueColumn::builder()
                .name(&c.name)
                .r#type(c.ty.as_str())
                .comment(&c.comment)
                .build()
                .with_context(|| format!("building column {}", c.name))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut serde = SerDeInfo::builder().serialization_library(&spec.serde.library);
    for (k, v) in &spec.serde.parameters {
        serde = serde.parameters(k, v);
    }

    let storage = StorageDescriptor::builder()
        .set_columns(Some(columns))
        .location(&spec.location)
        .input_format(&spec.input_format)
        .output_format(&spec.output_format)
        .serde_info(serde.build())
        .build();

    let mut input = TableInput::builder()
        .name(&spec.name)
        .description(&spec.description)
        .storage_descriptor(storage)
        .table_type(&spec.table_type);
    for (k, v) in &spec.parameters {
        input = input.parameters(k, v);
    }
    input
        .build()
        .with_context(|| format!("building table input {}", spec.name))
}

/// Read a Glue column back into the crate's column type.
pub fn from_glue_column(col: &GlueColumn) -> Column {
    let ty = col.r#type().unwrap_or_default();
    let parsed = HiveType::parse(ty).unwrap_or_else(|| {
        warn!(column = col.name(), ty, "unrecognised column type, reading as string");
        HiveType::String
    });
    Column::new(col.name(), parsed, col.comment().unwrap_or_default())
}

#[async_trait]
impl Catalog for GlueCatalog {
    #[instrument(level = "info", skip(self, description))]
    async fn ensure_database(&self, name: &str, description: &str) -> Result<bool> {
        let input = DatabaseInput::builder()
            .name(name)
            .description(description)
            .build()
            .context("building database input")?;

        let result = self
            .client
            .create_database()
            .catalog_id(&self.catalog_id)
            .database_input(input)
            .send()
            .await;

        match result {
            Ok(_) => {
                info!(database = name, "created database");
                Ok(true)
            }
            Err(err) => {
                let err = err.into_service_error();
                if err.is_already_exists_exception() {
                    debug!(database = name, "database already exists");
                    Ok(false)
                } else {
                    Err(anyhow::Error::new(err))
                        .with_context(|| format!("creating database {}", name))
                }
            }
        }
    }

    #[instrument(level = "info", skip(self, table), fields(table = %table.name))]
    async fn upsert_table(&self, database: &str, table: &TableSpec) -> Result<TableAction> {
        let exists = self.table_columns(database, &table.name).await?.is_some();
        let input = table_input(table)?;

        if exists {
            self.client
                .update_table()
                .catalog_id(&self.catalog_id)
                .database_name(database)
                .table_input(input)
                .send()
                .await
                .with_context(|| format!("updating table {}.{}", database, table.name))?;
            info!(database, location = %table.location, "updated table");
            Ok(TableAction::Updated)
        } else {
            self.client
                .create_table()
                .catalog_id(&self.catalog_id)
                .database_name(database)
                .table_input(input)
                .send()
                .await
                .with_context(|| format!("creating table {}.{}", database, table.name))?;
            info!(database, location = %table.location, "created table");
            Ok(TableAction::Created)
        }
    }

    async fn table_columns(&self, database: &str, table: &str) -> Result<Option<Vec<Column>>> {
        let result = self
            .client
            .get_table()
            .catalog_id(&self.catalog_id)
            .database_name(database)
            .name(table.to_lowercase())
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                let err = err.into_service_error();
                if err.is_entity_not_found_exception() {
                    return Ok(None);
                }
                return Err(anyhow::Error::new(err))
                    .with_context(|| format!("reading table {}.{}", database, table));
            }
        };

        let columns = output
            .table()
            .and_then(|t| t.storage_descriptor())
            .map(|sd| sd.columns().iter().map(from_glue_column).collect())
            .unwrap_or_default();
        Ok(Some(columns))
    }
}
