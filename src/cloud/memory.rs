// src/cloud/memory.rs

use anyhow::{anyhow, bail, Context, Result};
use arrow::{
    compute::concat_batches,
    csv::ReaderBuilder,
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    collections::{BTreeMap, HashMap},
    io::Cursor,
    sync::{Arc, Mutex},
};
use tracing::{debug, info};

use super::{split_s3_uri, Catalog, ObjectStore, QueryEngine, TableAction};
use crate::schema::{
    tables::{ESCAPE_CHAR, QUOTE_CHAR, SEPARATOR_CHAR},
    Column, TableSpec,
};

static SELECT_ALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)^\s*select\s+\*\s+from\s+"((?:[^"]|"")+)"\s*\.\s*"((?:[^"]|"")+)"\s*(?:limit\s+(\d+))?\s*;?\s*$"#,
    )
    .expect("select pattern should compile")
});

/// Buckets and objects kept in process memory.
#[derive(Default)]
pub struct MemoryStore {
    buckets: Mutex<HashMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        let buckets = self.buckets.lock().ok()?;
        buckets.get(bucket)?.get(key).cloned()
    }

    /// Objects under `prefix`, ordered by key.
    pub fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let buckets = self
            .buckets
            .lock()
            .map_err(|_| anyhow!("object store lock poisoned"))?;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| anyhow!("no such bucket {}", bucket))?;
        Ok(objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<bool> {
        let mut buckets = self
            .buckets
            .lock()
            .map_err(|_| anyhow!("object store lock poisoned"))?;
        if buckets.contains_key(bucket) {
            return Ok(false);
        }
        buckets.insert(bucket.to_string(), BTreeMap::new());
        info!(bucket, "created in-memory bucket");
        Ok(true)
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let mut buckets = self
            .buckets
            .lock()
            .map_err(|_| anyhow!("object store lock poisoned"))?;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| anyhow!("no such bucket {}", bucket))?;
        debug!(bucket, key, bytes = body.len(), "stored object");
        objects.insert(key.to_string(), body);
        Ok(())
    }
}

/// Catalog kept in process memory. Names are folded to lowercase like Glue does.
#[derive(Default)]
pub struct MemoryCatalog {
    databases: Mutex<HashMap<String, HashMap<String, TableSpec>>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, database: &str, table: &str) -> Result<Option<TableSpec>> {
        let dbs = self
            .databases
            .lock()
            .map_err(|_| anyhow!("catalog lock poisoned"))?;
        let tables = dbs
            .get(database)
            .ok_or_else(|| anyhow!("no such database {}", database))?;
        Ok(tables.get(&table.to_lowercase()).cloned())
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn ensure_database(&self, name: &str, _description: &str) -> Result<bool> {
        let mut dbs = self
            .databases
            .lock()
            .map_err(|_| anyhow!("catalog lock poisoned"))?;
        if dbs.contains_key(name) {
            return Ok(false);
        }
        dbs.insert(name.to_string(), HashMap::new());
        Ok(true)
    }

    async fn upsert_table(&self, database: &str, table: &TableSpec) -> Result<TableAction> {
        let mut dbs = self
            .databases
            .lock()
            .map_err(|_| anyhow!("catalog lock poisoned"))?;
        let tables = dbs
            .get_mut(database)
            .ok_or_else(|| anyhow!("no such database {}", database))?;

        let mut stored = table.clone();
        stored.name = table.catalog_name();
        for col in &mut stored.columns {
            col.name = col.name.to_lowercase();
        }

        match tables.insert(stored.name.clone(), stored) {
            Some(_) => Ok(TableAction::Updated),
            None => Ok(TableAction::Created),
        }
    }

    async fn table_columns(&self, database: &str, table: &str) -> Result<Option<Vec<Column>>> {
        Ok(self.table(database, table)?.map(|t| t.columns))
    }
}

/// Answers `SELECT * FROM "db"."table" [LIMIT n]` by reading the table's
/// objects back through its registered column list, the way the CSV serde does.
pub struct MemoryQueryEngine {
    store: Arc<MemoryStore>,
    catalog: Arc<MemoryCatalog>,
}

impl MemoryQueryEngine {
    pub fn new(store: Arc<MemoryStore>, catalog: Arc<MemoryCatalog>) -> Self {
        Self { store, catalog }
    }
}

/// Parse the one query shape the in-memory engine understands.
pub fn parse_select_all(sql: &str) -> Result<(String, String, Option<usize>)> {
    let caps = SELECT_ALL
        .captures(sql)
        .ok_or_else(|| anyhow!("unsupported query: {}", sql))?;
    let unquote = |i: usize| caps[i].replace("\"\"", "\"");
    let limit = caps
        .get(3)
        .map(|m| m.as_str().parse::<usize>())
        .transpose()
        .context("parsing LIMIT")?;
    Ok((unquote(1), unquote(2), limit))
}

/// Read headerless CSV bytes as text columns named after `columns`.
pub fn read_table_csv(columns: &[Column], data: &[u8]) -> Result<RecordBatch> {
    let fields: Vec<Field> = columns
        .iter()
        .map(|c| Field::new(&c.name, DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let reader = ReaderBuilder::new(schema.clone())
        .with_header(false)
        .with_delimiter(SEPARATOR_CHAR)
        .with_quote(QUOTE_CHAR)
        .with_escape(ESCAPE_CHAR)
        .build(Cursor::new(data))
        .context("creating CSV reader")?;
    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("reading table data")?;
    concat_batches(&schema, &batches).context("concatenating table data")
}

#[async_trait]
impl QueryEngine for MemoryQueryEngine {
    async fn query(&self, database: &str, sql: &str) -> Result<RecordBatch> {
        let (db, table, limit) = parse_select_all(sql)?;
        if db != database {
            debug!(context = database, query = %db, "query names another database");
        }
        let spec = self
            .catalog
            .table(&db, &table)?
            .ok_or_else(|| anyhow!("table {}.{} does not exist", db, table))?;

        let (bucket, prefix) = split_s3_uri(&spec.location)?;
        let mut data = Vec::new();
        for (key, body) in self.store.list(&bucket, &prefix)? {
            debug!(key = %key, bytes = body.len(), "scanning object");
            data.extend_from_slice(&body);
            if !body.is_empty() && !body.ends_with(b"\n") {
                data.push(b'\n');
            }
        }

        let batch = read_table_csv(&spec.columns, &data)?;
        let batch = match limit {
            Some(n) if n < batch.num_rows() => batch.slice(0, n),
            _ => batch,
        };
        if batch.num_columns() != spec.columns.len() {
            bail!("table {} read back with the wrong width", spec.name);
        }
        Ok(batch)
    }
}
