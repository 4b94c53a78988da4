// src/ops/databases.rs
//! Database operations: schema management, queries, record writes, and
//! bulk import/export.

use super::Workspace;
use crate::api::{fetch_all, Paginated, PaginationCursor, RequestEnvelope};
use crate::bulk::{
    self, BulkSource, ExportFormat, FieldMapping, ImportOutcome, MergeStrategy, RowFailure,
};
use crate::codec::{self, EncodeOptions};
use crate::error::ClientError;
use crate::query::{build_query, FilterExpression, Sort};
use crate::types::{NotionId, PropertyValue, RecordSchema};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};

/// Identity of a created database.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseHandle {
    pub id: String,
    pub url: String,
    pub title: String,
}

/// One decoded database record.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub id: String,
    pub url: String,
    pub properties: IndexMap<String, PropertyValue>,
}

/// One page of query results plus the continuation cursor.
#[derive(Debug, Clone, Serialize)]
pub struct RecordPage {
    pub records: Vec<Record>,
    pub cursor: PaginationCursor,
}

/// Outcome of a bulk import that reached the service.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub total_rows: usize,
    pub imported: usize,
    pub failures: Vec<RowFailure>,
}

impl Workspace {
    /// Create a database under a parent page.
    ///
    /// A title property is required by the service; if the given schema
    /// has none, a `Name` title property is added.
    pub async fn create_database(
        &self,
        title: &str,
        parent_page: &NotionId,
        schema: &RecordSchema,
    ) -> Result<DatabaseHandle, ClientError> {
        let mut schema = schema.clone();
        if schema.title_property().is_none() {
            schema.insert(
                "Name",
                crate::types::PropertySpec::new(crate::types::PropertyKind::Title),
            );
        }

        let body = json!({
            "parent": { "page_id": parent_page.to_hyphenated() },
            "title": [{ "type": "text", "text": { "content": title } }],
            "properties": schema.to_remote(),
        });

        let created = self
            .transport()
            .execute(&RequestEnvelope::post("databases", body))
            .await?;

        let handle = DatabaseHandle {
            id: created
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            url: created
                .get("url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            title: title.to_string(),
        };
        log::info!("database created: {} ({})", handle.title, handle.id);
        Ok(handle)
    }

    /// Fetch and decode a database's property schema.
    pub async fn get_schema(
        &self,
        database_id: &NotionId,
    ) -> Result<RecordSchema, ClientError> {
        let raw = self
            .transport()
            .execute(&RequestEnvelope::get(format!(
                "databases/{}",
                database_id.to_hyphenated()
            )))
            .await?;

        let properties = raw.get("properties").ok_or_else(|| {
            ClientError::Malformed("database response has no properties".to_string())
        })?;
        RecordSchema::from_remote(properties)
    }

    /// Query one page of records, fetching the schema first to validate
    /// the filter and sorts locally.
    pub async fn query(
        &self,
        database_id: &NotionId,
        filter: Option<&FilterExpression>,
        sorts: &[Sort],
        cursor: Option<&str>,
        page_size: Option<u32>,
    ) -> Result<RecordPage, ClientError> {
        let schema = self.get_schema(database_id).await?;
        self.query_with_schema(database_id, &schema, filter, sorts, cursor, page_size)
            .await
    }

    /// Query with a schema the caller already holds — the validation is
    /// identical, but repeat pagination calls skip the schema fetch.
    pub async fn query_with_schema(
        &self,
        database_id: &NotionId,
        schema: &RecordSchema,
        filter: Option<&FilterExpression>,
        sorts: &[Sort],
        cursor: Option<&str>,
        page_size: Option<u32>,
    ) -> Result<RecordPage, ClientError> {
        let envelope = build_query(database_id, schema, filter, sorts, cursor, page_size)?;
        let response = self.transport().execute(&envelope).await?;
        let page: Paginated<Value> = serde_json::from_value(response)?;

        let mut records = Vec::with_capacity(page.results.len());
        for raw in &page.results {
            records.push(decode_record(raw)?);
        }

        Ok(RecordPage {
            records,
            cursor: PaginationCursor::from_response(&page),
        })
    }

    /// Drain every page of a query.
    pub async fn query_all(
        &self,
        database_id: &NotionId,
        filter: Option<&FilterExpression>,
        sorts: &[Sort],
    ) -> Result<Vec<Record>, ClientError> {
        let schema = self.get_schema(database_id).await?;

        let pages = fetch_all(
            |page_size, cursor| {
                let schema = &schema;
                async move {
                    let envelope = build_query(
                        database_id,
                        schema,
                        filter,
                        sorts,
                        cursor.as_deref(),
                        Some(page_size),
                    )?;
                    let response = self.transport().execute(&envelope).await?;
                    let page: Paginated<Value> = serde_json::from_value(response)?;
                    Ok(page)
                }
            },
            None,
        )
        .await?;

        pages.iter().map(decode_record).collect()
    }

    /// Create one record in a database, validating every property against
    /// the schema before the write is sent.
    pub async fn create_record(
        &self,
        database_id: &NotionId,
        values: &IndexMap<String, PropertyValue>,
    ) -> Result<Record, ClientError> {
        let schema = self.get_schema(database_id).await?;
        self.create_record_with_schema(database_id, &schema, values)
            .await
    }

    async fn create_record_with_schema(
        &self,
        database_id: &NotionId,
        schema: &RecordSchema,
        values: &IndexMap<String, PropertyValue>,
    ) -> Result<Record, ClientError> {
        let properties = codec::encode_record(values, schema, &EncodeOptions::default())?;
        let body = json!({
            "parent": { "database_id": database_id.to_hyphenated() },
            "properties": properties,
        });

        let created = self
            .transport()
            .execute(&RequestEnvelope::post("pages", body))
            .await?;
        decode_record(&created)
    }

    /// Update a record's property values and/or archived flag.
    pub async fn update_record(
        &self,
        page_id: &NotionId,
        values: Option<&IndexMap<String, PropertyValue>>,
        archived: Option<bool>,
    ) -> Result<Record, ClientError> {
        let mut body = serde_json::Map::new();

        if let Some(values) = values {
            let page = self
                .transport()
                .execute(&RequestEnvelope::get(format!(
                    "pages/{}",
                    page_id.to_hyphenated()
                )))
                .await?;
            let database_id = page
                .get("parent")
                .and_then(|p| p.get("database_id"))
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ClientError::validation("page is not a database record")
                })?;
            let database_id = NotionId::parse(database_id)?;
            let schema = self.get_schema(&database_id).await?;

            body.insert(
                "properties".to_string(),
                codec::encode_record(values, &schema, &EncodeOptions::default())?,
            );
        }

        if let Some(archived) = archived {
            body.insert("archived".to_string(), json!(archived));
        }

        if body.is_empty() {
            return Err(ClientError::validation(
                "nothing to update: provide values or an archived flag",
            ));
        }

        let updated = self
            .transport()
            .execute(&RequestEnvelope::patch(
                format!("pages/{}", page_id.to_hyphenated()),
                Value::Object(body),
            ))
            .await?;
        decode_record(&updated)
    }

    /// Bulk-import flat rows into a database.
    ///
    /// The mapping and every row are validated in one pure pass first
    /// (`strict` aborts there on the first bad row, with nothing written).
    /// Then records are created one by one; under `best_effort` a failed
    /// create is recorded and the import continues, under `strict` it
    /// aborts.
    pub async fn import_rows(
        &self,
        database_id: &NotionId,
        source: BulkSource,
        mapping: &FieldMapping,
        strategy: MergeStrategy,
    ) -> Result<ImportReport, ClientError> {
        let schema = self.get_schema(database_id).await?;

        let ImportOutcome {
            records,
            source_rows,
            mut failures,
            total_rows,
        } = bulk::import_records(source, mapping, &schema, strategy)?;

        let mut imported = 0usize;
        for (position, values) in records.iter().enumerate() {
            match self
                .create_record_with_schema(database_id, &schema, values)
                .await
            {
                Ok(_) => imported += 1,
                Err(error) => match strategy {
                    MergeStrategy::Strict => return Err(error),
                    MergeStrategy::BestEffort => {
                        failures.push(RowFailure {
                            index: source_rows[position],
                            field: String::new(),
                            message: error.to_string(),
                        });
                    }
                },
            }

            if (position + 1) % 10 == 0 {
                log::info!("import progress: {}/{} records", position + 1, records.len());
            }
        }

        log::info!(
            "bulk import finished: {}/{} rows imported, {} failures",
            imported,
            total_rows,
            failures.len()
        );
        Ok(ImportReport {
            total_rows,
            imported,
            failures,
        })
    }

    /// Export every record of a database as CSV or JSON bytes.
    pub async fn export_rows(
        &self,
        database_id: &NotionId,
        format: ExportFormat,
    ) -> Result<Vec<u8>, ClientError> {
        let schema = self.get_schema(database_id).await?;
        let records = self.query_all(database_id, None, &[]).await?;
        let rows: Vec<IndexMap<String, PropertyValue>> =
            records.into_iter().map(|record| record.properties).collect();
        bulk::export_records(&rows, &schema, format)
    }
}

fn decode_record(raw: &Value) -> Result<Record, ClientError> {
    let properties = match raw.get("properties") {
        Some(properties) => codec::decode_record(properties)?,
        None => IndexMap::new(),
    };

    Ok(Record {
        id: raw
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        url: raw
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        properties,
    })
}
