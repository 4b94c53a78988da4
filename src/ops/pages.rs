// src/ops/pages.rs
//! Page operations: create, update, read, search, archive.

use super::blocks::{self, BlockText};
use super::Workspace;
use crate::api::{fetch_all, Paginated, RequestEnvelope};
use crate::codec::{self, EncodeOptions};
use crate::error::ClientError;
use crate::types::{NotionId, PropertyValue};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};

/// Where a new page lives.
#[derive(Debug, Clone)]
pub enum Parent {
    Page(NotionId),
    Database(NotionId),
}

impl Parent {
    fn to_remote(&self) -> Value {
        match self {
            Parent::Page(id) => json!({ "page_id": id.to_hyphenated() }),
            Parent::Database(id) => json!({ "database_id": id.to_hyphenated() }),
        }
    }
}

/// Identity of a created or updated page.
#[derive(Debug, Clone, Serialize)]
pub struct PageHandle {
    pub id: String,
    pub url: String,
    pub title: String,
}

/// A fully decoded page.
#[derive(Debug, Clone, Serialize)]
pub struct PageDetails {
    pub id: String,
    pub url: String,
    pub title: String,
    pub archived: bool,
    pub properties: IndexMap<String, PropertyValue>,
}

/// A page plus its flattened child blocks.
#[derive(Debug, Clone, Serialize)]
pub struct PageContent {
    pub page: PageDetails,
    pub blocks: Vec<BlockText>,
}

/// One workspace search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub object: String,
    pub title: String,
    pub url: String,
}

/// What a search may be narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    All,
    Pages,
    Databases,
}

impl Workspace {
    /// Create a page under a parent page or database.
    ///
    /// For database parents the property values are validated against the
    /// live schema and the title lands under the schema's title property;
    /// plain-page parents only take the title. Content text becomes child
    /// blocks in a follow-up append.
    pub async fn create_page(
        &self,
        title: &str,
        parent: Parent,
        properties: Option<IndexMap<String, PropertyValue>>,
        content: Option<&str>,
    ) -> Result<PageHandle, ClientError> {
        let encoded_properties = match &parent {
            Parent::Database(database_id) => {
                let schema = self.get_schema(database_id).await?;
                let title_property = schema.title_property().ok_or_else(|| {
                    ClientError::validation(
                        "target database has no title property to receive the page title",
                    )
                })?;

                let mut values = properties.unwrap_or_default();
                // The title is a dedicated parameter; a stray title
                // property in the value map would fight with it.
                values.shift_remove(title_property);
                let mut encoded =
                    codec::encode_record(&values, &schema, &EncodeOptions::default())?;
                if let Value::Object(map) = &mut encoded {
                    map.insert(
                        title_property.to_string(),
                        codec::encode(&PropertyValue::Title(title.to_string()))?,
                    );
                }
                encoded
            }
            Parent::Page(_) => {
                if properties.as_ref().is_some_and(|p| !p.is_empty()) {
                    return Err(ClientError::validation(
                        "typed properties require a database parent",
                    ));
                }
                json!({
                    "title": codec::encode(&PropertyValue::Title(title.to_string()))?["title"]
                })
            }
        };

        let body = json!({
            "parent": parent.to_remote(),
            "properties": encoded_properties,
        });

        let created = self
            .transport()
            .execute(&RequestEnvelope::post("pages", body))
            .await?;
        let handle = page_handle(&created, title);

        if let Some(content) = content {
            let children = blocks::text_to_blocks(content);
            if !children.is_empty() {
                self.append_blocks(&handle.id, children).await?;
            }
        }

        log::info!("page created: {} ({})", handle.title, handle.id);
        Ok(handle)
    }

    /// Update a page's title, properties, or archived flag.
    ///
    /// Property updates require the page to be a database record; the
    /// database schema is fetched to validate them, exactly like a create.
    pub async fn update_page(
        &self,
        page_id: &NotionId,
        title: Option<&str>,
        properties: Option<IndexMap<String, PropertyValue>>,
        archived: Option<bool>,
    ) -> Result<PageHandle, ClientError> {
        let mut body = serde_json::Map::new();
        let mut encoded_properties = serde_json::Map::new();

        if properties.as_ref().is_some_and(|p| !p.is_empty()) || title.is_some() {
            let page = self
                .transport()
                .execute(&RequestEnvelope::get(format!(
                    "pages/{}",
                    page_id.to_hyphenated()
                )))
                .await?;

            let parent_database = page
                .get("parent")
                .and_then(|p| p.get("database_id"))
                .and_then(Value::as_str);

            match parent_database {
                Some(database_id) => {
                    let database_id = NotionId::parse(database_id)?;
                    let schema = self.get_schema(&database_id).await?;

                    if let Some(values) = &properties {
                        let encoded =
                            codec::encode_record(values, &schema, &EncodeOptions::default())?;
                        if let Value::Object(map) = encoded {
                            encoded_properties.extend(map);
                        }
                    }
                    if let Some(title) = title {
                        let title_property = schema.title_property().ok_or_else(|| {
                            ClientError::validation(
                                "parent database has no title property",
                            )
                        })?;
                        encoded_properties.insert(
                            title_property.to_string(),
                            codec::encode(&PropertyValue::Title(title.to_string()))?,
                        );
                    }
                }
                None => {
                    if properties.as_ref().is_some_and(|p| !p.is_empty()) {
                        return Err(ClientError::validation(
                            "typed property updates require a database record",
                        ));
                    }
                    if let Some(title) = title {
                        encoded_properties.insert(
                            "title".to_string(),
                            codec::encode(&PropertyValue::Title(title.to_string()))?,
                        );
                    }
                }
            }
        }

        if !encoded_properties.is_empty() {
            body.insert(
                "properties".to_string(),
                Value::Object(encoded_properties),
            );
        }
        if let Some(archived) = archived {
            body.insert("archived".to_string(), json!(archived));
        }

        if body.is_empty() {
            return Err(ClientError::validation(
                "nothing to update: provide a title, properties, or archived flag",
            ));
        }

        let updated = self
            .transport()
            .execute(&RequestEnvelope::patch(
                format!("pages/{}", page_id.to_hyphenated()),
                Value::Object(body),
            ))
            .await?;

        let handle = page_handle(&updated, title.unwrap_or(""));
        log::info!("page updated: {}", handle.id);
        Ok(handle)
    }

    /// Fetch a page and decode its properties.
    pub async fn get_page(&self, page_id: &NotionId) -> Result<PageDetails, ClientError> {
        let raw = self
            .transport()
            .execute(&RequestEnvelope::get(format!(
                "pages/{}",
                page_id.to_hyphenated()
            )))
            .await?;
        decode_page(&raw)
    }

    /// Fetch a page together with its child blocks, flattened to text.
    pub async fn get_page_content(
        &self,
        page_id: &NotionId,
    ) -> Result<PageContent, ClientError> {
        let page = self.get_page(page_id).await?;

        let path = format!("blocks/{}/children", page_id.to_hyphenated());
        let raw_blocks = fetch_all(
            |page_size, cursor| {
                let mut envelope = RequestEnvelope::get(&path)
                    .with_query("page_size", page_size.to_string());
                if let Some(cursor) = cursor {
                    envelope = envelope.with_query("start_cursor", cursor);
                }
                async move {
                    let value = self.transport().execute(&envelope).await?;
                    let page: Paginated<Value> = serde_json::from_value(value)?;
                    Ok(page)
                }
            },
            None,
        )
        .await?;

        let blocks = raw_blocks.iter().filter_map(blocks::block_to_text).collect();
        Ok(PageContent { page, blocks })
    }

    /// Append pre-built block payloads to a page or block.
    pub(crate) async fn append_blocks(
        &self,
        parent_id: &str,
        children: Vec<Value>,
    ) -> Result<(), ClientError> {
        self.transport()
            .execute(&RequestEnvelope::patch(
                format!("blocks/{}/children", parent_id),
                json!({ "children": children }),
            ))
            .await?;
        Ok(())
    }

    /// Workspace-wide search, newest edits first by default.
    pub async fn search(
        &self,
        query: &str,
        scope: SearchScope,
        page_size: Option<u32>,
    ) -> Result<Vec<SearchHit>, ClientError> {
        let mut body = serde_json::Map::new();
        body.insert("query".to_string(), json!(query));
        body.insert(
            "page_size".to_string(),
            json!(page_size
                .unwrap_or(crate::constants::NOTION_API_PAGE_SIZE)
                .clamp(1, crate::constants::NOTION_API_PAGE_SIZE)),
        );
        body.insert(
            "sort".to_string(),
            json!({ "direction": "descending", "timestamp": "last_edited_time" }),
        );
        match scope {
            SearchScope::Pages => {
                body.insert(
                    "filter".to_string(),
                    json!({ "property": "object", "value": "page" }),
                );
            }
            SearchScope::Databases => {
                body.insert(
                    "filter".to_string(),
                    json!({ "property": "object", "value": "database" }),
                );
            }
            SearchScope::All => {}
        }

        let response = self
            .transport()
            .execute(&RequestEnvelope::post("search", Value::Object(body)))
            .await?;

        let page: Paginated<Value> = serde_json::from_value(response)?;
        let hits = page
            .results
            .iter()
            .map(|hit| SearchHit {
                id: hit
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                object: hit
                    .get("object")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                title: extract_any_title(hit),
                url: hit
                    .get("url")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect();

        log::info!("search '{}' returned {} results", query, page.results.len());
        Ok(hits)
    }

    /// Archive a page. The service has no hard delete; archiving is the
    /// strongest removal this client offers.
    pub async fn archive_page(&self, page_id: &NotionId) -> Result<PageHandle, ClientError> {
        self.update_page(page_id, None, None, Some(true)).await
    }
}

fn page_handle(raw: &Value, fallback_title: &str) -> PageHandle {
    let title = extract_any_title(raw);
    PageHandle {
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
        title: if title.is_empty() {
            fallback_title.to_string()
        } else {
            title
        },
    }
}

fn decode_page(raw: &Value) -> Result<PageDetails, ClientError> {
    let properties = match raw.get("properties") {
        Some(properties) => codec::decode_record(properties)?,
        None => IndexMap::new(),
    };

    let title = properties
        .values()
        .find_map(|value| match value {
            PropertyValue::Title(text) => Some(text.clone()),
            _ => None,
        })
        .unwrap_or_else(|| "Untitled".to_string());

    Ok(PageDetails {
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
        title,
        archived: raw
            .get("archived")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        properties,
    })
}

/// Pull a display title out of a page or database object.
fn extract_any_title(raw: &Value) -> String {
    // Database objects carry `title` at the top level.
    if let Some(items) = raw.get("title").and_then(Value::as_array) {
        return items
            .iter()
            .filter_map(|item| item.get("plain_text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .concat();
    }

    // Page objects nest it inside a title property.
    raw.get("properties")
        .and_then(Value::as_object)
        .and_then(|properties| {
            properties.values().find_map(|property| {
                if property.get("type").and_then(Value::as_str) == Some("title") {
                    property.get("title").and_then(Value::as_array).map(|items| {
                        items
                            .iter()
                            .filter_map(|item| {
                                item.get("plain_text").and_then(Value::as_str)
                            })
                            .collect::<Vec<_>>()
                            .concat()
                    })
                } else {
                    None
                }
            })
        })
        .unwrap_or_default()
}
