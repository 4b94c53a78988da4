// src/lib.rs
//! notion-workspace — a client library that exposes Notion workspace
//! management (pages, databases, comments, users) as callable operations.
//!
//! The crate is the translation layer between a tool-calling host and the
//! Notion API. It owns three hard problems:
//!
//! - **Transport** — authenticated, timeout-bounded HTTP with a uniform
//!   retry/backoff policy for transient failures and atomic usage
//!   counters (`api`).
//! - **Property codec** — a closed-table, bidirectional mapping between
//!   the service's richly-typed property model and a simplified internal
//!   value model (`codec`, `types`).
//! - **Query & bulk translation** — validated filter/sort construction
//!   with cursor pagination (`query`) and flat-record import/export with
//!   explicit merge strategies (`bulk`).
//!
//! The hosting framework registers the `ops` functions as externally
//! callable tools, serializes their payloads, and resolves credentials;
//! none of that happens here.
//!
//! # Example
//!
//! ```no_run
//! use notion_workspace::{ApiKey, ClientConfig, Workspace};
//!
//! # async fn run() -> Result<(), notion_workspace::ClientError> {
//! let key = ApiKey::new("secret_abcdefghijklmnopqrs")?;
//! let workspace = Workspace::new(ClientConfig::new(key))?;
//! let info = workspace.ping().await?;
//! println!("connected as {:?}", info.bot_name);
//! # Ok(())
//! # }
//! ```

mod api;
mod bulk;
mod codec;
mod config;
mod constants;
mod error;
mod ops;
mod query;
mod types;

// --- Error Handling ---
pub use crate::error::{ClientError, ErrorCode, Result};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{ApiKey, ClientConfig};

// --- Domain Types ---
pub use crate::types::{
    ComputedValue, DatabaseId, DateRange, FileRef, NotionId, PageId, PersonRef, PropertyKind,
    PropertySpec, PropertyValue, RecordSchema, UserId,
};

// --- Transport ---
pub use crate::api::{
    fetch_all, Method, Paginated, PaginationCursor, RequestEnvelope, RetryPolicy, Transport,
    UsageCounters, UsageSnapshot,
};

// --- Property Codec ---
pub use crate::codec::{
    decode, decode_property, decode_record, encode, encode_for_schema, encode_record,
    EncodeOptions,
};

// --- Query Builder ---
pub use crate::query::{
    build_query, FilterExpression, FilterOperator, Operand, Sort, SortDirection, SortKey,
};

// --- Bulk Mapper ---
pub use crate::bulk::{
    export_records, import_records, BulkSource, ExportFormat, FieldMapping, ImportOutcome,
    MergeStrategy, RowFailure,
};

// --- Operations ---
pub use crate::ops::blocks::BlockText;
pub use crate::ops::collaboration::{CommentInfo, UserInfo, UserKind};
pub use crate::ops::databases::{DatabaseHandle, ImportReport, Record, RecordPage};
pub use crate::ops::pages::{
    PageContent, PageDetails, PageHandle, Parent, SearchHit, SearchScope,
};
pub use crate::ops::{ConnectionInfo, Workspace};
