// src/ops/mod.rs
//! The callable operations surface.
//!
//! One public async function per operation, grouped the way the service
//! groups its resources: pages, databases, collaboration. The hosting
//! framework registers these as externally callable tools and serializes
//! the returned payload structs; this layer never does that serialization
//! itself, it only returns `Serialize`-able data or a typed error.

pub mod blocks;
pub mod collaboration;
pub mod databases;
pub mod pages;

use crate::api::{RequestEnvelope, Transport, UsageCounters, UsageSnapshot};
use crate::config::ClientConfig;
use crate::error::ClientError;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Identity returned by a connectivity probe.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub bot_id: String,
    pub bot_name: Option<String>,
    pub usage: UsageSnapshot,
}

/// The workspace client: transport plus counters, shared by every
/// operation. Cheap to clone-by-reference via the host's own `Arc` if it
/// dispatches operations concurrently.
pub struct Workspace {
    transport: Transport,
    counters: Arc<UsageCounters>,
}

impl Workspace {
    /// Wire up a workspace client from resolved configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let counters = Arc::new(UsageCounters::new());
        let transport = Transport::new(&config, Arc::clone(&counters))?;
        log::info!(
            "workspace client initialized against {} (version {})",
            config.base_url,
            config.protocol_version
        );
        Ok(Self {
            transport,
            counters,
        })
    }

    /// The transport, for operations in sibling modules.
    pub(crate) fn transport(&self) -> &Transport {
        &self.transport
    }

    /// The usage counters backing this client.
    pub fn counters(&self) -> &UsageCounters {
        &self.counters
    }

    /// Point-in-time usage numbers.
    pub fn usage(&self) -> UsageSnapshot {
        self.counters.snapshot()
    }

    /// Connectivity probe: authenticates against the `users/me` endpoint
    /// and reports the integration's own identity.
    pub async fn ping(&self) -> Result<ConnectionInfo, ClientError> {
        let me = self
            .transport
            .execute(&RequestEnvelope::get("users/me"))
            .await?;

        Ok(ConnectionInfo {
            bot_id: me
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            bot_name: me
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string),
            usage: self.usage(),
        })
    }
}
