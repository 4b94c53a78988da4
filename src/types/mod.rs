use thiserror::Error;

mod ids;
mod properties;
mod schema;

pub use ids::*;
pub use properties::*;
pub use schema::*;

/// Pre-flight validation failures for domain newtypes.
///
/// These never leave the process: constructing an invalid ID, credential,
/// or property value fails here, before any request is issued.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid Notion ID format: {0}")]
    InvalidId(String),

    #[error("Invalid API key format: {reason}")]
    InvalidApiKey { reason: String },

    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid date value: {value} - {reason}")]
    InvalidDate { value: String, reason: String },

    #[error("Empty required field: {0}")]
    EmptyField(&'static str),
}
