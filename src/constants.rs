// src/constants.rs
//! Domain constants that define the operational boundaries of the client.
//!
//! Each constant is named for the domain concept it constrains. Reading
//! these constants should tell you the story of how the client talks to
//! the Notion API: where it connects, how it identifies itself, how much
//! it fetches, and how long it waits.

// ---------------------------------------------------------------------------
// Notion API boundaries
// ---------------------------------------------------------------------------

/// Base URL for all Notion API requests.
pub const NOTION_API_BASE_URL: &str = "https://api.notion.com/v1";

/// Protocol version sent with every request via the `Notion-Version` header.
///
/// Notion versions its API by date; responses are shaped by this value,
/// so the property codec and this constant must move together.
pub const NOTION_VERSION: &str = "2022-06-28";

/// How many objects the Notion API returns per page of results.
///
/// The Notion API maximum is 100. We default to the maximum to minimize
/// round-trips when draining paginated listings.
pub const NOTION_API_PAGE_SIZE: u32 = 100;

// ---------------------------------------------------------------------------
// Transport boundaries
// ---------------------------------------------------------------------------

/// Per-request timeout in seconds.
///
/// Exceeding this yields a network error, which follows the same retry
/// policy as any other transient failure.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default number of attempts (initial call plus retries) for transient
/// failures: rate limits, 5xx responses, and network errors.
pub const RETRY_MAX_ATTEMPTS: u32 = 3;

/// Base delay before the first retry, in milliseconds. Doubled per attempt
/// up to [`RETRY_MAX_DELAY_MS`].
pub const RETRY_BASE_DELAY_MS: u64 = 500;

/// Upper bound on any single backoff delay, in milliseconds.
pub const RETRY_MAX_DELAY_MS: u64 = 30_000;

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters shown when previewing undecodable response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;
