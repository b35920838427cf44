//! Minimal HTTP/1.0 client for feed retrieval.
//!
//! This is intentionally not a general-purpose HTTP client: one bare GET per
//! socket, `Connection: close`, read to end-of-stream, no chunked transfer
//! encoding, no persistent connections, no proxies. Redirects (301/302) are
//! followed up to a fixed limit; everything else is surfaced as a typed
//! error.
//!
//! - [`fetcher`] - socket handling, request writing, redirect loop
//! - [`response`] - status line and header block parsing

mod fetcher;
mod response;

pub use fetcher::{fetch, FetchError, REDIRECT_LIMIT};
pub use response::HttpResponse;
