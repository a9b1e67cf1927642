//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout)
//!     → GET /enrichment/{id} → EnrichmentClient::fetch → JSON
//!     → GET /health
//! ```

pub mod server;

pub use server::{build_router, HttpServer};
