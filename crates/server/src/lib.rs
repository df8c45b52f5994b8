//! Facematch Server - HTTP REST API for face embedding generation and matching
//!
//! This crate exposes the matching pipeline over HTTP:
//!
//! - **Embedding generation**: image in, 512-d unit embedding out
//! - **Face matching**: image or embedding in, ranked matches out
//! - **Health & Metrics**: liveness/readiness probes and Prometheus metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe with model name and embedding dimension
//! - `GET /ready` - Readiness probe (record store reachable)
//! - `GET /metrics` - Prometheus metrics
//! - `POST /generate-embedding` - Multipart `file` or raw image body
//! - `POST /match-face` - JSON `{embedding, threshold?}`, multipart `file`
//!   with optional `threshold`, or raw image body; `?threshold=` also accepted

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
