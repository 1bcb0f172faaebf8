//! Arrange Server - HTTP REST API for bookmark clustering
//!
//! Exposes the `arrange` pipeline over HTTP:
//!
//! - **Clustering**: embed a batch of bookmarks and group them by density
//! - **Category naming**: ask the configured label generator to name each cluster
//! - **Titles**: title a single summary
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
//! ## Public (no authentication)
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics
//!
//! ## Protected (API key required when keys are configured)
//!
//! - `POST /api/v1/cluster` - Cluster documents
//! - `POST /api/v1/cluster/categorize` - Cluster and name
//! - `POST /api/v1/categories` - Name pre-clustered documents
//! - `POST /api/v1/title` - Title one summary

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
