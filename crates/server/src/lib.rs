//! SHL Server - HTTP front end for the assessment recommender
//!
//! Serves a single-page HTML form and a small JSON API over one
//! [`recommender::Recommender`] built at startup.
//!
//! If the catalog cannot be loaded or indexed, or the generation credential is
//! missing, the server still starts but every page shows the diagnostic and
//! `/ready` reports 503 until a successful reload.
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
//! # Endpoints
//!
//! - `GET /` - HTML form, `?sample=N` prefills sample question `N`
//! - `POST /recommend` - HTML form submission
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `POST /api/v1/recommend` - JSON recommendation
//! - `GET /api/v1/filters` - Selector options and sample questions
//! - `POST /api/v1/catalog/reload` - Rebuild the engine from the catalog file
//! - `GET /api/v1/metadata` - Server metadata

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod session;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::{EngineState, ServerState};
