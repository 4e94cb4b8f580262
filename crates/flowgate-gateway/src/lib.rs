//! `flowgate-gateway` — Flowgate runtime.
//!
//! This crate provides the concrete implementations of the gateway kernel
//! contracts defined in `flowgate-kernel`:
//!
//! | Kernel contract | Implementation |
//! |----------------|----------------|
//! | [`CatalogLoader`](flowgate_kernel::CatalogLoader) | [`loader::FileCatalogLoader`] |
//! | [`SecurityHandler`](flowgate_kernel::SecurityHandler) | [`security::SubscriptionHandler`] |
//! | [`PolicyRegistry`](flowgate_kernel::PolicyRegistry) | [`policies::InMemoryPolicyRegistry`] |
//! | [`Policy`](flowgate_kernel::Policy) | [`policies::SetVariablePolicy`], [`policies::ThrowPolicy`], [`policies::CorsPolicy`], [`policies::RateLimitPolicy`], [`policies::InvokeSubflowPolicy`] |
//!
//! On top of the contracts, the runtime adds the catalog snapshot lifecycle
//! ([`snapshot::SnapshotManager`]), path matching ([`matcher`]), candidate
//! resolution ([`resolver`]), security orchestration
//! ([`security::SecurityEvaluator`]), champion selection ([`plan`]), and the
//! policy assembly engine ([`assembly::AssemblyEngine`]).  The
//! [`server::GatewayServer`] wires everything together into an axum HTTP
//! service.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use flowgate_gateway::server::{GatewayServer, GatewayServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = GatewayServer::new(GatewayServerConfig {
//!         port: 3000,
//!         catalog_dir: "./catalog".to_string(),
//!     });
//!
//!     server.start().await.unwrap();
//! }
//! ```

pub mod assembly;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod params;
pub mod pipeline;
pub mod plan;
pub mod policies;
pub mod resolver;
pub mod security;
pub mod server;
pub mod snapshot;

// Re-export the kernel contract for convenience.
pub use flowgate_kernel as kernel;
