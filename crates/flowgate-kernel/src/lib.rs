//! `flowgate-kernel` — gateway kernel contract.
//!
//! This crate defines the *document model, capability traits, and load-time
//! validation* for the Flowgate API gateway.  No concrete runtime lives here —
//! that belongs in `flowgate-gateway`.
//!
//! # Architecture mapping
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              flowgate-kernel  (this crate)                  │
//! │  Catalog documents   SecurityScheme / SecurityRequirement   │
//! │  Policy trait        SecurityHandler trait                  │
//! │  CatalogLoader trait Context (per-request variable store)   │
//! │  validate_api()      ConfigError                            │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │              flowgate-gateway  (runtime crate)              │
//! │  PathMatcher / Snapshot / SnapshotManager                   │
//! │  CandidateResolver / SecurityEvaluator / PlanSelector       │
//! │  AssemblyEngine / ParamResolver / built-in policies         │
//! │  GatewayServer  (axum HTTP server)                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod context;
pub mod error;
pub mod loader;
pub mod policy;
pub mod security;
pub mod types;
pub mod validation;

// ── Flat re-exports ────────────────────────────────────────────────────────

pub use catalog::{
    ApiDocument, ApiState, AppState, Application, CatalogDocument, CatalogDocuments,
    ClientCredentials, Operation, Plan, Product, Subscription,
};
pub use context::{Context, FINISH, POST_FLOW};
pub use error::ConfigError;
pub use loader::CatalogLoader;
pub use policy::{Assembly, AssemblyStep, Policy, PolicyFault, PolicyOutcome, PolicyRegistry};
pub use security::{
    ApiKeyCredentials, HandlerError, KeyKind, SchemeOutcome, SecurityHandler,
    SecurityRequirement, SecurityScheme, SchemeTransport,
};
pub use types::{GatewayRequest, GatewayResponse, HttpMethod};
pub use validation::validate_api;
