//! Configuration error types for `flowgate-kernel`.
//!
//! [`ConfigError`] covers every failure mode that can be detected at
//! *catalog-load time* — malformed base paths, unknown security scheme
//! references, invalid scheme combinations — before any request is served.
//! Runtime failures (no snapshot, unauthorized request, suspended API, …)
//! belong in the gateway implementation crate (`flowgate-gateway`).

use thiserror::Error;

/// Load-time / configuration error type for the gateway kernel contract.
///
/// A `ConfigError` rejects the *offending API document* during snapshot
/// build; it never takes down the whole catalog or the serving process.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    // ── Identity ────────────────────────────────────────────────────────────
    /// An API document `name` field is empty or whitespace-only.
    #[error("api name cannot be empty")]
    EmptyApiName,

    /// An API `base_path` is syntactically invalid.
    #[error("api '{0}' has an invalid base path: {1}")]
    InvalidBasePath(String, String),

    // ── Security schemes ─────────────────────────────────────────────────────
    /// A security requirement references a scheme name that is not present in
    /// the document's `security_definitions`.
    #[error("api '{0}' references unknown security scheme '{1}'")]
    UnknownScheme(String, String),

    /// A single requirement contains more than two API-key schemes.
    #[error("api '{0}': a security requirement may contain at most two api-key schemes")]
    TooManyKeySchemes(String),

    /// A single requirement contains more than one client-id scheme
    /// (regardless of header vs. query transport).
    #[error("api '{0}': a security requirement may contain at most one client-id scheme")]
    DuplicateClientIdScheme(String),

    /// A single requirement contains more than one client-secret scheme
    /// (regardless of header vs. query transport).
    #[error("api '{0}': a security requirement may contain at most one client-secret scheme")]
    DuplicateClientSecretScheme(String),

    /// A requirement carries a client-secret scheme with no client-id scheme
    /// alongside it — a secret is never verifiable on its own.
    #[error("api '{0}': a client-secret scheme requires a client-id scheme in the same requirement")]
    ClientSecretWithoutClientId(String),

    // ── Catalog loading ──────────────────────────────────────────────────────
    /// The catalog loader could not produce a document set.
    #[error("catalog load failed: {0}")]
    CatalogLoad(String),

    /// A single catalog document could not be parsed.
    #[error("document '{0}' is invalid: {1}")]
    InvalidDocument(String, String),
}
