//! Security scheme model and the pluggable security-handler capability.
//!
//! An API document declares *schemes* (`security_definitions`) and
//! *requirements* (ordered lists of scheme names).  A requirement passes only
//! when **all** of its schemes pass; multiple requirements on one operation
//! are alternatives — the first requirement that passes authorizes the
//! candidate.
//!
//! Credential *verification* is not performed here: the evaluator in the
//! runtime crate extracts credentials from the request and delegates to a
//! caller-supplied [`SecurityHandler`].

use crate::catalog::Subscription;
use crate::types::GatewayRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Scheme model
// ─────────────────────────────────────────────────────────────────────────────

/// Where a credential travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemeTransport {
    /// Exact-match HTTP header name.
    Header,
    /// Exact-match query parameter name.
    Query,
}

/// What an API-key credential identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyKind {
    ClientId,
    ClientSecret,
}

/// A single named security scheme from an API's `security_definitions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SecurityScheme {
    /// API-key scheme: a client id or client secret in a header or query
    /// parameter.
    ApiKey {
        /// Transport the credential arrives on.
        #[serde(rename = "in")]
        transport: SchemeTransport,
        /// Header or query parameter name, matched exactly.
        name: String,
        /// Whether this key is a client id or a client secret.
        key: KeyKind,
    },
    /// HTTP basic authentication (`Authorization: Basic <base64>`).
    Basic,
    /// OAuth2 bearer token (`Authorization: Bearer <token>`).  Token
    /// issuance and introspection strategies are external collaborators.
    #[serde(rename = "oauth2")]
    OAuth2,
}

/// An ordered set of scheme names that must **all** pass (AND semantics).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecurityRequirement(pub Vec<String>);

impl SecurityRequirement {
    /// A requirement with no schemes — always passes and marks the candidate
    /// as requiring no security.
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn of(schemes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(schemes.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handler capability
// ─────────────────────────────────────────────────────────────────────────────

/// API-key credentials extracted from a request for one requirement.
///
/// The load-time checker guarantees at most one client-id and at most one
/// client-secret scheme per requirement, so the pair is unambiguous.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiKeyCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Verdict returned by a [`SecurityHandler`] method.
#[derive(Debug, Clone, Default)]
pub struct SchemeOutcome {
    /// Whether the credential(s) verified.
    pub pass: bool,
    /// Derived secret payload made available to the assembly (e.g. hashed
    /// client secret, token claims).
    pub secret: Option<serde_json::Value>,
    /// Id of the subscription that matched the credentials, when one did.
    pub subscription_id: Option<String>,
}

impl SchemeOutcome {
    /// A failing outcome with no derived data.
    pub fn reject() -> Self {
        Self::default()
    }
}

/// Error raised *by* a handler (not a failed check — a failed check is a
/// `pass: false` outcome).  The evaluator treats a handler error as "this
/// candidate fails" and logs it; it is never process-fatal.
#[derive(Debug, Error)]
#[error("security handler failure: {0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Pluggable credential-verification capability.
///
/// The evaluator only orchestrates calls and interprets pass/fail plus the
/// optional secret payload; it never inspects handler internals.  Timeouts
/// on external verification calls are the handler's responsibility.
///
/// Implementations must be `Send + Sync` so they can be shared across Tokio
/// tasks without additional synchronization by the caller.
#[async_trait]
pub trait SecurityHandler: Send + Sync {
    /// Verify an API-key credential pair against the snapshot's
    /// subscriptions.  Called once per requirement that contains api-key
    /// schemes; `api` names the candidate's API document.
    async fn eval_api_key(
        &self,
        request: &GatewayRequest,
        subscriptions: &[Subscription],
        api: &str,
        keys: &ApiKeyCredentials,
    ) -> Result<SchemeOutcome, HandlerError>;

    /// Verify a raw `Authorization: Basic …` header value.
    async fn eval_basic(
        &self,
        request: &GatewayRequest,
        subscriptions: &[Subscription],
        api: &str,
        credential: &str,
    ) -> Result<SchemeOutcome, HandlerError>;

    /// Verify a bearer token extracted from `Authorization: Bearer …`.
    async fn eval_oauth2(
        &self,
        request: &GatewayRequest,
        subscriptions: &[Subscription],
        api: &str,
        token: &str,
    ) -> Result<SchemeOutcome, HandlerError>;
}
