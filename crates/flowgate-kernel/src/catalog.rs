//! Catalog document model.
//!
//! A published catalog is a set of four document collections — catalogs,
//! products, APIs, and subscriptions — supplied by the injected
//! [`CatalogLoader`](crate::loader::CatalogLoader) and frozen into an
//! immutable snapshot by the runtime crate.  Documents are plain serde
//! structs; everything derived (compiled path patterns, specificity scores)
//! is computed once at snapshot-build time, never here.

use crate::policy::Assembly;
use crate::security::{SecurityRequirement, SecurityScheme};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ─────────────────────────────────────────────────────────────────────────────
// API documents
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of a published API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiState {
    #[default]
    Published,
    /// Requests resolving to a suspended API are refused with `503`.
    Suspended,
}

/// A single operation (method) on a path template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Operation {
    /// Stable identifier surfaced to policies at `_.api.operation-id`.
    #[serde(default)]
    pub operation_id: Option<String>,
    /// Operation-level security requirements.  `None` falls back to the
    /// document-level requirements; `Some(vec![])` means "no security".
    #[serde(default)]
    pub security: Option<Vec<SecurityRequirement>>,
    /// The policy chain executed for this operation.
    #[serde(default)]
    pub assembly: Option<Assembly>,
}

impl Operation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the operation id.
    pub fn with_operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    /// Builder: set operation-level security requirements.
    pub fn with_security(mut self, reqs: Vec<SecurityRequirement>) -> Self {
        self.security = Some(reqs);
        self
    }

    /// Builder: set the assembly.
    pub fn with_assembly(mut self, assembly: Assembly) -> Self {
        self.assembly = Some(assembly);
        self
    }
}

/// A published API document.
///
/// `paths` maps a path template to its per-method operations.  Templates use
/// `{param}` for single-segment placeholders and `{+param}` (final segment
/// only) for a placeholder that absorbs the remainder of the path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiDocument {
    pub name: String,
    #[serde(default)]
    pub version: String,
    /// Leading-slash base path; a trailing slash is stripped at compile time.
    pub base_path: String,
    #[serde(default)]
    pub state: ApiState,
    /// Named security schemes referenced by requirements.
    #[serde(default)]
    pub security_definitions: BTreeMap<String, SecurityScheme>,
    /// Document-level security requirements (operation fallback).
    #[serde(default)]
    pub security: Vec<SecurityRequirement>,
    /// path template → (uppercase method → operation).
    #[serde(default)]
    pub paths: BTreeMap<String, BTreeMap<String, Operation>>,
}

impl ApiDocument {
    /// Construct a minimal API document.
    pub fn new(name: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "1.0.0".to_string(),
            base_path: base_path.into(),
            state: ApiState::Published,
            security_definitions: BTreeMap::new(),
            security: Vec::new(),
            paths: BTreeMap::new(),
        }
    }

    /// Builder: add an operation under `template` + `method`.
    pub fn with_operation(
        mut self,
        template: impl Into<String>,
        method: impl Into<String>,
        operation: Operation,
    ) -> Self {
        self.paths
            .entry(template.into())
            .or_default()
            .insert(method.into().to_uppercase(), operation);
        self
    }

    /// Builder: register a named security scheme.
    pub fn with_scheme(mut self, name: impl Into<String>, scheme: SecurityScheme) -> Self {
        self.security_definitions.insert(name.into(), scheme);
        self
    }

    /// Builder: set document-level security requirements.
    pub fn with_security(mut self, reqs: Vec<SecurityRequirement>) -> Self {
        self.security = reqs;
        self
    }

    /// Builder: set the lifecycle state.
    pub fn with_state(mut self, state: ApiState) -> Self {
        self.state = state;
        self
    }

    /// Effective requirements for one operation: operation-level when
    /// declared, document-level otherwise.
    pub fn requirements_for<'a>(&'a self, operation: &'a Operation) -> &'a [SecurityRequirement] {
        match &operation.security {
            Some(reqs) => reqs.as_slice(),
            None => self.security.as_slice(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Products and plans
// ─────────────────────────────────────────────────────────────────────────────

/// A plan groups APIs under a subscription tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    /// Names of the APIs this plan grants access to.  Empty means all APIs
    /// of the owning product.
    #[serde(default)]
    pub apis: Vec<String>,
}

/// A product bundles plans for publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    #[serde(default)]
    pub plans: BTreeMap<String, Plan>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscriptions
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of the application owning a subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AppState {
    #[default]
    Active,
    Suspended,
}

/// A client id / client secret pair registered to an application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCredentials {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// The application owning a subscription's credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    #[serde(default)]
    pub state: AppState,
    #[serde(default)]
    pub credentials: Vec<ClientCredentials>,
}

/// A subscription ties an application's credentials to a plan registration.
///
/// Usable only when `active == true` **and** the owning application's state
/// is `ACTIVE`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub application: Application,
    pub plan_id: String,
    #[serde(default)]
    pub product: String,
    /// API names this subscription's plan covers.  Empty means all.
    #[serde(default)]
    pub apis: Vec<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl Subscription {
    /// Whether this subscription may authorize requests at all.
    pub fn usable(&self) -> bool {
        self.active && self.application.state == AppState::Active
    }

    /// Whether this subscription's plan covers the named API.
    pub fn covers(&self, api: &str) -> bool {
        self.apis.is_empty() || self.apis.iter().any(|a| a == api)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────────────────────────

/// A catalog names a publication space (organization/catalog pair).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDocument {
    pub name: String,
    #[serde(default)]
    pub organization: String,
}

/// The full raw document set handed to the snapshot builder.
///
/// API order is significant: candidate ties are broken by this insertion
/// order (and are explicitly unstable across catalog reloads).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocuments {
    #[serde(default)]
    pub catalogs: Vec<CatalogDocument>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub apis: Vec<ApiDocument>,
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
}

impl CatalogDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add an API document.
    pub fn with_api(mut self, api: ApiDocument) -> Self {
        self.apis.push(api);
        self
    }

    /// Builder: add a subscription.
    pub fn with_subscription(mut self, sub: Subscription) -> Self {
        self.subscriptions.push(sub);
        self
    }

    /// Builder: add a product.
    pub fn with_product(mut self, product: Product) -> Self {
        self.products.push(product);
        self
    }
}
