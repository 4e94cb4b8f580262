//! Per-request security evaluation.
//!
//! For each candidate the evaluator walks the operation's security
//! requirements (falling back to document-level requirements), extracts
//! credentials from the configured transport, and delegates verification to
//! the injected [`SecurityHandler`].  Requirements are alternatives (OR);
//! the schemes inside one requirement must all pass (AND).
//!
//! A failed check — or a handler-raised error, which is logged — drops the
//! *candidate*, never the whole request: other candidates are still
//! evaluated.  Evaluation is read-only against the request and the
//! snapshot, so candidates can be evaluated concurrently.

mod handlers;

pub use handlers::SubscriptionHandler;

use crate::resolver::{AuthOutcome, Candidate};
use crate::snapshot::Snapshot;
use flowgate_kernel::{
    ApiKeyCredentials, GatewayRequest, KeyKind, SchemeOutcome, SecurityHandler,
    SecurityRequirement, SecurityScheme,
};
use tracing::warn;

/// Orchestrates requirement evaluation over an injected handler.
pub struct SecurityEvaluator<'a> {
    handler: &'a dyn SecurityHandler,
}

impl<'a> SecurityEvaluator<'a> {
    pub fn new(handler: &'a dyn SecurityHandler) -> Self {
        Self { handler }
    }

    /// Evaluate one candidate's requirements.
    ///
    /// A candidate with zero requirements — or one whose requirement list
    /// contains an empty requirement — is marked `no_security_reqs` and
    /// always passes.
    pub async fn evaluate(
        &self,
        request: &GatewayRequest,
        snapshot: &Snapshot,
        candidate: &Candidate,
    ) -> AuthOutcome {
        let api = candidate.api(snapshot);
        let Some(operation) = candidate.operation(snapshot) else {
            return AuthOutcome::default();
        };

        let requirements = api.requirements_for(operation);
        if requirements.is_empty() {
            return AuthOutcome {
                no_security_reqs: true,
                ..AuthOutcome::default()
            };
        }

        for requirement in requirements {
            // An empty requirement is an always-passing alternative: the
            // candidate requires no security.
            if requirement.is_empty() {
                return AuthOutcome {
                    no_security_reqs: true,
                    ..AuthOutcome::default()
                };
            }
            match self
                .eval_requirement(request, &snapshot.docs().subscriptions, api, requirement)
                .await
            {
                Some(outcome) => {
                    return AuthOutcome {
                        authenticated: true,
                        no_security_reqs: false,
                        resolved_secret: outcome.secret,
                        subscription_id: outcome.subscription_id,
                    };
                }
                None => continue,
            }
        }
        AuthOutcome::default()
    }

    /// Evaluate a single requirement.  `Some` when every scheme passed.
    async fn eval_requirement(
        &self,
        request: &GatewayRequest,
        subscriptions: &[flowgate_kernel::Subscription],
        api: &flowgate_kernel::ApiDocument,
        requirement: &SecurityRequirement,
    ) -> Option<SchemeOutcome> {
        let mut keys = ApiKeyCredentials::default();
        let mut has_key_scheme = false;
        let mut combined: Option<SchemeOutcome> = None;

        // Non-key schemes verify independently; key schemes are collected
        // and verified as one pair per requirement (load-time validation
        // guarantees at most one id and one secret scheme).
        for scheme_name in &requirement.0 {
            // Unknown names are rejected at load time; a miss here means the
            // snapshot was built without validation, so fail safe.
            let scheme = api.security_definitions.get(scheme_name)?;
            let credential = extract_credential(scheme, request)?;

            match scheme {
                SecurityScheme::ApiKey { key, .. } => {
                    has_key_scheme = true;
                    match key {
                        KeyKind::ClientId => keys.client_id = Some(credential),
                        KeyKind::ClientSecret => keys.client_secret = Some(credential),
                    }
                }
                SecurityScheme::Basic => {
                    let outcome = self.checked(
                        self.handler
                            .eval_basic(request, subscriptions, &api.name, &credential)
                            .await,
                        request,
                        "basic",
                    )?;
                    combined = Some(outcome);
                }
                SecurityScheme::OAuth2 => {
                    let outcome = self.checked(
                        self.handler
                            .eval_oauth2(request, subscriptions, &api.name, &credential)
                            .await,
                        request,
                        "oauth2",
                    )?;
                    combined = Some(outcome);
                }
            }
        }

        if has_key_scheme {
            let outcome = self.checked(
                self.handler
                    .eval_api_key(request, subscriptions, &api.name, &keys)
                    .await,
                request,
                "api-key",
            )?;
            combined = Some(outcome);
        }

        combined
    }

    /// Interpret a handler result: an error is logged and treated as a
    /// failed check (fail-safe, not fail-open); a `pass: false` outcome
    /// likewise fails the requirement.
    fn checked(
        &self,
        result: Result<SchemeOutcome, flowgate_kernel::HandlerError>,
        request: &GatewayRequest,
        scheme_kind: &str,
    ) -> Option<SchemeOutcome> {
        match result {
            Ok(outcome) if outcome.pass => Some(outcome),
            Ok(_) => None,
            Err(e) => {
                warn!(
                    request_id = %request.id,
                    scheme = scheme_kind,
                    error = %e,
                    "security handler error; dropping candidate"
                );
                None
            }
        }
    }
}

/// Extract the raw credential a scheme expects from the request.
///
/// Transport matching is exact: the configured header name (lowercased, as
/// all request headers are) or query parameter name.  `None` means the
/// credential is absent and the requirement cannot pass.
fn extract_credential(scheme: &SecurityScheme, request: &GatewayRequest) -> Option<String> {
    match scheme {
        SecurityScheme::ApiKey {
            transport, name, ..
        } => match transport {
            flowgate_kernel::SchemeTransport::Header => {
                request.headers.get(&name.to_lowercase()).cloned()
            }
            flowgate_kernel::SchemeTransport::Query => request.query.get(name).cloned(),
        },
        SecurityScheme::Basic => request
            .headers
            .get("authorization")
            .filter(|v| v.starts_with("Basic "))
            .cloned(),
        SecurityScheme::OAuth2 => request
            .headers
            .get("authorization")
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string),
    }
}

// =============================================================================
// Tests
// =============================================================================
