//! Load-time validation of API documents.
//!
//! [`validate_api`] checks the structural invariants of a single API
//! document *before* it enters a snapshot.  A failing document is rejected
//! on its own — one bad API never takes down the whole catalog — and the
//! check runs once per load, never per request.

use crate::catalog::ApiDocument;
use crate::error::ConfigError;
use crate::security::{KeyKind, SecurityRequirement, SecurityScheme};

/// Validate all structural invariants of an API document.
///
/// Returns `Ok(())` if the document can be compiled into a snapshot.
/// Returns the *first* detected [`ConfigError`] otherwise.
///
/// Checks performed (in order):
/// 1. API name is non-empty.
/// 2. `base_path` starts with `/`.
/// 3. Every requirement (document-level and per-operation) references only
///    declared schemes.
/// 4. Per requirement: at most two API-key schemes.
/// 5. Per requirement: at most one client-id and at most one client-secret
///    scheme, regardless of header vs. query transport.
/// 6. Per requirement: a client-secret scheme is accompanied by a client-id
///    scheme.
pub fn validate_api(api: &ApiDocument) -> Result<(), ConfigError> {
    // ── 1. API name ──────────────────────────────────────────────────────────
    if api.name.trim().is_empty() {
        return Err(ConfigError::EmptyApiName);
    }

    // ── 2. Base path shape ───────────────────────────────────────────────────
    if !api.base_path.starts_with('/') {
        return Err(ConfigError::InvalidBasePath(
            api.name.clone(),
            "base path must start with '/'".to_string(),
        ));
    }

    // ── 3–6. Requirement checks ──────────────────────────────────────────────
    for requirement in &api.security {
        validate_requirement(api, requirement)?;
    }
    for methods in api.paths.values() {
        for operation in methods.values() {
            for requirement in operation.security.as_deref().unwrap_or_default() {
                validate_requirement(api, requirement)?;
            }
        }
    }

    Ok(())
}

fn validate_requirement(
    api: &ApiDocument,
    requirement: &SecurityRequirement,
) -> Result<(), ConfigError> {
    let mut key_schemes = 0usize;
    let mut client_ids = 0usize;
    let mut client_secrets = 0usize;

    for scheme_name in &requirement.0 {
        let scheme = api
            .security_definitions
            .get(scheme_name)
            .ok_or_else(|| ConfigError::UnknownScheme(api.name.clone(), scheme_name.clone()))?;

        if let SecurityScheme::ApiKey { key, .. } = scheme {
            key_schemes += 1;
            match key {
                KeyKind::ClientId => client_ids += 1,
                KeyKind::ClientSecret => client_secrets += 1,
            }
        }
    }

    if key_schemes > 2 {
        return Err(ConfigError::TooManyKeySchemes(api.name.clone()));
    }
    if client_ids > 1 {
        return Err(ConfigError::DuplicateClientIdScheme(api.name.clone()));
    }
    if client_secrets > 1 {
        return Err(ConfigError::DuplicateClientSecretScheme(api.name.clone()));
    }
    if client_secrets == 1 && client_ids == 0 {
        return Err(ConfigError::ClientSecretWithoutClientId(api.name.clone()));
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
