//! Policy trait, assembly configuration, and the policy-registry capability.
//!
//! An *assembly* is the ordered, possibly nested, list of policy steps
//! configured for an operation.  Each step names a policy and carries a JSON
//! properties object; the runtime substitutes `$(path)` references in the
//! properties against the request context before every invocation.
//!
//! Policies return an explicit [`PolicyOutcome`] instead of driving
//! continuation callbacks: `Proceed` advances the flow, `Fail` aborts the
//! whole assembly, and `Invoke` suspends the current flow to run a nested
//! assembly.

use crate::context::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Assembly configuration
// ─────────────────────────────────────────────────────────────────────────────

/// One step in an assembly: a policy name plus its configuration properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyStep {
    /// Name resolved through the [`PolicyRegistry`] at execution time.
    pub policy: String,
    /// Free-form configuration passed to the policy after `$(path)`
    /// substitution.
    #[serde(default)]
    pub properties: Value,
}

impl AssemblyStep {
    pub fn new(policy: impl Into<String>, properties: Value) -> Self {
        Self {
            policy: policy.into(),
            properties,
        }
    }
}

/// The ordered list of policy steps configured for an operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assembly {
    pub steps: Vec<AssemblyStep>,
}

impl Assembly {
    pub fn new(steps: Vec<AssemblyStep>) -> Self {
        Self { steps }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Policy outcome
// ─────────────────────────────────────────────────────────────────────────────

/// A named, messaged failure raised by a policy.  Carries the HTTP status
/// the gateway surfaces to the client; internal details are never serialized.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{name}: {message}")]
pub struct PolicyFault {
    pub name: String,
    pub message: String,
    pub status: u16,
}

impl PolicyFault {
    pub fn new(name: impl Into<String>, message: impl Into<String>, status: u16) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            status,
        }
    }
}

/// Instruction returned by [`Policy::execute`] controlling what the engine
/// does next.
#[derive(Debug, Clone)]
pub enum PolicyOutcome {
    /// Advance to the next step of the current flow.
    Proceed,
    /// Abort the entire assembly — no further steps in parent or child flows
    /// execute.  Lifecycle notifications still fire.
    Fail(PolicyFault),
    /// Suspend the current flow and run the nested assembly; on its
    /// successful completion the parent resumes at its next step, and a
    /// nested failure propagates as a failure of the parent.
    Invoke(Assembly),
}

// ─────────────────────────────────────────────────────────────────────────────
// Policy trait & registry capability
// ─────────────────────────────────────────────────────────────────────────────

/// A pluggable unit of request/response processing executed by the assembly
/// engine.
///
/// `props` arrives with `$(path)` references already substituted.  A step's
/// own asynchronous work is a suspension point during which no other step of
/// the *same* assembly runs; other requests' assemblies proceed concurrently.
///
/// Implementations must be `Send + Sync` so they can be shared across Tokio
/// tasks without additional synchronization by the caller.
#[async_trait]
pub trait Policy: Send + Sync {
    /// Stable, human-readable identifier for this policy (used in logs and
    /// registry lookups).
    fn name(&self) -> &str;

    /// Execute one step against the per-request context.
    async fn execute(&self, props: &Value, ctx: &mut Context) -> PolicyOutcome;
}

/// Capability mapping a policy name to an executable [`Policy`].
pub trait PolicyRegistry: Send + Sync {
    /// Look up a policy by name.  `None` fails the assembly with a
    /// policy-not-found fault.
    fn lookup(&self, name: &str) -> Option<Arc<dyn Policy>>;
}
