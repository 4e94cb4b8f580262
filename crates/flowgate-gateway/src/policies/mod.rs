//! Built-in policies and the in-memory policy registry.

mod cors;
mod invoke_subflow;
mod rate_limit;
mod set_variable;
mod throw;

pub use cors::CorsPolicy;
pub use invoke_subflow::InvokeSubflowPolicy;
pub use rate_limit::RateLimitPolicy;
pub use set_variable::SetVariablePolicy;
pub use throw::ThrowPolicy;

use flowgate_kernel::{Policy, PolicyRegistry};
use std::collections::HashMap;
use std::sync::Arc;

/// [`PolicyRegistry`] backed by a name → policy map.
#[derive(Default)]
pub struct InMemoryPolicyRegistry {
    policies: HashMap<String, Arc<dyn Policy>>,
}

impl InMemoryPolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with every built-in policy.
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        reg.register(Arc::new(SetVariablePolicy));
        reg.register(Arc::new(ThrowPolicy));
        reg.register(Arc::new(CorsPolicy));
        reg.register(Arc::new(RateLimitPolicy::new()));
        reg.register(Arc::new(InvokeSubflowPolicy));
        reg
    }

    /// Register a policy under its own name.  A later registration with the
    /// same name replaces the earlier one.
    pub fn register(&mut self, policy: Arc<dyn Policy>) {
        self.policies.insert(policy.name().to_string(), policy);
    }
}

impl PolicyRegistry for InMemoryPolicyRegistry {
    fn lookup(&self, name: &str) -> Option<Arc<dyn Policy>> {
        self.policies.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_knows_all_policies() {
        let reg = InMemoryPolicyRegistry::builtin();
        for name in ["set-variable", "throw", "cors", "rate-limit", "invoke-subflow"] {
            assert!(reg.lookup(name).is_some(), "missing policy '{name}'");
        }
        assert!(reg.lookup("ghost").is_none());
    }
}
