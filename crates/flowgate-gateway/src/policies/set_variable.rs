//! `set-variable` — write a value into the request context.
//!
//! Properties:
//! - `name` (string, required): dotted context path to write.
//! - `value` (any): value to store; `$(path)` references in it resolve
//!   before this policy runs, so typed values pass through.

use async_trait::async_trait;
use flowgate_kernel::{Context, Policy, PolicyFault, PolicyOutcome};
use serde_json::Value;

pub struct SetVariablePolicy;

#[async_trait]
impl Policy for SetVariablePolicy {
    fn name(&self) -> &str {
        "set-variable"
    }

    async fn execute(&self, props: &Value, ctx: &mut Context) -> PolicyOutcome {
        let Some(name) = props.get("name").and_then(Value::as_str) else {
            return PolicyOutcome::Fail(PolicyFault::new(
                "SetVariableError",
                "set-variable requires a 'name' property",
                500,
            ));
        };
        let value = props.get("value").cloned().unwrap_or(Value::Null);
        ctx.set(name, value);
        PolicyOutcome::Proceed
    }
}
