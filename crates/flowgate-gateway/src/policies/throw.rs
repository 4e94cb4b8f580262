//! `throw` — abort the assembly with a named fault.
//!
//! Properties:
//! - `name` (string): fault name, default `ThrowError`.
//! - `message` (string): user-visible message.
//! - `status` (number): HTTP status, default `500`.

use async_trait::async_trait;
use flowgate_kernel::{Context, Policy, PolicyFault, PolicyOutcome};
use serde_json::Value;

pub struct ThrowPolicy;

#[async_trait]
impl Policy for ThrowPolicy {
    fn name(&self) -> &str {
        "throw"
    }

    async fn execute(&self, props: &Value, _ctx: &mut Context) -> PolicyOutcome {
        let name = props
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("ThrowError");
        let message = props
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("assembly raised a fault");
        let status = props
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|s| u16::try_from(s).ok())
            .unwrap_or(500);
        PolicyOutcome::Fail(PolicyFault::new(name, message, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn raises_the_configured_fault() {
        let mut ctx = Context::new();
        let outcome = ThrowPolicy
            .execute(
                &json!({ "name": "TooBig", "message": "payload too large", "status": 413 }),
                &mut ctx,
            )
            .await;
        let PolicyOutcome::Fail(fault) = outcome else {
            panic!("expected a failure outcome");
        };
        assert_eq!(fault.name, "TooBig");
        assert_eq!(fault.status, 413);
    }

    #[tokio::test]
    async fn defaults_apply_when_properties_are_absent() {
        let mut ctx = Context::new();
        let PolicyOutcome::Fail(fault) = ThrowPolicy.execute(&json!({}), &mut ctx).await else {
            panic!("expected a failure outcome");
        };
        assert_eq!(fault.name, "ThrowError");
        assert_eq!(fault.status, 500);
    }
}
