//! `invoke-subflow` — run a nested assembly.
//!
//! Properties:
//! - `assembly` (array of steps, required): the nested flow.  Its failure
//!   propagates as a failure of the invoking flow.

use async_trait::async_trait;
use flowgate_kernel::{Assembly, Context, Policy, PolicyFault, PolicyOutcome};
use serde_json::Value;

pub struct InvokeSubflowPolicy;

#[async_trait]
impl Policy for InvokeSubflowPolicy {
    fn name(&self) -> &str {
        "invoke-subflow"
    }

    async fn execute(&self, props: &Value, _ctx: &mut Context) -> PolicyOutcome {
        let Some(steps) = props.get("assembly") else {
            return PolicyOutcome::Fail(PolicyFault::new(
                "InvokeSubflowError",
                "invoke-subflow requires an 'assembly' property",
                500,
            ));
        };
        match serde_json::from_value::<Assembly>(steps.clone()) {
            Ok(sub) => PolicyOutcome::Invoke(sub),
            Err(e) => PolicyOutcome::Fail(PolicyFault::new(
                "InvokeSubflowError",
                format!("nested assembly does not parse: {e}"),
                500,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn parses_the_nested_assembly() {
        let mut ctx = Context::new();
        let outcome = InvokeSubflowPolicy
            .execute(
                &json!({ "assembly": [ { "policy": "set-variable", "properties": { "name": "x", "value": 1 } } ] }),
                &mut ctx,
            )
            .await;
        let PolicyOutcome::Invoke(sub) = outcome else {
            panic!("expected an invoke outcome");
        };
        assert_eq!(sub.steps.len(), 1);
        assert_eq!(sub.steps[0].policy, "set-variable");
    }

    #[tokio::test]
    async fn missing_assembly_property_fails() {
        let mut ctx = Context::new();
        assert!(matches!(
            InvokeSubflowPolicy.execute(&json!({}), &mut ctx).await,
            PolicyOutcome::Fail(_)
        ));
    }
}
