//! `cors` — attach CORS headers to the response.
//!
//! The policy does not write headers directly: it subscribes an observer on
//! the `FINISH` lifecycle event, so the headers land on `message.headers`
//! after the assembly is done — on the failure path too.
//!
//! Properties:
//! - `allow-origin` (string): default `*`.
//! - `allow-methods` (string): default `GET,POST,PUT,PATCH,DELETE,OPTIONS`.
//! - `allow-headers` (string): default `content-type,authorization`.

use async_trait::async_trait;
use flowgate_kernel::{Context, FINISH, Policy, PolicyOutcome};
use serde_json::Value;

pub struct CorsPolicy;

const DEFAULT_METHODS: &str = "GET,POST,PUT,PATCH,DELETE,OPTIONS";
const DEFAULT_HEADERS: &str = "content-type,authorization";

#[async_trait]
impl Policy for CorsPolicy {
    fn name(&self) -> &str {
        "cors"
    }

    async fn execute(&self, props: &Value, ctx: &mut Context) -> PolicyOutcome {
        let origin = props
            .get("allow-origin")
            .and_then(Value::as_str)
            .unwrap_or("*")
            .to_string();
        let methods = props
            .get("allow-methods")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_METHODS)
            .to_string();
        let headers = props
            .get("allow-headers")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_HEADERS)
            .to_string();

        ctx.subscribe(FINISH, move |c| {
            c.set(
                "message.headers.access-control-allow-origin",
                Value::String(origin.clone()),
            );
            c.set(
                "message.headers.access-control-allow-methods",
                Value::String(methods.clone()),
            );
            c.set(
                "message.headers.access-control-allow-headers",
                Value::String(headers.clone()),
            );
        });
        PolicyOutcome::Proceed
    }
}
