//! `rate-limit` — per-client token-bucket throttling with header reporting.
//!
//! Each caller (the subscription id seeded at `_.client.id`, falling back
//! to `anonymous`) owns an independent bucket.  The bucket refills
//! continuously: on each request the elapsed wall-clock time is converted
//! to tokens, then one token is consumed.  When no tokens remain the flow
//! fails with `429 Too Many Requests`.
//!
//! A `FINISH` observer writes `x-ratelimit-limit` and
//! `x-ratelimit-remaining` onto `message.headers` on allowed *and*
//! rejected requests alike.
//!
//! Properties:
//! - `requests-per-second` (number): sustained refill rate, default 100.
//! - `burst` (number): bucket capacity, default 200.

use async_trait::async_trait;
use flowgate_kernel::{Context, FINISH, Policy, PolicyFault, PolicyOutcome};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::warn;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    /// Refill from elapsed time, then try to consume one token.
    /// Returns `(allowed, remaining)`.
    fn try_consume(&mut self, rate_per_second: f64, burst: f64) -> (bool, f64) {
        let now = Instant::now();
        let refill = now.duration_since(self.last_refill).as_secs_f64() * rate_per_second;
        self.tokens = (self.tokens + refill).min(burst);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            (true, self.tokens)
        } else {
            (false, self.tokens)
        }
    }
}

/// Token-bucket rate-limit policy.
pub struct RateLimitPolicy {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitPolicy {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
        }
    }

    fn caller_id(ctx: &Context) -> String {
        ctx.get("_.client.id")
            .and_then(Value::as_str)
            .unwrap_or("anonymous")
            .to_string()
    }
}

#[async_trait]
impl Policy for RateLimitPolicy {
    fn name(&self) -> &str {
        "rate-limit"
    }

    async fn execute(&self, props: &Value, ctx: &mut Context) -> PolicyOutcome {
        let rate = props
            .get("requests-per-second")
            .and_then(Value::as_f64)
            .unwrap_or(100.0);
        let burst = props.get("burst").and_then(Value::as_f64).unwrap_or(200.0);

        let caller = Self::caller_id(ctx);
        let (allowed, remaining) = {
            let mut buckets = self.buckets.lock().await;
            let bucket = buckets
                .entry(caller.clone())
                .or_insert_with(|| Bucket::new(burst));
            bucket.try_consume(rate, burst)
        };

        let limit = burst as u64;
        let remaining = remaining.floor() as u64;
        ctx.subscribe(FINISH, move |c| {
            c.set(
                "message.headers.x-ratelimit-limit",
                Value::String(limit.to_string()),
            );
            c.set(
                "message.headers.x-ratelimit-remaining",
                Value::String(remaining.to_string()),
            );
        });

        if allowed {
            PolicyOutcome::Proceed
        } else {
            warn!(caller = %caller, "rate limit exceeded");
            PolicyOutcome::Fail(PolicyFault::new(
                "RateLimitExceeded",
                format!("rate limit exceeded for client '{caller}'"),
                429,
            ))
        }
    }
}
