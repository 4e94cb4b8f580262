//! The per-request processing pipeline.
//!
//! Stage order, each stage reading the output of the previous one:
//!
//! 1. acquire the current catalog snapshot (refcounted, released on drop);
//! 2. resolve `(method, path)` into ranked candidates;
//! 3. evaluate security for every candidate concurrently;
//! 4. select the champion (plan hint, terminal checks);
//! 5. run the operation's policy assembly against the request context;
//! 6. raise `FINISH` and serialize `message.*` into the response.
//!
//! Failures at any stage are shaped through the same `message.*` context
//! subtree as successes, so `FINISH` observers (CORS, rate-limit headers)
//! still decorate error responses.

use crate::assembly::AssemblyEngine;
use crate::error::{GatewayError, GatewayResult};
use crate::plan;
use crate::resolver::{self, Candidate};
use crate::security::SecurityEvaluator;
use crate::snapshot::SnapshotManager;
use flowgate_kernel::{
    Context, FINISH, GatewayRequest, GatewayResponse, PolicyRegistry, SecurityHandler,
};
use futures::future::join_all;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Orchestrates one request through resolution, security, and assembly.
pub struct Pipeline {
    manager: Arc<SnapshotManager>,
    registry: Arc<dyn PolicyRegistry>,
    handler: Arc<dyn SecurityHandler>,
}

impl Pipeline {
    pub fn new(
        manager: Arc<SnapshotManager>,
        registry: Arc<dyn PolicyRegistry>,
        handler: Arc<dyn SecurityHandler>,
    ) -> Self {
        Self {
            manager,
            registry,
            handler,
        }
    }

    /// Process one request to a response.  Never panics, never errors: every
    /// failure maps to an HTTP error response.
    pub async fn handle(&self, request: &GatewayRequest) -> GatewayResponse {
        let mut ctx = Context::new();
        seed_request(&mut ctx, request);
        ctx.set("message.status", json!(200));
        ctx.set("message.headers", json!({}));

        if let Err(e) = self.drive(request, &mut ctx).await {
            info!(
                request_id = %request.id,
                status = e.status(),
                code = e.code(),
                "request rejected"
            );
            ctx.set("message.status", json!(e.status()));
            ctx.set(
                "message.body",
                json!({ "error": { "code": e.code(), "message": e.to_string() } }),
            );
        }

        ctx.notify(FINISH);
        serialize_message(&ctx)
    }

    async fn drive(&self, request: &GatewayRequest, ctx: &mut Context) -> GatewayResult<()> {
        let snapshot = self.manager.acquire_current()?;

        let method = request.method.as_str();
        let candidates = resolver::resolve(&snapshot, method, &request.path);
        if candidates.is_empty() {
            return Err(GatewayError::NoMatch(format!(
                "{method} {}",
                request.path
            )));
        }
        debug!(
            request_id = %request.id,
            snapshot_id = %snapshot.id(),
            candidates = candidates.len(),
            "candidates resolved"
        );

        // Candidates are independent; evaluate their security concurrently.
        let evaluator = SecurityEvaluator::new(self.handler.as_ref());
        let outcomes = join_all(
            candidates
                .iter()
                .map(|c| evaluator.evaluate(request, &snapshot, c)),
        )
        .await;
        let authorized: Vec<Candidate> = candidates
            .into_iter()
            .zip(outcomes)
            .map(|(mut c, auth)| {
                c.auth = Some(auth);
                c
            })
            .filter(Candidate::authorized)
            .collect();

        let hint = request.headers.get(plan::PLAN_HINT_HEADER).map(String::as_str);
        let champion = plan::select(&snapshot, authorized, hint)?;
        seed_champion(ctx, &snapshot, &champion);

        let assembly = champion
            .operation(&snapshot)
            .and_then(|op| op.assembly.clone());
        if let Some(assembly) = assembly {
            let engine = AssemblyEngine::new(self.registry.as_ref());
            engine.run(&assembly, ctx).await?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Context seeding / serialization
// ─────────────────────────────────────────────────────────────────────────────

/// Seed `request.*` from the inbound request.
///
/// The body is stored as parsed JSON when it parses, else as a string, so
/// assemblies can address into JSON payloads with `$(request.body.field)`.
fn seed_request(ctx: &mut Context, request: &GatewayRequest) {
    ctx.set("request.id", json!(request.id));
    ctx.set("request.method", json!(request.method.as_str()));
    ctx.set("request.path", json!(request.path));
    ctx.set("request.headers", string_map(&request.headers));
    ctx.set("request.query", string_map(&request.query));

    let body = if request.body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&request.body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&request.body).into_owned()))
    };
    ctx.set("request.body", body);
}

/// Seed `_.api.*` and `_.client.*` from the selected champion.
fn seed_champion(ctx: &mut Context, snapshot: &crate::snapshot::Snapshot, champion: &Candidate) {
    let api = champion.api(snapshot);
    ctx.set("_.api.name", json!(api.name));
    ctx.set("_.api.version", json!(api.version));
    ctx.set("_.api.path", json!(champion.template));
    ctx.set("_.api.method", json!(champion.method));
    if let Some(id) = champion
        .operation(snapshot)
        .and_then(|op| op.operation_id.as_deref())
    {
        ctx.set("_.api.operation-id", json!(id));
    }

    let auth = champion.auth.clone().unwrap_or_default();
    let client_id = auth.subscription_id.as_deref().unwrap_or("anonymous");
    ctx.set("_.client.id", json!(client_id));
    if let Some(secret) = auth.resolved_secret {
        ctx.set("_.client.secret", secret);
    }
}

fn string_map(map: &HashMap<String, String>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

/// Serialize `message.*` into the outbound response.
///
/// A string body passes through verbatim; any other JSON value is encoded
/// and gets a `content-type: application/json` header unless the assembly
/// set one itself.
fn serialize_message(ctx: &Context) -> GatewayResponse {
    let status = ctx
        .get("message.status")
        .and_then(Value::as_u64)
        .and_then(|s| u16::try_from(s).ok())
        .unwrap_or(200);
    let mut response = GatewayResponse::new(status);

    if let Some(headers) = ctx.get("message.headers").and_then(Value::as_object) {
        for (name, value) in headers {
            response.headers.insert(name.clone(), header_text(value));
        }
    }

    match ctx.get("message.body") {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) => response.body = s.clone().into_bytes(),
        Some(other) => {
            response.body = serde_json::to_vec(other).unwrap_or_default();
            response
                .headers
                .entry("content-type".to_string())
                .or_insert_with(|| "application/json".to_string());
        }
    }
    response
}

fn header_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
