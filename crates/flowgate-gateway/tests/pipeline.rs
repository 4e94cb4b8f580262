//! End-to-end pipeline tests: catalog documents in, HTTP responses out.
//!
//! These exercise the full request path — snapshot, candidate resolution,
//! security evaluation against subscriptions, champion selection, and the
//! policy assembly — without binding a TCP socket.  The axum layer itself is
//! covered separately via `tower::ServiceExt::oneshot`.

use flowgate_gateway::pipeline::Pipeline;
use flowgate_gateway::policies::InMemoryPolicyRegistry;
use flowgate_gateway::security::SubscriptionHandler;
use flowgate_gateway::server::{GatewayServer, GatewayServerConfig};
use flowgate_gateway::snapshot::SnapshotManager;
use flowgate_kernel::{
    ApiDocument, Application, AppState, Assembly, AssemblyStep, CatalogDocuments,
    ClientCredentials, GatewayRequest, HttpMethod, KeyKind, Operation, SchemeTransport,
    SecurityRequirement, SecurityScheme, Subscription,
};
use serde_json::{Value, json};
use std::sync::Arc;

fn pipeline_with(docs: CatalogDocuments) -> Pipeline {
    let manager = Arc::new(SnapshotManager::new());
    manager.load(docs);
    Pipeline::new(
        manager,
        Arc::new(InMemoryPolicyRegistry::builtin()),
        Arc::new(SubscriptionHandler),
    )
}

fn client_id_scheme(header: &str) -> SecurityScheme {
    SecurityScheme::ApiKey {
        transport: SchemeTransport::Header,
        name: header.to_string(),
        key: KeyKind::ClientId,
    }
}

fn subscription(id: &str, plan: &str, client_id: &str, apis: &[&str]) -> Subscription {
    Subscription {
        id: id.to_string(),
        application: Application {
            name: format!("{id}-app"),
            state: AppState::Active,
            credentials: vec![ClientCredentials {
                client_id: client_id.to_string(),
                client_secret: Some("shh".to_string()),
            }],
        },
        plan_id: plan.to_string(),
        product: "p".to_string(),
        apis: apis.iter().map(|a| a.to_string()).collect(),
        active: true,
    }
}

fn echo_assembly(path: &str) -> Assembly {
    Assembly::new(vec![AssemblyStep::new(
        "set-variable",
        json!({ "name": "message.body", "value": format!("$({path})") }),
    )])
}

// ============================================================================
// Secured operations
// ============================================================================

fn secured_stock_docs() -> CatalogDocuments {
    let api = ApiDocument::new("stock", "/stock")
        .with_scheme("client-id-header", client_id_scheme("x-client-id"))
        .with_security(vec![SecurityRequirement::of(["client-id-header"])])
        .with_operation(
            "/quote",
            "get",
            Operation::new().with_assembly(echo_assembly("_.client.id")),
        );
    CatalogDocuments::new()
        .with_api(api)
        .with_subscription(subscription("sub-1", "gold", "abc", &["stock"]))
}

#[tokio::test]
async fn valid_api_key_authorizes_and_exposes_the_subscription() {
    let pipeline = pipeline_with(secured_stock_docs());
    let request = GatewayRequest::new("r1", "/stock/quote", HttpMethod::Get)
        .with_header("x-client-id", "abc");
    let response = pipeline.handle(&request).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"sub-1");
}

#[tokio::test]
async fn empty_requirement_makes_the_operation_open() {
    // A declared-but-empty requirement (`{}`) is not the same as an absent
    // list, but it must behave the same: no credentials needed, assembly
    // runs to completion.
    let api = ApiDocument::new("stock", "/stock")
        .with_security(vec![SecurityRequirement::none()])
        .with_operation(
            "/quote",
            "get",
            Operation::new().with_assembly(echo_assembly("request.path")),
        );
    let pipeline = pipeline_with(CatalogDocuments::new().with_api(api));

    let request = GatewayRequest::new("r1", "/stock/quote", HttpMethod::Get);
    let response = pipeline.handle(&request).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"/stock/quote");
}

#[tokio::test]
async fn missing_credential_is_unauthorized() {
    let pipeline = pipeline_with(secured_stock_docs());
    let request = GatewayRequest::new("r1", "/stock/quote", HttpMethod::Get);
    let response = pipeline.handle(&request).await;
    assert_eq!(response.status, 401);
    let body: Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["error"]["code"], json!("UNAUTHORIZED"));
}

#[tokio::test]
async fn unknown_credential_is_unauthorized() {
    let pipeline = pipeline_with(secured_stock_docs());
    let request = GatewayRequest::new("r1", "/stock/quote", HttpMethod::Get)
        .with_header("x-client-id", "wrong");
    let response = pipeline.handle(&request).await;
    assert_eq!(response.status, 401);
}

// ============================================================================
// Champion selection across overlapping APIs
// ============================================================================

fn overlapping_docs() -> CatalogDocuments {
    let api = |name: &str| {
        ApiDocument::new(name, "/v")
            .with_scheme("key", client_id_scheme("x-client-id"))
            .with_security(vec![SecurityRequirement::of(["key"])])
            .with_operation(
                "/r",
                "get",
                Operation::new().with_assembly(echo_assembly("_.api.name")),
            )
    };
    CatalogDocuments::new()
        .with_api(api("alpha"))
        .with_api(api("beta"))
        .with_subscription(subscription("sub-a", "gold", "abc", &["alpha"]))
        .with_subscription(subscription("sub-b", "silver", "abc", &["beta"]))
}

#[tokio::test]
async fn first_authorized_candidate_wins_without_a_hint() {
    let pipeline = pipeline_with(overlapping_docs());
    let request =
        GatewayRequest::new("r1", "/v/r", HttpMethod::Get).with_header("x-client-id", "abc");
    let response = pipeline.handle(&request).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"alpha");
}

#[tokio::test]
async fn plan_hint_steers_the_champion() {
    let pipeline = pipeline_with(overlapping_docs());
    let request = GatewayRequest::new("r1", "/v/r", HttpMethod::Get)
        .with_header("x-client-id", "abc")
        .with_header("x-plan-id", "silver");
    let response = pipeline.handle(&request).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"beta");
}

// ============================================================================
// Assembly composition
// ============================================================================

#[tokio::test]
async fn nested_subflow_shapes_the_response() {
    let assembly = Assembly::new(vec![AssemblyStep::new(
        "invoke-subflow",
        json!({
            "assembly": [
                { "policy": "set-variable", "properties": { "name": "message.status", "value": 202 } }
            ]
        }),
    )]);
    let docs = CatalogDocuments::new().with_api(ApiDocument::new("open", "/open").with_operation(
        "/go",
        "get",
        Operation::new().with_assembly(assembly),
    ));
    let pipeline = pipeline_with(docs);
    let request = GatewayRequest::new("r1", "/open/go", HttpMethod::Get);
    let response = pipeline.handle(&request).await;
    assert_eq!(response.status, 202);
}

#[tokio::test]
async fn rate_limit_throttles_across_requests() {
    let assembly = Assembly::new(vec![AssemblyStep::new(
        "rate-limit",
        json!({ "requests-per-second": 0.0, "burst": 1.0 }),
    )]);
    let docs = CatalogDocuments::new().with_api(ApiDocument::new("open", "/open").with_operation(
        "/go",
        "get",
        Operation::new().with_assembly(assembly),
    ));
    let pipeline = pipeline_with(docs);

    let request = GatewayRequest::new("r1", "/open/go", HttpMethod::Get);
    let first = pipeline.handle(&request).await;
    assert_eq!(first.status, 200);
    assert_eq!(
        first.headers.get("x-ratelimit-remaining").map(String::as_str),
        Some("0")
    );

    let second = pipeline.handle(&request).await;
    assert_eq!(second.status, 429);
    // Headers decorate the rejection too.
    assert_eq!(
        second.headers.get("x-ratelimit-limit").map(String::as_str),
        Some("1")
    );
}

// ============================================================================
// HTTP layer (tower oneshot, no socket)
// ============================================================================

mod http {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn write(dir: &std::path::Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    fn open_api_file(name: &str) -> String {
        format!(
            r#"{{ "kind": "api", "name": "{name}", "version": "1.0", "base_path": "/{name}",
                 "paths": {{ "/ping": {{ "GET": {{
                     "assembly": [
                         {{ "policy": "set-variable",
                            "properties": {{ "name": "message.body", "value": "pong" }} }}
                     ] }} }} }} }}"#
        )
    }

    async fn app(dir: &std::path::Path) -> axum::Router {
        GatewayServer::new(GatewayServerConfig {
            port: 0,
            catalog_dir: dir.to_string_lossy().into_owned(),
        })
        .build_app()
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_responds() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "api.json", &open_api_file("echo"));
        let app = app(dir.path()).await;

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn gateway_fallback_runs_the_assembly() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "api.json", &open_api_file("echo"));
        let app = app(dir.path()).await;

        let response = app
            .oneshot(Request::get("/echo/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"pong");
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "api.json", &open_api_file("echo"));
        let app = app(dir.path()).await;

        let response = app
            .oneshot(Request::get("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reload_installs_a_new_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "api.json", &open_api_file("echo"));
        let app = app(dir.path()).await;

        // A second API appears on disk after startup.
        write(dir.path(), "late.json", &open_api_file("late"));

        let before = app
            .clone()
            .oneshot(Request::get("/late/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(before.status(), StatusCode::NOT_FOUND);

        let reload = app
            .clone()
            .oneshot(
                Request::post("/admin/catalog/reload")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(reload.status(), StatusCode::OK);

        let after = app
            .oneshot(Request::get("/late/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(after.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn snapshot_admin_view_lists_the_latest() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "api.json", &open_api_file("echo"));
        let app = app(dir.path()).await;

        let response = app
            .oneshot(
                Request::get("/admin/snapshots")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        let snapshots = parsed["snapshots"].as_array().unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0]["is_latest"], json!(true));
        assert_eq!(snapshots[0]["refcount"], json!(0));
    }
}
