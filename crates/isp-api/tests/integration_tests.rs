//! # Integration Tests for isp-api
//!
//! Drives the full router over the in-memory backend: authentication and
//! authorization, access-list writes, the registry CRUD surface, token
//! lifecycle, error mapping, health probes and the OpenAPI document.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use isp_api::memory::{MemoryStore, Snapshot};
use isp_api::service::BaselineOutcome;
use isp_api::state::AppState;
use isp_core::{AccessList, AppGroup, Application, ApplicationType, Domain, Token};

/// Helper: an app over an empty store.
fn test_app() -> axum::Router {
    isp_api::app(AppState::in_memory())
}

/// Helper: one domain (1), one group (10), one application (100).
fn seeded_store() -> MemoryStore {
    let now = Utc::now();
    MemoryStore::from_snapshot(Snapshot {
        domains: vec![Domain {
            id: 1,
            name: "root".to_string(),
            description: String::new(),
            system_id: 1,
            created_at: now,
            updated_at: now,
        }],
        app_groups: vec![AppGroup {
            id: 10,
            name: "billing".to_string(),
            description: String::new(),
            domain_id: 1,
            created_at: now,
            updated_at: now,
        }],
        applications: vec![Application {
            id: 100,
            name: "invoicer".to_string(),
            description: String::new(),
            application_group_id: 10,
            app_type: ApplicationType::System,
            created_at: now,
            updated_at: now,
        }],
        ..Snapshot::default()
    })
}

fn seeded_app() -> axum::Router {
    isp_api::app(AppState::with_memory_store(&seeded_store()))
}

/// Helper: POST a JSON body.
async fn post_json(app: axum::Router, uri: &str, body: Value) -> axum::http::Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Helper: read response body as string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::http::Response<Body>) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/liveness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe_without_database() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health/readiness")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

#[tokio::test]
async fn test_metrics_disabled_returns_404() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_slow_request_times_out_with_408() {
    let slow = axum::Router::new().route(
        "/slow",
        axum::routing::get(|| async {
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            "late"
        }),
    );
    let app = isp_api::with_request_timeout(slow, std::time::Duration::from_millis(20));
    let response = app
        .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
}

// -- Authentication -----------------------------------------------------------

#[tokio::test]
async fn test_authenticate_live_token() {
    let store = seeded_store();
    let app = isp_api::app(AppState::with_memory_store(&store));

    let created = body_json(
        post_json(
            app.clone(),
            "/system/token/create_token",
            json!({"appId": 100, "expireTime": -1}),
        )
        .await,
    )
    .await;
    let token = created["tokens"][0]["token"].as_str().unwrap().to_string();

    let response = post_json(app, "/system/secure/authenticate", json!({"token": token})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["authData"]["systemId"], 1);
    assert_eq!(body["authData"]["domainId"], 1);
    assert_eq!(body["authData"]["serviceId"], 10);
    assert_eq!(body["authData"]["applicationId"], 100);
    assert_eq!(body["authData"]["appName"], "invoicer");
    assert!(body.get("errorReason").is_none());
}

#[tokio::test]
async fn test_authenticate_unknown_token() {
    let app = seeded_app();
    let response = post_json(app, "/system/secure/authenticate", json!({"token": "nope"})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["authenticated"], false);
    assert_eq!(body["errorReason"], "token not found");
    assert!(body.get("authData").is_none());
}

#[tokio::test]
async fn test_authenticate_expired_token() {
    let mut snapshot = seeded_store().snapshot();
    snapshot.tokens.push(Token {
        token: "stale".to_string(),
        app_id: 100,
        expire_time: 1_000,
        created_at: Utc::now() - Duration::hours(1),
    });
    let store = MemoryStore::from_snapshot(snapshot);
    let app = isp_api::app(AppState::with_memory_store(&store));

    let response = post_json(app, "/system/secure/authenticate", json!({"token": "stale"})).await;
    let body = body_json(response).await;
    assert_eq!(body["authenticated"], false);
    assert_eq!(body["errorReason"], "token is expired");
}

// -- Authorization ------------------------------------------------------------

#[tokio::test]
async fn test_authorize_follows_access_list() {
    let mut snapshot = seeded_store().snapshot();
    snapshot.access_lists = vec![
        AccessList {
            app_id: 100,
            method: "orders/create".to_string(),
            value: true,
        },
        AccessList {
            app_id: 100,
            method: "orders/delete".to_string(),
            value: false,
        },
    ];
    let store = MemoryStore::from_snapshot(snapshot);
    let app = isp_api::app(AppState::with_memory_store(&store));

    for (endpoint, expected) in [
        ("orders/create", true),
        ("orders/delete", false),
        ("orders/unknown", false),
    ] {
        let response = post_json(
            app.clone(),
            "/system/secure/authorize",
            json!({"appId": 100, "endpoint": endpoint}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["authorized"], expected, "endpoint {endpoint}");
    }
}

// -- Access Lists -------------------------------------------------------------

#[tokio::test]
async fn test_set_list_with_remove_old_replaces_rows() {
    let app = seeded_app();
    post_json(
        app.clone(),
        "/system/access_list/set_one",
        json!({"appId": 100, "method": "a", "value": true}),
    )
    .await;

    let response = post_json(
        app.clone(),
        "/system/access_list/set_list",
        json!({
            "appId": 100,
            "removeOld": true,
            "methods": [{"method": "b", "value": true}, {"method": "c", "value": false}]
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body,
        json!([{"method": "b", "value": true}, {"method": "c", "value": false}])
    );

    let response = post_json(app, "/system/access_list/get_by_id", json!({"id": 100})).await;
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_access_list_for_missing_application_is_404() {
    let app = seeded_app();
    let response = post_json(app, "/system/access_list/get_by_id", json!({"id": 999})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["details"]["reason"], "APPLICATION_NOT_FOUND");
}

#[tokio::test]
async fn test_delete_access_list_rows() {
    let app = seeded_app();
    post_json(
        app.clone(),
        "/system/access_list/set_list",
        json!({"appId": 100, "methods": [{"method": "a", "value": true}, {"method": "b", "value": true}]}),
    )
    .await;
    let response = post_json(
        app,
        "/system/access_list/delete_list",
        json!({"appId": 100, "methods": ["a"]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["count"], 1);
}

// -- Domains & Groups ---------------------------------------------------------

#[tokio::test]
async fn test_create_domain_and_group() {
    let app = test_app();
    let response = post_json(
        app.clone(),
        "/system/domain/create_update_domain",
        json!({"name": "payments", "description": "pay"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let domain = body_json(response).await;
    assert_eq!(domain["name"], "payments");
    assert_eq!(domain["systemId"], 1);
    let domain_id = domain["id"].as_i64().unwrap();

    let response = post_json(
        app.clone(),
        "/system/application_group/create",
        json!({"name": "gateway", "domainId": domain_id}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let group = body_json(response).await;
    assert_eq!(group["domainId"], domain_id);

    let response = post_json(app, "/system/application_group/get_all", json!({})).await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_group_name_is_409() {
    let app = seeded_app();
    let response = post_json(
        app,
        "/system/application_group/create",
        json!({"name": "billing", "domainId": 1}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "ALREADY_EXISTS");
    assert_eq!(body["error"]["details"]["reason"], "APP_GROUP_DUPLICATE_NAME");
}

#[tokio::test]
async fn test_group_in_missing_domain_is_404() {
    let app = test_app();
    let response = post_json(
        app,
        "/system/application_group/create",
        json!({"name": "orphan", "domainId": 42}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["error"]["details"]["reason"],
        "DOMAIN_NOT_FOUND"
    );
}

#[tokio::test]
async fn test_delete_domain_cascades_to_applications() {
    let app = seeded_app();
    let response = post_json(
        app.clone(),
        "/system/domain/delete_domains",
        json!({"idList": [1]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["count"], 1);

    let response = post_json(
        app,
        "/system/application/get_application_by_id",
        json!({"id": 100}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_empty_id_list_is_400() {
    let app = seeded_app();
    let response = post_json(app, "/system/domain/delete_domains", json!({"idList": []})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let app = seeded_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/system/domain/get_domain_by_id")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_blank_name_is_400() {
    let app = test_app();
    let response = post_json(
        app,
        "/system/domain/create_update_domain",
        json!({"name": "   "}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// -- Applications -------------------------------------------------------------

#[tokio::test]
async fn test_create_update_application_allocates_next_id() {
    let app = seeded_app();
    let response = post_json(
        app.clone(),
        "/system/application/create_update_application",
        json!({"name": "mailer", "serviceId": 10, "type": "MOBILE"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    assert_eq!(created["id"], 101);
    assert_eq!(created["type"], "MOBILE");
    assert_eq!(created["tokens"], json!([]));

    let response = post_json(app, "/system/application/next_id", json!({})).await;
    assert_eq!(body_json(response).await["id"], 102);
}

#[tokio::test]
async fn test_create_application_with_taken_id_is_409() {
    let app = seeded_app();
    let response = post_json(
        app,
        "/system/application/create_application",
        json!({"id": 100, "name": "other", "applicationGroupId": 10, "type": "SYSTEM"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        body_json(response).await["error"]["details"]["reason"],
        "APPLICATION_DUPLICATE_ID"
    );
}

#[tokio::test]
async fn test_update_application_moves_tokens_to_new_id() {
    let app = seeded_app();
    post_json(
        app.clone(),
        "/system/token/create_token",
        json!({"appId": 100}),
    )
    .await;

    let response = post_json(
        app.clone(),
        "/system/application/update_application",
        json!({"oldId": 100, "newId": 500, "name": "invoicer-v2"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["id"], 500);
    assert_eq!(updated["name"], "invoicer-v2");
    assert_eq!(updated["tokens"].as_array().unwrap().len(), 1);
    assert_eq!(updated["tokens"][0]["appId"], 500);
}

#[tokio::test]
async fn test_system_tree_nests_groups_and_applications() {
    let app = seeded_app();
    let response = post_json(app, "/system/application/get_system_tree", json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let tree = body_json(response).await;
    assert_eq!(tree[0]["id"], 1);
    assert_eq!(tree[0]["services"][0]["id"], 10);
    assert_eq!(tree[0]["services"][0]["apps"][0]["id"], 100);
}

#[tokio::test]
async fn test_get_application_by_token() {
    let app = seeded_app();
    let created = body_json(
        post_json(
            app.clone(),
            "/system/token/create_token",
            json!({"appId": 100}),
        )
        .await,
    )
    .await;
    let token = created["tokens"][0]["token"].clone();

    let response = post_json(
        app,
        "/system/application/get_application_by_token",
        json!({"token": token}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"], 100);
}

// -- Tokens -------------------------------------------------------------------

#[tokio::test]
async fn test_revoke_tokens_reports_remaining() {
    let app = seeded_app();
    for _ in 0..2 {
        post_json(
            app.clone(),
            "/system/token/create_token",
            json!({"appId": 100}),
        )
        .await;
    }
    let response = post_json(
        app.clone(),
        "/system/token/get_tokens_by_app_id",
        json!({"appId": 100}),
    )
    .await;
    let tokens = body_json(response).await;
    let first = tokens[0]["token"].clone();

    let response = post_json(
        app.clone(),
        "/system/token/revoke_tokens",
        json!({"appId": 100, "tokens": [first]}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["deleted"], 1);
    assert_eq!(body["application"]["tokens"].as_array().unwrap().len(), 1);

    let response = post_json(
        app,
        "/system/token/revoke_tokens_for_app",
        json!({"appId": 100}),
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["deleted"], 1);
    assert_eq!(body["application"]["tokens"], json!([]));
}

#[tokio::test]
async fn test_create_token_rejects_bad_expire_time() {
    let app = seeded_app();
    let response = post_json(
        app,
        "/system/token/create_token",
        json!({"appId": 100, "expireTime": -5}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_token_for_missing_application_is_404() {
    let app = seeded_app();
    let response = post_json(
        app,
        "/system/token/create_token",
        json!({"appId": 7}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// -- Baseline -----------------------------------------------------------------

#[tokio::test]
async fn test_baseline_admin_token_authenticates_and_authorizes_login() {
    let state = AppState::in_memory();
    let outcome = state.services.baseline.run("admin-ui-token").await.unwrap();
    assert_eq!(outcome, BaselineOutcome::Provisioned);
    let again = state.services.baseline.run("admin-ui-token").await.unwrap();
    assert_eq!(again, BaselineOutcome::SkippedTokenPresent);

    let app = isp_api::app(state);
    let body = body_json(
        post_json(
            app.clone(),
            "/system/secure/authenticate",
            json!({"token": "admin-ui-token"}),
        )
        .await,
    )
    .await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["authData"]["applicationId"], 1);

    let body = body_json(
        post_json(
            app,
            "/system/secure/authorize",
            json!({"appId": 1, "endpoint": "admin/auth/login"}),
        )
        .await,
    )
    .await;
    assert_eq!(body["authorized"], true);
}

// -- OpenAPI ------------------------------------------------------------------

#[tokio::test]
async fn test_openapi_document_served() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert_eq!(doc["info"]["title"], "ISP System Service");
    assert!(doc["paths"]["/system/secure/authenticate"].is_object());
}
