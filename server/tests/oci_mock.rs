//! Remote tools, cache build and discovery against an in-process OCI stand-in

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use opsi_mcp::config::AppConfig;
use opsi_mcp::oci::{AuthType, Credentials, OciConfigFile};
use opsi_mcp::registry::ClientRegistry;
use opsi_mcp::skills::SkillLibrary;
use opsi_mcp::tools::ToolRouter;

const TENANCY: &str = "ocid1.tenancy.oc1..aaaatenant";
const PROD: &str = "ocid1.compartment.oc1..prod";

type Params = Query<HashMap<String, String>>;

async fn require_signature(request: Request, next: Next) -> Response {
    let signed = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Signature ") && v.contains("keyId=\"") && v.contains("rsa-sha256"))
        .unwrap_or(false);
    if !signed || request.headers().get("date").is_none() {
        return (StatusCode::UNAUTHORIZED, Json(json!({"code": "NotAuthenticated", "message": "unsigned"})))
            .into_response();
    }
    next.run(request).await
}

fn insight(id: &str, database_id: &str, name: &str, source: &str) -> Value {
    json!({
        "id": id,
        "databaseId": database_id,
        "databaseName": name,
        "databaseDisplayName": name,
        "databaseType": "ATP-S",
        "entitySource": source,
        "compartmentId": PROD,
        "status": "ENABLED",
        "lifecycleState": "ACTIVE"
    })
}

async fn tenancy(Path(id): Path<String>) -> Json<Value> {
    Json(json!({"id": id, "name": "acme", "homeRegionKey": "IAD"}))
}

async fn region_subscriptions() -> Json<Value> {
    Json(json!([
        {"regionKey": "IAD", "regionName": "us-ashburn-1", "status": "READY", "isHomeRegion": true}
    ]))
}

async fn get_compartment(Path(id): Path<String>) -> Response {
    if id == TENANCY {
        Json(json!({"id": TENANCY, "name": "acme", "lifecycleState": "ACTIVE"})).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn list_compartments(Query(q): Params) -> Json<Value> {
    if q.get("compartmentId").map(String::as_str) == Some(TENANCY) {
        Json(json!([{
            "id": PROD,
            "name": "Prod",
            "compartmentId": TENANCY,
            "lifecycleState": "ACTIVE"
        }]))
    } else {
        Json(json!([]))
    }
}

async fn database_insights(Query(q): Params) -> Response {
    if q.get("compartmentId").map(String::as_str) != Some(PROD) {
        return Json(json!({"items": []})).into_response();
    }
    match q.get("page").map(String::as_str) {
        None => {
            let mut headers = HeaderMap::new();
            headers.insert("opc-next-page", "2".parse().unwrap());
            (
                headers,
                Json(json!({"items": [
                    insight("ins1", "db-a", "SALES", "AUTONOMOUS_DATABASE"),
                    insight("ins2", "db-a", "SALES_PE", "PE_COMANAGED_DATABASE"),
                ]})),
            )
                .into_response()
        }
        Some(_) => Json(json!({"items": [insight("ins3", "db-b", "HR", "EM_MANAGED_EXTERNAL_DATABASE")]})).into_response(),
    }
}

async fn get_database_insight(Path(id): Path<String>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("opc-request-id", "REQ123".parse().unwrap());
    (
        StatusCode::NOT_FOUND,
        headers,
        Json(json!({"code": "NotAuthorizedOrNotFound", "message": format!("{} not found", id)})),
    )
        .into_response()
}

async fn host_insights(Query(q): Params) -> Json<Value> {
    if q.get("compartmentId").map(String::as_str) != Some(PROD) {
        return Json(json!({"items": []}));
    }
    Json(json!({"items": [{
        "id": "hins1",
        "hostName": "app01",
        "hostDisplayName": "app01",
        "platformType": "LINUX",
        "entitySource": "MACS_MANAGED_EXTERNAL_HOST",
        "compartmentId": PROD,
        "status": "ENABLED",
        "lifecycleState": "ACTIVE"
    }]}))
}

async fn managed_databases() -> Json<Value> {
    Json(json!({"items": [
        {"id": "db-a", "name": "sales", "managementOption": "ADVANCED", "deploymentType": "AUTONOMOUS"},
        {"id": "db-c", "name": "ops", "managementOption": "BASIC", "deploymentType": "VM"}
    ]}))
}

async fn start_mock() -> String {
    let app = Router::new()
        .route("/20160918/tenancies/:id", get(tenancy))
        .route("/20160918/tenancies/:id/regionSubscriptions", get(region_subscriptions))
        .route("/20160918/compartments", get(list_compartments))
        .route("/20160918/compartments/:id", get(get_compartment))
        .route("/20200630/databaseInsights", get(database_insights))
        .route("/20200630/databaseInsights/:id", get(get_database_insight))
        .route("/20200630/hostInsights", get(host_insights))
        .route("/20201101/managedDatabases", get(managed_databases))
        .layer(middleware::from_fn(require_signature));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn router(cache_dir: &std::path::Path) -> ToolRouter {
    let base = start_mock().await;

    let mut config = AppConfig::default();
    config.cache.directory = cache_dir.to_path_buf();
    config.oci.config_file = cache_dir.join("no-oci-config");

    let registry = ClientRegistry::new(config)
        .with_oci_config(OciConfigFile::parse("[DEFAULT]\ntenancy=ocid1.tenancy.oc1..aaaatenant\nregion=us-ashburn-1\n").unwrap())
        .with_endpoint_override(base);
    registry.insert_credentials(
        "DEFAULT",
        Credentials {
            auth_type: AuthType::ApiKey,
            key_id: format!("{}/ocid1.user.oc1..aaaauser/11:22", TENANCY),
            private_key: rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap(),
            tenancy_id: TENANCY.to_string(),
            region: Some("us-ashburn-1".to_string()),
        },
    );

    ToolRouter::new(Arc::new(registry), Arc::new(SkillLibrary::builtin()))
}

#[tokio::test]
async fn paged_listing_follows_next_page() {
    let dir = tempfile::tempdir().unwrap();
    let router = router(dir.path()).await;

    let result = router
        .call("list_database_insights", json!({"compartment_id": PROD}))
        .await
        .unwrap();
    assert_eq!(result["count"], 3);
    assert_eq!(result["truncated"], false);
    assert_eq!(result["region"], "us-ashburn-1");

    let capped = router
        .call("list_database_insights", json!({"compartment_id": PROD, "max_items": 2}))
        .await
        .unwrap();
    assert_eq!(capped["count"], 2);
    assert_eq!(capped["truncated"], true);
}

#[tokio::test]
async fn service_errors_become_payloads() {
    let dir = tempfile::tempdir().unwrap();
    let router = router(dir.path()).await;

    let (payload, is_error) = router
        .call_tool("get_database_insight", json!({"database_insight_id": "ocid1.opsidatabaseinsight.oc1.iad.missing"}))
        .await;
    assert!(is_error);
    assert_eq!(payload["type"], "ServiceError");
    assert_eq!(payload["status"], 404);
    assert_eq!(payload["code"], "NotAuthorizedOrNotFound");
    assert_eq!(payload["opc_request_id"], "REQ123");
}

#[tokio::test]
async fn build_then_query_cache() {
    let dir = tempfile::tempdir().unwrap();
    let router = router(dir.path()).await;

    let report = router.call("build_inventory_cache", json!({})).await.unwrap();
    assert_eq!(report["status"], "success", "report: {}", report);
    assert_eq!(report["compartments"], 2);
    assert_eq!(report["databases"], 3);
    assert_eq!(report["hosts"], 1);
    assert_eq!(report["saved"], true);
    assert!(dir.path().join("opsi_cache_DEFAULT.json").exists());

    let found = router
        .call("search_cached_databases", json!({"name": "sales", "compartment": "prod"}))
        .await
        .unwrap();
    assert_eq!(found["count"], 2);

    let tree = router.call("get_compartment_tree", json!({})).await.unwrap();
    assert_eq!(tree["trees"][0]["name"], "acme");
    assert_eq!(tree["trees"][0]["children"][0]["database_count"], 3);

    let status = router.call("get_cache_status", json!({})).await.unwrap();
    assert_eq!(status["valid"], true);
    assert_eq!(status["summary"]["build_status"], "success");
}

#[tokio::test]
async fn discovery_correlates_insights_and_managed_databases() {
    let dir = tempfile::tempdir().unwrap();
    let router = router(dir.path()).await;

    let report = router
        .call("discover_databases", json!({"compartment": PROD}))
        .await
        .unwrap();
    assert_eq!(report["both"], 1);
    assert_eq!(report["insight_only"], 1);
    assert_eq!(report["managed_only"], 1);

    let databases = report["databases"].as_array().unwrap();
    let a = databases.iter().find(|d| d["database_id"] == "db-a").unwrap();
    assert_eq!(a["insight_ids"], json!(["ins1", "ins2"]));
    assert_eq!(a["management_option"], "ADVANCED");
}
