//! HTTP API tests

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::Router;
use http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use dockhand::deploy::orchestrator::Orchestrator;
use dockhand::jobs::service::JobService;
use dockhand::jobs::tracker::JobTracker;
use dockhand::profiles::ProfileManager;
use dockhand::server::serve::router;
use dockhand::server::state::ServerState;
use dockhand::store::memory::MemoryStore;
use dockhand::store::Store;

fn app() -> Router {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let tracker = Arc::new(JobTracker::new());
    // No stages: submitted jobs complete immediately
    let orchestrator = Arc::new(Orchestrator::new(tracker, store.clone(), Vec::new()));
    let jobs = Arc::new(JobService::new(store.clone(), orchestrator, 3));
    let profiles = Arc::new(ProfileManager::new(store));
    router(Arc::new(ServerState::new(jobs, profiles)))
}

fn deployment() -> Value {
    json!({
        "projectPath": "/srv/app",
        "imageName": "web",
        "imageTag": "1.0",
        "dockerHubUsername": "acme",
        "dockerHubPassword": "registry-secret",
        "sshHost": "10.0.0.5",
        "sshUser": "deploy",
        "sshPassword": "ssh-secret",
        "containerName": "web"
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "dockhand");
}

#[tokio::test]
async fn test_deploy_accepts_valid_config() {
    let app = app();
    let (status, body) = send(&app, "POST", "/api/deploy", Some(deployment())).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job_id = body["jobId"].as_i64().unwrap();
    assert!(body.get("warning").is_none());

    let (status, job) = send(&app, "GET", &format!("/api/jobs/{}", job_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["id"], job_id);
    assert_eq!(job["config"]["imageName"], "web");
    assert!(job["config"].get("dockerHubPassword").is_none());
    assert!(job["config"].get("sshPassword").is_none());
}

#[tokio::test]
async fn test_deploy_validation_error() {
    let app = app();
    let mut config = deployment();
    config["imageName"] = json!("");
    config.as_object_mut().unwrap().remove("sshPassword");

    let (status, body) = send(&app, "POST", "/api/deploy", Some(config)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation");
    assert!(body["message"].as_str().unwrap().contains("imageName"));

    let (_, jobs) = send(&app, "GET", "/api/jobs", None).await;
    assert_eq!(jobs, json!([]));
}

#[tokio::test]
async fn test_deploy_rejects_non_json_body() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/deploy")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "validation");
}

#[tokio::test]
async fn test_unknown_job_is_404() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/jobs/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_image_tags_requires_key() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/images/tags?imageKey=acme/web", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = send(&app, "GET", "/api/images/tags", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation");
}

#[tokio::test]
async fn test_profile_lifecycle() {
    let app = app();
    let (status, saved) = send(
        &app,
        "POST",
        "/api/profiles",
        Some(json!({"name": "production", "passphrase": "hunter2", "config": deployment()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = saved["id"].as_i64().unwrap();

    let (status, listed) = send(&app, "GET", "/api/profiles", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed[0]["name"], "production");
    assert!(!listed.to_string().contains("dockerHubPassword"));

    let load_uri = format!("/api/profiles/{}/load", id);
    let (status, body) = send(&app, "POST", &load_uri, Some(json!({"passphrase": "wrong"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "authentication");
    assert_eq!(body["message"], "decryption failed");

    let (status, config) = send(&app, "POST", &load_uri, Some(json!({"passphrase": "hunter2"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(config["dockerHubPassword"], "registry-secret");
    assert_eq!(config["sshPassword"], "ssh-secret");

    let (status, _) = send(&app, "DELETE", &format!("/api/profiles/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, body) = send(&app, "DELETE", &format!("/api/profiles/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_profile_save_requires_passphrase() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/profiles",
        Some(json!({"name": "production", "config": deployment()})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation");
}
