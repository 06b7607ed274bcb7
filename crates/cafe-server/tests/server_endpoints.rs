mod common;

use serde_json::Value;

#[tokio::test]
async fn health_endpoints_work() {
    let server = common::start_server().await;

    let resp = server.client.get(server.url("/")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["service"], "Cafe Ratings API");
    assert_eq!(body["status"], "ok");

    let resp = server.client.get(server.url("/healthz")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let resp = server.client.get(server.url("/readyz")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["cache"]["mode"], "local");
    assert_eq!(body["cache"]["entries"], 0);

    server.stop().await;
}

#[tokio::test]
async fn request_id_is_generated_or_echoed() {
    let server = common::start_server().await;

    let resp = server.client.get(server.url("/healthz")).send().await.unwrap();
    let generated = resp.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());

    let resp = server
        .client
        .get(server.url("/healthz"))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers().get("x-request-id").unwrap(), "trace-me");

    server.stop().await;
}

#[tokio::test]
async fn paths_match_with_and_without_trailing_slash() {
    let server = common::start_server().await;

    for path in ["/cities", "/cities/"] {
        let resp = server.client.get(server.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK, "{path}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body, serde_json::json!({"Cities": []}));
    }

    let resp = server
        .client
        .get(server.url("/no/such/route"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["detail"], "Not found.");

    server.stop().await;
}

#[tokio::test]
async fn readiness_reports_cache_usage() {
    let server = common::start_server().await;
    let admin = server.token_for("admin", cafe_core::Role::Admin).await;
    server
        .client
        .post(server.url("/cities/Test City/cafes/"))
        .bearer_auth(&admin)
        .json(&serde_json::json!({"name": "Test Cafe", "location": "x"}))
        .send()
        .await
        .unwrap();
    server
        .client
        .get(server.url("/cities/Test City/cafes/"))
        .send()
        .await
        .unwrap();

    let body: Value = server
        .client
        .get(server.url("/readyz"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["cache"]["entries"], 1);
    server.stop().await;

    let mut cfg = cafe_server::AppConfig::default();
    cfg.cache.enabled = false;
    let server = common::start_server_with(cfg).await;
    let body: Value = server
        .client
        .get(server.url("/readyz"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["cache"], serde_json::json!({"entries": 0, "mode": "disabled"}));
    server.stop().await;
}
