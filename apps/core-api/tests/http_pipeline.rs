#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use core_api::config::{AppConfig, HostConfig};
use core_api::middleware::X_REQUEST_ID;
use core_api::App;
use serde_json::{Value, json};
use tower::ServiceExt as _;

async fn app() -> App {
    let mut cfg = AppConfig::default();
    "sqlite::memory:".clone_into(&mut cfg.database.dsn);
    cfg.database.pool.max_conns = Some(1);
    cfg.database.pool.min_conns = Some(1);
    App::build(&HostConfig::from(cfg)).await.unwrap()
}

async fn read_json(resp: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn create(code: &str, request_id: Option<&str>) -> Request<Body> {
    let body = json!({
        "code": code,
        "user_id": "550e8400-e29b-41d4-a716-446655440000",
        "total_amount": 100.0,
        "details": [{
            "product_id": "650e8400-e29b-41d4-a716-446655440000",
            "product_name": "Standard room",
            "qty": 2,
            "price_per_unit": 50.0,
            "sub_total": 100.0
        }]
    });
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/bookings")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(id) = request_id {
        builder = builder.header(&X_REQUEST_ID, id);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn health_gets_a_generated_request_id() {
    let app = app().await;

    let resp = app
        .router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let id = resp.headers().get(&X_REQUEST_ID).unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok(), "{id}");
    assert_eq!(read_json(resp).await["status"], "UP");
}

#[tokio::test]
async fn root_and_health_report_status_and_time() {
    let app = app().await;

    for path in ["/", "/health"] {
        let resp = app
            .router
            .clone()
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK, "{path}");
        let json = read_json(resp).await;
        assert_eq!(json["status"], "UP", "{path}");
        let time = json["time"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(time).is_ok(), "{time}");
    }
}

#[tokio::test]
async fn aborted_host_cancels_request_storage_work() {
    let app = app().await;
    app.abort.cancel();

    let resp = app
        .router
        .clone()
        .oneshot(create("PIPE009", Some("req-abort")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = read_json(resp).await;
    assert_eq!(json["code"], "DB_TIMEOUT");
    assert_eq!(json["trace_id"], "req-abort");
}

#[tokio::test]
async fn incoming_request_id_becomes_the_trace_id() {
    let app = app().await;

    let resp = app
        .router
        .oneshot(create("PIPE001", Some("req-pipe-1")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(resp.headers().get(&X_REQUEST_ID).unwrap(), "req-pipe-1");
    let json = read_json(resp).await;
    assert_eq!(json["trace_id"], "req-pipe-1");
    assert_eq!(json["data"]["code"], "PIPE001");
}

#[tokio::test]
async fn created_booking_is_readable_by_code() {
    let app = app().await;
    let router = app.router.clone();
    let resp = router.oneshot(create("PIPE002", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .router
        .oneshot(
            Request::get("/api/v1/bookings/PIPE002")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = read_json(resp).await;
    assert_eq!(json["data"]["total_amount"], 100.0);
}

#[tokio::test]
async fn duplicate_code_problem_carries_the_request_id() {
    let app = app().await;
    let first = app.router.clone().oneshot(create("PIPE003", None)).await.unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let resp = app
        .router
        .oneshot(create("PIPE003", Some("req-dup")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/problem+json"
    );
    let json = read_json(resp).await;
    assert_eq!(json["code"], "BOOKING_CODE_ALREADY_EXISTS");
    assert_eq!(json["trace_id"], "req-dup");
}

#[tokio::test]
async fn unknown_route_is_a_not_found_problem() {
    let app = app().await;

    let resp = app
        .router
        .oneshot(Request::get("/nowhere").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let json = read_json(resp).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["instance"], "/nowhere");
}

#[tokio::test]
async fn registry_knows_booking_codes() {
    let app = app().await;
    assert_eq!(
        app.registry.lookup("BOOKING_NOT_FOUND"),
        Some(StatusCode::NOT_FOUND)
    );
    assert_eq!(app.registry.lookup("DB_CONFLICT"), Some(StatusCode::CONFLICT));
}
