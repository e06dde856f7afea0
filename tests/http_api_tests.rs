//! HTTP surface tests driven through the router with `oneshot`.

mod test_utils;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use tender_market::repositories::Page;
use tender_market::server::{AppState, create_app};
use tender_market::telemetry::REQUEST_ID_HEADER;
use test_utils::{Marketplace, OUTSIDER, OWNER, seed_marketplace, setup_test_db_arc};
use tower::ServiceExt;

async fn app() -> (Router, Marketplace) {
    let db = setup_test_db_arc().await.unwrap();
    let market = seed_marketplace(&db).await.unwrap();
    (create_app(AppState::new(db, Page::default())), market)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
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
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, json)
}

async fn create_tender(app: &Router, market: &Marketplace, name: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/tenders/new",
        Some(json!({
            "name": name,
            "description": "Deliver supplies",
            "serviceType": "Delivery",
            "organizationId": market.organization_id,
            "creatorUsername": OWNER,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

#[tokio::test]
async fn ping_answers_ok_with_request_id() {
    let (app, _) = app().await;

    let response = app
        .oneshot(Request::builder().uri("/api/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn tender_lifecycle_over_http() {
    let (app, market) = app().await;
    let tender = create_tender(&app, &market, "Supplies").await;
    let id = tender["id"].as_str().unwrap().to_string();
    assert_eq!(tender["version"], 1);
    assert_eq!(tender["serviceType"], "Delivery");
    assert_eq!(tender["status"], "Created");
    assert!(tender["createdAt"].is_string());

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/tenders/{id}/status?status=Published&username={OWNER}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Published");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/tenders/{id}/status?username={OWNER}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("Published"));

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/api/tenders/{id}/edit?username={OWNER}"),
        Some(json!({ "name": "", "description": "Deliver more supplies" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 2);
    assert_eq!(body["name"], "Supplies");
    assert_eq!(body["description"], "Deliver more supplies");

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/tenders/{id}/rollback/1?username={OWNER}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 3);
    assert_eq!(body["description"], "Deliver supplies");

    let (status, body) = send(&app, Method::GET, "/api/tenders?service_type=Delivery", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn errors_map_to_status_codes_with_reason() {
    let (app, market) = app().await;
    let tender = create_tender(&app, &market, "Supplies").await;
    let id = tender["id"].as_str().unwrap().to_string();

    let cases = [
        (
            Method::GET,
            "/api/tenders?limit=abc".to_string(),
            StatusCode::BAD_REQUEST,
        ),
        (
            Method::GET,
            "/api/tenders?offset=-1".to_string(),
            StatusCode::BAD_REQUEST,
        ),
        (
            Method::GET,
            "/api/tenders?limit=18446744073709551615".to_string(),
            StatusCode::BAD_REQUEST,
        ),
        (
            Method::GET,
            format!("/api/tenders/my?username={OWNER}&offset=9223372036854775808"),
            StatusCode::BAD_REQUEST,
        ),
        (
            Method::GET,
            "/api/tenders/not-a-uuid/status?username=owner".to_string(),
            StatusCode::BAD_REQUEST,
        ),
        (
            Method::PUT,
            format!("/api/tenders/{id}/rollback/first?username={OWNER}"),
            StatusCode::BAD_REQUEST,
        ),
        (
            Method::GET,
            format!("/api/tenders/{id}/status?username=nobody"),
            StatusCode::UNAUTHORIZED,
        ),
        (
            Method::GET,
            format!("/api/tenders/{id}/status?username={OUTSIDER}"),
            StatusCode::FORBIDDEN,
        ),
        (
            Method::PUT,
            format!("/api/tenders/{id}/rollback/9?username={OWNER}"),
            StatusCode::NOT_FOUND,
        ),
        (
            Method::GET,
            "/api/tenders/my".to_string(),
            StatusCode::UNAUTHORIZED,
        ),
    ];

    for (method, uri, expected) in cases {
        let (status, body) = send(&app, method, &uri, None).await;
        assert_eq!(status, expected, "{uri}");
        assert!(body["reason"].is_string(), "{uri}: {body}");
        assert_eq!(body.as_object().unwrap().len(), 1, "{uri}");
    }
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let (app, market) = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/tenders/new",
        Some(json!({
            "name": "Supplies",
            "description": "Deliver supplies",
            "serviceType": "Gardening",
            "organizationId": market.organization_id,
            "creatorUsername": OWNER,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "invalid request body");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/bids/new",
        Some(json!({ "name": "Offer" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bid_decision_over_http() {
    let (app, market) = app().await;
    let tender = create_tender(&app, &market, "Supplies").await;
    let tender_id = tender["id"].as_str().unwrap().to_string();
    send(
        &app,
        Method::PUT,
        &format!("/api/tenders/{tender_id}/status?status=Published&username={OWNER}"),
        None,
    )
    .await;

    let (status, bid) = send(
        &app,
        Method::POST,
        "/api/bids/new",
        Some(json!({
            "name": "Offer",
            "description": "Fast delivery",
            "tenderId": tender_id,
            "authorType": "User",
            "authorId": market.outsider_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{bid}");
    let bid_id = bid["id"].as_str().unwrap().to_string();
    assert_eq!(bid["tenderId"], tender_id.as_str());

    let (status, bids) = send(
        &app,
        Method::GET,
        &format!("/api/bids/{tender_id}/list?username={OWNER}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bids.as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/bids/{bid_id}/submit_decision?decision=Maybe&username={OWNER}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["reason"], "invalid decision value");

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/bids/{bid_id}/submit_decision?decision=Approved&username={OWNER}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], bid["status"]);

    let (_, status_body) = send(
        &app,
        Method::GET,
        &format!("/api/tenders/{tender_id}/status?username={OWNER}"),
        None,
    )
    .await;
    assert_eq!(status_body, json!("Closed"));

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/api/bids/{bid_id}/edit?username={OUTSIDER}"),
        Some(json!({ "description": "Even faster" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 2);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/bids/{bid_id}/rollback/1?username={OWNER}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn openapi_document_lists_marketplace_paths() {
    let (app, _) = app().await;

    let (status, doc) = send(&app, Method::GET, "/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    let paths = doc["paths"].as_object().unwrap();
    assert!(paths.contains_key("/api/tenders/new"));
    assert!(paths.contains_key("/api/bids/{id}/submit_decision"));
}
