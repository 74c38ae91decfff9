//! Router-level tests: each request goes through the full axum stack via
//! `tower::ServiceExt::oneshot`, with the engine seeded through the
//! directory the way the internal control plane would.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use stagecast_api::http::{create_router, AppState};
use stagecast_core::models::UserId;
use stagecast_core::Config;

struct TestApp {
    router: Router,
    owner: UserId,
    room_id: String,
}

fn test_app(config: Config) -> TestApp {
    let state = AppState::from_config(&config);
    let owner = UserId::new();
    let studio = state
        .directory
        .create_studio("main".to_string(), owner.clone())
        .expect("studio");
    let room = state
        .directory
        .create_room(&studio.id, "stage".to_string(), &owner)
        .expect("room");
    TestApp {
        router: create_router(state),
        owner,
        room_id: room.id.as_str().to_string(),
    }
}

fn default_app() -> TestApp {
    test_app(Config::default())
}

fn json_request(method: &str, uri: &str, user: Option<&UserId>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        builder = builder
            .header("x-user-id", user.as_str())
            .header("x-user-name", "ada");
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_check_works() {
    let app = default_app();
    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn member_can_post_chat() {
    let app = default_app();
    let response = app
        .router
        .oneshot(json_request(
            "POST",
            &format!("/api/rooms/{}/chat", app.room_id),
            Some(&app.owner),
            json!({"text": "hello"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["seq"], 1);
    assert_eq!(body["author"], "ada");
    assert_eq!(body["text"], "hello");
}

#[tokio::test]
async fn chat_without_identity_is_unauthorized() {
    let app = default_app();
    let response = app
        .router
        .oneshot(json_request(
            "POST",
            &format!("/api/rooms/{}/chat", app.room_id),
            None,
            json!({"text": "anonymous"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn oversized_chat_is_rejected() {
    let app = default_app();
    let response = app
        .router
        .oneshot(json_request(
            "POST",
            &format!("/api/rooms/{}/chat", app.room_id),
            Some(&app.owner),
            json!({"text": "x".repeat(501)}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn unknown_room_is_not_found() {
    let app = default_app();
    let response = app
        .router
        .oneshot(json_request(
            "POST",
            "/api/rooms/nosuchroom00/chat",
            Some(&app.owner),
            json!({"text": "hello"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_emote_is_unprocessable() {
    let app = default_app();
    let response = app
        .router
        .oneshot(json_request(
            "POST",
            &format!("/api/rooms/{}/reactions", app.room_id),
            Some(&app.owner),
            json!({"emote": "rocket"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn reaction_rate_limit_maps_to_429() {
    let app = default_app();
    let uri = format!("/api/rooms/{}/reactions", app.room_id);

    let first = app
        .router
        .clone()
        .oneshot(json_request("POST", &uri, Some(&app.owner), json!({"emote": "heart"})))
        .await
        .expect("response");
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .router
        .oneshot(json_request("POST", &uri, Some(&app.owner), json!({"emote": "heart"})))
        .await
        .expect("response");
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(second).await;
    assert!(body["retry_after_ms"].as_u64().is_some());
}

#[tokio::test]
async fn access_code_issue_validate_revoke_flow() {
    let app = default_app();

    let issued = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/rooms/{}/access", app.room_id),
            Some(&app.owner),
            json!({}),
        ))
        .await
        .expect("response");
    assert_eq!(issued.status(), StatusCode::OK);
    let issued = body_json(issued).await;
    let code = issued["code"].as_str().expect("code").to_string();
    assert_eq!(code.len(), 6);
    assert!(issued["expires_at"].as_str().is_some());

    let validated = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/access/validate",
            None,
            json!({"code": code}),
        ))
        .await
        .expect("response");
    assert_eq!(validated.status(), StatusCode::OK);
    let validated = body_json(validated).await;
    assert_eq!(validated["room_id"], app.room_id);
    assert_eq!(validated["phase"], "active");

    let revoked = app
        .router
        .clone()
        .oneshot(json_request(
            "DELETE",
            &format!("/api/access/{code}"),
            Some(&app.owner),
            json!({}),
        ))
        .await
        .expect("response");
    assert_eq!(revoked.status(), StatusCode::NO_CONTENT);

    let after = app
        .router
        .oneshot(json_request(
            "POST",
            "/api/access/validate",
            None,
            json!({"code": code}),
        ))
        .await
        .expect("response");
    assert_eq!(after.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn revoke_requires_admin() {
    let app = default_app();
    let issued = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/rooms/{}/access", app.room_id),
            Some(&app.owner),
            json!({}),
        ))
        .await
        .expect("response");
    let code = body_json(issued).await["code"]
        .as_str()
        .expect("code")
        .to_string();

    let stranger = UserId::new();
    let response = app
        .router
        .oneshot(json_request(
            "DELETE",
            &format!("/api/access/{code}"),
            Some(&stranger),
            json!({}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn live_signal_publishes_with_seq() {
    let app = default_app();
    let response = app
        .router
        .oneshot(json_request(
            "POST",
            &format!("/internal/rooms/{}/live", app.room_id),
            None,
            json!({"live": true}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["seq"], 1);
}

#[tokio::test]
async fn events_stream_opens_for_member() {
    let app = default_app();
    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri(format!("/api/rooms/{}/events", app.room_id))
                .header("x-user-id", app.owner.as_str())
                .header("x-user-name", "ada")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("text/event-stream"));
}

#[tokio::test]
async fn guest_needs_valid_code_for_events() {
    let app = default_app();
    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/api/rooms/{}/events?code=000000&name=guest",
                    app.room_id
                ))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn internal_provisioning_flow() {
    let app = default_app();
    let owner = UserId::new();

    let studio = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/internal/studios",
            None,
            json!({"name": "second", "owner_id": owner.as_str()}),
        ))
        .await
        .expect("response");
    assert_eq!(studio.status(), StatusCode::OK);
    let studio = body_json(studio).await;
    let studio_id = studio["id"].as_str().expect("studio id").to_string();

    let room = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/internal/studios/{studio_id}/rooms"),
            Some(&owner),
            json!({"name": "encore"}),
        ))
        .await
        .expect("response");
    assert_eq!(room.status(), StatusCode::OK);
    let room = body_json(room).await;
    assert_eq!(room["number"], 1);

    let member = UserId::new();
    let membership = app
        .router
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/internal/studios/{studio_id}/members"),
            Some(&owner),
            json!({"user_id": member.as_str(), "role": "admin"}),
        ))
        .await
        .expect("response");
    assert_eq!(membership.status(), StatusCode::OK);
    let membership = body_json(membership).await;
    assert_eq!(membership["role"], "admin");

    let room_id = room["id"].as_str().expect("room id").to_string();
    let removed = app
        .router
        .oneshot(json_request(
            "DELETE",
            &format!("/internal/rooms/{room_id}"),
            Some(&member),
            json!({}),
        ))
        .await
        .expect("response");
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);
}
