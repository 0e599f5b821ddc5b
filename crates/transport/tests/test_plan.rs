//! Integration tests for the reqwest-backed request sender.

use std::time::Duration;

use httpmock::prelude::*;
use serde_json::{json, Value};
use url::Url;

use webchat_transport::{
    normalize_endpoint, EndpointRotator, Method, ReqwestSender, Request, RequestSender,
    SenderSettings, TransportError, OCTET_STREAM,
};

fn sender() -> ReqwestSender {
    ReqwestSender::new(&SenderSettings {
        timeout: Duration::from_secs(5),
        ..SenderSettings::default()
    })
    .expect("sender builds")
}

fn endpoint_for(server: &MockServer) -> Url {
    normalize_endpoint(&server.base_url()).expect("endpoint parses")
}

#[tokio::test]
async fn get_without_payload_sends_json_accept_and_request_id() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/websvcs/chat/poll/p1")
                .header("accept", "application/json")
                .header_exists("x-request-id");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"chat": {"status": {"type": "success"}}}));
        })
        .await;

    let response = sender()
        .send(&endpoint_for(&server), Request::get("/chat/poll/p1"))
        .await
        .expect("poll succeeds");

    mock.assert_async().await;
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type.as_deref(), Some("application/json"));
    let body: Value = response.json().expect("body is json");
    assert_eq!(body["chat"]["status"]["type"], "success");
}

#[tokio::test]
async fn payload_switches_to_post_with_json_body() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/websvcs/chat/reconnect")
                .header("content-type", "application/json")
                .json_body(json!({"chatID": "c1"}));
            then.status(200).json_body(json!({"chat": {}}));
        })
        .await;

    sender()
        .send(
            &endpoint_for(&server),
            Request::post("/chat/reconnect", json!({"chatID": "c1"})),
        )
        .await
        .expect("reconnect succeeds");

    mock.assert_async().await;
}

#[tokio::test]
async fn explicit_method_wins_without_payload() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/websvcs/chat/exit/p1");
            then.status(200).json_body(json!({"chat": {}}));
        })
        .await;

    sender()
        .send(
            &endpoint_for(&server),
            Request::get("/chat/exit/p1").with_method(Method::Post),
        )
        .await
        .expect("exit succeeds");

    mock.assert_async().await;
}

#[tokio::test]
async fn service_unavailable_is_distinguished() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/websvcs/chat/poll/p1");
            then.status(503);
        })
        .await;

    let error = sender()
        .send(&endpoint_for(&server), Request::get("/chat/poll/p1"))
        .await
        .expect_err("503 must fail");

    assert!(error.is_service_unavailable());
}

#[tokio::test]
async fn other_http_failures_carry_the_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/websvcs/serverConfiguration");
            then.status(500);
        })
        .await;

    let error = sender()
        .send(&endpoint_for(&server), Request::get("/serverConfiguration"))
        .await
        .expect_err("500 must fail");

    assert!(matches!(error, TransportError::Status { status: 500, .. }));
    assert!(!error.is_service_unavailable());
}

#[tokio::test]
async fn binary_download_uses_requested_accept_type() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/websvcs/chat/getfile/a/b/-image.jpeg")
                .header("accept", OCTET_STREAM);
            then.status(200)
                .header("content-type", "image/jpeg")
                .body(&[0xff_u8, 0xd8, 0xff][..]);
        })
        .await;

    let response = sender()
        .send(
            &endpoint_for(&server),
            Request::get("/chat/getfile/a/b/-image.jpeg").with_accept(OCTET_STREAM),
        )
        .await
        .expect("download succeeds");

    mock.assert_async().await;
    assert_eq!(response.body.as_ref(), &[0xff_u8, 0xd8, 0xff]);
    assert_eq!(response.content_type.as_deref(), Some("image/jpeg"));
}

#[tokio::test]
async fn rotation_moves_requests_to_the_backup() {
    let primary = MockServer::start_async().await;
    let backup = MockServer::start_async().await;
    primary
        .mock_async(|when, then| {
            when.method(GET).path("/websvcs/serverConfiguration");
            then.status(503);
        })
        .await;
    let backup_mock = backup
        .mock_async(|when, then| {
            when.method(GET).path("/websvcs/serverConfiguration");
            then.status(200).json_body(json!([]));
        })
        .await;

    let rotator = EndpointRotator::from_strs(&[primary.base_url(), backup.base_url()])
        .expect("rotator builds");
    let sender = sender();

    let error = sender
        .send(rotator.current(), Request::get("/serverConfiguration"))
        .await
        .expect_err("primary is down");
    assert!(error.is_service_unavailable());

    sender
        .send(rotator.next(), Request::get("/serverConfiguration"))
        .await
        .expect("backup answers");
    backup_mock.assert_async().await;
}
