mod support;

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use batchgate_api_types::{HealthResponse, PreviewResponse};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use support::{
    FormPart, StubEngine, file, limits, multipart_body, multipart_content_type, options,
    router_with,
};

fn upload_request(path: &str, parts: &[FormPart<'_>]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, multipart_content_type())
        .body(Body::from(multipart_body(parts)))
        .expect("request")
}

async fn send(
    engine: Arc<StubEngine>,
    request: Request<Body>,
) -> (StatusCode, axum::http::HeaderMap, bytes::Bytes) {
    let response = router_with(engine, limits(1024, 3))
        .oneshot(request)
        .await
        .expect("router response");
    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    (status, headers, body)
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).expect("json body")
}

#[tokio::test]
async fn health_answers_on_both_paths_without_the_engine() {
    for path in ["/api/v1/health", "/api/health"] {
        let engine = Arc::new(StubEngine::default());
        let request = Request::builder()
            .uri(path)
            .body(Body::empty())
            .expect("request");
        let (status, headers, body) = send(engine.clone(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert!(headers.contains_key("x-request-id"));
        let health: HealthResponse = serde_json::from_slice(&body).expect("health body");
        assert_eq!(health.status, "ok");
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn single_file_is_returned_raw() {
    let engine = Arc::new(StubEngine::default());
    let request = upload_request("/api/v1/process", &[file("cat.jpg", b"meow")]);
    let (status, headers, body) = send(engine, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"out:meow");
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"cat.png\""
    );
}

#[tokio::test]
async fn several_files_become_an_ordered_zip() {
    let engine = Arc::new(StubEngine::default());
    let request = upload_request(
        "/api/v1/process",
        &[
            file("b.jpg", b"second"),
            file("a.jpg", b"first"),
            options(r#"{"shadow":{"enabled":true}}"#),
        ],
    );
    let (status, headers, body) = send(engine, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"processed_images.zip\""
    );

    let mut archive = zip::ZipArchive::new(Cursor::new(body.to_vec())).expect("zip");
    assert_eq!(archive.len(), 2);
    let mut members = Vec::new();
    for index in 0..archive.len() {
        let mut member = archive.by_index(index).expect("member");
        let mut data = Vec::new();
        member.read_to_end(&mut data).expect("read member");
        members.push((member.name().to_string(), data));
    }
    assert_eq!(
        members,
        vec![
            ("b.png".to_string(), b"out:second".to_vec()),
            ("a.png".to_string(), b"out:first".to_vec()),
        ]
    );
}

#[tokio::test]
async fn preview_inlines_every_result() {
    let engine = Arc::new(StubEngine::default());
    let request = upload_request(
        "/api/v1/process-preview",
        &[file("one.jpg", b"1"), file("two.jpg", b"2")],
    );
    let (status, headers, body) = send(engine, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(
        headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/json")
    );
    let raw = json_body(&body);
    assert_eq!(raw["files"][0]["mimeType"], "image/png");

    let preview: PreviewResponse = serde_json::from_slice(&body).expect("preview body");
    let decoded: Vec<(String, Vec<u8>)> = preview
        .files
        .iter()
        .map(|file| {
            let encoded = file
                .data_url
                .strip_prefix("data:image/png;base64,")
                .expect("data url");
            (file.name.clone(), STANDARD.decode(encoded).expect("base64"))
        })
        .collect();
    assert_eq!(
        decoded,
        vec![
            ("one.png".to_string(), b"out:1".to_vec()),
            ("two.png".to_string(), b"out:2".to_vec()),
        ]
    );
}

#[tokio::test]
async fn preview_passes_duplicate_names_through() {
    let engine = Arc::new(StubEngine::default());
    let request = upload_request(
        "/api/v1/process-preview",
        &[file("a.jpg", b"1"), file("a.jpg", b"2")],
    );
    let (status, _, body) = send(engine, request).await;

    assert_eq!(status, StatusCode::OK);
    let preview: PreviewResponse = serde_json::from_slice(&body).expect("preview body");
    let names: Vec<_> = preview.files.iter().map(|file| file.name.as_str()).collect();
    assert_eq!(names, ["a.png", "a.png"]);
}

#[tokio::test]
async fn missing_files_are_rejected_before_dispatch() {
    for path in ["/api/v1/process", "/api/v1/process-preview"] {
        let engine = Arc::new(StubEngine::default());
        let request = upload_request(path, &[options("{}")]);
        let (status, _, body) = send(engine.clone(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&body), json!({"error": "No file uploaded"}));
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn malformed_options_are_rejected_on_both_routes() {
    for path in ["/api/v1/process", "/api/v1/process-preview"] {
        let engine = Arc::new(StubEngine::default());
        let request = upload_request(path, &[file("a.jpg", b"a"), options("{oops")]);
        let (status, _, body) = send(engine.clone(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body = json_body(&body);
        assert_eq!(body["error"], "Invalid JSON in options");
        assert!(body["detail"].is_string());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn one_backend_failure_fails_the_batch() {
    let engine = Arc::new(StubEngine::default());
    let request = upload_request(
        "/api/v1/process",
        &[file("a.jpg", b"a"), file("fail.jpg", b"b"), file("c.jpg", b"c")],
    );
    let (status, headers, body) = send(engine, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/json")
    );
    let body = json_body(&body);
    assert_eq!(body["error"], "Internal server error");
    assert!(body["detail"].as_str().unwrap().contains("fail.jpg"));
}

#[tokio::test]
async fn preview_failure_returns_no_partial_list() {
    let engine = Arc::new(StubEngine::default());
    let request = upload_request(
        "/api/v1/process-preview",
        &[file("ok.jpg", b"a"), file("fail.jpg", b"b")],
    );
    let (status, _, body) = send(engine, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(&body).get("files").is_none());
}

#[tokio::test]
async fn too_many_files_are_rejected() {
    let engine = Arc::new(StubEngine::default());
    let request = upload_request(
        "/api/v1/process",
        &[
            file("1.jpg", b"1"),
            file("2.jpg", b"2"),
            file("3.jpg", b"3"),
            file("4.jpg", b"4"),
        ],
    );
    let (status, _, body) = send(engine.clone(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["error"], "Too many files");
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn oversized_file_is_rejected() {
    let engine = Arc::new(StubEngine::default());
    let big = vec![7u8; 2048];
    let request = upload_request("/api/v1/process", &[file("big.jpg", &big)]);
    let (status, _, body) = send(engine.clone(), request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    let body = json_body(&body);
    assert_eq!(body["error"], "File too large");
    assert!(body["detail"].as_str().unwrap().contains("1 KiB"));
    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
}
