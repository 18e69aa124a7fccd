use std::time::Duration;

use batchgate::application::backend::{BackendError, TransformEngine};
use batchgate::config::EngineSettings;
use batchgate::domain::uploads::UploadItem;
use batchgate::infra::engine::HttpTransformEngine;
use bytes::Bytes;
use httpmock::MockServer;
use url::Url;

fn engine(server: &MockServer, timeout: Duration) -> HttpTransformEngine {
    let settings = EngineSettings {
        base_url: Url::parse(&server.base_url()).expect("mock url"),
        timeout,
    };
    HttpTransformEngine::new(&settings).expect("engine client")
}

fn upload() -> UploadItem {
    UploadItem::new(
        "portrait.jpg",
        Some("image/jpeg".into()),
        Bytes::from_static(b"jpeg-bytes"),
    )
}

#[tokio::test]
async fn engine_metadata_is_used_when_present() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method("POST")
                .path("/process")
                .header_exists("content-type");
            then.status(200)
                .header("content-type", "image/png")
                .header("x-output-filename", "portrait_cutout.png")
                .body(b"png-bytes");
        })
        .await;

    let result = engine(&server, Duration::from_secs(5))
        .transform(&upload(), r#"{"shadow":{"enabled":true}}"#)
        .await
        .expect("transform");

    mock.assert_async().await;
    assert_eq!(result.payload, Bytes::from_static(b"png-bytes"));
    assert_eq!(result.media_type, "image/png");
    assert_eq!(result.filename, "portrait_cutout.png");
}

#[tokio::test]
async fn missing_metadata_falls_back_to_the_upload() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("POST").path("/process");
            then.status(200).body(b"raw");
        })
        .await;

    let result = engine(&server, Duration::from_secs(5))
        .transform(&upload(), "{}")
        .await
        .expect("transform");

    assert_eq!(result.filename, "portrait.jpg");
    assert_eq!(result.media_type, "image/jpeg");
}

#[tokio::test]
async fn error_status_carries_code_and_excerpt() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("POST").path("/process");
            then.status(422).body("orientation must be one of: lying, standing");
        })
        .await;

    let err = engine(&server, Duration::from_secs(5))
        .transform(&upload(), "{}")
        .await
        .unwrap_err();

    match err {
        BackendError::Status { status, excerpt } => {
            assert_eq!(status, 422);
            assert!(excerpt.starts_with("orientation must be"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn slow_engine_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("POST").path("/process");
            then.status(200)
                .delay(Duration::from_millis(1500))
                .body(b"late");
        })
        .await;

    let err = engine(&server, Duration::from_millis(200))
        .transform(&upload(), "{}")
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::Timeout { .. }), "{err:?}");
}

#[tokio::test]
async fn unreachable_engine_is_a_transport_error() {
    let settings = EngineSettings {
        base_url: Url::parse("http://127.0.0.1:9").expect("url"),
        timeout: Duration::from_secs(2),
    };
    let err = HttpTransformEngine::new(&settings)
        .expect("engine client")
        .transform(&upload(), "{}")
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            BackendError::Transport { .. } | BackendError::Timeout { .. }
        ),
        "{err:?}"
    );
}
