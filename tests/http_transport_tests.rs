// tests/http_transport_tests.rs
use bytes::Bytes;
use inspector::document::FileKind;
use inspector::errors::InspectError;
use inspector::models::{FailureKind, SubmissionOutcome, SubmissionRequest};
use inspector::transport::{HttpTransport, PhaseReporter, Transport};
use mockito::Matcher;
use pretty_assertions::assert_eq;
use reqwest::Client;

const ENDPOINT: &str = "/api/analyze";

fn transport(server: &mockito::ServerGuard) -> HttpTransport {
    HttpTransport::new(Client::new(), &server.url(), ENDPOINT)
}

fn request(name: &str) -> SubmissionRequest {
    SubmissionRequest::new(name, Bytes::from_static(b"import os\nos.system('whoami')\n"))
}

#[tokio::test]
async fn posts_one_multipart_field_with_filename_header() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", ENDPOINT)
        .match_header("accept", "application/json")
        .match_header("x-filename", "my%20script.py")
        .match_header("content-type", Matcher::Regex("^multipart/form-data".to_string()))
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="file"; filename="my script.py""#.to_string()),
            Matcher::Regex("os.system".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"fileType": "python", "detectionLabels": ["Trojan.Generic"],
                "urls": ["http://a.com"], "strings": ["hello"],
                "behaviorIndicators": ["Process injection"], "commands": ["os.system"]}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let doc = transport(&server)
        .send(request("my script.py"), PhaseReporter::detached())
        .await
        .unwrap();

    assert_eq!(doc.kind, FileKind::Script);
    assert_eq!(doc.detection_labels, vec!["Trojan.Generic".to_string()]);
    assert_eq!(doc.commands, vec!["os.system".to_string()]);
    mock.assert_async().await;
}

#[tokio::test]
async fn server_error_uses_json_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", ENDPOINT)
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message": "Analysis worker crashed"}"#)
        .create_async()
        .await;

    let err = transport(&server)
        .send(request("sample.py"), PhaseReporter::detached())
        .await
        .unwrap_err();

    assert!(matches!(err, InspectError::ApiError { status: 500, .. }));
    assert_eq!(
        SubmissionOutcome::from_error(err),
        SubmissionOutcome::Failure(
            FailureKind::ServerRejected,
            "Analysis worker crashed".to_string()
        )
    );
}

#[tokio::test]
async fn server_error_falls_back_to_plain_text() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", ENDPOINT)
        .with_status(502)
        .with_body("Bad gateway")
        .create_async()
        .await;

    let err = transport(&server)
        .send(request("sample.pyc"), PhaseReporter::detached())
        .await
        .unwrap_err();

    assert_eq!(
        SubmissionOutcome::from_error(err),
        SubmissionOutcome::Failure(FailureKind::ServerRejected, "Bad gateway".to_string())
    );
}

#[tokio::test]
async fn success_status_with_error_field_is_backend_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", ENDPOINT)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"fileType": "exe", "error": "scan engine unavailable"}"#)
        .create_async()
        .await;

    let err = transport(&server)
        .send(request("bad.exe"), PhaseReporter::detached())
        .await
        .unwrap_err();

    assert_eq!(
        SubmissionOutcome::from_error(err),
        SubmissionOutcome::Failure(
            FailureKind::BackendReportedError,
            "scan engine unavailable".to_string()
        )
    );
}

#[tokio::test]
async fn unparseable_success_body_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", ENDPOINT)
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let err = transport(&server)
        .send(request("sample.py"), PhaseReporter::detached())
        .await
        .unwrap_err();

    assert_eq!(FailureKind::classify(&err), FailureKind::Malformed);
}

#[tokio::test]
async fn missing_required_fields_are_malformed() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", ENDPOINT)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"fileType": "python"}"#)
        .create_async()
        .await;

    let err = transport(&server)
        .send(request("sample.py"), PhaseReporter::detached())
        .await
        .unwrap_err();

    assert_eq!(FailureKind::classify(&err), FailureKind::Malformed);
}

#[tokio::test]
async fn unreachable_service_is_a_network_failure() {
    let transport = HttpTransport::new(Client::new(), "http://127.0.0.1:1", ENDPOINT);
    let err = transport
        .send(request("sample.py"), PhaseReporter::detached())
        .await
        .unwrap_err();

    match SubmissionOutcome::from_error(err) {
        SubmissionOutcome::Failure(FailureKind::Network, message) => {
            assert!(message.starts_with("Connection failed"), "{message}");
        }
        other => panic!("expected a network failure, got {:?}", other),
    }
}
