//! Backend behaviour: fixture files and the HTTP client against a local
//! one-shot server

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use mircs_client::{
    ApiError, DataCache, FetchMode, HttpApi, InMemoryApi, Outcome, PersistenceApi,
    RecordingNotifier, Slot,
};
use mircs_core::DataSetId;
use serde_json::json;

// ============================================================================
// Test Helpers
// ============================================================================

/// A request as seen by the test server
struct Seen {
    request_line: String,
    authorization: Option<String>,
    body: String,
}

/// Serve exactly one request with `status` and `body`, returning what the
/// client sent.
fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<Seen>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        let mut authorization = None;
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            let (name, value) = line.split_once(':').unwrap();
            match name.to_ascii_lowercase().as_str() {
                "authorization" => authorization = Some(value.trim().to_string()),
                "content-length" => content_length = value.trim().parse().unwrap(),
                _ => {}
            }
        }
        let mut buf = vec![0; content_length];
        reader.read_exact(&mut buf).unwrap();

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
        .unwrap();
        stream.flush().unwrap();

        Seen {
            request_line: request_line.trim_end().to_string(),
            authorization,
            body: String::from_utf8(buf).unwrap(),
        }
    });
    (url, handle)
}

fn http(url: &str) -> HttpApi {
    HttpApi::new(url, Duration::from_secs(5))
}

// ============================================================================
// HTTP backend
// ============================================================================

#[test]
fn list_requests_carry_the_bearer_token() {
    let (url, server) = serve_once(200, r#"{"list":[{"_id":"d1","name":"People"}]}"#);
    let api = http(&url).with_token(Some("tok".to_string()));
    let sets = api.list_data_sets().unwrap();
    let seen = server.join().unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(seen.request_line, "GET /api/datasets HTTP/1.1");
    assert_eq!(seen.authorization.as_deref(), Some("Bearer tok"));
}

#[test]
fn missing_list_field_degrades_to_empty() {
    let (url, server) = serve_once(200, r#"{"items":[]}"#);
    let records = http(&url).data_set_records(&DataSetId::new("d1")).unwrap();
    let seen = server.join().unwrap();
    assert!(records.is_empty());
    assert_eq!(seen.request_line, "GET /api/datasets/d1/records HTTP/1.1");
}

#[test]
fn sign_in_stores_the_token() {
    let (url, server) = serve_once(
        200,
        r#"{"createdAt":null,"userId":"u1","email":"a@b.c","idToken":"jwt","expiresInMs":86400000}"#,
    );
    let api = http(&url);
    let session = api.sign_in("a@b.c", "pw").unwrap();
    let seen = server.join().unwrap();

    assert_eq!(session.id_token, "jwt");
    assert_eq!(api.token().as_deref(), Some("jwt"));
    assert_eq!(seen.request_line, "POST /auth/verify-password HTTP/1.1");
    let sent: serde_json::Value = serde_json::from_str(&seen.body).unwrap();
    assert_eq!(sent, json!({"email": "a@b.c", "password": "pw"}));
}

#[test]
fn sign_in_rejections_are_distinguished() {
    let (url, server) = serve_once(401, r#"{"message":"no user exists with email 'x@y.z'"}"#);
    let err = http(&url).sign_in("x@y.z", "pw").unwrap_err();
    server.join().unwrap();
    assert_eq!(
        err,
        ApiError::UnknownEmail {
            email: "x@y.z".to_string()
        }
    );

    let (url, server) = serve_once(401, r#"{"message":"wrong password"}"#);
    let err = http(&url).sign_in("a@b.c", "bad").unwrap_err();
    server.join().unwrap();
    assert_eq!(err, ApiError::WrongPassword);
    assert_eq!(err.user_notice(), "Sign in failed");
}

#[test]
fn server_errors_keep_status_and_message() {
    let (url, server) = serve_once(500, r#"{"error":"database unavailable"}"#);
    let err = http(&url).list_relationships().unwrap_err();
    server.join().unwrap();
    assert_eq!(
        err,
        ApiError::Status {
            code: 500,
            message: "database unavailable".to_string()
        }
    );
}

#[test]
fn delete_accepts_result_body() {
    let (url, server) = serve_once(200, r#"{"result":"deleted"}"#);
    http(&url).delete_data_set(&DataSetId::new("d1")).unwrap();
    let seen = server.join().unwrap();
    assert_eq!(seen.request_line, "DELETE /api/datasets/d1 HTTP/1.1");
}

// ============================================================================
// Fixture backend
// ============================================================================

#[test]
fn fixture_file_backs_the_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fixture.json");
    std::fs::write(
        &path,
        json!({
            "dataSets": [{"_id": "a", "name": "A"}],
            "records": {"a": [{"_id": 1, "Name": "Foo", "X": -63.5, "Y": 44.6}]}
        })
        .to_string(),
    )
    .unwrap();

    let api = Arc::new(InMemoryApi::from_file(&path).unwrap());
    let notifier = RecordingNotifier::new();
    let mut cache = DataCache::new(api, Arc::new(notifier.clone())).with_mode(FetchMode::Inline);

    cache.request_records(&DataSetId::new("a"));
    cache.request_records(&DataSetId::new("missing"));
    let events = cache.pump();

    assert_eq!(events[0].outcome, Outcome::Updated { len: 1 });
    assert_eq!(events[1].slot, Slot::Records(DataSetId::new("missing")));
    assert!(matches!(events[1].outcome, Outcome::Failed(ApiError::NotFound { .. })));
    assert_eq!(notifier.messages(), vec!["dataset not found: missing"]);
}

#[test]
fn unreadable_fixture_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.json");
    assert!(matches!(
        InMemoryApi::from_file(&path),
        Err(ApiError::Parse(_))
    ));
}
