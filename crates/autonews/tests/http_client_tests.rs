//! `HttpTranslationApi` against a one-shot local HTTP responder.

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use autonews::api::{InboxQuery, StepRequest, TranslationApi};
use autonews::config::ApiConfig;
use autonews::{ApiError, HttpTranslationApi, RecordStatus};

/// Serves exactly one response and hands back the raw request it received.
async fn serve_once(status: &str, content_type: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {}\r\ncontent-type: {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    );

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        while !request_complete(&request) {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
        }
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        String::from_utf8_lossy(&request).to_string()
    });

    (format!("http://{}", addr), handle)
}

fn request_complete(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    buf.len() >= header_end + 4 + content_length
}

fn api(base_url: &str) -> HttpTranslationApi {
    HttpTranslationApi::new(&ApiConfig {
        base_url: base_url.to_string(),
        ..ApiConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_update_status_request() {
    let (base, server) = serve_once("200 OK", "application/json", r#"{"id": 7, "status": "processed"}"#).await;

    let response = api(&base)
        .update_status(7, RecordStatus::Processed)
        .await
        .unwrap();
    let request = server.await.unwrap();

    assert_eq!(response, json!({"id": 7, "status": "processed"}));
    assert!(request.starts_with("PATCH /autonews_api/v1/translations/inbox/7/status HTTP/1.1"));
    assert!(request.ends_with(r#"{"status":"processed"}"#));
}

#[tokio::test]
async fn test_step_request_body() {
    let (base, server) = serve_once("200 OK", "application/json", r#"{"body_prepared": "x"}"#).await;

    let request_body = StepRequest {
        inbox_id: 7,
        gpt_prompt_id: 1,
        reasoning_effort: Default::default(),
    };
    api(&base).prepare(&request_body).await.unwrap();
    let request = server.await.unwrap();

    assert!(request.starts_with("POST /autonews_api/v1/translations/prepare HTTP/1.1"));
    assert!(request.ends_with(r#"{"inbox_id":7,"gpt_prompt_id":1,"reasoning_effort":"medium"}"#));
}

#[tokio::test]
async fn test_error_status_carries_body() {
    let (base, server) = serve_once("502 Bad Gateway", "text/plain", "upstream model timed out").await;

    let result = api(&base).fetch_record(3).await;
    server.await.unwrap();

    match result {
        Err(ApiError::Status { status, body }) => {
            assert_eq!(status, 502);
            assert_eq!(body, "upstream model timed out");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_error_body_uses_reason() {
    let (base, server) = serve_once("404 Not Found", "application/json", "").await;

    let result = api(&base).fetch_record(3).await;
    server.await.unwrap();

    assert!(matches!(
        result,
        Err(ApiError::Status { status: 404, ref body }) if body == "Not Found"
    ));
}

#[tokio::test]
async fn test_plain_text_body_is_string_value() {
    let (base, server) = serve_once("200 OK", "text/plain", "queued").await;

    let response = api(&base)
        .send_report(&autonews::api::SlackReport {
            channel_id: "C1".to_string(),
            text: "done".to_string(),
        })
        .await
        .unwrap();
    let request = server.await.unwrap();

    assert_eq!(response, json!("queued"));
    assert!(request.starts_with("POST /autonews_api/v1/slack_reports HTTP/1.1"));
}

#[tokio::test]
async fn test_malformed_json_is_decode_error() {
    let (base, server) = serve_once("200 OK", "application/json", "{oops").await;

    let result = api(&base).primary(&StepRequest {
        inbox_id: 1,
        gpt_prompt_id: 2,
        reasoning_effort: Default::default(),
    })
    .await;
    server.await.unwrap();

    assert!(matches!(result, Err(ApiError::Decode { .. })));
}

#[tokio::test]
async fn test_list_inbox_query_and_decoding() {
    let body = json!({
        "records": [
            {"id": 2, "status": "ready_to_publish", "body_raw": "b", "payload_json": "[{\"language\": \"EN\"}]"},
            {"id": 1, "status": "new", "body_raw": "a", "payload_json": null}
        ],
        "total_pages": 3,
        "total_count": 41
    })
    .to_string();
    let (base, server) = serve_once("200 OK", "application/json; charset=utf-8", &body).await;

    let query = InboxQuery {
        page: 2,
        page_size: 100,
        ..InboxQuery::default()
    };
    let page = api(&base).list_inbox(&query).await.unwrap();
    let request = server.await.unwrap();

    assert!(request.starts_with(
        "GET /autonews_api/v1/translations/inbox?page=2&page_size=100&sort_by=id&sort_order=desc HTTP/1.1"
    ));
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.total_count, 41);
    assert_eq!(page.records[0].status, RecordStatus::ReadyToPublish);
    assert_eq!(page.records[0].payload_json[0].language(), Some("EN"));
    assert!(page.records[1].payload_json.is_empty());
}

#[tokio::test]
async fn test_fetch_record_with_backend_timestamps() {
    let body = r#"{"id": 9, "status": "new", "body_raw": null, "created_at": "2024-05-01T12:00:00.123456", "updated_at": null}"#;
    let (base, server) = serve_once("200 OK", "application/json", body).await;

    let record = api(&base).fetch_record(9).await.unwrap();
    let request = server.await.unwrap();

    assert!(request.starts_with("GET /autonews_api/v1/translations/inbox/9"));
    assert_eq!(record.id, 9);
    assert_eq!(record.body_raw, "");
    assert_eq!(
        record.created_at.map(|t| t.timestamp()),
        Some(1_714_564_800)
    );
    assert_eq!(record.updated_at, None);
}
