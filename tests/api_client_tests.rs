use std::sync::Arc;
use std::time::Duration;

use jobwatch::api::ApiClient;
use jobwatch::auth::{SessionToken, StaticToken, TokenProvider};
use jobwatch::error::ClientError;
use jobwatch::jobs::{JobMonitor, MonitorOptions};
use jobwatch::models::{ConnectedAccount, RegisterRequest};
use reqwest::StatusCode;
use serde_json::json;
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, body_string_contains, header, method, path, query_param},
};

fn client_for(server: &MockServer, token: Option<&str>) -> ApiClient {
    let tokens: Arc<dyn TokenProvider> = Arc::new(StaticToken::new(token.map(str::to_string)));
    ApiClient::new(
        Url::parse(&server.uri()).unwrap(),
        tokens,
        Duration::from_secs(5),
    )
    .unwrap()
}

fn jobs_body() -> serde_json::Value {
    json!([
        {"id": 1, "job_type": "run_email_fetch", "status": "SUCCESS", "triggered_by": "CRON",
         "created_at": "2024-01-01T10:00:00", "started_at": "2024-01-01T10:00:01",
         "finished_at": "2024-01-01T10:00:09", "output_payload": {"fetched": 3}},
        {"id": 2, "job_type": "run_email_extraction", "status": "FAILED", "triggered_by": "MANUAL",
         "created_at": "2024-01-02T10:00:00+00:00", "started_at": "2024-01-02T10:00:01+00:00",
         "finished_at": "2024-01-02T10:00:02+00:00",
         "input_payload": {"connected_account_id": "7"},
         "error_payload": {"message": "Token expired"}, "retry_count": 1}
    ])
}

#[tokio::test]
async fn list_jobs_sends_bearer_token_and_decodes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/jobs/"))
        .and(header("authorization", "Bearer token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jobs_body()))
        .expect(1)
        .mount(&server)
        .await;

    let jobs = client_for(&server, Some("token-123")).list_jobs().await.unwrap();

    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].triggered_by.as_deref(), Some("CRON"));
    assert_eq!(jobs[0].duration().map(|d| d.num_seconds()), Some(8));
    assert_eq!(jobs[1].account_id(), Some(7));
    assert_eq!(jobs[1].retry_count, 1);
    assert!(jobs[1].error_text().unwrap().contains("Token expired"));
}

#[tokio::test]
async fn jobs_limit_is_sent_as_query_parameter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/jobs/"))
        .and(query_param("limit", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let jobs = client_for(&server, None)
        .with_jobs_limit(Some(25))
        .list_jobs()
        .await
        .unwrap();
    assert!(jobs.is_empty());
}

#[tokio::test]
async fn requests_without_token_are_unauthenticated() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/emails/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    client_for(&server, None).list_emails().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn session_token_is_attached_once_established() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/jobs/"))
        .and(header("authorization", "Bearer from-login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let session = SessionToken::new();
    let client = ApiClient::new(
        Url::parse(&server.uri()).unwrap(),
        session.clone(),
        Duration::from_secs(5),
    )
    .unwrap();

    session.establish("from-login");
    client.list_jobs().await.unwrap();
}

#[tokio::test]
async fn malformed_body_is_reported_as_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/jobs/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;

    let err = client_for(&server, None).list_jobs().await.unwrap_err();
    match err {
        ClientError::Malformed { endpoint, .. } => assert_eq!(endpoint, "api/v1/jobs/"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn non_success_status_carries_server_detail() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/jobs/"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"detail": "Not authenticated"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server, Some("expired")).list_jobs().await.unwrap_err();
    assert!(err.is_unauthorized());
    match err {
        ClientError::Status { status, detail } => {
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(detail, "Not authenticated");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn get_job_and_sync() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/jobs/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jobs_body()[1].clone()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/jobs/sync"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({"status": "accepted"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Some("t"));
    let job = client.get_job(2).await.unwrap();
    assert_eq!(job.status, "FAILED");

    client.sync_jobs().await.unwrap();
}

#[tokio::test]
async fn base_url_path_prefix_is_preserved() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/dashboard/api/v1/jobs/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(
        Url::parse(&format!("{}/dashboard", server.uri())).unwrap(),
        Arc::new(StaticToken::default()),
        Duration::from_secs(5),
    )
    .unwrap();
    client.list_jobs().await.unwrap();
}

#[tokio::test]
async fn login_posts_form_without_bearer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("username=alice"))
        .and(body_string_contains("password=s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "jwt-abc",
            "refresh_token": "refresh-abc",
            "token_type": "bearer",
            "user": {"id": 4, "username": "alice", "primary_email": "alice@example.com",
                     "role": {"id": 1, "name": "user"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server, Some("stale"))
        .login("alice", "s3cret")
        .await
        .unwrap();
    assert_eq!(response.access_token, "jwt-abc");
    assert_eq!(response.user.unwrap().username, "alice");

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn failed_login_maps_to_status_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "Incorrect username or password"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server, None).login("alice", "wrong").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(err.notice_message(), "Incorrect username or password");
}

#[tokio::test]
async fn register_posts_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .and(body_json(json!({
            "username": "bob",
            "primary_email": "bob@example.com",
            "password": "pw"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 9, "username": "bob", "primary_email": "bob@example.com", "is_active": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let user = client_for(&server, None)
        .register(&RegisterRequest {
            name: None,
            username: "bob".to_string(),
            primary_email: "bob@example.com".to_string(),
            password: "pw".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(user.id, 9);
}

#[tokio::test]
async fn account_lifecycle_endpoints() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/connected-accounts/"))
        .and(body_json(json!({"provider": "gmail", "email": "me@example.com"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 3, "provider": "gmail", "email": "me@example.com", "is_active": true,
            "token_expiry": null
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/connected-accounts/3/authorize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "authorization_url": "https://accounts.google.com/o/oauth2/auth?state=x"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/connected-accounts/3/fetch"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"fetched": 10})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/connected-accounts/3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Some("t"));
    let account = client.create_account(" Gmail ", "me@example.com").await.unwrap();
    assert!(!account.is_authorized());

    let link = client.authorize_account(&account).await.unwrap();
    assert!(link.authorization_url.starts_with("https://accounts.google.com"));

    let imported = client
        .import_account(account.id, jobwatch::api::accounts::DEFAULT_IMPORT_LIMIT)
        .await
        .unwrap();
    assert_eq!(imported["fetched"], 10);

    client.delete_account(account.id).await.unwrap();
}

#[tokio::test]
async fn authorize_non_oauth_provider_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let account: ConnectedAccount = serde_json::from_value(json!({
        "id": 5, "provider": "outlook", "email": "me@example.com"
    }))
    .unwrap();

    let err = client_for(&server, Some("t"))
        .authorize_account(&account)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Unsupported { .. }));
    assert_eq!(err.notice_message(), "OUTLOOK integration is coming soon.");
}

#[tokio::test]
async fn monitor_over_http_applies_first_poll() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/jobs/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jobs_body()))
        .mount(&server)
        .await;

    let client = Arc::new(client_for(&server, Some("t")));
    let monitor = JobMonitor::mount(
        client,
        MonitorOptions {
            interval: Duration::from_secs(60),
            ..MonitorOptions::default()
        },
    );

    let mut updates = monitor.subscribe();
    tokio::time::timeout(Duration::from_secs(5), async {
        while monitor.snapshot().generation == 0 {
            updates.changed().await.unwrap();
        }
    })
    .await
    .expect("first poll applied in time");

    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.total, 2);
    assert_eq!(snapshot.generation, 1);
    assert_eq!(
        snapshot.display.iter().map(|j| j.id).collect::<Vec<_>>(),
        vec![2, 1]
    );
    assert_eq!(snapshot.stats.failed, 1);

    monitor.unmount().await;
}
