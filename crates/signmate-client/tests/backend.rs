//! Client tests against an in-process mock backend

use axum::{
    extract::{Multipart, Path},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use signmate_client::{BackendClient, ClientConfig, ClientError, DocumentRecord, RecordId};

const TOKEN: &str = "test-token";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN))
        .unwrap_or(false)
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] == "secret" {
        (
            StatusCode::OK,
            Json(json!({ "token": TOKEN, "user": { "email": body["email"] } })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid credentials" })),
        )
    }
}

async fn register(Json(body): Json<Value>) -> Json<Value> {
    assert!(body["name"].is_string());
    Json(json!({ "token": TOKEN, "user": { "email": body["email"] } }))
}

async fn upload(headers: HeaderMap, mut multipart: Multipart) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "No token" })));
    }
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() == Some("pdf") {
            let filename = field.file_name().map(str::to_string);
            let data = field.bytes().await.unwrap();
            if filename.as_deref() == Some("signed-document.pdf") && data.starts_with(b"%PDF") {
                // Mongoose with virtuals sends both keys
                return (StatusCode::CREATED, Json(json!({ "_id": "doc-1", "id": "doc-1" })));
            }
        }
    }
    (StatusCode::BAD_REQUEST, Json(json!({ "message": "No file" })))
}

async fn mine(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::FORBIDDEN, Json(json!({ "error": "Forbidden" })));
    }
    (
        StatusCode::OK,
        Json(json!([
            { "_id": "doc-1", "filename": "signed-document.pdf" },
            { "_id": "doc-2", "id": "doc-2", "filename": "lease.pdf" },
        ])),
    )
}

async fn download(headers: HeaderMap, Path(id): Path<String>) -> Result<Vec<u8>, StatusCode> {
    if !authorized(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    match id.as_str() {
        "doc-1" => Ok(b"%PDF-1.7 fake".to_vec()),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn spawn_backend() -> String {
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/documents/upload", post(upload))
        .route("/documents/mine", get(mine))
        .route("/documents/download/:id", get(download));
    let app = Router::new().nest("/api", api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api", addr)
}

fn client(base_url: &str, token: Option<&str>) -> BackendClient {
    let mut config = ClientConfig::new(base_url);
    if let Some(token) = token {
        config = config.with_token(token);
    }
    BackendClient::new(config).unwrap()
}

#[tokio::test]
async fn login_returns_token() {
    let base = spawn_backend().await;
    let session = client(&base, None)
        .login("jane@example.com", "secret")
        .await
        .unwrap();
    assert_eq!(session.token, TOKEN);
    assert_eq!(session.email, "jane@example.com");
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let base = spawn_backend().await;
    let err = client(&base, None)
        .login("jane@example.com", "nope")
        .await
        .unwrap_err();
    match err {
        ClientError::Unauthorized(msg) => assert_eq!(msg, "Invalid credentials"),
        other => panic!("expected Unauthorized, got {:?}", other),
    }
}

#[tokio::test]
async fn register_then_list_with_returned_token() {
    let base = spawn_backend().await;
    let anonymous = client(&base, None);
    let session = anonymous
        .register("Jane", "jane@example.com", "secret")
        .await
        .unwrap();

    let records = anonymous.with_token(session.token).unwrap().list().await.unwrap();
    assert_eq!(
        records,
        vec![
            DocumentRecord {
                id: RecordId::from("doc-1"),
                filename: "signed-document.pdf".into(),
            },
            DocumentRecord {
                id: RecordId::from("doc-2"),
                filename: "lease.pdf".into(),
            },
        ]
    );
}

#[tokio::test]
async fn upload_returns_record_id() {
    let base = spawn_backend().await;
    let id = client(&base, Some(TOKEN))
        .upload("signed-document.pdf", b"%PDF-1.7\n...".to_vec())
        .await
        .unwrap();
    assert_eq!(id, RecordId::from("doc-1"));
}

#[tokio::test]
async fn upload_with_bad_token_is_unauthorized() {
    let base = spawn_backend().await;
    let err = client(&base, Some("stale"))
        .upload("signed-document.pdf", b"%PDF-1.7".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized(_)), "got {:?}", err);
}

#[tokio::test]
async fn missing_token_fails_before_network() {
    // Nothing listens here; the call must fail on the token check alone
    let err = client("http://127.0.0.1:9/api", None).list().await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized(_)), "got {:?}", err);
}

#[tokio::test]
async fn forbidden_maps_to_unauthorized() {
    let base = spawn_backend().await;
    let err = client(&base, Some("stale")).list().await.unwrap_err();
    match err {
        ClientError::Unauthorized(msg) => assert_eq!(msg, "Forbidden"),
        other => panic!("expected Unauthorized, got {:?}", other),
    }
}

#[tokio::test]
async fn download_bytes_and_missing_document() {
    let base = spawn_backend().await;
    let api = client(&base, Some(TOKEN));

    let bytes = api.download(&RecordId::from("doc-1")).await.unwrap();
    assert_eq!(bytes, b"%PDF-1.7 fake".to_vec());

    let err = api.download(&RecordId::from("missing")).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)), "got {:?}", err);
}

#[tokio::test]
async fn download_id_stays_one_path_segment() {
    let base = spawn_backend().await;
    let api = client(&base, Some(TOKEN));

    // Unescaped, the `?` would turn this into a request for doc-1
    let err = api.download(&RecordId::from("doc-1?x=1")).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)), "got {:?}", err);

    let err = api.download(&RecordId::from("x/doc-1")).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)), "got {:?}", err);
}

#[tokio::test]
async fn dead_endpoint_is_transport_error() {
    // Grab a free port, then close it so the connection is refused
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{}/api", addr), Some(TOKEN))
        .upload("signed-document.pdf", b"%PDF-1.7".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)), "got {:?}", err);
}

#[tokio::test]
async fn invalid_config_rejected() {
    let err = BackendClient::new(ClientConfig::new("ftp://example.com")).unwrap_err();
    assert!(matches!(err, ClientError::InvalidConfig(_)));
}
