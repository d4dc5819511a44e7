//! HTTP client for the auth and document endpoints

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::models::{
    AuthResponse, AuthSession, DocumentRecord, ErrorBody, LoginRequest, RecordId, RegisterRequest,
    UploadResponse,
};
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info};

/// Client for the SignMate backend.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct BackendClient {
    config: ClientConfig,
    http: Client,
}

impl BackendClient {
    /// Creates a new client
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the base URL, timeout or token is unusable,
    /// or the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::InvalidConfig(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Same client with a different bearer token, e.g. after login
    pub fn with_token(&self, token: impl Into<String>) -> Result<Self> {
        let config = self.config.clone().with_token(token);
        config.validate()?;
        Ok(Self {
            config,
            http: self.http.clone(),
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let request = self
            .http
            .post(self.config.endpoint("auth/login"))
            .json(&LoginRequest { email, password });
        let body: AuthResponse = send(request).await?.json().await?;
        info!(email = %body.user.email, "logged in");
        Ok(AuthSession {
            token: body.token,
            email: body.user.email,
        })
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthSession> {
        let request = self
            .http
            .post(self.config.endpoint("auth/register"))
            .json(&RegisterRequest {
                name,
                email,
                password,
            });
        let body: AuthResponse = send(request).await?.json().await?;
        info!(email = %body.user.email, "registered");
        Ok(AuthSession {
            token: body.token,
            email: body.user.email,
        })
    }

    /// Upload a signed PDF. Returns the backend's record id.
    pub async fn upload(&self, filename: &str, pdf: Vec<u8>) -> Result<RecordId> {
        let token = self.token()?;
        let size = pdf.len();
        let part = multipart::Part::bytes(pdf)
            .file_name(filename.to_string())
            .mime_str("application/pdf")?;
        let form = multipart::Form::new().part("pdf", part);

        let request = self
            .http
            .post(self.config.endpoint("documents/upload"))
            .bearer_auth(token)
            .multipart(form);
        let body: UploadResponse = send(request).await?.json().await?;
        info!(id = %body.id, filename, bytes = size, "uploaded document");
        Ok(body.id)
    }

    /// Documents owned by the current user
    pub async fn list(&self) -> Result<Vec<DocumentRecord>> {
        let token = self.token()?;
        let request = self
            .http
            .get(self.config.endpoint("documents/mine"))
            .bearer_auth(token);
        let records: Vec<DocumentRecord> = send(request).await?.json().await?;
        debug!(count = records.len(), "listed documents");
        Ok(records)
    }

    /// Raw bytes of a stored document
    pub async fn download(&self, id: &RecordId) -> Result<Vec<u8>> {
        let token = self.token()?;
        let request = self
            .http
            .get(self.config.endpoint_with("documents/download", &id.0)?)
            .bearer_auth(token);
        let bytes = send(request).await?.bytes().await?;
        debug!(%id, bytes = bytes.len(), "downloaded document");
        Ok(bytes.to_vec())
    }

    fn token(&self) -> Result<&str> {
        self.config
            .token
            .as_deref()
            .ok_or_else(|| ClientError::Unauthorized("no bearer token configured; log in first".into()))
    }
}

/// Send once (no retries) and turn non-2xx statuses into errors.
async fn send(request: RequestBuilder) -> Result<Response> {
    let response = request.send().await.map_err(|e| {
        ClientError::Transport(format!("request failed: {}", e))
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or(text);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ClientError::Unauthorized(
            if message.is_empty() {
                status.to_string()
            } else {
                message
            },
        )),
        _ => Err(ClientError::Transport(format!("HTTP {}: {}", status, message))),
    }
}
