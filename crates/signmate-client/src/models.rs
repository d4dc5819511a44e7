//! Wire types for the document backend

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a stored document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

/// One entry of the "my documents" listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDocumentRecord")]
pub struct DocumentRecord {
    pub id: RecordId,
    pub filename: String,
}

/// Mongo-style backends send `_id`, sometimes next to a virtual `id`
#[derive(Deserialize)]
struct RawDocumentRecord {
    #[serde(rename = "_id")]
    mongo_id: Option<RecordId>,
    id: Option<RecordId>,
    filename: String,
}

impl TryFrom<RawDocumentRecord> for DocumentRecord {
    type Error = String;

    fn try_from(raw: RawDocumentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: pick_id(raw.mongo_id, raw.id)?,
            filename: raw.filename,
        })
    }
}

/// `_id` wins when both are present
fn pick_id(mongo_id: Option<RecordId>, id: Option<RecordId>) -> Result<RecordId, String> {
    mongo_id
        .or(id)
        .ok_or_else(|| "missing field `_id` or `id`".to_string())
}

/// Credentials returned by login/register
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub token: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AuthResponse {
    pub token: String,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AuthUser {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawUploadResponse")]
pub(crate) struct UploadResponse {
    pub id: RecordId,
}

#[derive(Deserialize)]
struct RawUploadResponse {
    #[serde(rename = "_id")]
    mongo_id: Option<RecordId>,
    id: Option<RecordId>,
}

impl TryFrom<RawUploadResponse> for UploadResponse {
    type Error = String;

    fn try_from(raw: RawUploadResponse) -> Result<Self, Self::Error> {
        Ok(Self {
            id: pick_id(raw.mongo_id, raw.id)?,
        })
    }
}

/// Error body the backend sends on failures, `{"message": ...}` and/or
/// `{"error": ...}`
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.message.or(self.error)
    }
}
