//! Client for the SignMate document backend
//!
//! Authentication, storage and listing live on an external HTTP service.
//! This crate speaks to it with an explicitly configured bearer token;
//! nothing is read from ambient storage.

pub mod client;
pub mod config;
pub mod error;
pub mod models;

pub use client::BackendClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use models::{AuthSession, DocumentRecord, RecordId};
