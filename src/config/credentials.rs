// Service-account credential bootstrap.
//
// Runs once at startup and yields a `ServiceAccountKey` value that is handed to the
// sheets client. Nothing downstream reads credentials from the environment.

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

use super::SheetsConfig;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("Failed to read credentials file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed service account JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Service account JSON is missing {0}")]
    MissingField(&'static str),
}

/// The subset of a Google service-account key file needed for the JWT-bearer grant.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

// Keep the private key out of logs.
impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, CredentialsError> {
        let key: ServiceAccountKey = serde_json::from_str(raw)?;
        if key.client_email.trim().is_empty() {
            return Err(CredentialsError::MissingField("client_email"));
        }
        if key.private_key.trim().is_empty() {
            return Err(CredentialsError::MissingField("private_key"));
        }
        Ok(key)
    }
}

/// Resolve the service-account key: inline JSON first, then the key file.
pub fn bootstrap(sheets: &SheetsConfig) -> Result<ServiceAccountKey, CredentialsError> {
    if let Some(raw) = &sheets.credentials_json {
        tracing::info!("Using service account credentials from GOOGLE_SHEETS_CREDENTIALS");
        return ServiceAccountKey::from_json(raw);
    }

    let path = &sheets.credentials_path;
    let raw = std::fs::read_to_string(path).map_err(|source| CredentialsError::Read {
        path: path.clone(),
        source,
    })?;
    tracing::info!("Using service account credentials from {}", path.display());
    ServiceAccountKey::from_json(&raw)
}
