pub mod credentials;

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

pub use credentials::{CredentialsError, ServiceAccountKey};

pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub sheets: SheetsConfig,
    pub webhook: WebhookConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    /// Tab to read and write. `None` means the first tab of the spreadsheet.
    pub tab: Option<String>,
    pub credentials_path: PathBuf,
    /// Inline service-account JSON; wins over `credentials_path` when present.
    #[serde(skip_serializing)]
    pub credentials_json: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the config from an arbitrary variable source. `from_env` is the
    /// process-environment flavour of this.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let spreadsheet_id = non_empty(lookup("GSHEET_ID")).ok_or(ConfigError::Missing("GSHEET_ID"))?;
        let webhook_url =
            non_empty(lookup("ZAPIER_WEBHOOK_URL")).ok_or(ConfigError::Missing("ZAPIER_WEBHOOK_URL"))?;
        url::Url::parse(&webhook_url).map_err(|_| ConfigError::Invalid {
            name: "ZAPIER_WEBHOOK_URL",
            value: webhook_url.clone(),
        })?;

        let sheets = SheetsConfig {
            spreadsheet_id,
            tab: non_empty(lookup("SHEET_TAB")),
            credentials_path: non_empty(lookup("CREDENTIALS_PATH"))
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("service_account.json")),
            credentials_json: non_empty(lookup("GOOGLE_SHEETS_CREDENTIALS")),
            api_base: non_empty(lookup("SHEETS_API_BASE"))
                .unwrap_or_else(|| DEFAULT_SHEETS_API_BASE.to_string()),
        };
        let webhook = WebhookConfig { url: webhook_url };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(sheets, webhook),
            Environment::Staging => Self::staging(sheets, webhook),
            Environment::Development => Self::development(sheets, webhook),
        }
        .with_overrides(&lookup)
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PORT") {
            self.server.port = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value: v.clone() })?;
        }
        if let Some(v) = non_empty(lookup("STATIC_DIR")) {
            self.server.static_dir = PathBuf::from(v);
        }

        if let Some(v) = lookup("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Some(v) = lookup("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }

        Ok(self)
    }

    fn development(sheets: SheetsConfig, webhook: WebhookConfig) -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig::default(),
            sheets,
            webhook,
            api: ApiConfig { enable_request_logging: true },
            security: SecurityConfig { enable_cors: true },
        }
    }

    fn staging(sheets: SheetsConfig, webhook: WebhookConfig) -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig::default(),
            sheets,
            webhook,
            api: ApiConfig { enable_request_logging: true },
            security: SecurityConfig { enable_cors: true },
        }
    }

    fn production(sheets: SheetsConfig, webhook: WebhookConfig) -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig::default(),
            sheets,
            webhook,
            api: ApiConfig { enable_request_logging: false },
            security: SecurityConfig { enable_cors: true },
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            static_dir: PathBuf::from("static"),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
