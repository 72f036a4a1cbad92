use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub siblings: SiblingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    /// Optional YAML file replacing the built-in route access policy
    pub access_policy_file: Option<String>,
}

/// Where the other services live when this process mounts only one of them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiblingConfig {
    pub practitioner_url: String,
    pub facility_url: String,
    pub individual_url: String,
    pub timeout_ms: u64,
}

impl SiblingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("JWT secret must be at least {min} bytes outside development")]
    WeakJwtSecret { min: usize },

    #[error("Invalid URL for {name}: {reason}")]
    InvalidUrl { name: &'static str, reason: String },

    #[error("Sibling call timeout must be greater than zero")]
    ZeroTimeout,
}

const DEV_JWT_SECRET: &str = "development-secret-change-me";
const MIN_JWT_SECRET_LEN: usize = 32;

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(lookup)
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Server overrides
        if let Some(v) = lookup("CLINIC_API_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("CLINIC_API_PORT").or_else(|| lookup("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Some(v) = lookup("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Some(v) = lookup("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Some(v) = lookup("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Some(v) = lookup("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Some(v) = lookup("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }
        if let Some(v) = lookup("SECURITY_ACCESS_POLICY_FILE") {
            self.security.access_policy_file = Some(v);
        }

        // Sibling service overrides
        if let Some(v) = lookup("PRACTITIONER_SERVICE_URL") {
            self.siblings.practitioner_url = v;
        }
        if let Some(v) = lookup("FACILITY_SERVICE_URL") {
            self.siblings.facility_url = v;
        }
        if let Some(v) = lookup("INDIVIDUAL_SERVICE_URL") {
            self.siblings.individual_url = v;
        }
        if let Some(v) = lookup("SIBLING_TIMEOUT_MS") {
            self.siblings.timeout_ms = v.parse().unwrap_or(self.siblings.timeout_ms);
        }

        self
    }

    /// Reject settings the server must not start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.environment != Environment::Development
            && (self.security.jwt_secret.len() < MIN_JWT_SECRET_LEN || self.security.jwt_secret == DEV_JWT_SECRET)
        {
            return Err(ConfigError::WeakJwtSecret { min: MIN_JWT_SECRET_LEN });
        }

        for (name, raw) in [
            ("PRACTITIONER_SERVICE_URL", &self.siblings.practitioner_url),
            ("FACILITY_SERVICE_URL", &self.siblings.facility_url),
            ("INDIVIDUAL_SERVICE_URL", &self.siblings.individual_url),
        ] {
            url::Url::parse(raw).map_err(|e| ConfigError::InvalidUrl { name, reason: e.to_string() })?;
        }

        if self.siblings.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                access_policy_file: None,
            },
            siblings: SiblingConfig {
                practitioner_url: "http://localhost:3001".to_string(),
                facility_url: "http://localhost:3002".to_string(),
                individual_url: "http://localhost:3003".to_string(),
                timeout_ms: 5_000,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                access_policy_file: None,
            },
            siblings: SiblingConfig {
                practitioner_url: "http://practitioner-service:8080".to_string(),
                facility_url: "http://facility-service:8080".to_string(),
                individual_url: "http://individual-service:8080".to_string(),
                timeout_ms: 3_000,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                access_policy_file: None,
            },
            siblings: SiblingConfig {
                practitioner_url: "http://practitioner-service:8080".to_string(),
                facility_url: "http://facility-service:8080".to_string(),
                individual_url: "http://individual-service:8080".to_string(),
                timeout_ms: 2_000,
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}
