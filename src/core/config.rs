use std::env;

use thiserror::Error;

const DEFAULT_SHORTENER_URL: &str = "https://tinyurl.com/api-create.php";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:5173";

#[derive(Debug, Clone)]
pub struct Settings {
    app: AppSettings,
    backend: BackendSettings,
    shortener: ShortenerSettings,
    telemetry: TelemetrySettings,
}

/// Where shared exam links point; the student page lives under `/exam`.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub public_base_url: String,
}

/// Connection details for the external record store. `base_url` being absent
/// is a supported configuration: live exam lookups and result persistence are
/// then reported as unconfigured, preview exams still work.
#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub base_url: Option<String>,
    pub api_key: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct ShortenerSettings {
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    pub log_level: String,
    pub json: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("missing required value for {0}")]
    MissingValue(&'static str),
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let public_base_url = env_or_default("EXAMLINK_PUBLIC_BASE_URL", DEFAULT_PUBLIC_BASE_URL);

        let backend_base_url = env_optional("EXAMLINK_BACKEND_URL");
        let backend_api_key = env_or_default("EXAMLINK_BACKEND_API_KEY", "");
        let backend_timeout_seconds = parse_u64(
            "EXAMLINK_BACKEND_TIMEOUT_SECONDS",
            env_or_default("EXAMLINK_BACKEND_TIMEOUT_SECONDS", "30"),
        )?;

        let shortener_base_url = env_or_default("EXAMLINK_SHORTENER_URL", DEFAULT_SHORTENER_URL);
        let shortener_timeout_seconds = parse_u64(
            "EXAMLINK_SHORTENER_TIMEOUT_SECONDS",
            env_or_default("EXAMLINK_SHORTENER_TIMEOUT_SECONDS", "10"),
        )?;

        let log_level = env_or_default("EXAMLINK_LOG_LEVEL", "info");
        let json = env_optional("EXAMLINK_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            app: AppSettings { public_base_url },
            backend: BackendSettings {
                base_url: backend_base_url,
                api_key: backend_api_key,
                timeout_seconds: backend_timeout_seconds,
            },
            shortener: ShortenerSettings {
                base_url: shortener_base_url,
                timeout_seconds: shortener_timeout_seconds,
            },
            telemetry: TelemetrySettings { log_level, json },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub fn app(&self) -> &AppSettings {
        &self.app
    }

    pub fn backend(&self) -> &BackendSettings {
        &self.backend
    }

    pub fn shortener(&self) -> &ShortenerSettings {
        &self.shortener
    }

    pub fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base_url) = &self.backend.base_url {
            if !is_http_url(base_url) {
                return Err(ConfigError::InvalidValue {
                    field: "EXAMLINK_BACKEND_URL",
                    value: base_url.clone(),
                });
            }
            if self.backend.api_key.is_empty() {
                return Err(ConfigError::MissingValue("EXAMLINK_BACKEND_API_KEY"));
            }
        }

        if !is_http_url(&self.shortener.base_url) {
            return Err(ConfigError::InvalidValue {
                field: "EXAMLINK_SHORTENER_URL",
                value: self.shortener.base_url.clone(),
            });
        }

        if !is_http_url(&self.app.public_base_url) {
            return Err(ConfigError::InvalidValue {
                field: "EXAMLINK_PUBLIC_BASE_URL",
                value: self.app.public_base_url.clone(),
            });
        }

        if self.backend.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "EXAMLINK_BACKEND_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.shortener.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "EXAMLINK_SHORTENER_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }

        Ok(())
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
