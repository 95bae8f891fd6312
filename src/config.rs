use std::env;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub event_buffer_size: usize,
    pub routing_provider_url: Option<String>,
    pub routing_api_key: Option<String>,
    pub routing_profile: String,
    pub routing_timeout: Duration,
    pub routing_concurrency: usize,
    pub candidate_radius_km: Option<f64>,
    pub legal_service_url: Option<String>,
    pub finance_service_url: Option<String>,
    pub collaborator_timeout: Duration,
    pub default_base_price: f64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") | Err(_) => LogFormat::Compact,
            Ok(other) => {
                return Err(AppError::Internal(format!(
                    "invalid LOG_FORMAT: {other}, expected compact/json"
                )));
            }
        };

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            routing_provider_url: non_empty("ROUTING_PROVIDER_URL"),
            routing_api_key: non_empty("ROUTING_API_KEY"),
            routing_profile: env::var("ROUTING_PROFILE")
                .unwrap_or_else(|_| "driving-hgv".to_string()),
            routing_timeout: Duration::from_millis(parse_or_default("ROUTING_TIMEOUT_MS", 2000)?),
            routing_concurrency: parse_or_default("ROUTING_CONCURRENCY", 8)?,
            candidate_radius_km: parse_optional("CANDIDATE_RADIUS_KM")?,
            legal_service_url: non_empty("LEGAL_SERVICE_URL"),
            finance_service_url: non_empty("FINANCE_SERVICE_URL"),
            collaborator_timeout: Duration::from_millis(parse_or_default(
                "COLLABORATOR_TIMEOUT_MS",
                5000,
            )?),
            default_base_price: parse_or_default("DEFAULT_BASE_PRICE", 50.0)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            event_buffer_size: 1024,
            routing_provider_url: None,
            routing_api_key: None,
            routing_profile: "driving-hgv".to_string(),
            routing_timeout: Duration::from_millis(2000),
            routing_concurrency: 8,
            candidate_radius_km: None,
            legal_service_url: None,
            finance_service_url: None,
            collaborator_timeout: Duration::from_millis(5000),
            default_base_price: 50.0,
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_optional(key)?.unwrap_or(default))
}

fn parse_optional<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        None => Ok(None),
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}
