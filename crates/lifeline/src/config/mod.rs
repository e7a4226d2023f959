use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::workflows::registry::domain::Coordinates;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub datasets: DatasetConfig,
    pub outreach: OutreachConfig,
    /// `None` when SMS credentials are incomplete; messages are then only logged.
    pub messaging: Option<MessagingConfig>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let datasets = DatasetConfig {
            donors: path_var("APP_DONOR_DATASET", "data/donors.csv"),
            organs: path_var("APP_ORGAN_DATASET", "data/organs.csv"),
            hospitals: path_var("APP_HOSPITAL_DIRECTORY", "data/hospitals.csv"),
            likelihood_model: path_var("APP_LIKELIHOOD_MODEL", "data/likelihood_model.json"),
        };

        let outreach = OutreachConfig {
            top_n: parse_var("APP_OUTREACH_TOP_N", 5)?,
            attempt_timeout: Duration::from_secs(parse_var("APP_OUTREACH_TIMEOUT_SECS", 10)?),
            broadcast_concurrency: parse_var("APP_BROADCAST_CONCURRENCY", 5)?,
            cooldown_minutes: parse_var("APP_OUTREACH_COOLDOWN_MINUTES", 30)?,
            site: Coordinates::new(
                parse_var("APP_SITE_LAT", 19.0760)?,
                parse_var("APP_SITE_LON", 72.8777)?,
            ),
        };

        let messaging = match (
            non_empty_var("APP_SMS_ACCOUNT_SID"),
            non_empty_var("APP_SMS_AUTH_TOKEN"),
            non_empty_var("APP_SMS_FROM"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(MessagingConfig {
                account_sid,
                auth_token,
                from_number,
                base_url: non_empty_var("APP_SMS_BASE_URL")
                    .unwrap_or_else(|| "https://api.twilio.com".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            datasets,
            outreach,
            messaging,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn path_var(name: &str, default: &str) -> PathBuf {
    non_empty_var(name).map_or_else(|| PathBuf::from(default), PathBuf::from)
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Locations of the datasets and model artifact loaded at startup.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub donors: PathBuf,
    pub organs: PathBuf,
    pub hospitals: PathBuf,
    pub likelihood_model: PathBuf,
}

#[derive(Debug, Clone)]
pub struct OutreachConfig {
    pub top_n: usize,
    pub attempt_timeout: Duration,
    pub broadcast_concurrency: usize,
    pub cooldown_minutes: i64,
    /// Where shortage-triggered outreach is centred.
    pub site: Coordinates,
}

/// Credentials for the Twilio-compatible SMS provider.
#[derive(Clone)]
pub struct MessagingConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub base_url: String,
}

impl fmt::Debug for MessagingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagingConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_number", &self.from_number)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { name, value } => {
                write!(f, "{name} must be numeric (got '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
