use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_SERVICE_NAME: &str = "ArdaCredit Backend Prototype";
pub const DEFAULT_AUDIT_TOPIC: &str = "credit-applications";
pub const DEFAULT_AUDIT_BROKER: &str = "localhost:9092";

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
    pub service_name: String,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub audit: AuditConfig,
    pub scoring: ScoringConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );
        let service_name =
            env::var("APP_SERVICE_NAME").unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());

        let host = env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            service_name,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            audit: AuditConfig::from_env()?,
            scoring: ScoringConfig::from_env()?,
        })
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Broker, topic and dispatcher sizing for the audit trail.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub brokers: Vec<String>,
    pub topic: String,
    pub publish_timeout: Duration,
    pub queue_capacity: usize,
    pub workers: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            brokers: vec![DEFAULT_AUDIT_BROKER.to_string()],
            topic: DEFAULT_AUDIT_TOPIC.to_string(),
            publish_timeout: Duration::from_secs(5),
            queue_capacity: 1024,
            workers: 4,
        }
    }
}

impl AuditConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let brokers = match env::var("AUDIT_BROKERS") {
            Ok(raw) => {
                let brokers: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|broker| !broker.is_empty())
                    .map(str::to_string)
                    .collect();
                if brokers.is_empty() {
                    return Err(ConfigError::MissingBrokers);
                }
                brokers
            }
            Err(_) => defaults.brokers,
        };

        let topic = env::var("AUDIT_TOPIC").unwrap_or(defaults.topic);
        let publish_timeout = match env::var("AUDIT_PUBLISH_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(parse_positive("AUDIT_PUBLISH_TIMEOUT_SECS", &raw)?),
            Err(_) => defaults.publish_timeout,
        };
        let queue_capacity = match env::var("AUDIT_QUEUE_CAPACITY") {
            Ok(raw) => parse_positive("AUDIT_QUEUE_CAPACITY", &raw)? as usize,
            Err(_) => defaults.queue_capacity,
        };
        let workers = match env::var("AUDIT_WORKERS") {
            Ok(raw) => parse_positive("AUDIT_WORKERS", &raw)? as usize,
            Err(_) => defaults.workers,
        };

        Ok(Self {
            brokers,
            topic,
            publish_timeout,
            queue_capacity,
            workers,
        })
    }
}

/// Randomness controls for the scoring engine.
#[derive(Debug, Clone, Default)]
pub struct ScoringConfig {
    pub seed: Option<u64>,
}

impl ScoringConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let seed = match env::var("SCORING_SEED") {
            Ok(raw) => Some(raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
                key: "SCORING_SEED",
                value: raw.clone(),
            })?),
            Err(_) => None,
        };
        Ok(Self { seed })
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidNumber {
            key,
            value: raw.to_string(),
        }),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
    MissingBrokers,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a positive integer (found '{value}')")
            }
            ConfigError::MissingBrokers => {
                write!(f, "AUDIT_BROKERS must list at least one host:port")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::MissingBrokers => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_SERVICE_NAME",
            "AUDIT_BROKERS",
            "AUDIT_TOPIC",
            "AUDIT_PUBLISH_TIMEOUT_SECS",
            "AUDIT_QUEUE_CAPACITY",
            "AUDIT_WORKERS",
            "SCORING_SEED",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.service_name, DEFAULT_SERVICE_NAME);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.audit.brokers, vec!["localhost:9092".to_string()]);
        assert_eq!(config.audit.topic, "credit-applications");
        assert_eq!(config.audit.publish_timeout, Duration::from_secs(5));
        assert!(config.scoring.seed.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 8080));
        reset_env();
    }

    #[test]
    fn audit_settings_come_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("AUDIT_BROKERS", "kafka-1:9092, kafka-2:9092,");
        env::set_var("AUDIT_TOPIC", "credit-audit");
        env::set_var("AUDIT_WORKERS", "2");
        env::set_var("SCORING_SEED", "42");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.audit.brokers,
            vec!["kafka-1:9092".to_string(), "kafka-2:9092".to_string()]
        );
        assert_eq!(config.audit.topic, "credit-audit");
        assert_eq!(config.audit.workers, 2);
        assert_eq!(config.scoring.seed, Some(42));
        reset_env();
    }

    #[test]
    fn rejects_zero_queue_capacity() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("AUDIT_QUEUE_CAPACITY", "0");
        let err = AppConfig::load().expect_err("zero capacity rejected");
        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                key: "AUDIT_QUEUE_CAPACITY",
                ..
            }
        ));
        reset_env();
    }
}
