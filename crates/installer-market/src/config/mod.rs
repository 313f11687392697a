use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::marketplace::{EscalationPolicy, GradeMultiplierTable, GradingConfig, PricingConfig};

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
    pub market: MarketConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            market: MarketConfig::from_env()?,
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Pricing and grading options plus the scheduled regrade period.
#[derive(Debug, Clone, Default)]
pub struct MarketConfig {
    pub pricing: PricingConfig,
    pub grading: GradingConfig,
    pub regrade_interval_secs: u64,
}

impl MarketConfig {
    pub const DEFAULT_REGRADE_INTERVAL_SECS: u64 = 3_600;

    /// Reads `MARKET_*` variables over the built-in defaults. Escalation is
    /// only configured when `MARKET_ESCALATION_INTERVAL_SECS` is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut pricing = PricingConfig::default();
        if let Some(interval_seconds) = read_var::<i64>("MARKET_ESCALATION_INTERVAL_SECS")? {
            pricing.default_escalation = Some(EscalationPolicy {
                interval_seconds,
                increment_percent: read_var("MARKET_ESCALATION_INCREMENT_PERCENT")?
                    .unwrap_or(Decimal::from(5)),
                start_delay_seconds: read_var("MARKET_ESCALATION_START_DELAY_SECS")?
                    .unwrap_or(0),
            });
        }

        let defaults = GradeMultiplierTable::default();
        pricing.multipliers = GradeMultiplierTable {
            a: read_var("MARKET_MULTIPLIER_A")?.unwrap_or(defaults.a),
            b: read_var("MARKET_MULTIPLIER_B")?.unwrap_or(defaults.b),
            c: read_var("MARKET_MULTIPLIER_C")?.unwrap_or(defaults.c),
            d: read_var("MARKET_MULTIPLIER_D")?.unwrap_or(defaults.d),
        };

        let mut grading = GradingConfig::default();
        if let Some(minimum) = read_var("MARKET_GRADE_MIN_SAMPLE")? {
            grading.minimum_sample_size = minimum;
        }
        if let Some(days) = read_var("MARKET_RECENCY_WINDOW_DAYS")? {
            grading.recency_window_days = days;
        }
        if let Some(threshold) = read_var("MARKET_NEGATIVE_THRESHOLD")? {
            grading.negative_rating_threshold = threshold;
        }

        let regrade_interval_secs = read_var("MARKET_REGRADE_INTERVAL_SECS")?
            .unwrap_or(Self::DEFAULT_REGRADE_INTERVAL_SECS);

        let config = Self {
            pricing,
            grading,
            regrade_interval_secs,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pricing
            .validate()
            .map_err(|err| ConfigError::InvalidMarket(err.to_string()))?;
        self.grading
            .validate()
            .map_err(|err| ConfigError::InvalidMarket(err.to_string()))?;
        if self.regrade_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MARKET_REGRADE_INTERVAL_SECS",
            });
        }
        Ok(())
    }
}

fn read_var<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key }),
        Err(_) => Ok(None),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { key: &'static str },
    InvalidMarket(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { key } => write!(f, "{key} has an unparseable value"),
            ConfigError::InvalidMarket(reason) => {
                write!(f, "market configuration rejected: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidValue { .. }
            | ConfigError::InvalidMarket(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::GradeTier;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    const MARKET_KEYS: [&str; 11] = [
        "MARKET_ESCALATION_INTERVAL_SECS",
        "MARKET_ESCALATION_INCREMENT_PERCENT",
        "MARKET_ESCALATION_START_DELAY_SECS",
        "MARKET_MULTIPLIER_A",
        "MARKET_MULTIPLIER_B",
        "MARKET_MULTIPLIER_C",
        "MARKET_MULTIPLIER_D",
        "MARKET_GRADE_MIN_SAMPLE",
        "MARKET_RECENCY_WINDOW_DAYS",
        "MARKET_NEGATIVE_THRESHOLD",
        "MARKET_REGRADE_INTERVAL_SECS",
    ];

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        for key in MARKET_KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.market.pricing.default_escalation.is_none());
        assert_eq!(config.market.grading.minimum_sample_size, 5);
        assert_eq!(
            config.market.regrade_interval_secs,
            MarketConfig::DEFAULT_REGRADE_INTERVAL_SECS
        );
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn market_overrides_are_read_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MARKET_ESCALATION_INTERVAL_SECS", "1800");
        env::set_var("MARKET_ESCALATION_INCREMENT_PERCENT", "2.5");
        env::set_var("MARKET_MULTIPLIER_C", "0.85");
        env::set_var("MARKET_RECENCY_WINDOW_DAYS", "30");

        let market = MarketConfig::from_env().expect("market config loads");
        let policy = market
            .pricing
            .default_escalation
            .expect("escalation configured");
        assert_eq!(policy.interval_seconds, 1_800);
        assert_eq!(policy.increment_percent, Decimal::new(25, 1));
        assert_eq!(policy.start_delay_seconds, 0);
        assert_eq!(
            market.pricing.multipliers.get(GradeTier::C),
            Decimal::new(85, 2)
        );
        assert_eq!(market.grading.recency_window_days, 30);
        reset_env();
    }

    #[test]
    fn rejects_unparseable_and_inconsistent_values() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MARKET_GRADE_MIN_SAMPLE", "five");
        assert!(matches!(
            MarketConfig::from_env(),
            Err(ConfigError::InvalidValue {
                key: "MARKET_GRADE_MIN_SAMPLE"
            })
        ));

        reset_env();
        env::set_var("MARKET_MULTIPLIER_A", "1.2");
        assert!(matches!(
            MarketConfig::from_env(),
            Err(ConfigError::InvalidMarket(_))
        ));
        reset_env();
    }
}
