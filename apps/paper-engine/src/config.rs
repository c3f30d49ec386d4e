//! Configuration module for the paper engine.
//!
//! Loads a YAML file, interpolates environment variables and validates every
//! section before the engine is built.
//!
//! # Usage
//!
//! ```rust,ignore
//! use paper_engine::config::load_config;
//!
//! // Load from default path (config/paper-engine.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("custom/engine.yaml"))?;
//!
//! println!("slippage: {}%", config.execution.slippage_percent);
//! ```

use std::collections::HashMap;
use std::time::Duration;

use chrono::{NaiveTime, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::session::MarketSession;
use crate::domain::stop_enforcement::SameTickPriority;
use crate::infrastructure::fees::{Brokerage, FeeRates, FeeSchedule};

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/paper-engine.yaml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Trading session.
    #[serde(default)]
    pub session: SessionConfig,
    /// Fill simulation.
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Fee schedule.
    #[serde(default)]
    pub fees: FeesConfig,
    /// Extra or overriding lot sizes keyed by underlying symbol.
    #[serde(default)]
    pub lots: HashMap<String, u32>,
    /// Monitoring and session clock.
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Snapshot persistence.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Prometheus metrics.
    #[serde(default)]
    pub metrics: MetricsSettings,
}

// ============================================
// Sections
// ============================================

/// Trading session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session open, local exchange time.
    #[serde(default = "default_open")]
    pub open: NaiveTime,
    /// Session close, local exchange time.
    #[serde(default = "default_close")]
    pub close: NaiveTime,
    /// Exchange offset from UTC in minutes.
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,
    /// Trading weekdays.
    #[serde(default = "default_trading_days")]
    pub trading_days: Vec<Weekday>,
    /// Reject DAY/IOC orders while the market is closed.
    #[serde(default = "default_true")]
    pub enforce_market_hours: bool,
    /// Accept AMO orders while the market is closed.
    #[serde(default = "default_true")]
    pub allow_amo: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            open: default_open(),
            close: default_close(),
            utc_offset_minutes: default_utc_offset(),
            trading_days: default_trading_days(),
            enforce_market_hours: true,
            allow_amo: true,
        }
    }
}

impl SessionConfig {
    /// Build the domain session.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the window, offset or days are invalid.
    pub fn to_session(&self) -> Result<MarketSession, ConfigError> {
        MarketSession::new(
            self.open,
            self.close,
            self.utc_offset_minutes,
            self.trading_days.clone(),
        )
        .map_err(|e| ConfigError::ValidationError(format!("session: {e}")))
    }
}

#[allow(clippy::expect_used)] // Constant time is always valid
fn default_open() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 15, 0).expect("valid open time")
}

#[allow(clippy::expect_used)] // Constant time is always valid
fn default_close() -> NaiveTime {
    NaiveTime::from_hms_opt(15, 30, 0).expect("valid close time")
}

const fn default_utc_offset() -> i32 {
    330
}

fn default_trading_days() -> Vec<Weekday> {
    vec![
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ]
}

const fn default_true() -> bool {
    true
}

/// Fill simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Adverse slippage in percent (0 to 5).
    #[serde(default = "default_slippage")]
    pub slippage_percent: Decimal,
    /// Use bid/ask for fills and mid for marks when quotes are present.
    #[serde(default = "default_true")]
    pub prefer_quotes: bool,
    /// Which level wins when stop-loss and target trigger on one tick.
    #[serde(default)]
    pub same_tick_priority: SameTickPriority,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            slippage_percent: default_slippage(),
            prefer_quotes: true,
            same_tick_priority: SameTickPriority::default(),
        }
    }
}

const fn default_slippage() -> Decimal {
    Decimal::from_parts(1, 0, 0, false, 1)
}

/// Fee configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeesConfig {
    /// Named schedule.
    #[serde(default)]
    pub schedule: FeeSchedule,
    /// Brokerage override.
    #[serde(default)]
    pub brokerage: Option<Brokerage>,
    /// STT override, percent of sell premium.
    #[serde(default)]
    pub stt_sell_percent: Option<Decimal>,
    /// Exchange charge override, percent of turnover.
    #[serde(default)]
    pub exchange_percent: Option<Decimal>,
    /// SEBI fee override, percent of turnover.
    #[serde(default)]
    pub sebi_percent: Option<Decimal>,
    /// Stamp duty override, percent of buy premium.
    #[serde(default)]
    pub stamp_buy_percent: Option<Decimal>,
    /// GST override, percent of brokerage plus exchange charges.
    #[serde(default)]
    pub gst_percent: Option<Decimal>,
}

impl FeesConfig {
    /// Schedule preset with overrides applied.
    #[must_use]
    pub fn to_rates(&self) -> FeeRates {
        let preset = FeeRates::preset(self.schedule);
        FeeRates {
            brokerage: self.brokerage.unwrap_or(preset.brokerage),
            stt_sell_percent: self.stt_sell_percent.unwrap_or(preset.stt_sell_percent),
            exchange_percent: self.exchange_percent.unwrap_or(preset.exchange_percent),
            sebi_percent: self.sebi_percent.unwrap_or(preset.sebi_percent),
            stamp_buy_percent: self.stamp_buy_percent.unwrap_or(preset.stamp_buy_percent),
            gst_percent: self.gst_percent.unwrap_or(preset.gst_percent),
        }
    }
}

/// Monitoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Consecutive priceless ticks before a data gap alert.
    #[serde(default = "default_gap_cycles")]
    pub data_gap_alert_cycles: u32,
    /// Wall-clock expiry check period in seconds. Zero disables the timer.
    #[serde(default = "default_expiry_check_interval")]
    pub expiry_check_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            data_gap_alert_cycles: default_gap_cycles(),
            expiry_check_interval_secs: default_expiry_check_interval(),
        }
    }
}

impl MonitorConfig {
    /// Expiry timer period, if enabled.
    #[must_use]
    pub const fn expiry_check_interval(&self) -> Option<Duration> {
        match self.expiry_check_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

const fn default_gap_cycles() -> u32 {
    5
}

const fn default_expiry_check_interval() -> u64 {
    60
}

/// Snapshot persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Write snapshots and restore on start.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Snapshot file path.
    #[serde(default = "default_snapshot_path")]
    pub path: String,
    /// Minimum milliseconds between snapshot writes. Zero writes after
    /// every state change.
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_snapshot_path(),
            snapshot_interval_ms: default_snapshot_interval(),
        }
    }
}

impl PersistenceConfig {
    /// Snapshot cadence, or `None` to write on every change.
    #[must_use]
    pub const fn snapshot_interval(&self) -> Option<Duration> {
        match self.snapshot_interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

const fn default_snapshot_interval() -> u64 {
    1000
}

fn default_snapshot_path() -> String {
    "./data/paper-engine.json".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: `json` or `pretty`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Returns true for JSON output.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Prometheus exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Install the exporter.
    #[serde(default)]
    pub enabled: bool,
    /// Listener address.
    #[serde(default = "default_metrics_addr")]
    pub listen_addr: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: default_metrics_addr(),
        }
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to [`DEFAULT_CONFIG_PATH`].
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = if interpolated.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml_bw::from_str(&interpolated)?
    };
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match cap.get(1).map(|m| std::env::var(m.as_str())) {
            Some(Ok(v)) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
///
/// # Errors
///
/// Returns `ValidationError` naming the first invalid field.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    config.session.to_session()?;

    let slippage = config.execution.slippage_percent;
    if slippage < Decimal::ZERO || slippage > Decimal::from(5) {
        return Err(ConfigError::ValidationError(
            "execution.slippage_percent must be between 0 and 5".to_string(),
        ));
    }

    if config.monitor.data_gap_alert_cycles == 0 {
        return Err(ConfigError::ValidationError(
            "monitor.data_gap_alert_cycles must be at least 1".to_string(),
        ));
    }

    let rates = config.fees.to_rates();
    let percents = [
        ("fees.stt_sell_percent", rates.stt_sell_percent),
        ("fees.exchange_percent", rates.exchange_percent),
        ("fees.sebi_percent", rates.sebi_percent),
        ("fees.stamp_buy_percent", rates.stamp_buy_percent),
        ("fees.gst_percent", rates.gst_percent),
    ];
    if let Some((field, _)) = percents.iter().find(|(_, rate)| rate.is_sign_negative()) {
        return Err(ConfigError::ValidationError(format!("{field} must not be negative")));
    }
    let brokerage_negative = match rates.brokerage {
        Brokerage::PerOrder { amount } => amount.is_sign_negative(),
        Brokerage::Percent { percent, cap } => {
            percent.is_sign_negative() || cap.is_some_and(|c| c.is_sign_negative())
        }
    };
    if brokerage_negative {
        return Err(ConfigError::ValidationError(
            "fees.brokerage must not be negative".to_string(),
        ));
    }

    if let Some(symbol) = config.lots.iter().find(|(_, lot)| **lot == 0).map(|(s, _)| s) {
        return Err(ConfigError::ValidationError(format!(
            "lots.{symbol} must be positive"
        )));
    }

    if config.persistence.enabled && config.persistence.path.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "persistence.path is required when persistence is enabled".to_string(),
        ));
    }

    let formats = ["json", "pretty"];
    if !formats.contains(&config.logging.format.to_lowercase().as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "logging.format must be one of: {formats:?}"
        )));
    }

    if config.metrics.enabled && config.metrics.listen_addr.parse::<std::net::SocketAddr>().is_err() {
        return Err(ConfigError::ValidationError(format!(
            "metrics.listen_addr '{}' is not a socket address",
            config.metrics.listen_addr
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session.utc_offset_minutes, 330);
        assert_eq!(config.execution.slippage_percent, dec!(0.1));
        assert_eq!(config.fees.schedule, FeeSchedule::AliceBlue);
        assert_eq!(config.monitor.data_gap_alert_cycles, 5);
        assert_eq!(
            config.monitor.expiry_check_interval(),
            Some(Duration::from_secs(60))
        );
        assert!(config.persistence.enabled);
        assert_eq!(
            config.persistence.snapshot_interval(),
            Some(Duration::from_secs(1))
        );
        assert!(!config.metrics.enabled);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_full_config() {
        let yaml = r#"
session:
  open: "09:15:00"
  close: "15:30:00"
  trading_days: [Mon, Tue, Wed, Thu, Fri]
  allow_amo: false
execution:
  slippage_percent: "0.25"
  prefer_quotes: false
  same_tick_priority: target_first
fees:
  schedule: ZERODHA
  brokerage:
    mode: percent
    percent: "0.03"
    cap: "20"
lots:
  TATAMOTORS: 1425
monitor:
  data_gap_alert_cycles: 3
  expiry_check_interval_secs: 0
persistence:
  enabled: false
  snapshot_interval_ms: 0
logging:
  level: debug
  format: json
"#;
        let config = match load_config_from_string(yaml) {
            Ok(c) => c,
            Err(e) => panic!("should load config: {e}"),
        };
        assert!(!config.session.allow_amo);
        assert_eq!(config.execution.slippage_percent, dec!(0.25));
        assert_eq!(config.execution.same_tick_priority, SameTickPriority::TargetFirst);
        assert_eq!(config.fees.schedule, FeeSchedule::Zerodha);
        assert!(matches!(config.fees.to_rates().brokerage, Brokerage::Percent { .. }));
        assert_eq!(config.lots.get("TATAMOTORS"), Some(&1425));
        assert_eq!(config.monitor.expiry_check_interval(), None);
        assert_eq!(config.persistence.snapshot_interval(), None);
        assert!(config.logging.is_json());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = load_config_from_string("").unwrap();
        assert!(config.session.enforce_market_hours);
    }

    #[test]
    fn test_env_var_with_default_when_missing() {
        let input = "level: ${PAPER_ENGINE_CONFIG_TEST_NONEXISTENT_VAR:-warn}";
        assert_eq!(interpolate_env_vars(input), "level: warn");
    }

    #[test]
    #[expect(clippy::literal_string_with_formatting_args)] // ${...} is env var syntax, not format args
    fn test_env_var_with_default_uses_existing() {
        let input = "path: ${PATH:-default}";
        let result = interpolate_env_vars(input);
        assert_ne!(result, "path: default");
        assert!(result.starts_with("path: "));
    }

    #[test]
    fn test_env_var_without_default_becomes_empty() {
        let input = "path: ${PAPER_ENGINE_CONFIG_TEST_UNLIKELY_TO_EXIST}";
        assert_eq!(interpolate_env_vars(input), "path: ");
    }

    #[test_case("session:\n  open: \"15:30:00\"\n  close: \"09:15:00\"", "session" ; "inverted session")]
    #[test_case("execution:\n  slippage_percent: \"7\"", "slippage_percent" ; "slippage too high")]
    #[test_case("monitor:\n  data_gap_alert_cycles: 0", "data_gap_alert_cycles" ; "zero gap cycles")]
    #[test_case("fees:\n  gst_percent: \"-1\"", "gst_percent" ; "negative gst")]
    #[test_case("lots:\n  NIFTY: 0", "lots.NIFTY" ; "zero lot")]
    #[test_case("logging:\n  format: xml", "logging.format" ; "unknown log format")]
    #[test_case("metrics:\n  enabled: true\n  listen_addr: nowhere", "listen_addr" ; "bad metrics address")]
    fn test_validation_errors(yaml: &str, field: &str) {
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected validation error for {field}");
        };
        assert!(err.to_string().contains(field), "{err}");
    }

    #[test]
    fn test_unknown_fee_schedule_fails_to_parse() {
        let result = load_config_from_string("fees:\n  schedule: ROBINHOOD");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
