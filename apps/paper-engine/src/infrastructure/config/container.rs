//! Dependency Injection Container
//!
//! Builds the engine's ports, settings and optional store from a loaded
//! [`Config`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    EventPublisherPort, FeeModel, InstrumentLookup, LotValidator, PricePolicy, QuoteFirstPolicy,
    StateStore,
};
use crate::application::services::{
    EngineLoop, EngineLoopConfig, EnginePorts, EngineSettings, ExecutionEngine,
};
use crate::config::{Config, ConfigError};
use crate::domain::order_execution::SlippageModel;
use crate::infrastructure::events::LogEventPublisher;
use crate::infrastructure::fees::ScheduleFeeModel;
use crate::infrastructure::instruments::InMemoryInstrumentRegistry;
use crate::infrastructure::lots::StaticLotTable;
use crate::infrastructure::persistence::JsonFileStateStore;

/// Dependency injection container.
///
/// Holds all wired dependencies. Ports are shared, so engines built from the
/// same container see the same instrument registry.
#[derive(Clone)]
pub struct Container {
    settings: EngineSettings,
    ports: EnginePorts,
    loop_config: EngineLoopConfig,
    store: Option<Arc<dyn StateStore>>,
    publisher: Arc<dyn EventPublisherPort>,
}

impl Container {
    /// Wire everything from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the session or slippage are invalid.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let session = config.session.to_session()?;
        let slippage = SlippageModel::new(config.execution.slippage_percent)
            .map_err(|e| ConfigError::ValidationError(format!("execution: {e}")))?;

        let settings = EngineSettings {
            session,
            enforce_market_hours: config.session.enforce_market_hours,
            allow_amo: config.session.allow_amo,
            slippage,
            same_tick_priority: config.execution.same_tick_priority,
            data_gap_alert_cycles: config.monitor.data_gap_alert_cycles,
        };

        let fees: Arc<dyn FeeModel> = Arc::new(ScheduleFeeModel::new(config.fees.to_rates()));
        let lots: Arc<dyn LotValidator> =
            Arc::new(StaticLotTable::new().with_overrides(&config.lots));
        let instruments: Arc<dyn InstrumentLookup> = Arc::new(InMemoryInstrumentRegistry::new());
        let prices: Arc<dyn PricePolicy> =
            Arc::new(QuoteFirstPolicy::new(config.execution.prefer_quotes));

        let store = config.persistence.enabled.then(|| {
            Arc::new(JsonFileStateStore::new(config.persistence.path.clone())) as Arc<dyn StateStore>
        });

        let loop_config = EngineLoopConfig {
            clock_interval: config.monitor.expiry_check_interval(),
            snapshot_interval: config.persistence.snapshot_interval(),
            ..EngineLoopConfig::default()
        };

        tracing::debug!(
            schedule = ?config.fees.schedule,
            slippage = %config.execution.slippage_percent,
            persistence = config.persistence.enabled,
            "Container wired"
        );

        Ok(Self {
            settings,
            ports: EnginePorts {
                fees,
                lots,
                instruments,
                prices,
            },
            loop_config,
            store,
            publisher: Arc::new(LogEventPublisher),
        })
    }

    /// Replace the event publisher.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisherPort>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Loop configuration derived from the config file.
    #[must_use]
    pub const fn loop_config(&self) -> &EngineLoopConfig {
        &self.loop_config
    }

    /// Replace the loop configuration.
    #[must_use]
    pub fn with_loop_config(mut self, loop_config: EngineLoopConfig) -> Self {
        self.loop_config = loop_config;
        self
    }

    /// Engine settings.
    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Engine ports.
    #[must_use]
    pub const fn ports(&self) -> &EnginePorts {
        &self.ports
    }

    /// Snapshot store, when persistence is enabled.
    #[must_use]
    pub fn store(&self) -> Option<Arc<dyn StateStore>> {
        self.store.clone()
    }

    /// Event publisher.
    #[must_use]
    pub fn event_publisher(&self) -> Arc<dyn EventPublisherPort> {
        Arc::clone(&self.publisher)
    }

    /// Build a fresh engine.
    #[must_use]
    pub fn engine(&self) -> ExecutionEngine {
        ExecutionEngine::new(self.settings.clone(), self.ports.clone())
    }

    /// Build an event loop around a fresh engine, with the store and publisher attached.
    #[must_use]
    pub fn engine_loop(&self, shutdown: CancellationToken) -> EngineLoop {
        let engine_loop = EngineLoop::new(self.engine(), self.loop_config.clone(), shutdown)
            .with_publisher(self.event_publisher());
        match self.store() {
            Some(store) => engine_loop.with_store(store),
            None => engine_loop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_string;
    use crate::domain::instrument::{Instrument, InstrumentSpec, OptionKind};
    use crate::domain::order_execution::OrderSide;
    use crate::domain::shared::{InstrumentToken, Money, Quantity};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn wires_from_defaults() {
        let config = load_config_from_string("persistence:\n  enabled: false").unwrap();
        let container = Container::from_config(&config).unwrap();

        assert!(container.store().is_none());
        assert!(container.settings().enforce_market_hours);
        assert_eq!(container.settings().slippage.percent(), dec!(0.1));
        assert_eq!(container.ports().lots.lot_size("NIFTY"), Some(25));

        let fees = container.ports().fees.fees(OrderSide::Buy, Quantity::new(25), dec!(100));
        assert_eq!(fees.brokerage, Money::new(dec!(15)));
    }

    #[test]
    fn applies_overrides() {
        let yaml = r#"
fees:
  schedule: ZERODHA
lots:
  NIFTY: 75
persistence:
  path: /tmp/paper-engine-container-test.json
  snapshot_interval_ms: 250
"#;
        let config = load_config_from_string(yaml).unwrap();
        let container = Container::from_config(&config).unwrap();

        assert!(container.store().is_some());
        assert_eq!(
            container.loop_config().snapshot_interval,
            Some(std::time::Duration::from_millis(250))
        );
        assert_eq!(container.ports().lots.lot_size("NIFTY"), Some(75));
        let fees = container.ports().fees.fees(OrderSide::Buy, Quantity::new(25), dec!(100));
        assert_eq!(fees.brokerage, Money::new(dec!(20)));
    }

    #[test]
    fn engines_share_the_instrument_registry() {
        let config = load_config_from_string("persistence:\n  enabled: false").unwrap();
        let container = Container::from_config(&config).unwrap();

        let mut engine = container.engine();
        engine.register_instrument(
            Instrument::new(InstrumentSpec {
                token: InstrumentToken::new("NIFTY24DEC24000CE"),
                underlying: "NIFTY".to_string(),
                expiry: NaiveDate::from_ymd_opt(2024, 12, 26).unwrap(),
                strike: dec!(24000),
                second_strike: None,
                kind: OptionKind::Call,
                lot_size: 25,
                tradable: true,
            })
            .unwrap(),
        );

        let token = InstrumentToken::new("NIFTY24DEC24000CE");
        assert!(container.ports().instruments.resolve(&token).is_some());
    }
}
