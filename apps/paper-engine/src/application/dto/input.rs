//! Replayable engine input records.

use serde::{Deserialize, Serialize};

use super::{CancelCommand, ModifyCommand, ReconcileCommand, SquareOffCommand, Tick, TradeRequest};
use crate::domain::instrument::Instrument;
use crate::domain::shared::Timestamp;

/// One line of a JSON-lines input stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineInput {
    /// Register an instrument.
    Instrument(Instrument),
    /// Market tick.
    Tick(Tick),
    /// Trade request.
    Trade(TradeRequest),
    /// Cancel a pending order.
    Cancel(CancelCommand),
    /// Amend a pending order.
    Modify(ModifyCommand),
    /// Close one position.
    SquareOff(SquareOffCommand),
    /// Close every position.
    SquareOffAll,
    /// Reconcile a position.
    Reconcile(ReconcileCommand),
    /// Session clock tick at a given time.
    Clock {
        /// Clock time.
        at: Timestamp,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_tags_parse() {
        let line = r#"{"kind": "trade", "shape": "single", "strategy_tag": "s", "side": "SELL", "quantity": 25, "limit_price": "50", "instrument": "X"}"#;
        let input: EngineInput = serde_json::from_str(line).unwrap();
        assert!(matches!(input, EngineInput::Trade(TradeRequest::Single(_))));

        let line = r#"{"kind": "square_off_all"}"#;
        assert_eq!(
            serde_json::from_str::<EngineInput>(line).unwrap(),
            EngineInput::SquareOffAll
        );
    }
}
