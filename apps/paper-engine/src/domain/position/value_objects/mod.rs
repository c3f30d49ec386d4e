//! Position Value Objects

mod exit_reason;
mod position_fill;
mod trade_record;

pub use exit_reason::ExitReason;
pub use position_fill::PositionFill;
pub use trade_record::TradeRecord;
