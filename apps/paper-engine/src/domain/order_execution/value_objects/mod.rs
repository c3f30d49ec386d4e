//! Order Execution Value Objects

mod order_leg;
mod order_origin;
mod order_side;
mod order_status;
mod order_type;
mod reasons;
mod strategy_shape;
mod validity;

pub use order_leg::OrderLeg;
pub use order_origin::OrderOrigin;
pub use order_side::OrderSide;
pub use order_status::OrderStatus;
pub use order_type::OrderType;
pub use reasons::{CancelReason, RejectReason};
pub use strategy_shape::StrategyShape;
pub use validity::Validity;
