//! Order Book
//!
//! Engine-owned store of every order it has seen, plus an index of pending
//! orders in placement order. Only the engine loop touches it, so there is no
//! interior locking.

use std::collections::HashMap;

use super::aggregate::Order;
use crate::domain::shared::{InstrumentToken, OrderId};

/// All orders by id and the pending ones in placement order.
#[derive(Debug, Default, Clone)]
pub struct OrderBook {
    orders: HashMap<OrderId, Order>,
    pending: Vec<OrderId>,
}

impl OrderBook {
    /// Create an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an order. Pending orders join the evaluation queue.
    pub fn insert(&mut self, order: Order) {
        let id = order.id().clone();
        if order.is_pending() && !self.pending.contains(&id) {
            self.pending.push(id.clone());
        }
        self.orders.insert(id, order);
    }

    /// Look up an order.
    #[must_use]
    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.orders.get(id)
    }

    /// Look up an order for mutation.
    pub fn get_mut(&mut self, id: &OrderId) -> Option<&mut Order> {
        self.orders.get_mut(id)
    }

    /// Pending order ids with a leg on `instrument`, in placement order.
    #[must_use]
    pub fn pending_ids_for(&self, instrument: &InstrumentToken) -> Vec<OrderId> {
        self.pending
            .iter()
            .filter(|id| self.orders.get(*id).is_some_and(|o| o.trades(instrument)))
            .cloned()
            .collect()
    }

    /// Orders that reached a terminal status, in no particular order.
    pub fn closed_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values().filter(|o| !o.is_pending())
    }

    /// Pending orders in placement order.
    pub fn pending_orders(&self) -> impl Iterator<Item = &Order> {
        self.pending.iter().filter_map(|id| self.orders.get(id))
    }

    /// Drop an order from the pending queue after a terminal transition.
    pub fn release(&mut self, id: &OrderId) {
        self.pending.retain(|p| p != id);
    }

    /// Total orders stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Check if the book is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Number of pending orders.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::aggregate::PlaceOrderCommand;
    use crate::domain::order_execution::value_objects::{
        CancelReason, OrderLeg, OrderOrigin, OrderSide, OrderType, StrategyShape, Validity,
    };
    use crate::domain::shared::{Quantity, StrategyTag, Timestamp};
    use rust_decimal_macros::dec;

    fn order(counter: u64, token: &str) -> Order {
        Order::place(
            PlaceOrderCommand {
                id: OrderId::sequential(counter),
                strategy_tag: StrategyTag::new("s"),
                shape: StrategyShape::Single,
                side: OrderSide::Buy,
                order_type: OrderType::Limit,
                quantity: Quantity::new(25),
                limit_price: dec!(100),
                validity: Validity::Day,
                stop_loss: None,
                target: None,
                legs: vec![OrderLeg::new(InstrumentToken::new(token), OrderSide::Buy, 1)],
                origin: OrderOrigin::Request,
            },
            Timestamp::parse("2024-12-02T05:00:00Z").unwrap(),
            None,
        )
    }

    #[test]
    fn pending_keeps_placement_order() {
        let mut book = OrderBook::new();
        book.insert(order(2, "A"));
        book.insert(order(1, "A"));
        book.insert(order(3, "B"));
        let ids: Vec<String> = book
            .pending_ids_for(&InstrumentToken::new("A"))
            .into_iter()
            .map(OrderId::into_inner)
            .collect();
        assert_eq!(ids, vec!["ORD-000002", "ORD-000001"]);
        assert_eq!(book.pending_len(), 3);
    }

    #[test]
    fn release_removes_from_pending_only() {
        let mut book = OrderBook::new();
        book.insert(order(1, "A"));
        let id = OrderId::sequential(1);
        book.get_mut(&id)
            .unwrap()
            .cancel(CancelReason::user_requested(), Timestamp::now())
            .unwrap();
        book.release(&id);
        assert_eq!(book.pending_len(), 0);
        assert_eq!(book.len(), 1);
        assert!(!book.get(&id).unwrap().is_pending());
    }

    #[test]
    fn reinserting_does_not_duplicate_pending() {
        let mut book = OrderBook::new();
        book.insert(order(1, "A"));
        book.insert(order(1, "A"));
        assert_eq!(book.pending_len(), 1);
        assert_eq!(book.pending_orders().count(), 1);
    }
}
