//! Order state containers: app-owned, SDK-provided update logic.

use crate::shared::OrderId;

use super::Order;
use std::collections::HashMap;

/// Tracks a user's open orders keyed by order id.
///
/// Updates follow last-write-wins: events that reference an id which is no
/// longer present are absorbed without error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserOrders {
    orders: HashMap<OrderId, Order>,
}

impl UserOrders {
    pub fn new() -> Self {
        Self {
            orders: HashMap::new(),
        }
    }

    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.orders.get(id)
    }

    pub fn contains(&self, id: &OrderId) -> bool {
        self.orders.contains_key(id)
    }

    /// Insert an order, replacing any previous record with the same id.
    pub fn upsert(&mut self, order: Order) {
        self.orders.insert(order.id.clone(), order);
    }

    /// Replace an existing order. Returns `false` if the id is unknown.
    pub fn update_existing(&mut self, order: Order) -> bool {
        match self.orders.get_mut(&order.id) {
            Some(existing) => {
                *existing = order;
                true
            }
            None => false,
        }
    }

    /// Remove every listed id. Returns how many orders were actually removed.
    pub fn remove_many<'a>(&mut self, ids: impl IntoIterator<Item = &'a OrderId>) -> usize {
        ids.into_iter()
            .filter(|id| self.orders.remove(*id).is_some())
            .count()
    }

    /// Replace the whole set (e.g. from an `orders` snapshot).
    pub fn replace_all(&mut self, orders: Vec<Order>) {
        self.orders = orders.into_iter().map(|o| (o.id.clone(), o)).collect();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &OrderId> {
        self.orders.keys()
    }

    pub fn clear(&mut self) {
        self.orders.clear();
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn order(id: &str, size: i64) -> Order {
        Order {
            id: OrderId::from(id),
            symbol: None,
            side: None,
            order_type: None,
            price: Some(Decimal::from(100)),
            size: Decimal::from(size),
            filled: Decimal::ZERO,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_upsert_adds_and_replaces() {
        let mut orders = UserOrders::new();
        orders.upsert(order("1", 10));
        orders.upsert(order("1", 5));
        assert_eq!(orders.len(), 1);
        assert_eq!(orders.get(&OrderId::from("1")).unwrap().size, Decimal::from(5));
    }

    #[test]
    fn test_update_existing_ignores_unknown_id() {
        let mut orders = UserOrders::new();
        assert!(!orders.update_existing(order("9", 1)));
        assert!(orders.is_empty());

        orders.upsert(order("9", 1));
        assert!(orders.update_existing(order("9", 4)));
        assert_eq!(orders.get(&OrderId::from("9")).unwrap().size, Decimal::from(4));
    }

    #[test]
    fn test_remove_many() {
        let mut orders = UserOrders::new();
        orders.upsert(order("1", 1));
        orders.upsert(order("2", 1));
        orders.upsert(order("3", 1));

        let removed = orders.remove_many(&[OrderId::from("1"), OrderId::from("3"), OrderId::from("x")]);
        assert_eq!(removed, 2);
        assert_eq!(orders.ids().collect::<Vec<_>>(), vec![&OrderId::from("2")]);
    }

    #[test]
    fn test_replace_all() {
        let mut orders = UserOrders::new();
        orders.upsert(order("old", 1));
        orders.replace_all(vec![order("a", 1), order("b", 2)]);
        assert_eq!(orders.len(), 2);
        assert!(!orders.contains(&OrderId::from("old")));
    }
}
