//! Conversions: WS wire types → Order domain types.

use super::wire;
use super::{Order, UserOrders};

impl From<wire::WsOrder> for Order {
    fn from(order: wire::WsOrder) -> Self {
        Order {
            id: order.id,
            symbol: order.symbol,
            side: order.side,
            order_type: order.order_type,
            price: order.price,
            size: order.size,
            filled: order.filled,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

impl From<Vec<Order>> for UserOrders {
    fn from(orders: Vec<Order>) -> Self {
        let mut user_orders = UserOrders::new();
        user_orders.replace_all(orders);
        user_orders
    }
}
