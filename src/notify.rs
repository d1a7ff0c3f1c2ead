//! User-facing notifications derived from account events.

use crate::domain::notice::FundsNotice;
use crate::event::InboundEvent;
use crate::shared::serde_util::truthy;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    Deposit,
    Withdrawal,
    OrderPartiallyFilled,
    OrderFilled,
}

/// A message to show the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserNotification {
    pub category: NotificationCategory,
    pub message: String,
    /// The originating payload, for richer rendering.
    pub payload: serde_json::Value,
}

/// Build the notification for an event, if it warrants one.
///
/// Pure; state is never touched here.
pub fn dispatch(event: &InboundEvent) -> Option<UserNotification> {
    match event {
        InboundEvent::DepositNotice(notice) => Some(deposit(notice)),
        InboundEvent::WithdrawalNotice(notice) => Some(UserNotification {
            category: NotificationCategory::Withdrawal,
            message: format!(
                "You have performed a withdrawal of {} {}.",
                notice.amount.normalize(),
                notice.currency.display_code()
            ),
            payload: notice.raw.clone(),
        }),
        InboundEvent::OrderPartiallyFilled(order) => Some(UserNotification {
            category: NotificationCategory::OrderPartiallyFilled,
            message: format!("Order {} partially filled.", order.id),
            payload: serde_json::to_value(order).unwrap_or_default(),
        }),
        InboundEvent::OrderFilled(ids) if !ids.is_empty() => Some(UserNotification {
            category: NotificationCategory::OrderFilled,
            message: format!("{} order(s) filled.", ids.len()),
            payload: serde_json::to_value(ids).unwrap_or_default(),
        }),
        _ => None,
    }
}

fn deposit(notice: &FundsNotice) -> UserNotification {
    let state = if truthy(&notice.status) {
        "received a"
    } else {
        "a pending"
    };
    UserNotification {
        category: NotificationCategory::Deposit,
        message: format!(
            "You have {} deposit of {} {}.",
            state,
            notice.amount.normalize(),
            notice.currency.display_code()
        ),
        payload: notice.raw.clone(),
    }
}
