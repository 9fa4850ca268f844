//! Order status values.

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown order status string.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid status '{0}'. Valid statuses: pending, processing, shipped, completed, cancelled")]
pub struct InvalidOrderStatus(pub String);

/// Order lifecycle status.
///
/// There is no enforced transition graph: an admin may move an order to any
/// of these values at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.order_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Status assigned to an order at conversion time.
    ///
    /// Orders are finalized immediately; nothing moves them out of
    /// `pending` because there is no payment step.
    pub const INITIAL: Self = Self::Completed;

    /// Every status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Completed,
        Self::Cancelled,
    ];

    /// The wire/database name of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = InvalidOrderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| InvalidOrderStatus(s.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_status() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "archived".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err, InvalidOrderStatus("archived".to_owned()));
        assert!(err.to_string().contains("Valid statuses"));
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("Shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_new_orders_start_completed() {
        assert_eq!(OrderStatus::INITIAL, OrderStatus::Completed);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Cancelled).expect("serialize");
        assert_eq!(json, "\"cancelled\"");
    }
}
