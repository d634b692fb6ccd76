//! Placed-order snapshot.
//!
//! Orders are not sent anywhere: a successful checkout writes one snapshot
//! to a local storage slot and clears the cart.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::{Cart, CartLine};

/// Delivery area, which decides the shipping fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryZone {
    #[default]
    InsideDhaka,
    OutsideDhaka,
}

impl DeliveryZone {
    /// Flat shipping fee for the zone.
    #[must_use]
    pub fn shipping_fee(self) -> Decimal {
        match self {
            Self::InsideDhaka => Decimal::new(80, 0),
            Self::OutsideDhaka => Decimal::new(120, 0),
        }
    }
}

/// Customer details captured by the checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub full_name: String,
    pub phone: String,
    #[serde(default)]
    pub email: String,
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub delivery: DeliveryZone,
    #[serde(default)]
    pub notes: String,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub customer: CustomerDetails,
    pub items: Vec<CartLine>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Snapshot a cart into an order placed at `placed_at`.
    ///
    /// The order id is `ORD-` followed by the placement time in unix
    /// milliseconds.
    #[must_use]
    pub fn from_cart(customer: CustomerDetails, cart: &Cart, placed_at: DateTime<Utc>) -> Self {
        let subtotal = cart.subtotal();
        let shipping = customer.delivery.shipping_fee();
        Self {
            id: format!("ORD-{}", placed_at.timestamp_millis()),
            customer,
            items: cart.lines().to_vec(),
            subtotal,
            shipping,
            total: subtotal.saturating_add(shipping),
            created_at: placed_at,
        }
    }
}
