//! Checkout: form validation and order placement.
//!
//! Placing an order writes a single snapshot to the order slot and empties
//! the cart. Nothing is sent to a payment or fulfilment service.

use apple_nation_core::{CustomerDetails, Order};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::cart::{CartStore, ORDER_STORAGE_KEY, SlotStorage, StorageError};
use crate::clock::Clock;

/// A checkout form field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    FullName,
    Phone,
    Address,
}

impl Field {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FullName => "fullName",
            Self::Phone => "phone",
            Self::Address => "address",
        }
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::FullName => "Please enter your full name",
            Self::Phone => "Please enter a valid phone number",
            Self::Address => "Please enter your delivery address",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that stop an order from being placed.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{}", .0.message())]
    Invalid(Field),

    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Failed to save order: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to encode order: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Check the customer form and the cart.
///
/// Lengths are measured on trimmed input: full name longer than 2
/// characters, phone at least 10, address longer than 5.
///
/// # Errors
///
/// Returns the first failing field, then [`CheckoutError::EmptyCart`].
pub fn validate(customer: &CustomerDetails, cart: &CartStore) -> Result<(), CheckoutError> {
    if trimmed_len(&customer.full_name) <= 2 {
        return Err(CheckoutError::Invalid(Field::FullName));
    }
    if trimmed_len(&customer.phone) < 10 {
        return Err(CheckoutError::Invalid(Field::Phone));
    }
    if trimmed_len(&customer.address) <= 5 {
        return Err(CheckoutError::Invalid(Field::Address));
    }
    if cart.lines().is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    Ok(())
}

fn trimmed_len(value: &str) -> usize {
    value.trim().chars().count()
}

/// Validate, write the order snapshot and clear the cart.
///
/// The cart is only cleared once the snapshot is stored.
///
/// # Errors
///
/// Returns a validation error, or a storage error if the snapshot could not
/// be written.
#[instrument(skip_all, fields(slot = %cart.slot()))]
pub fn place_order(
    customer: CustomerDetails,
    cart: &mut CartStore,
    orders: &dyn SlotStorage,
    clock: &dyn Clock,
) -> Result<Order, CheckoutError> {
    validate(&customer, cart)?;

    let customer = CustomerDetails {
        full_name: customer.full_name.trim().to_string(),
        phone: customer.phone.trim().to_string(),
        address: customer.address.trim().to_string(),
        ..customer
    };

    let order = Order::from_cart(customer, cart.cart(), clock.utc_now());
    orders.write(ORDER_STORAGE_KEY, &serde_json::to_string(&order)?)?;
    cart.clear();

    info!(
        order_id = %order.id,
        items = order.items.len(),
        total = %order.total,
        "Order placed"
    );

    Ok(order)
}

/// The last placed order, if one is stored and readable.
#[must_use]
pub fn last_order(orders: &dyn SlotStorage) -> Option<Order> {
    let raw = match orders.read(ORDER_STORAGE_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!(error = %e, "Failed to read order slot");
            return None;
        }
    };
    serde_json::from_str(&raw).ok()
}
