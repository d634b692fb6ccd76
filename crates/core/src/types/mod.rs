//! Core types for Apple Nation.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod catalog;
pub mod id;
pub mod order;
pub mod price;

pub use cart::{
    Attributes, Cart, CartLine, LineKey, MAX_LINE_QUANTITY, MAX_UNIT_PRICE, NewCartItem,
    PLACEHOLDER_IMAGE, normalize_quantity, parse_quantity,
};
pub use catalog::{Category, Page, ProductDetail, ProductSummary, Variant};
pub use id::*;
pub use order::{CustomerDetails, DeliveryZone, Order};
pub use price::{CurrencyCode, Discount, DiscountKind, Price, format_amount};
