//! Apple Nation Core - Shared types library.
//!
//! This crate provides common types used across all Apple Nation components:
//! - `storefront` - Cart, search and checkout services plus the JSON API
//! - `cli` - Command-line tools for the search index and local carts
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no storage. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, prices, cart lines, catalog records and orders

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
