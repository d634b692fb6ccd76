//! Order placement through the shared application state.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use apple_nation_core::{CustomerDetails, DeliveryZone, NewCartItem, Order, ProductId};
use apple_nation_integration_tests::{TestContext, apple_catalog};
use apple_nation_storefront::cart::{ORDER_STORAGE_KEY, SlotStorage};
use apple_nation_storefront::checkout::{self, CheckoutError, Field};
use rust_decimal::Decimal;

fn customer() -> CustomerDetails {
    CustomerDetails {
        full_name: "  Rahim Uddin ".to_string(),
        phone: "01712345678".to_string(),
        address: "House 4, Road 7, Dhanmondi".to_string(),
        city: "Dhaka".to_string(),
        ..CustomerDetails::default()
    }
}

fn place(
    ctx: &TestContext,
    visitor: &str,
    details: CustomerDetails,
) -> Result<Order, CheckoutError> {
    let orders = ctx.state.visitor_storage(visitor);
    ctx.state
        .carts()
        .with_cart(visitor, |cart| {
            checkout::place_order(details, cart, &orders, ctx.state.clock())
        })
        .unwrap()
}

#[test]
fn test_order_is_recorded_and_cart_cleared() {
    let ctx = TestContext::new(apple_catalog());
    ctx.state
        .carts()
        .with_cart("v1", |cart| {
            cart.add_item(
                NewCartItem::new(ProductId::new(1), "iPhone 15", Decimal::new(120_000, 0)),
                2,
            );
        })
        .unwrap();

    let order = place(&ctx, "v1", customer());

    let order = order.unwrap();
    assert_eq!(order.id, "ORD-1717000000000");
    assert_eq!(order.customer.full_name, "Rahim Uddin");
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.subtotal, Decimal::new(240_000, 0));
    assert_eq!(order.shipping, DeliveryZone::InsideDhaka.shipping_fee());
    assert_eq!(order.total, order.subtotal + order.shipping);

    assert_eq!(ctx.state.carts().with_cart("v1", |cart| cart.count()).unwrap(), 0);
    assert_eq!(
        checkout::last_order(&ctx.state.visitor_storage("v1")),
        Some(order)
    );
    assert!(
        ctx.storage
            .read(&format!("{ORDER_STORAGE_KEY}.v1"))
            .unwrap()
            .is_some()
    );
}

#[test]
fn test_invalid_details_keep_cart() {
    let ctx = TestContext::new(apple_catalog());
    ctx.state
        .carts()
        .with_cart("v2", |cart| {
            cart.add_item(
                NewCartItem::new(ProductId::new(3), "AirPods Pro", Decimal::new(25_000, 0)),
                1,
            );
        })
        .unwrap();

    let short_phone = CustomerDetails {
        phone: "01712".to_string(),
        ..customer()
    };
    assert!(matches!(
        place(&ctx, "v2", short_phone),
        Err(CheckoutError::Invalid(Field::Phone))
    ));

    assert_eq!(ctx.state.carts().with_cart("v2", |cart| cart.count()).unwrap(), 1);
    assert_eq!(checkout::last_order(&ctx.state.visitor_storage("v2")), None);
}

#[test]
fn test_empty_cart_is_rejected() {
    let ctx = TestContext::new(apple_catalog());
    assert!(matches!(
        place(&ctx, "v3", customer()),
        Err(CheckoutError::EmptyCart)
    ));
}

#[test]
fn test_second_order_replaces_first() {
    let ctx = TestContext::new(apple_catalog());
    let add = |name: &str| {
        ctx.state
            .carts()
            .with_cart("v4", |cart| {
                cart.add_item(
                    NewCartItem::new(ProductId::new(3), name, Decimal::new(25_000, 0)),
                    1,
                );
            })
            .unwrap();
    };

    add("AirPods Pro");
    let first = place(&ctx, "v4", customer()).unwrap();

    ctx.clock.advance(Duration::from_secs(60));
    add("AirPods Pro (2nd gen)");
    let second = place(&ctx, "v4", customer()).unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(
        checkout::last_order(&ctx.state.visitor_storage("v4")).map(|order| order.id),
        Some(second.id)
    );
}

#[test]
fn test_orders_are_per_visitor() {
    let ctx = TestContext::new(apple_catalog());
    ctx.state
        .carts()
        .with_cart("alice", |cart| {
            cart.add_item(
                NewCartItem::new(ProductId::new(1), "iPhone 15", Decimal::new(120_000, 0)),
                1,
            );
        })
        .unwrap();
    place(&ctx, "alice", customer()).unwrap();

    assert!(checkout::last_order(&ctx.state.visitor_storage("alice")).is_some());
    assert!(checkout::last_order(&ctx.state.visitor_storage("bob")).is_none());
}
