//! The JSON routes through the full middleware stack.

#![allow(clippy::unwrap_used)]

use apple_nation_integration_tests::{TestContext, apple_catalog};
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

/// A client that keeps the session cookie between requests.
struct Client {
    app: Router,
    cookie: Option<String>,
}

impl Client {
    fn new(ctx: &TestContext) -> Self {
        Self {
            app: apple_nation_storefront::app(ctx.state.clone()),
            cookie: None,
        }
    }

    /// Another tab in the same browser, sharing the session cookie.
    fn same_browser(&self) -> Self {
        Self {
            app: self.app.clone(),
            cookie: self.cookie.clone(),
        }
    }

    /// A second browser against the same server.
    fn fresh(&self) -> Self {
        Self {
            app: self.app.clone(),
            cookie: None,
        }
    }

    async fn send(
        &mut self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    async fn get(&mut self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }
}

fn iphone() -> Value {
    json!({
        "id": 1,
        "variantId": 4,
        "name": "iPhone 15",
        "price": 120000,
        "attributes": { "color": "Blue" }
    })
}

fn customer() -> Value {
    json!({
        "fullName": "Rahim Uddin",
        "phone": "01712345678",
        "address": "House 4, Road 7, Dhanmondi",
        "delivery": "outside-dhaka"
    })
}

#[tokio::test]
async fn test_health_and_readiness() {
    let ctx = TestContext::new(apple_catalog());
    let mut client = Client::new(&ctx);

    let (status, body) = client.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));

    let (status, body) = client.get("/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], json!(false));

    ctx.state.search().refresh().await;

    let (status, body) = client.get("/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["products"], json!(3));
}

#[tokio::test]
async fn test_cart_lifecycle() {
    let ctx = TestContext::new(apple_catalog());
    let mut client = Client::new(&ctx);

    let (status, cart) = client.get("/api/cart").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["count"], json!(0));
    assert!(client.cookie.is_some());

    let mut body = iphone();
    body["quantity"] = json!(2);
    let (status, cart) = client.send(Method::POST, "/api/cart/items", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["count"], json!(2));
    assert_eq!(cart["lines"][0]["key"], json!("1:4"));
    assert_eq!(cart["lines"][0]["image"], json!("/globe.svg"));
    assert_eq!(cart["subtotal"], json!(240_000.0));

    // Same product and variant merges into the existing line.
    let (_, cart) = client
        .send(Method::POST, "/api/cart/items", Some(iphone()))
        .await;
    assert_eq!(cart["lines"].as_array().unwrap().len(), 1);
    assert_eq!(cart["count"], json!(3));

    let (status, cart) = client
        .send(
            Method::PATCH,
            "/api/cart/items/1:4",
            Some(json!({ "quantity": "abc" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["count"], json!(1));

    let (status, cart) = client
        .send(Method::DELETE, "/api/cart/items/1:4", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["count"], json!(0));
    assert_eq!(cart["lines"], json!([]));
}

#[tokio::test]
async fn test_carts_are_per_session() {
    let ctx = TestContext::new(apple_catalog());
    let mut alice = Client::new(&ctx);
    let mut bob = alice.fresh();

    alice
        .send(Method::POST, "/api/cart/items", Some(iphone()))
        .await;

    let (_, cart) = bob.get("/api/cart").await;
    assert_eq!(cart["count"], json!(0));
    let (_, cart) = alice.get("/api/cart").await;
    assert_eq!(cart["count"], json!(1));

    let (_, cart) = alice.send(Method::DELETE, "/api/cart", None).await;
    assert_eq!(cart["count"], json!(0));
}

#[tokio::test]
async fn test_add_without_name_is_rejected() {
    let ctx = TestContext::new(apple_catalog());
    let mut client = Client::new(&ctx);

    let mut body = iphone();
    body["name"] = json!("  ");
    let (status, body) = client
        .send(Method::POST, "/api/cart/items", Some(body))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn test_suggest_echoes_sequence() {
    let ctx = TestContext::new(apple_catalog());
    let mut client = Client::new(&ctx);

    let (status, body) = client.get("/api/search/suggest?q=pro&seq=7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seq"], json!(7));
    assert_eq!(body["status"], json!("results"));
    assert_eq!(body["ready"], json!(true));
    assert_eq!(body["results"].as_array().unwrap().len(), 2);

    let (_, body) = client.get("/api/search/suggest?q=p").await;
    assert_eq!(body["status"], json!("too_short"));
    assert!(body.get("seq").is_none());

    let (_, body) = client.get("/api/search/suggest?q=pixel").await;
    assert_eq!(body["status"], json!("no_results"));
}

#[tokio::test]
async fn test_rapid_typing_supersedes_earlier_suggestion() {
    let ctx = TestContext::new(apple_catalog());
    let mut client = Client::new(&ctx);
    client.get("/api/cart").await;
    let mut tab = client.same_browser();
    let mut stranger = client.fresh();

    let ((_, first), (_, second), (_, other)) = tokio::join!(
        client.get("/api/search/suggest?q=ip&seq=1"),
        async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            tab.get("/api/search/suggest?q=iphone&seq=2").await
        },
        stranger.get("/api/search/suggest?q=ip&seq=1"),
    );

    assert_eq!(first["status"], json!("superseded"));
    assert_eq!(first["seq"], json!(1));
    assert!(first.get("results").is_none());
    assert_eq!(second["status"], json!("results"));
    assert_eq!(second["results"].as_array().unwrap().len(), 2);
    assert_eq!(other["status"], json!("results"));
}

#[tokio::test]
async fn test_catalog_routes() {
    let ctx = TestContext::new(apple_catalog());
    let mut client = Client::new(&ctx);

    let (status, body) = client.get("/api/categories").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = client.get("/api/categories/2/products").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["name"], json!("AirPods Pro"));

    let (status, _) = client.get("/api/categories/2/products?page=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = client.get("/api/products/3").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = client.get("/api/products/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Not found"));
}

#[tokio::test]
async fn test_products_listing_route() {
    let ctx = TestContext::new(apple_catalog());
    let mut client = Client::new(&ctx);

    let (status, body) = client.get("/api/products").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_items"], json!(3));
    assert_eq!(body["total_pages"], json!(1));
    assert_eq!(body["per_page"], json!(20));

    let (_, body) = client
        .get("/api/products?category=1&sort=price-high&price=100000-inf")
        .await;
    let names: Vec<_> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["iPhone 15 Pro", "iPhone 15"]);
    assert_eq!(body["items"][0]["price"], json!(150_000.0));

    let (_, body) = client.get("/api/products?search=AIRPODS&sort=name-asc").await;
    assert_eq!(body["total_items"], json!(1));
    assert_eq!(body["items"][0]["name"], json!("AirPods Pro"));

    let (_, body) = client.get("/api/products?page=2").await;
    assert!(body["items"].as_array().unwrap().is_empty());
    assert_eq!(body["current_page"], json!(2));

    for bad in [
        "/api/products?sort=newest",
        "/api/products?price=cheap",
        "/api/products?category=phones",
        "/api/products?page=0",
    ] {
        let (status, _) = client.get(bad).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{bad}");
    }
}

#[tokio::test]
async fn test_checkout_flow() {
    let ctx = TestContext::new(apple_catalog());
    let mut client = Client::new(&ctx);

    let (status, _) = client.get("/api/checkout/last-order").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = client
        .send(Method::POST, "/api/checkout", Some(customer()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("field").is_none());

    client
        .send(Method::POST, "/api/cart/items", Some(iphone()))
        .await;

    let mut bad = customer();
    bad["phone"] = json!("0171");
    let (status, body) = client.send(Method::POST, "/api/checkout", Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], json!("phone"));

    let (status, order) = client
        .send(Method::POST, "/api/checkout", Some(customer()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["id"], json!("ORD-1717000000000"));
    assert_eq!(order["shipping"], json!(120.0));
    assert_eq!(order["total"], json!(120_120.0));

    let (_, cart) = client.get("/api/cart").await;
    assert_eq!(cart["count"], json!(0));

    let (status, last) = client.get("/api/checkout/last-order").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(last, order);
}

#[tokio::test]
async fn test_request_id_header() {
    let ctx = TestContext::new(apple_catalog());
    let app = apple_nation_storefront::app(ctx.state.clone());

    let response = app
        .clone()
        .oneshot(
            Request::get("/health")
                .header("x-request-id", "edge-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "edge-42");

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let generated = response.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(generated.len(), 36);
}

#[tokio::test]
async fn test_oversized_price_is_rejected_and_cart_stays_usable() {
    let ctx = TestContext::new(apple_catalog());
    let mut client = Client::new(&ctx);
    client.get("/api/cart").await;

    let huge = json!({ "id": 9, "name": "Huge", "price": 1e28, "quantity": 10 });
    let (status, body) = client
        .send(Method::POST, "/api/cart/items", Some(huge))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("price"));

    let (status, cart) = client.get("/api/cart").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["count"], json!(0));

    let (status, _) = client.send(Method::DELETE, "/api/cart", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_huge_quantity_is_capped() {
    let ctx = TestContext::new(apple_catalog());
    let mut client = Client::new(&ctx);

    let mut body = iphone();
    body["quantity"] = json!(4_000_000_000_u64);
    let (status, cart) = client
        .send(Method::POST, "/api/cart/items", Some(body))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["count"], json!(999));
    assert_eq!(cart["subtotal"], json!(119_880_000.0));
}
