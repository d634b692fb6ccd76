//! Remote catalog API client.
//!
//! # Architecture
//!
//! - The catalog API is the source of truth - NO local sync, direct calls
//! - Responses are normalized once, here, into `apple_nation_core` records
//! - In-memory caching via `moka` for API responses (5 minute TTL)
//!
//! # Endpoints
//!
//! ```text
//! GET {base}/categories
//! GET {base}/categories/{id}/products?page={page}&limit={per_page}
//! GET {base}/products/{id}
//! ```
//!
//! Everything that consumes the catalog depends on [`CatalogSource`], so the
//! search index and tests never need a live HTTP server.

mod cache;
pub mod conversions;
pub mod raw;

use std::sync::Arc;
use std::time::Duration;

use apple_nation_core::{Category, CategoryId, Page, ProductDetail, ProductId, ProductSummary};
use async_trait::async_trait;
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::CatalogConfig;

use cache::{CacheKey, CacheValue};
use conversions::{convert_categories, convert_detail, convert_listing, detail_payload};
use raw::{Envelope, RawCategory, RawListing};

/// Errors that can occur when talking to the catalog API.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The envelope reported `success: false`.
    #[error("Catalog request unsuccessful: {0}")]
    Unsuccessful(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the catalog API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The request did not finish in time.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Read access to the catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// All categories with their declared product counts.
    async fn categories(&self) -> Result<Vec<Category>, CatalogError>;

    /// One page of a category's products.
    async fn category_products(
        &self,
        category: CategoryId,
        page: u32,
        per_page: u32,
    ) -> Result<Page<ProductSummary>, CatalogError>;

    /// Full product record.
    async fn product(&self, id: ProductId) -> Result<ProductDetail, CatalogError>;
}

// =============================================================================
// CatalogClient
// =============================================================================

/// HTTP client for the catalog API.
///
/// Categories, category pages and product details are cached for 5 minutes.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<SecretString>,
    timeout: Duration,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Create a new catalog client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("apple-nation-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                client,
                base_url: config.base_url.clone(),
                api_token: config.api_token.clone(),
                timeout: config.timeout,
                cache,
            }),
        })
    }

    /// Build an endpoint URL below the base URL.
    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, CatalogError> {
        let mut url = self.inner.base_url.join(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Report requests cut off by the client timeout as [`CatalogError::Timeout`].
    fn transport_error(&self, e: reqwest::Error) -> CatalogError {
        if e.is_timeout() {
            tracing::warn!(timeout_ms = self.inner.timeout.as_millis(), "Catalog request timed out");
            CatalogError::Timeout(self.inner.timeout)
        } else {
            CatalogError::Http(e)
        }
    }

    /// Execute a GET request and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CatalogError> {
        let mut request = self
            .inner
            .client
            .get(url.clone())
            .header("Accept", "application/json");
        if let Some(token) = &self.inner.api_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();

        // Check for rate limiting
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CatalogError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(url.path().to_string()));
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                url = %url,
                body = %response_text.chars().take(500).collect::<String>(),
                "Catalog API returned non-success status"
            );
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body: response_text.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                url = %url,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse catalog response"
            );
            CatalogError::Parse(e)
        })
    }
}

/// Reject envelopes that explicitly report failure.
fn ensure_success<T>(envelope: &Envelope<T>) -> Result<(), CatalogError> {
    if envelope.success == Some(false) {
        return Err(CatalogError::Unsuccessful(
            envelope
                .message
                .clone()
                .unwrap_or_else(|| "no message".to_string()),
        ));
    }
    Ok(())
}

#[async_trait]
impl CatalogSource for CatalogClient {
    #[instrument(skip(self))]
    async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let url = self.endpoint("categories", &[])?;
        let envelope: Envelope<Vec<RawCategory>> = self.get_json(url).await?;
        ensure_success(&envelope)?;

        let categories = convert_categories(envelope.data);
        debug!(count = categories.len(), "Fetched categories");

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;

        Ok(categories)
    }

    #[instrument(skip(self), fields(category_id = %category))]
    async fn category_products(
        &self,
        category: CategoryId,
        page: u32,
        per_page: u32,
    ) -> Result<Page<ProductSummary>, CatalogError> {
        let cache_key = CacheKey::CategoryPage {
            category,
            page,
            per_page,
        };

        if let Some(CacheValue::CategoryPage(cached)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for category page");
            return Ok(cached);
        }

        let url = self.endpoint(
            &format!("categories/{category}/products"),
            &[("page", page.to_string()), ("limit", per_page.to_string())],
        )?;
        let raw: RawListing = self.get_json(url).await?;
        if let RawListing::Enveloped(envelope) = &raw {
            ensure_success(envelope)?;
        }

        let listing = convert_listing(raw, page, per_page);
        debug!(
            count = listing.items.len(),
            last_page = listing.last_page,
            "Fetched category page"
        );

        self.inner
            .cache
            .insert(cache_key, CacheValue::CategoryPage(listing.clone()))
            .await;

        Ok(listing)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn product(&self, id: ProductId) -> Result<ProductDetail, CatalogError> {
        let cache_key = CacheKey::Product(id);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = self.endpoint(&format!("products/{id}"), &[])?;
        let envelope: Envelope<Value> = self.get_json(url).await?;
        ensure_success(&envelope)?;

        let product = detail_payload(envelope.data)
            .as_ref()
            .and_then(convert_detail)
            .ok_or_else(|| CatalogError::NotFound(format!("Product not found: {id}")))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> CatalogClient {
        CatalogClient::new(&CatalogConfig {
            base_url: Url::parse("https://api.example.com/public/").unwrap(),
            api_token: None,
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_below_base() {
        let url = client()
            .endpoint(
                "categories/4/products",
                &[("page", "2".to_string()), ("limit", "30".to_string())],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/public/categories/4/products?page=2&limit=30"
        );
    }

    #[test]
    fn test_ensure_success() {
        let ok: Envelope<()> = Envelope {
            success: None,
            message: None,
            data: (),
        };
        assert!(ensure_success(&ok).is_ok());

        let failed: Envelope<()> = Envelope {
            success: Some(false),
            message: Some("store closed".to_string()),
            data: (),
        };
        let err = ensure_success(&failed).unwrap_err();
        assert_eq!(err.to_string(), "Catalog request unsuccessful: store closed");
    }

    #[tokio::test]
    async fn test_slow_catalog_reports_timeout() {
        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let timeout = Duration::from_millis(100);
        let client = CatalogClient::new(&CatalogConfig {
            base_url: Url::parse(&format!("http://{addr}/api/")).unwrap(),
            api_token: None,
            timeout,
        })
        .unwrap();

        let err = client.categories().await.unwrap_err();
        assert!(matches!(err, CatalogError::Timeout(t) if t == timeout), "{err:?}");
        assert_eq!(err.to_string(), "Timed out after 100ms");

        server.abort();
    }

    #[test]
    fn test_catalog_error_display() {
        let err = CatalogError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");

        let err = CatalogError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 502: bad gateway");
    }
}
