//! Cart store.
//!
//! A [`CartStore`] owns the line list for one storage slot. It loads the
//! slot once ([`CartStore::hydrate`]) and from then on writes the whole list
//! back after every mutation. Persistence is best-effort: a failed write is
//! logged and the in-memory cart stays authoritative.
//!
//! The server keeps one store per visitor in a [`CartRegistry`].

pub mod storage;

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use moka::sync::Cache;

use apple_nation_core::{Cart, CartLine, LineKey, NewCartItem, parse_quantity};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, instrument, warn};

pub use storage::{
    CART_STORAGE_KEY, FileStorage, MemoryStorage, ORDER_STORAGE_KEY, ScopedStorage, SlotStorage,
    StorageError, cart_slot_key, validate_key,
};

/// The cart for one storage slot.
#[derive(Debug)]
pub struct CartStore {
    slot: String,
    storage: Arc<dyn SlotStorage>,
    cart: Cart,
    hydrated: bool,
}

impl CartStore {
    /// Create an unhydrated store for `slot`.
    #[must_use]
    pub fn new(slot: impl Into<String>, storage: Arc<dyn SlotStorage>) -> Self {
        Self {
            slot: slot.into(),
            storage,
            cart: Cart::new(),
            hydrated: false,
        }
    }

    /// Create and immediately hydrate a store.
    #[must_use]
    pub fn open(slot: impl Into<String>, storage: Arc<dyn SlotStorage>) -> Self {
        let mut store = Self::new(slot, storage);
        store.hydrate();
        store
    }

    /// Load the slot. Runs once; later calls are no-ops.
    ///
    /// Whatever the slot holds replaces the in-memory lines. A missing,
    /// unreadable or malformed slot yields an empty cart.
    #[instrument(skip(self), fields(slot = %self.slot))]
    pub fn hydrate(&mut self) {
        if self.hydrated {
            return;
        }

        let raw = match self.storage.read(&self.slot) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Failed to read cart slot, starting empty");
                None
            }
        };

        self.cart = raw.as_deref().map(decode_lines).unwrap_or_default();
        self.hydrated = true;
        debug!(lines = self.cart.lines().len(), "Cart hydrated");
    }

    /// Whether the slot has been loaded.
    #[must_use]
    pub const fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    #[must_use]
    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Add `quantity` of an item (see [`Cart::add`]).
    pub fn add_item(&mut self, item: NewCartItem, quantity: u32) -> LineKey {
        let key = self.cart.add(item, quantity);
        self.persist();
        key
    }

    /// Remove a line. Absent keys are ignored.
    pub fn remove_item(&mut self, key: &LineKey) {
        if self.cart.remove(key) {
            self.persist();
        }
    }

    /// Set a line's quantity to `max(1, round(quantity))`.
    ///
    /// Non-finite input is treated as 1. Absent keys are ignored.
    pub fn update_quantity(&mut self, key: &LineKey, quantity: f64) {
        if self.cart.set_quantity(key, quantity) {
            self.persist();
        }
    }

    /// Like [`Self::update_quantity`], for raw form input.
    pub fn update_quantity_text(&mut self, key: &LineKey, input: &str) {
        self.update_quantity(key, f64::from(parse_quantity(input)));
    }

    pub fn clear(&mut self) {
        self.cart.clear();
        self.persist();
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Total number of units.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.cart.count()
    }

    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.cart.subtotal()
    }

    /// Write the whole list back to the slot.
    fn persist(&self) {
        if !self.hydrated {
            return;
        }

        let encoded = match serde_json::to_string(&self.cart) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(slot = %self.slot, error = %e, "Failed to encode cart");
                return;
            }
        };

        if let Err(e) = self.storage.write(&self.slot, &encoded) {
            warn!(slot = %self.slot, error = %e, "Failed to persist cart");
        }
    }
}

/// Decode a persisted slot.
///
/// Anything that is not a JSON array is an empty cart. Entries that do not
/// parse as lines are skipped.
fn decode_lines(raw: &str) -> Cart {
    let Ok(Value::Array(entries)) = serde_json::from_str::<Value>(raw) else {
        debug!("Cart slot is not a JSON array, ignoring");
        return Cart::new();
    };

    let total = entries.len();
    let lines: Vec<CartLine> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect();

    if lines.len() != total {
        debug!(
            dropped = total - lines.len(),
            "Skipped malformed cart entries"
        );
    }

    Cart::from_lines(lines)
}

// =============================================================================
// CartRegistry
// =============================================================================

/// How long an untouched cart stays in memory by default.
pub const DEFAULT_CART_IDLE: Duration = Duration::from_secs(30 * 60);

const MAX_CARTS_IN_MEMORY: u64 = 10_000;

/// Hydrated carts keyed by visitor.
///
/// Each store sits behind its own mutex, so two requests for the same
/// visitor never interleave mutations while different visitors do not
/// contend. Carts idle for longer than the idle timeout are dropped from
/// memory and hydrated again from their slot on the next request.
pub struct CartRegistry {
    storage: Arc<dyn SlotStorage>,
    carts: Cache<String, Arc<Mutex<CartStore>>>,
}

impl fmt::Debug for CartRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartRegistry")
            .field("storage", &self.storage)
            .field("carts", &self.carts.entry_count())
            .finish()
    }
}

impl CartRegistry {
    #[must_use]
    pub fn new(storage: Arc<dyn SlotStorage>) -> Self {
        Self::with_idle_timeout(storage, DEFAULT_CART_IDLE)
    }

    #[must_use]
    pub fn with_idle_timeout(storage: Arc<dyn SlotStorage>, idle: Duration) -> Self {
        let carts = Cache::builder()
            .max_capacity(MAX_CARTS_IN_MEMORY)
            .time_to_idle(idle)
            .build();
        Self { storage, carts }
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<dyn SlotStorage> {
        &self.storage
    }

    /// Run `f` against the visitor's cart, hydrating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Poisoned`] if a previous holder panicked. The
    /// poisoned store is dropped so the next call reloads the slot.
    pub fn with_cart<R>(
        &self,
        visitor: &str,
        f: impl FnOnce(&mut CartStore) -> R,
    ) -> Result<R, StorageError> {
        let store = self.carts.get_with_by_ref(visitor, || {
            Arc::new(Mutex::new(CartStore::open(
                cart_slot_key(visitor),
                Arc::clone(&self.storage),
            )))
        });

        let Ok(mut guard) = store.lock() else {
            warn!(visitor, "Cart lock poisoned, dropping in-memory cart");
            self.carts.invalidate(visitor);
            return Err(StorageError::Poisoned);
        };
        Ok(f(&mut guard))
    }

    /// Number of carts held in memory.
    ///
    /// Eviction runs lazily; call [`CartRegistry::run_pending_tasks`] first
    /// for an exact figure.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.carts.entry_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply pending evictions now.
    pub fn run_pending_tasks(&self) {
        self.carts.run_pending_tasks();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use apple_nation_core::{ProductId, VariantId};

    fn iphone() -> NewCartItem {
        NewCartItem::new(ProductId::new(7), "iPhone 15", Decimal::new(129_999, 0))
            .with_variant(VariantId::new(3))
            .with_attribute("color", "Black")
    }

    fn airpods() -> NewCartItem {
        NewCartItem::new(ProductId::new(9), "AirPods Pro", Decimal::new(24_500, 0))
    }

    fn memory() -> Arc<dyn SlotStorage> {
        Arc::new(MemoryStorage::new())
    }

    #[test]
    fn test_hydrate_missing_slot_is_empty() {
        let mut store = CartStore::new(CART_STORAGE_KEY, memory());
        assert!(!store.is_hydrated());
        store.hydrate();
        assert!(store.is_hydrated());
        assert!(store.lines().is_empty());
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_hydrate_malformed_slot_is_empty() {
        for raw in ["not json", "{\"key\": 1}", "42", "null"] {
            let storage = memory();
            storage.write(CART_STORAGE_KEY, raw).unwrap();
            let store = CartStore::open(CART_STORAGE_KEY, storage);
            assert!(store.is_hydrated(), "{raw}");
            assert!(store.lines().is_empty(), "{raw}");
        }
    }

    #[test]
    fn test_hydrate_skips_bad_entries() {
        let storage = memory();
        storage
            .write(
                CART_STORAGE_KEY,
                r#"[{"key":"9","id":9,"variantId":null,"name":"AirPods Pro","price":24500,"image":"/a.png","attributes":null,"quantity":2},{"oops":true}]"#,
            )
            .unwrap();
        let store = CartStore::open(CART_STORAGE_KEY, storage);
        assert_eq!(store.lines().len(), 1);
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn test_mutations_persist_after_hydration() {
        let storage = memory();
        let mut store = CartStore::open(CART_STORAGE_KEY, Arc::clone(&storage));

        let key = store.add_item(iphone(), 1);
        store.add_item(airpods(), 2);
        store.update_quantity(&key, 3.0);

        let reloaded = CartStore::open(CART_STORAGE_KEY, storage);
        assert_eq!(reloaded.lines(), store.lines());
        assert_eq!(reloaded.count(), 5);
        assert_eq!(reloaded.subtotal(), store.subtotal());
    }

    #[test]
    fn test_empty_cart_round_trips() {
        let storage = memory();
        let mut store = CartStore::open(CART_STORAGE_KEY, Arc::clone(&storage));
        store.add_item(airpods(), 1);
        store.clear();

        assert_eq!(
            storage.read(CART_STORAGE_KEY).unwrap().as_deref(),
            Some("[]")
        );
        let reloaded = CartStore::open(CART_STORAGE_KEY, storage);
        assert!(reloaded.is_hydrated());
        assert!(reloaded.lines().is_empty());
    }

    #[test]
    fn test_mutations_before_hydration_are_not_persisted() {
        let storage = memory();
        let mut store = CartStore::new(CART_STORAGE_KEY, Arc::clone(&storage));
        store.add_item(airpods(), 1);

        assert_eq!(store.count(), 1);
        assert_eq!(storage.read(CART_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn test_persisted_line_shape() {
        let storage = memory();
        let mut store = CartStore::open(CART_STORAGE_KEY, Arc::clone(&storage));
        store.add_item(iphone(), 1);

        let raw = storage.read(CART_STORAGE_KEY).unwrap().unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        let line = &value[0];
        assert_eq!(line["key"], "7:3");
        assert_eq!(line["id"], 7);
        assert_eq!(line["variantId"], 3);
        assert_eq!(line["name"], "iPhone 15");
        assert_eq!(line["image"], "/globe.svg");
        assert_eq!(line["attributes"]["color"], "Black");
        assert_eq!(line["quantity"], 1);
    }

    #[test]
    fn test_update_quantity_normalizes_input() {
        let mut store = CartStore::open(CART_STORAGE_KEY, memory());
        let key = store.add_item(airpods(), 4);

        store.update_quantity(&key, 0.0);
        assert_eq!(store.count(), 1);

        store.update_quantity(&key, 2.6);
        assert_eq!(store.count(), 3);

        store.update_quantity(&key, f64::NAN);
        assert_eq!(store.count(), 1);

        store.update_quantity_text(&key, "5");
        assert_eq!(store.count(), 5);

        store.update_quantity_text(&key, "lots");
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_remove_absent_key_is_noop() {
        let storage = memory();
        let mut store = CartStore::open(CART_STORAGE_KEY, Arc::clone(&storage));
        store.add_item(airpods(), 1);
        let before = storage.read(CART_STORAGE_KEY).unwrap();

        store.remove_item(&LineKey::from_raw("404"));
        store.update_quantity(&LineKey::from_raw("404"), 9.0);

        assert_eq!(store.count(), 1);
        assert_eq!(storage.read(CART_STORAGE_KEY).unwrap(), before);
    }

    #[test]
    fn test_registry_separates_visitors() {
        let registry = CartRegistry::new(memory());

        registry
            .with_cart("alice", |cart| cart.add_item(airpods(), 2))
            .unwrap();
        registry
            .with_cart("bob", |cart| cart.add_item(iphone(), 1))
            .unwrap();

        assert_eq!(registry.with_cart("alice", |c| c.count()).unwrap(), 2);
        assert_eq!(registry.with_cart("bob", |c| c.count()).unwrap(), 1);
        registry.run_pending_tasks();
        assert_eq!(registry.len(), 2);

        let slot = cart_slot_key("alice");
        assert!(registry.storage().read(&slot).unwrap().is_some());
    }

    #[test]
    fn test_registry_concurrent_adds() {
        let registry = Arc::new(CartRegistry::new(memory()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        registry
                            .with_cart("shared", |cart| cart.add_item(airpods(), 1))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.with_cart("shared", |c| c.count()).unwrap(), 200);
        assert_eq!(
            registry.with_cart("shared", |c| c.lines().len()).unwrap(),
            1
        );
    }

    #[test]
    fn test_idle_cart_is_evicted_and_reloads_intact() {
        let registry =
            CartRegistry::with_idle_timeout(memory(), std::time::Duration::from_millis(50));
        registry
            .with_cart("idle", |cart| cart.add_item(airpods(), 3))
            .unwrap();
        registry.run_pending_tasks();
        assert_eq!(registry.len(), 1);

        std::thread::sleep(std::time::Duration::from_millis(150));
        registry.run_pending_tasks();
        assert!(registry.is_empty());

        assert_eq!(registry.with_cart("idle", |c| c.count()).unwrap(), 3);
        registry.run_pending_tasks();
        assert_eq!(registry.len(), 1);
    }
}
