//! Shopping cart backed by local storage.
//!
//! The cart is an observable [`Store`] of [`CartState`]. A built-in
//! subscriber writes the item list to [`LocalStorage`] under [`CART_KEY`]
//! after every mutation, so the cart survives restarts. The modal `open`
//! flag is session-only and always starts closed.

use pocket_mall_core::{Price, Product, ProductId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::LocalStorage;
use crate::store::{Store, SubscriptionId};

/// Storage key of the persisted item list.
pub const CART_KEY: &str = "shopping_cart";

/// Largest quantity a single line can hold.
pub const MAX_QUANTITY: u32 = 9_999;

/// Errors from cart operations addressing a single item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("{0} is not in cart")]
    NotInCart(ProductId),
}

/// One product line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub title: String,
    #[serde(default)]
    pub image: String,
    /// Unit price.
    pub lprice: Price,
    /// Always within `1..=MAX_QUANTITY`.
    pub quantity: u32,
    #[serde(default)]
    pub selected: bool,
}

impl CartItem {
    fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.product_id.clone(),
            title: product.title.clone(),
            image: product.image.clone(),
            lprice: product.lprice,
            quantity: quantity.clamp(1, MAX_QUANTITY),
            selected: false,
        }
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.lprice.times(self.quantity)
    }
}

/// Cart contents plus the modal flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    /// Items in insertion order, unique by product id.
    pub items: Vec<CartItem>,
    pub open: bool,
}

impl CartState {
    /// Number of distinct products (the header badge).
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    #[must_use]
    pub fn total_price(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    #[must_use]
    pub fn selected_count(&self) -> usize {
        self.items.iter().filter(|item| item.selected).count()
    }

    #[must_use]
    pub fn selected_price(&self) -> Price {
        self.items
            .iter()
            .filter(|item| item.selected)
            .map(CartItem::line_total)
            .sum()
    }

    /// True when the cart is non-empty and every item is selected.
    #[must_use]
    pub fn is_all_selected(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|item| item.selected)
    }

    #[must_use]
    pub fn get(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.product_id == product_id)
    }

    fn get_mut(&mut self, product_id: &ProductId) -> Result<&mut CartItem, CartError> {
        self.items
            .iter_mut()
            .find(|item| &item.product_id == product_id)
            .ok_or_else(|| CartError::NotInCart(product_id.clone()))
    }
}

/// Observable, persisted cart.
#[derive(Debug)]
pub struct CartStore {
    store: Store<CartState>,
}

impl CartStore {
    /// Rehydrate the cart from `storage` and start persisting to it.
    ///
    /// A missing or unreadable blob yields an empty cart.
    #[must_use]
    pub fn load(storage: LocalStorage) -> Self {
        let stored: Vec<CartItem> = storage.get_or_default(CART_KEY);

        let mut items: Vec<CartItem> = Vec::with_capacity(stored.len());
        for mut item in stored {
            if items.iter().any(|existing| existing.product_id == item.product_id) {
                continue;
            }
            item.quantity = item.quantity.clamp(1, MAX_QUANTITY);
            items.push(item);
        }
        tracing::debug!(items = items.len(), "Cart rehydrated");

        let mut store = Store::new(CartState { items, open: false });
        store.subscribe(move |state: &CartState| {
            if let Err(e) = storage.set_item(CART_KEY, &state.items) {
                tracing::warn!(error = %e, "Failed to persist cart");
            }
        });

        Self { store }
    }

    #[must_use]
    pub const fn state(&self) -> &CartState {
        self.store.state()
    }

    /// Owned copy of the current state, for embedding in page state.
    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.store.state().clone()
    }

    pub fn subscribe(&mut self, listener: impl Fn(&CartState) + Send + 'static) -> SubscriptionId {
        self.store.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    /// Add `quantity` of a product (at least 1), merging with an existing line.
    /// The line is capped at [`MAX_QUANTITY`].
    ///
    /// Returns the line's new quantity.
    pub fn add(&mut self, product: &Product, quantity: u32) -> u32 {
        let quantity = quantity.clamp(1, MAX_QUANTITY);
        self.store.update(|state| {
            let existing = state
                .items
                .iter_mut()
                .find(|item| item.product_id == product.product_id);
            match existing {
                Some(item) => {
                    item.quantity = item.quantity.saturating_add(quantity).min(MAX_QUANTITY);
                    item.quantity
                }
                None => {
                    state.items.push(CartItem::from_product(product, quantity));
                    quantity
                }
            }
        })
    }

    /// Delete one line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] if the product is not in the cart.
    pub fn remove(&mut self, product_id: &ProductId) -> Result<CartItem, CartError> {
        let index = self
            .state()
            .items
            .iter()
            .position(|item| &item.product_id == product_id)
            .ok_or_else(|| CartError::NotInCart(product_id.clone()))?;
        Ok(self.store.update(|state| state.items.remove(index)))
    }

    /// Delete every selected line. Returns how many were removed.
    pub fn remove_selected(&mut self) -> usize {
        self.store.update(|state| {
            let before = state.items.len();
            state.items.retain(|item| !item.selected);
            before - state.items.len()
        })
    }

    /// Flip one line's selection. Returns the new flag.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] if the product is not in the cart.
    pub fn toggle_selected(&mut self, product_id: &ProductId) -> Result<bool, CartError> {
        self.state().get(product_id).ok_or_else(|| CartError::NotInCart(product_id.clone()))?;
        self.store.update(|state| -> Result<bool, CartError> {
            let item = state.get_mut(product_id)?;
            item.selected = !item.selected;
            Ok(item.selected)
        })
    }

    /// Select everything, unless everything is already selected, in which
    /// case deselect everything. Returns the new flag.
    pub fn toggle_all(&mut self) -> bool {
        let selected = !self.state().is_all_selected();
        self.set_all_selected(selected);
        selected
    }

    pub fn set_all_selected(&mut self, selected: bool) {
        self.store.update(|state| {
            for item in &mut state.items {
                item.selected = selected;
            }
        });
    }

    /// Add one to a line. Returns the new quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] if the product is not in the cart.
    pub fn increase(&mut self, product_id: &ProductId) -> Result<u32, CartError> {
        self.state().get(product_id).ok_or_else(|| CartError::NotInCart(product_id.clone()))?;
        self.store.update(|state| -> Result<u32, CartError> {
            let item = state.get_mut(product_id)?;
            item.quantity = item.quantity.saturating_add(1).min(MAX_QUANTITY);
            Ok(item.quantity)
        })
    }

    /// Take one from a line; a line at quantity 1 is removed instead.
    ///
    /// Returns the new quantity, or `None` when the line was removed.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] if the product is not in the cart.
    pub fn decrease(&mut self, product_id: &ProductId) -> Result<Option<u32>, CartError> {
        let quantity = self
            .state()
            .get(product_id)
            .map(|item| item.quantity)
            .ok_or_else(|| CartError::NotInCart(product_id.clone()))?;

        if quantity <= 1 {
            self.remove(product_id)?;
            return Ok(None);
        }

        self.store.update(|state| -> Result<Option<u32>, CartError> {
            let item = state.get_mut(product_id)?;
            item.quantity -= 1;
            Ok(Some(item.quantity))
        })
    }

    /// Set a line's quantity, clamped to `1..=MAX_QUANTITY`. Returns the stored value.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] if the product is not in the cart.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> Result<u32, CartError> {
        self.state().get(product_id).ok_or_else(|| CartError::NotInCart(product_id.clone()))?;
        self.store.update(|state| -> Result<u32, CartError> {
            let item = state.get_mut(product_id)?;
            item.quantity = quantity.clamp(1, MAX_QUANTITY);
            Ok(item.quantity)
        })
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.store.update(|state| state.items.clear());
    }

    pub fn open(&mut self) {
        self.store.update(|state| state.open = true);
    }

    pub fn close(&mut self) {
        self.store.update(|state| state.open = false);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::testing::{sample_product, temp_storage};

    fn cart() -> CartStore {
        CartStore::load(temp_storage())
    }

    #[test]
    fn test_add_merges_existing_line() {
        let mut cart = cart();
        let product = sample_product("1", 220);

        assert_eq!(cart.add(&product, 1), 1);
        assert_eq!(cart.add(&product, 3), 4);
        assert_eq!(cart.state().item_count(), 1);
        assert!(!cart.state().items[0].selected);
    }

    #[test]
    fn test_add_zero_quantity_adds_one() {
        let mut cart = cart();
        assert_eq!(cart.add(&sample_product("1", 220), 0), 1);
    }

    #[test]
    fn test_decrease_never_goes_below_one() {
        let mut cart = cart();
        let product = sample_product("1", 220);
        cart.add(&product, 2);

        assert_eq!(cart.decrease(&product.product_id), Ok(Some(1)));
        assert_eq!(cart.decrease(&product.product_id), Ok(None));
        assert!(cart.state().items.is_empty());
        assert_eq!(
            cart.decrease(&product.product_id),
            Err(CartError::NotInCart(product.product_id))
        );
    }

    #[test]
    fn test_set_quantity_clamps_to_one() {
        let mut cart = cart();
        let product = sample_product("1", 220);
        cart.add(&product, 5);

        assert_eq!(cart.set_quantity(&product.product_id, 0), Ok(1));
        assert_eq!(cart.increase(&product.product_id), Ok(2));
    }

    #[test]
    fn test_quantity_is_capped() {
        let mut cart = cart();
        let product = sample_product("1", 220);
        cart.add(&product, u32::MAX);
        assert_eq!(cart.state().items[0].quantity, MAX_QUANTITY);

        assert_eq!(cart.add(&product, 5), MAX_QUANTITY);
        assert_eq!(cart.increase(&product.product_id), Ok(MAX_QUANTITY));
        assert_eq!(cart.set_quantity(&product.product_id, u32::MAX), Ok(MAX_QUANTITY));
    }

    #[test]
    fn test_huge_price_total_does_not_overflow() {
        let storage = temp_storage();
        let mut item = CartItem::from_product(&sample_product("1", 220), 1);
        item.lprice = serde_json::from_str("\"20000000000000000000\"").unwrap();
        item.quantity = u32::MAX;
        storage.set_item(CART_KEY, &vec![item]).unwrap();

        let mut cart = CartStore::load(storage);
        assert_eq!(cart.state().items[0].quantity, MAX_QUANTITY);
        cart.set_quantity(&ProductId::from("1"), u32::MAX).unwrap();

        let total = cart.state().total_price();
        assert!(total.to_string().ends_with('원'));
        assert_eq!(cart.state().selected_price(), Price::won(0));
    }

    #[test]
    fn test_toggle_all_and_remove_selected() {
        let mut cart = cart();
        for id in ["1", "2", "3"] {
            cart.add(&sample_product(id, 1_000), 1);
        }

        assert_eq!(cart.toggle_selected(&ProductId::from("2")), Ok(true));
        assert!(!cart.state().is_all_selected());

        assert!(cart.toggle_all());
        assert!(cart.state().is_all_selected());
        assert!(!cart.toggle_all());
        assert_eq!(cart.state().selected_count(), 0);

        cart.toggle_selected(&ProductId::from("1")).unwrap();
        cart.toggle_selected(&ProductId::from("3")).unwrap();
        assert_eq!(cart.remove_selected(), 2);
        assert_eq!(
            cart.state()
                .items
                .iter()
                .map(|item| item.product_id.as_str())
                .collect::<Vec<_>>(),
            vec!["2"]
        );
    }

    #[test]
    fn test_totals() {
        let mut cart = cart();
        let jelly = sample_product("1", 220);
        let bag = sample_product("2", 1_500);
        cart.add(&jelly, 3);
        cart.add(&bag, 2);
        cart.toggle_selected(&bag.product_id).unwrap();

        let state = cart.state();
        assert_eq!(state.item_count(), 2);
        assert_eq!(state.total_quantity(), 5);
        assert_eq!(state.total_price(), Price::won(3_660));
        assert_eq!(state.selected_count(), 1);
        assert_eq!(state.selected_price(), Price::won(3_000));
    }

    #[test]
    fn test_persists_and_rehydrates_closed() {
        let storage = temp_storage();
        let product = sample_product("1", 220);

        {
            let mut cart = CartStore::load(storage.clone());
            cart.add(&product, 2);
            cart.open();
            assert!(cart.state().open);
        }

        let cart = CartStore::load(storage);
        assert_eq!(cart.state().items.len(), 1);
        assert_eq!(cart.state().items[0].quantity, 2);
        assert!(!cart.state().open);
    }

    #[test]
    fn test_rehydration_repairs_stored_items() {
        let storage = temp_storage();
        let mut item = CartItem::from_product(&sample_product("1", 220), 1);
        item.quantity = 0;
        storage.set_item(CART_KEY, &vec![item.clone(), item]).unwrap();

        let cart = CartStore::load(storage);
        assert_eq!(cart.state().items.len(), 1);
        assert_eq!(cart.state().items[0].quantity, 1);
    }

    #[test]
    fn test_every_mutation_notifies() {
        let mut cart = cart();
        let badges = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&badges);
        cart.subscribe(move |state: &CartState| seen.lock().unwrap().push(state.item_count()));

        cart.add(&sample_product("1", 220), 1);
        cart.add(&sample_product("2", 220), 1);
        cart.clear();

        assert_eq!(*badges.lock().unwrap(), vec![1, 2, 0]);
    }
}
