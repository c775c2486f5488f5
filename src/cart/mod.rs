//! Cart
//!
//! The locally persisted cart: a set of `(product id, quantity)` lines keyed by product id.

use std::io;

use mockall::automock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod file;
mod memory;

pub use file::FileCartStore;
pub use memory::MemoryCartStore;

/// Errors raised by cart stores.
#[derive(Debug, Error)]
pub enum CartError {
    /// A cart line must hold at least one unit.
    #[error("quantity for product {0} must be at least 1")]
    InvalidQuantity(String),

    /// The product is not in the cart.
    #[error("product {0} is not in the cart")]
    UnknownProduct(String),

    /// The backing file could not be read or written.
    #[error("cart storage error: {0}")]
    Io(#[from] io::Error),

    /// The backing file does not contain a valid cart.
    #[error("cart storage is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A store lock was poisoned by a panicking writer.
    #[error("cart store lock poisoned")]
    Poisoned,
}

/// A persisted cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product identifier, unique within a cart
    pub product_id: String,

    /// Number of units, always at least one
    pub qty: u32,
}

impl CartLine {
    /// Creates a new cart line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] if `qty` is zero.
    pub fn new(product_id: impl Into<String>, qty: u32) -> Result<Self, CartError> {
        let product_id = product_id.into();

        if qty == 0 {
            return Err(CartError::InvalidQuantity(product_id));
        }

        Ok(Self { product_id, qty })
    }
}

/// Durable key-value store holding the cart.
///
/// Only `load`, `save` and `delete_item` need implementing; the remaining
/// operations are read-modify-write cycles over those three.
#[automock]
pub trait CartStore: Send + Sync {
    /// Load every line in the cart.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the backing storage cannot be read.
    fn load(&self) -> Result<Vec<CartLine>, CartError>;

    /// Replace the cart contents.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the backing storage cannot be written.
    fn save(&self, lines: &[CartLine]) -> Result<(), CartError>;

    /// Delete the line for `product_id`. Deleting an absent product is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the backing storage cannot be updated.
    fn delete_item(&self, product_id: &str) -> Result<(), CartError>;

    /// Add `qty` units of a product, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for a zero quantity, or a storage error.
    fn add_item(&self, product_id: &str, qty: u32) -> Result<(), CartError> {
        let line = CartLine::new(product_id, qty)?;
        let mut lines = self.load()?;

        match lines.iter_mut().find(|l| l.product_id == line.product_id) {
            Some(existing) => existing.qty = existing.qty.saturating_add(line.qty),
            None => lines.push(line),
        }

        self.save(&lines)
    }

    /// Replace the quantity of a product already in the cart. A quantity of
    /// zero deletes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::UnknownProduct`] if the product is not in the cart,
    /// or a storage error.
    fn set_quantity(&self, product_id: &str, qty: u32) -> Result<(), CartError> {
        let mut lines = self.load()?;

        let Some(existing) = lines.iter_mut().find(|l| l.product_id == product_id) else {
            return Err(CartError::UnknownProduct(product_id.to_string()));
        };

        if qty == 0 {
            return self.delete_item(product_id);
        }

        existing.qty = qty;

        self.save(&lines)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if the backing storage cannot be written.
    fn clear(&self) -> Result<(), CartError> {
        self.save(&[])
    }
}

/// Merge lines sharing a product id and drop empty lines.
///
/// First-seen order is preserved so a re-saved cart does not reshuffle.
pub fn normalize_lines(lines: impl IntoIterator<Item = CartLine>) -> Vec<CartLine> {
    let mut positions: FxHashMap<String, usize> = FxHashMap::default();
    let mut merged: Vec<CartLine> = Vec::new();

    for line in lines {
        if line.qty == 0 {
            continue;
        }

        match positions.get(&line.product_id).and_then(|&i| merged.get_mut(i)) {
            Some(existing) => existing.qty = existing.qty.saturating_add(line.qty),
            None => {
                positions.insert(line.product_id.clone(), merged.len());
                merged.push(line);
            }
        }
    }

    merged
}
