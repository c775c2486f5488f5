//! In-memory cart store

use std::sync::Mutex;

use super::{CartError, CartLine, CartStore, normalize_lines};

/// Cart store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryCartStore {
    lines: Mutex<Vec<CartLine>>,
}

impl MemoryCartStore {
    /// Create a store pre-populated with the given lines.
    pub fn with_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        Self {
            lines: Mutex::new(normalize_lines(lines)),
        }
    }
}

impl CartStore for MemoryCartStore {
    fn load(&self) -> Result<Vec<CartLine>, CartError> {
        let lines = self.lines.lock().map_err(|_poisoned| CartError::Poisoned)?;

        Ok(lines.clone())
    }

    fn save(&self, lines: &[CartLine]) -> Result<(), CartError> {
        let mut stored = self.lines.lock().map_err(|_poisoned| CartError::Poisoned)?;

        *stored = normalize_lines(lines.iter().cloned());

        Ok(())
    }

    fn delete_item(&self, product_id: &str) -> Result<(), CartError> {
        let mut stored = self.lines.lock().map_err(|_poisoned| CartError::Poisoned)?;

        stored.retain(|line| line.product_id != product_id);

        Ok(())
    }
}
