use serde::{Deserialize, Serialize};

// ============================================================================
// Display Slots
// ============================================================================

pub const DEFAULT_DISPLAY_CAPACITY: usize = 6;

/// A fixed shop location that can hold zero or one product for sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySlot {
    pub id: usize,
    pub product_id: Option<String>,
}

impl DisplaySlot {
    pub fn filled(&self) -> bool {
        self.product_id.is_some()
    }
}

/// The shop's display rack: a fixed number of slots created at session init.
/// Slots are never destroyed; only their contents change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayRack {
    slots: Vec<DisplaySlot>,
}

impl DisplayRack {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|id| DisplaySlot { id, product_id: None }).collect(),
        }
    }

    pub fn slots(&self) -> &[DisplaySlot] {
        &self.slots
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn filled_count(&self) -> usize {
        self.slots.iter().filter(|s| s.filled()).count()
    }

    /// Place a product in a slot. Refuses unknown slots, occupied slots, and
    /// products already on display elsewhere.
    pub fn assign(&mut self, slot_id: usize, product_id: &str) -> bool {
        if self.slot_of(product_id).is_some() {
            return false;
        }
        match self.slots.get_mut(slot_id) {
            Some(slot) if !slot.filled() => {
                slot.product_id = Some(product_id.to_string());
                true
            }
            _ => false,
        }
    }

    /// Empty a slot, returning the product that was in it
    pub fn clear(&mut self, slot_id: usize) -> Option<String> {
        self.slots.get_mut(slot_id).and_then(|slot| slot.product_id.take())
    }

    /// Find which slot holds a product, if any
    pub fn slot_of(&self, product_id: &str) -> Option<usize> {
        self.slots
            .iter()
            .find(|s| s.product_id.as_deref() == Some(product_id))
            .map(|s| s.id)
    }

    /// Remove a product from wherever it is displayed. Returns the slot it
    /// occupied, or None if it wasn't on display.
    pub fn remove_product(&mut self, product_id: &str) -> Option<usize> {
        let slot_id = self.slot_of(product_id)?;
        self.slots[slot_id].product_id = None;
        Some(slot_id)
    }

    /// IDs of every product currently on display, in slot order
    pub fn displayed_product_ids(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter_map(|s| s.product_id.as_deref())
            .collect()
    }
}

impl Default for DisplayRack {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_CAPACITY)
    }
}
