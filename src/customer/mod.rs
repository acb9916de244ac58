//! Customers
//!
//! The simulated shoppers: archetype data, preference generation, and the
//! per-customer state machine data driven by the day simulator.

pub mod archetype;
pub mod profile;

use serde::Serialize;
use uuid::Uuid;

pub use archetype::{ArchetypeRegistry, CustomerArchetype};
pub use profile::{Budget, CustomerPreferences, ProfileMode, generate_preferences};

// ============================================================================
// Customer State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CustomerState {
    Entering = 0,
    Browsing = 1,
    Buying = 2,
    Leaving = 3,
}

impl CustomerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerState::Entering => "entering",
            CustomerState::Browsing => "browsing",
            CustomerState::Buying => "buying",
            CustomerState::Leaving => "leaving",
        }
    }
}

// ============================================================================
// Customer Entity
// ============================================================================

#[derive(Debug, Clone)]
pub struct Customer {
    pub id: String,
    /// Archetype ID for typed shop-day customers; None for walk-ins
    pub archetype_id: Option<String>,
    pub display_name: String,
    pub sprite: String,
    pub preferences: CustomerPreferences,
    pub state: CustomerState,
    /// The one product this customer has settled on, if any
    pub interested_product_id: Option<String>,
    pub entered_at_ms: u64,
    pub made_a_sale: bool,
}

impl Customer {
    /// Create a typed shop-day customer from an archetype
    pub fn from_archetype(
        archetype: &CustomerArchetype,
        preferences: CustomerPreferences,
        entered_at_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            archetype_id: Some(archetype.id.clone()),
            display_name: archetype.display_name.clone(),
            sprite: archetype.sprite.clone(),
            preferences,
            state: CustomerState::Entering,
            interested_product_id: None,
            entered_at_ms,
            made_a_sale: false,
        }
    }

    /// Create an untyped walk-in customer (the ad-hoc generation path)
    pub fn walk_in(preferences: CustomerPreferences, entered_at_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            archetype_id: None,
            display_name: "Passerby".to_string(),
            sprite: "walk_in".to_string(),
            preferences,
            state: CustomerState::Entering,
            interested_product_id: None,
            entered_at_ms,
            made_a_sale: false,
        }
    }
}

// ============================================================================
// Customer Update for Network Sync
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CustomerUpdate {
    pub id: String,
    pub display_name: String,
    pub sprite: String,
    pub state: u8,
    pub interested_product_id: Option<String>,
}

impl From<&Customer> for CustomerUpdate {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id.clone(),
            display_name: customer.display_name.clone(),
            sprite: customer.sprite.clone(),
            state: customer.state as u8,
            interested_product_id: customer.interested_product_id.clone(),
        }
    }
}
