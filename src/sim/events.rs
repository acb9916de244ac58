//! Simulation Event Types
//!
//! Events the simulator emits for the presentation layer. The server drains
//! these each tick and maps them onto wire messages.

use serde::Serialize;

use crate::customer::{CustomerState, CustomerUpdate};

/// One completed sale, accumulated during a day for the summary
#[derive(Debug, Clone)]
pub struct SaleRecord {
    pub product_id: String,
    pub product_name: String,
    pub price: i64,
    pub customer_id: String,
}

/// End-of-day totals, derived from the sale records and the spawn counter
#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub day_number: u32,
    pub items_sold: u32,
    pub revenue: i64,
    pub customers_visited: u32,
}

/// Events surfaced to the presentation layer
#[derive(Debug, Clone)]
pub enum SimEvent {
    /// A customer moved through its state machine. `previous` is None on
    /// spawn.
    CustomerStateChanged {
        customer: CustomerUpdate,
        previous: Option<CustomerState>,
        state: CustomerState,
    },

    /// Thought-bubble text for the UI
    CustomerThought {
        customer_id: String,
        text: String,
    },

    /// A product was sold off its display slot
    Sale {
        customer_id: String,
        product_id: String,
        product_name: String,
        price: i64,
        slot_id: usize,
    },

    /// A customer started leaving; removal follows after the exit delay
    CustomerLeft {
        customer_id: String,
        made_a_sale: bool,
    },

    DayStarted {
        day_number: u32,
    },

    DayEnded {
        summary: DaySummary,
    },
}

impl SimEvent {
    /// Get event type as string (for logging/debugging)
    pub fn event_type(&self) -> &'static str {
        match self {
            SimEvent::CustomerStateChanged { .. } => "customer_state_changed",
            SimEvent::CustomerThought { .. } => "customer_thought",
            SimEvent::Sale { .. } => "sale",
            SimEvent::CustomerLeft { .. } => "customer_left",
            SimEvent::DayStarted { .. } => "day_started",
            SimEvent::DayEnded { .. } => "day_ended",
        }
    }
}
