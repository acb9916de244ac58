//! Shop Simulation Core
//!
//! The customer-and-shop-day simulation: trend-biased customer generation,
//! match scoring against the display rack, probabilistic purchases, and the
//! timed state machine that walks each customer through the shop.

pub mod day;
pub mod events;
pub mod trend;

pub use day::{
    DEFAULT_DAY_LENGTH_MS, DayStartError, DayState, MAX_ACTIVE_CUSTOMERS, PitchError, ShopDaySim,
    WalkInError, scheduled_customer_count,
};
pub use events::{DaySummary, SaleRecord, SimEvent};
pub use trend::Trend;
