//! Shop Day Simulator
//!
//! Drives each customer through Entering -> Browsing -> {Buying -> Leaving |
//! Leaving}, schedules arrivals across the day, and settles sales against
//! the session's inventory, display rack, and wallet. All timing runs
//! through the deterministic timer queue, so tests advance virtual time
//! instead of sleeping.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::events::{DaySummary, SaleRecord, SimEvent};
use crate::catalog::CatalogRegistry;
use crate::customer::{
    ArchetypeRegistry, Customer, CustomerState, CustomerUpdate, ProfileMode, generate_preferences,
};
use crate::inventory::Product;
use crate::matching::{self, Policy};
use crate::scheduler::TimerQueue;
use crate::session::ShopSession;

// ============================================================================
// Constants
// ============================================================================

pub const DEFAULT_DAY_LENGTH_MS: u64 = 60_000;
pub const MAX_ACTIVE_CUSTOMERS: usize = 6;

/// Door-to-floor walk time
const TRANSIT_DELAY_MS: u64 = 2_000;
/// Leave-signal-to-removal window (the exit animation on the client)
const EXIT_DELAY_MS: u64 = 1_000;
/// Arrivals land in this fraction of the day
const SPAWN_WINDOW_START: f64 = 0.1;
const SPAWN_WINDOW_END: f64 = 0.7;

const NO_MATCH_THOUGHTS: &[&str] = &[
    "Hmm, nothing really catches my eye...",
    "Cute shop! Not my style though.",
    "Maybe another day.",
];

const DECLINE_THOUGHTS: &[&str] = &[
    "It's nice, but I'll pass.",
    "Maybe next time...",
    "I should save my coins.",
];

const BOUGHT_THOUGHTS: &[&str] = &[
    "I love it!",
    "This is perfect!",
    "Exactly what I wanted!",
];

const IMPATIENT_THOUGHTS: &[&str] = &[
    "I can't wait around all day...",
    "Nobody's helping me. I'm off.",
];

const GONE_THOUGHT: &str = "Oh... someone already grabbed it.";

/// How many arrivals to schedule for a given day, clamped at 8
pub fn scheduled_customer_count(day_number: u32) -> u32 {
    (3 + day_number / 2).min(8)
}

// ============================================================================
// Timers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerOwner {
    Day,
    Customer(String),
}

#[derive(Debug, Clone)]
enum SimTimer {
    SpawnCustomer,
    BeginBrowsing { customer_id: String },
    ResolvePurchase { customer_id: String },
    BeginLeaving { customer_id: String },
    RemoveCustomer { customer_id: String },
    PatienceExpired { customer_id: String },
    EndDay,
}

// ============================================================================
// Day State
// ============================================================================

#[derive(Debug, Clone)]
pub struct DayState {
    pub in_progress: bool,
    pub day_length_ms: u64,
    pub scheduled_spawn_count: u32,
    pub customers_visited: u32,
    sales: Vec<SaleRecord>,
}

impl Default for DayState {
    fn default() -> Self {
        Self {
            in_progress: false,
            day_length_ms: DEFAULT_DAY_LENGTH_MS,
            scheduled_spawn_count: 0,
            customers_visited: 0,
            sales: Vec::new(),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DayStartError {
    #[error("no products are on display")]
    NoProductsDisplayed,

    #[error("a day is already in progress")]
    DayAlreadyRunning,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalkInError {
    #[error("the shop floor is full")]
    ShopFull,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PitchError {
    #[error("unknown customer: {0}")]
    UnknownCustomer(String),

    #[error("customer {0} is not browsing")]
    CustomerBusy(String),

    #[error("product {0} is not on display")]
    ProductUnavailable(String),
}

// ============================================================================
// Simulator
// ============================================================================

pub struct ShopDaySim {
    timers: TimerQueue<TimerOwner, SimTimer>,
    rng: StdRng,
    /// Active customers in arrival order
    customers: Vec<Customer>,
    day: DayState,
    events: Vec<SimEvent>,
}

impl ShopDaySim {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Fixed-seed simulator for deterministic runs
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            timers: TimerQueue::new(),
            rng,
            customers: Vec::new(),
            day: DayState::default(),
            events: Vec::new(),
        }
    }

    pub fn day(&self) -> &DayState {
        &self.day
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    /// Take everything emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    fn customer(&self, customer_id: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == customer_id)
    }

    fn customer_mut(&mut self, customer_id: &str) -> Option<&mut Customer> {
        self.customers.iter_mut().find(|c| c.id == customer_id)
    }

    // ------------------------------------------------------------------
    // Day lifecycle
    // ------------------------------------------------------------------

    /// Open the shop for a day. Refused when nothing is on display.
    pub fn start_day(
        &mut self,
        session: &mut ShopSession,
        now_ms: u64,
        day_length_ms: u64,
    ) -> Result<(), DayStartError> {
        if self.day.in_progress {
            return Err(DayStartError::DayAlreadyRunning);
        }
        if session.display.filled_count() == 0 {
            return Err(DayStartError::NoProductsDisplayed);
        }

        // Sweep leftover walk-ins from between days
        let leftover: Vec<String> = self.customers.iter().map(|c| c.id.clone()).collect();
        self.customers.clear();
        for id in leftover {
            self.timers.cancel_owner(&TimerOwner::Customer(id));
        }

        let spawn_count = scheduled_customer_count(session.day_number);
        self.day = DayState {
            in_progress: true,
            day_length_ms,
            scheduled_spawn_count: spawn_count,
            customers_visited: 0,
            sales: Vec::new(),
        };

        for _ in 0..spawn_count {
            let offset =
                self.rng.gen_range(SPAWN_WINDOW_START..SPAWN_WINDOW_END) * day_length_ms as f64;
            self.timers
                .schedule(now_ms + offset as u64, TimerOwner::Day, SimTimer::SpawnCustomer);
        }
        self.timers
            .schedule(now_ms + day_length_ms, TimerOwner::Day, SimTimer::EndDay);

        info!(
            "Day {} open: {} customers scheduled over {}ms",
            session.day_number, spawn_count, day_length_ms
        );
        self.events.push(SimEvent::DayStarted { day_number: session.day_number });
        Ok(())
    }

    /// Close up early. No-op when no day is running.
    pub fn end_day(&mut self, session: &mut ShopSession, catalog: &CatalogRegistry, now_ms: u64) {
        self.finish_day(session, catalog, now_ms);
    }

    /// Drive the simulation to `now_ms`, firing every due timer in order
    pub fn advance(
        &mut self,
        session: &mut ShopSession,
        catalog: &CatalogRegistry,
        archetypes: &ArchetypeRegistry,
        now_ms: u64,
    ) {
        while let Some((at_ms, timer)) = self.timers.pop_due(now_ms) {
            self.handle_timer(session, catalog, archetypes, timer, at_ms);
        }
    }

    // ------------------------------------------------------------------
    // Walk-ins (the ad-hoc customer path)
    // ------------------------------------------------------------------

    /// Let a passerby in. Walk-ins browse and then wait to be served; their
    /// patience timer shows them the door if the player never pitches
    /// anything.
    pub fn walk_in(
        &mut self,
        session: &ShopSession,
        catalog: &CatalogRegistry,
        now_ms: u64,
    ) -> Result<String, WalkInError> {
        if self.customers.len() >= MAX_ACTIVE_CUSTOMERS {
            return Err(WalkInError::ShopFull);
        }

        let prefs =
            generate_preferences(&session.trend, catalog, ProfileMode::WalkIn, &mut self.rng);
        let customer = Customer::walk_in(prefs, now_ms);
        let customer_id = customer.id.clone();
        self.admit(customer, now_ms);
        Ok(customer_id)
    }

    /// Player shows a product to a browsing walk-in. Resolves immediately
    /// under the exploratory policy. Returns whether the sale happened.
    pub fn pitch_product(
        &mut self,
        session: &mut ShopSession,
        customer_id: &str,
        product_id: &str,
        now_ms: u64,
    ) -> Result<bool, PitchError> {
        let customer = self
            .customer(customer_id)
            .ok_or_else(|| PitchError::UnknownCustomer(customer_id.to_string()))?;
        if customer.state != CustomerState::Browsing {
            return Err(PitchError::CustomerBusy(customer_id.to_string()));
        }
        let prefs = customer.preferences.clone();

        let product = match (
            session.inventory.find_by_id(product_id),
            session.display.slot_of(product_id),
        ) {
            (Some(product), Some(_)) => product.clone(),
            _ => return Err(PitchError::ProductUnavailable(product_id.to_string())),
        };

        self.set_state(customer_id, CustomerState::Buying);

        if matching::decide_purchase(Policy::Exploratory, &product, &prefs, &mut self.rng) {
            self.complete_sale(session, customer_id, &product, now_ms);
            Ok(true)
        } else {
            self.think_one_of(customer_id, DECLINE_THOUGHTS);
            self.begin_leaving(customer_id, now_ms);
            Ok(false)
        }
    }

    // ------------------------------------------------------------------
    // Timer handlers
    // ------------------------------------------------------------------

    fn handle_timer(
        &mut self,
        session: &mut ShopSession,
        catalog: &CatalogRegistry,
        archetypes: &ArchetypeRegistry,
        timer: SimTimer,
        at_ms: u64,
    ) {
        match timer {
            SimTimer::SpawnCustomer => self.handle_spawn(session, catalog, archetypes, at_ms),
            SimTimer::BeginBrowsing { customer_id } => {
                self.handle_begin_browsing(session, &customer_id, at_ms)
            }
            SimTimer::ResolvePurchase { customer_id } => {
                self.handle_resolve_purchase(session, &customer_id, at_ms)
            }
            SimTimer::BeginLeaving { customer_id } => self.begin_leaving(&customer_id, at_ms),
            SimTimer::RemoveCustomer { customer_id } => self.handle_remove(&customer_id),
            SimTimer::PatienceExpired { customer_id } => {
                self.handle_patience(&customer_id, at_ms)
            }
            SimTimer::EndDay => self.finish_day(session, catalog, at_ms),
        }
    }

    fn handle_spawn(
        &mut self,
        session: &ShopSession,
        catalog: &CatalogRegistry,
        archetypes: &ArchetypeRegistry,
        at_ms: u64,
    ) {
        if !self.day.in_progress {
            return;
        }
        if self.customers.len() >= MAX_ACTIVE_CUSTOMERS {
            debug!("shop floor full, arrival turned away");
            return;
        }
        let Some(archetype) = archetypes.random(&mut self.rng) else {
            warn!("no customer archetypes loaded; skipping arrival");
            return;
        };

        let prefs = generate_preferences(
            &session.trend,
            catalog,
            ProfileMode::Archetype(archetype),
            &mut self.rng,
        );
        let customer = Customer::from_archetype(archetype, prefs, at_ms);
        let tagline = archetype.tagline.clone();

        self.day.customers_visited += 1;
        let customer_id = customer.id.clone();
        self.admit(customer, at_ms);
        if !tagline.is_empty() {
            self.think(&customer_id, tagline);
        }
    }

    /// Put a new customer on the floor in Entering state and arm its timers
    fn admit(&mut self, customer: Customer, now_ms: u64) {
        let owner = TimerOwner::Customer(customer.id.clone());
        self.timers.schedule(
            now_ms + TRANSIT_DELAY_MS,
            owner.clone(),
            SimTimer::BeginBrowsing { customer_id: customer.id.clone() },
        );
        self.timers.schedule(
            now_ms + customer.preferences.patience_ms,
            owner,
            SimTimer::PatienceExpired { customer_id: customer.id.clone() },
        );

        debug!("customer {} ({}) entering", customer.id, customer.display_name);
        self.events.push(SimEvent::CustomerStateChanged {
            customer: CustomerUpdate::from(&customer),
            previous: None,
            state: CustomerState::Entering,
        });
        self.customers.push(customer);
    }

    fn handle_begin_browsing(&mut self, session: &ShopSession, customer_id: &str, at_ms: u64) {
        let Some(customer) = self.customer(customer_id) else { return };
        if customer.state != CustomerState::Entering {
            return;
        }
        let is_walk_in = customer.archetype_id.is_none();
        if !is_walk_in && !self.day.in_progress {
            // Day closed while they were in the doorway; end_day is about to
            // turn them around
            return;
        }
        let prefs = customer.preferences.clone();
        let displayed = session.displayed_products();

        if is_walk_in {
            // Walk-ins wait to be served; the best match is only a hint for
            // the player (and the thought bubble)
            let hint = matching::best_match(displayed.iter().copied(), &prefs)
                .map(|p| (p.id.clone(), p.name.clone()));
            if let Some((product_id, _)) = &hint {
                let product_id = product_id.clone();
                if let Some(c) = self.customer_mut(customer_id) {
                    c.interested_product_id = Some(product_id);
                }
            }
            self.set_state(customer_id, CustomerState::Browsing);
            if let Some((_, name)) = hint {
                self.think(customer_id, format!("That {} looks interesting...", name));
            }
            return;
        }

        let eligible: Vec<&Product> = displayed
            .iter()
            .copied()
            .filter(|p| matching::is_eligible(p, &prefs))
            .collect();
        let pick = eligible
            .choose(&mut self.rng)
            .map(|p| (p.id.clone(), p.name.clone()));

        match pick {
            None => {
                // Nothing speaks to them; a short deliberation, then out
                self.set_state(customer_id, CustomerState::Browsing);
                self.think_one_of(customer_id, NO_MATCH_THOUGHTS);
                let delay = self.rng.gen_range(1_000..3_000);
                self.timers.schedule(
                    at_ms + delay,
                    TimerOwner::Customer(customer_id.to_string()),
                    SimTimer::BeginLeaving { customer_id: customer_id.to_string() },
                );
            }
            Some((product_id, name)) => {
                if let Some(c) = self.customer_mut(customer_id) {
                    c.interested_product_id = Some(product_id);
                }
                self.set_state(customer_id, CustomerState::Browsing);
                let thought = interest_thought(&mut self.rng, &name);
                self.think(customer_id, thought);
                let delay = self.rng.gen_range(2_000..5_000);
                self.timers.schedule(
                    at_ms + delay,
                    TimerOwner::Customer(customer_id.to_string()),
                    SimTimer::ResolvePurchase { customer_id: customer_id.to_string() },
                );
            }
        }
    }

    fn handle_resolve_purchase(
        &mut self,
        session: &mut ShopSession,
        customer_id: &str,
        at_ms: u64,
    ) {
        let Some(customer) = self.customer(customer_id) else { return };
        if customer.state != CustomerState::Browsing {
            return;
        }
        let prefs = customer.preferences.clone();
        let Some(product_id) = customer.interested_product_id.clone() else {
            self.begin_leaving(customer_id, at_ms);
            return;
        };

        self.set_state(customer_id, CustomerState::Buying);

        // The product may have been sold or pulled while this customer
        // deliberated
        let product = match (
            session.inventory.find_by_id(&product_id),
            session.display.slot_of(&product_id),
        ) {
            (Some(product), Some(_)) => product.clone(),
            _ => {
                debug!("customer {}: product {} gone before purchase", customer_id, product_id);
                self.think(customer_id, GONE_THOUGHT.to_string());
                self.begin_leaving(customer_id, at_ms);
                return;
            }
        };

        if matching::decide_purchase(Policy::ShopFloor, &product, &prefs, &mut self.rng) {
            self.complete_sale(session, customer_id, &product, at_ms);
        } else {
            self.think_one_of(customer_id, DECLINE_THOUGHTS);
            self.begin_leaving(customer_id, at_ms);
        }
    }

    /// Settle a sale: free the slot, destroy the product, pay the player.
    /// Runs synchronously inside one timer handler, so no other event ever
    /// observes a half-applied sale.
    fn complete_sale(
        &mut self,
        session: &mut ShopSession,
        customer_id: &str,
        product: &Product,
        at_ms: u64,
    ) {
        let Some(slot_id) = session.display.remove_product(&product.id) else {
            warn!("sale of {} raced its display slot; treating as gone", product.id);
            self.begin_leaving(customer_id, at_ms);
            return;
        };
        session.inventory.remove(&product.id);
        session.wallet.credit(product.price);
        session.lifetime_items_sold += 1;
        session.lifetime_customers_served += 1;

        if self.day.in_progress {
            self.day.sales.push(SaleRecord {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                price: product.price,
                customer_id: customer_id.to_string(),
            });
        }

        info!("Sold '{}' for {} coins", product.name, product.price);
        self.events.push(SimEvent::Sale {
            customer_id: customer_id.to_string(),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            price: product.price,
            slot_id,
        });
        self.think_one_of(customer_id, BOUGHT_THOUGHTS);

        if let Some(customer) = self.customer_mut(customer_id) {
            customer.made_a_sale = true;
        }
        self.begin_leaving(customer_id, at_ms);
    }

    /// Move a customer into Leaving: emit the leave signal now, remove them
    /// after the exit delay, and drop any timers they still own
    fn begin_leaving(&mut self, customer_id: &str, at_ms: u64) {
        let Some(customer) = self.customer(customer_id) else { return };
        if customer.state == CustomerState::Leaving {
            return;
        }
        let made_a_sale = customer.made_a_sale;
        let owner = TimerOwner::Customer(customer_id.to_string());

        self.timers.cancel_owner(&owner);
        self.set_state(customer_id, CustomerState::Leaving);
        self.events.push(SimEvent::CustomerLeft {
            customer_id: customer_id.to_string(),
            made_a_sale,
        });
        self.timers.schedule(
            at_ms + EXIT_DELAY_MS,
            owner,
            SimTimer::RemoveCustomer { customer_id: customer_id.to_string() },
        );
    }

    fn handle_remove(&mut self, customer_id: &str) {
        // Cancellation here is a no-op in the common case; it exists for
        // timers armed between the leave signal and this removal
        self.timers.cancel_owner(&TimerOwner::Customer(customer_id.to_string()));
        self.customers.retain(|c| c.id != customer_id);
    }

    fn handle_patience(&mut self, customer_id: &str, at_ms: u64) {
        let Some(customer) = self.customer(customer_id) else { return };
        if customer.state == CustomerState::Leaving {
            return;
        }
        debug!("customer {} ran out of patience", customer_id);
        self.think_one_of(customer_id, IMPATIENT_THOUGHTS);
        self.begin_leaving(customer_id, at_ms);
    }

    fn finish_day(&mut self, session: &mut ShopSession, catalog: &CatalogRegistry, at_ms: u64) {
        if !self.day.in_progress {
            return;
        }
        self.day.in_progress = false;
        self.timers.cancel_owner(&TimerOwner::Day);

        // Everyone still inside heads for the door
        let lingering: Vec<String> = self
            .customers
            .iter()
            .filter(|c| c.state != CustomerState::Leaving)
            .map(|c| c.id.clone())
            .collect();
        for customer_id in lingering {
            self.begin_leaving(&customer_id, at_ms);
        }

        let summary = DaySummary {
            day_number: session.day_number,
            items_sold: self.day.sales.len() as u32,
            revenue: self.day.sales.iter().map(|s| s.price).sum(),
            customers_visited: self.day.customers_visited,
        };
        info!(
            "Day {} closed: {} sold for {} coins, {} visitors",
            summary.day_number, summary.items_sold, summary.revenue, summary.customers_visited
        );

        session.day_number += 1;
        session.trend.drift(catalog, &mut self.rng);
        self.events.push(SimEvent::DayEnded { summary });
    }

    // ------------------------------------------------------------------
    // Event helpers
    // ------------------------------------------------------------------

    fn set_state(&mut self, customer_id: &str, state: CustomerState) {
        let Some(customer) = self.customer_mut(customer_id) else { return };
        let previous = customer.state;
        if previous == state {
            return;
        }
        customer.state = state;
        let update = CustomerUpdate::from(&*customer);
        debug!(
            "customer {} {} -> {}",
            customer_id,
            previous.as_str(),
            state.as_str()
        );
        self.events.push(SimEvent::CustomerStateChanged {
            customer: update,
            previous: Some(previous),
            state,
        });
    }

    fn think(&mut self, customer_id: &str, text: String) {
        self.events.push(SimEvent::CustomerThought {
            customer_id: customer_id.to_string(),
            text,
        });
    }

    fn think_one_of(&mut self, customer_id: &str, pool: &[&str]) {
        let text = pool
            .choose(&mut self.rng)
            .copied()
            .unwrap_or_default()
            .to_string();
        self.think(customer_id, text);
    }
}

impl Default for ShopDaySim {
    fn default() -> Self {
        Self::new()
    }
}

fn interest_thought<R: Rng>(rng: &mut R, product_name: &str) -> String {
    match rng.gen_range(0..3) {
        0 => format!("Ooh, {}! So cute!", product_name),
        1 => format!("That {} is calling my name...", product_name),
        _ => format!("I've been looking for a {}!", product_name),
    }
}
