use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{RwLock, broadcast};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

mod catalog;
mod customer;
mod db;
mod display;
mod inventory;
mod matching;
mod protocol;
mod scheduler;
mod session;
mod sim;

use catalog::CatalogRegistry;
use customer::{ArchetypeRegistry, CustomerUpdate};
use db::Database;
use inventory::ProductUpdate;
use protocol::{ClientMessage, ServerMessage, SlotData};
use session::ShopSession;
use sim::{DEFAULT_DAY_LENGTH_MS, ShopDaySim, SimEvent, Trend};

// ============================================================================
// App State
// ============================================================================

#[derive(Clone)]
struct AppState {
    rooms: Arc<DashMap<String, Arc<ShopRoom>>>,
    db: Arc<Database>,
    // Static data registries (loaded from TOML at startup)
    catalog: Arc<CatalogRegistry>,
    archetypes: Arc<ArchetypeRegistry>,
}

impl AppState {
    async fn new() -> Self {
        // Initialize database
        let db = Database::new("sqlite:cozy_shop.db?mode=rwc")
            .await
            .expect("Failed to initialize database");

        let data_dir = std::path::Path::new("data");

        // Load product templates and the paint palette
        let mut catalog = CatalogRegistry::new();
        if let Err(e) = catalog.load_from_directory(data_dir) {
            error!("Failed to load product catalog: {}", e);
        }

        // Load customer archetypes
        let mut archetypes = ArchetypeRegistry::new();
        if let Err(e) = archetypes.load_from_directory(&data_dir.join("customers")) {
            error!("Failed to load customer archetypes: {}", e);
        }

        Self {
            rooms: Arc::new(DashMap::new()),
            db: Arc::new(db),
            catalog: Arc::new(catalog),
            archetypes: Arc::new(archetypes),
        }
    }
}

// ============================================================================
// Shop Room
// ============================================================================

struct RoomState {
    session: ShopSession,
    sim: ShopDaySim,
    tick: u64,
}

/// One live shop: the session, its simulator, and the fan-out channel to
/// every connected socket
struct ShopRoom {
    shop_id: String,
    started: Instant,
    state: RwLock<RoomState>,
    broadcast_tx: broadcast::Sender<ServerMessage>,
}

impl ShopRoom {
    fn new(session: ShopSession) -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            shop_id: session.shop_id.clone(),
            started: Instant::now(),
            state: RwLock::new(RoomState {
                session,
                sim: ShopDaySim::new(),
                tick: 0,
            }),
            broadcast_tx: tx,
        }
    }

    /// Milliseconds since this room opened; the simulator's clock
    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.broadcast_tx.subscribe()
    }

    async fn broadcast(&self, msg: ServerMessage) {
        // Ignore send errors (no receivers)
        let _ = self.broadcast_tx.send(msg);
    }

    /// Advance the simulation and fan out whatever it produced
    async fn tick(&self, catalog: &CatalogRegistry, archetypes: &ArchetypeRegistry) {
        let now_ms = self.now_ms();
        let (messages, sync) = {
            let mut guard = self.state.write().await;
            guard.tick += 1;
            let tick = guard.tick;
            let RoomState { session, sim, .. } = &mut *guard;

            sim.advance(session, catalog, archetypes, now_ms);
            let messages: Vec<ServerMessage> = sim
                .drain_events()
                .into_iter()
                .map(|event| sim_event_to_message(event, session))
                .collect();
            (messages, build_state_sync(tick, session, sim))
        };

        for msg in messages {
            self.broadcast(msg).await;
        }
        self.broadcast(sync).await;
    }

    async fn save(&self, db: &Database) {
        let data = self.state.read().await.session.to_save_data();
        if let Err(e) = db.upsert_shop(&data).await {
            warn!("Failed to save shop {}: {}", self.shop_id, e);
        }
    }
}

fn sim_event_to_message(event: SimEvent, session: &ShopSession) -> ServerMessage {
    match event {
        SimEvent::CustomerStateChanged { customer, previous, state } => {
            ServerMessage::CustomerStateChanged {
                customer,
                previous: previous.map(|p| p as u8),
                state: state as u8,
            }
        }
        SimEvent::CustomerThought { customer_id, text } => {
            ServerMessage::CustomerThought { customer_id, text }
        }
        SimEvent::Sale { customer_id, product_id, product_name, price, slot_id } => {
            ServerMessage::SaleMade {
                customer_id,
                product_id,
                product_name,
                price,
                slot_id,
                coins: session.wallet.coins(),
            }
        }
        SimEvent::CustomerLeft { customer_id, made_a_sale } => {
            ServerMessage::CustomerLeft { customer_id, made_a_sale }
        }
        SimEvent::DayStarted { day_number } => ServerMessage::DayStarted { day_number },
        SimEvent::DayEnded { summary } => ServerMessage::day_ended(&summary),
    }
}

fn build_state_sync(tick: u64, session: &ShopSession, sim: &ShopDaySim) -> ServerMessage {
    ServerMessage::StateSync {
        tick,
        coins: session.wallet.coins(),
        day_number: session.day_number,
        day_in_progress: sim.day().in_progress,
        slots: session.display.slots().iter().map(SlotData::from).collect(),
        products: session.inventory.all().iter().map(ProductUpdate::from).collect(),
        customers: sim.customers().iter().map(CustomerUpdate::from).collect(),
    }
}

// ============================================================================
// HTTP Handlers
// ============================================================================

async fn health_check() -> &'static str {
    "OK"
}

#[derive(Serialize)]
struct JoinResponse {
    shop_id: String,
    shop_name: String,
    coins: i64,
    day_number: u32,
}

/// Open (or re-open) a shop by name. Loads the saved session when one
/// exists, otherwise seeds a brand-new shop.
async fn join_or_create(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let name: String = name.trim().chars().take(40).collect();
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, "shop name required").into_response();
    }

    let saved = match state.db.get_shop_by_name(&name).await {
        Ok(saved) => saved,
        Err(e) => {
            error!("Database error looking up shop '{}': {}", name, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "database error").into_response();
        }
    };

    let session = match saved {
        Some(saved) => {
            // Already live? Hand back the existing room's identity.
            if state.rooms.contains_key(&saved.shop_id) {
                return Json(JoinResponse {
                    shop_id: saved.shop_id.clone(),
                    shop_name: saved.shop_name.clone(),
                    coins: saved.coins,
                    day_number: saved.day_number,
                })
                .into_response();
            }
            let mut rng = StdRng::from_entropy();
            let fallback_trend = Trend::seed(&state.catalog, &mut rng);
            ShopSession::from_save_data(&saved, fallback_trend)
        }
        None => {
            let mut rng = StdRng::from_entropy();
            let trend = Trend::seed(&state.catalog, &mut rng);
            let session = ShopSession::new(&name, trend);
            if let Err(e) = state.db.upsert_shop(&session.to_save_data()).await {
                error!("Failed to create shop '{}': {}", name, e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "database error").into_response();
            }
            info!("Created shop '{}' ({})", name, session.shop_id);
            session
        }
    };

    let response = JoinResponse {
        shop_id: session.shop_id.clone(),
        shop_name: session.shop_name.clone(),
        coins: session.wallet.coins(),
        day_number: session.day_number,
    };

    state
        .rooms
        .entry(session.shop_id.clone())
        .or_insert_with(|| Arc::new(ShopRoom::new(session)));

    Json(response).into_response()
}

// ============================================================================
// WebSocket Handling
// ============================================================================

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(shop_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let Some(room) = state.rooms.get(&shop_id).map(|r| r.clone()) else {
        return (StatusCode::NOT_FOUND, "unknown shop").into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state, room))
        .into_response()
}

async fn handle_socket(socket: WebSocket, state: AppState, room: Arc<ShopRoom>) {
    let (mut sender, mut receiver) = socket.split();
    let mut broadcast_rx = room.subscribe();

    // Greet the client with its identity and a full snapshot
    let (welcome, sync) = {
        let guard = room.state.read().await;
        (
            ServerMessage::Welcome {
                shop_id: guard.session.shop_id.clone(),
                shop_name: guard.session.shop_name.clone(),
            },
            build_state_sync(guard.tick, &guard.session, &guard.sim),
        )
    };
    for msg in [welcome, sync] {
        if let Ok(bytes) = protocol::encode_server_message(&msg) {
            let _ = sender.send(Message::Binary(bytes)).await;
        }
    }

    info!("Client connected to shop {}", room.shop_id);

    // Forward room broadcasts to this socket
    let mut send_task = tokio::spawn(async move {
        while let Ok(msg) = broadcast_rx.recv().await {
            if let Ok(bytes) = protocol::encode_server_message(&msg) {
                if sender.send(Message::Binary(bytes)).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle incoming messages
    let room_clone = room.clone();
    let state_clone = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Binary(data) => {
                    if let Err(e) =
                        handle_client_message(&state_clone, &room_clone, &data).await
                    {
                        warn!("Error handling message: {}", e);
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    // Persist on disconnect
    room.save(&state.db).await;
    info!("Client disconnected from shop {}", room.shop_id);
}

fn action_failed(action: &str, err: impl std::fmt::Display) -> ServerMessage {
    ServerMessage::ActionFailed {
        action: action.to_string(),
        reason: err.to_string(),
    }
}

async fn handle_client_message(
    state: &AppState,
    room: &ShopRoom,
    data: &[u8],
) -> Result<(), String> {
    let msg = protocol::decode_client_message(data)?;
    let now_ms = room.now_ms();
    let catalog = state.catalog.as_ref();

    let mut messages: Vec<ServerMessage> = Vec::new();
    {
        let mut guard = room.state.write().await;
        let RoomState { session, sim, tick } = &mut *guard;

        match msg {
            ClientMessage::CreateProduct { template_id, name, price, art_ref } => {
                match session.create_product(catalog, &template_id, &name, price, &art_ref) {
                    Ok(product) => messages.push(ServerMessage::ProductCreated {
                        product: ProductUpdate::from(&product),
                    }),
                    Err(e) => messages.push(action_failed("createProduct", e)),
                }
            }
            ClientMessage::SetPrice { product_id, price } => {
                match session.set_price(catalog, &product_id, price) {
                    Ok(()) => messages.push(ServerMessage::PriceChanged { product_id, price }),
                    Err(e) => messages.push(action_failed("setPrice", e)),
                }
            }
            ClientMessage::DisplayProduct { slot_id, product_id } => {
                match session.display_product(slot_id, &product_id) {
                    Ok(()) => messages.push(ServerMessage::SlotUpdated {
                        slot_id,
                        product_id: Some(product_id),
                    }),
                    Err(e) => messages.push(action_failed("displayProduct", e)),
                }
            }
            ClientMessage::ClearSlot { slot_id } => {
                session.clear_slot(slot_id);
                messages.push(ServerMessage::SlotUpdated { slot_id, product_id: None });
            }
            ClientMessage::StartDay => {
                if let Err(e) = sim.start_day(session, now_ms, DEFAULT_DAY_LENGTH_MS) {
                    messages.push(action_failed("startDay", e));
                }
            }
            ClientMessage::EndDay => {
                sim.end_day(session, catalog, now_ms);
            }
            ClientMessage::WalkIn => {
                if let Err(e) = sim.walk_in(session, catalog, now_ms) {
                    messages.push(action_failed("walkIn", e));
                }
            }
            ClientMessage::PitchProduct { customer_id, product_id } => {
                if let Err(e) = sim.pitch_product(session, &customer_id, &product_id, now_ms) {
                    messages.push(action_failed("pitchProduct", e));
                }
            }
            ClientMessage::RequestState => {
                messages.push(build_state_sync(*tick, session, sim));
            }
        }

        // Surface whatever the simulator emitted synchronously so responses
        // don't wait for the next tick
        for event in sim.drain_events() {
            messages.push(sim_event_to_message(event, session));
        }
    }

    for msg in messages {
        room.broadcast(msg).await;
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cozy_shop_server=info".parse().unwrap()),
        )
        .init();

    let state = AppState::new().await;

    // Spawn simulation tick loop
    let tick_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(50)); // 20 Hz
        loop {
            interval.tick().await;
            for room in tick_state.rooms.iter() {
                room.tick(&tick_state.catalog, &tick_state.archetypes).await;
            }
        }
    });

    // Spawn auto-save loop (every 30 seconds)
    let save_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            let mut saved_count = 0;
            for room in save_state.rooms.iter() {
                room.save(&save_state.db).await;
                saved_count += 1;
            }
            if saved_count > 0 {
                info!("Auto-saved {} shop(s)", saved_count);
            }
        }
    });

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/shops/joinOrCreate/:name", post(join_or_create))
        .route("/ws/:shop_id", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Cozy shop server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");
    axum::serve(listener, app).await.expect("Server error");
}
