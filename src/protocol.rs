use serde::{Deserialize, Serialize};

use crate::customer::CustomerUpdate;
use crate::display::DisplaySlot;
use crate::inventory::ProductUpdate;
use crate::sim::DaySummary;

// ============================================================================
// Client -> Server Messages
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Finish a design: mint a product from a template plus artwork
    #[serde(rename = "createProduct")]
    CreateProduct {
        template_id: String,
        name: String,
        price: i64,
        art_ref: String,
    },

    /// Re-price an inventory product
    #[serde(rename = "setPrice")]
    SetPrice { product_id: String, price: i64 },

    /// Put a product on a display slot
    #[serde(rename = "displayProduct")]
    DisplayProduct { slot_id: usize, product_id: String },

    /// Take whatever is in a slot off display
    #[serde(rename = "clearSlot")]
    ClearSlot { slot_id: usize },

    #[serde(rename = "startDay")]
    StartDay,

    #[serde(rename = "endDay")]
    EndDay,

    /// Invite a passerby in (the ad-hoc customer path)
    #[serde(rename = "walkIn")]
    WalkIn,

    /// Show a product to a browsing walk-in
    #[serde(rename = "pitchProduct")]
    PitchProduct { customer_id: String, product_id: String },

    /// Ask for a fresh full state sync
    #[serde(rename = "requestState")]
    RequestState,
}

// ============================================================================
// Server -> Client Messages
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Welcome {
        shop_id: String,
        shop_name: String,
    },
    StateSync {
        tick: u64,
        coins: i64,
        day_number: u32,
        day_in_progress: bool,
        slots: Vec<SlotData>,
        products: Vec<ProductUpdate>,
        customers: Vec<CustomerUpdate>,
    },
    ProductCreated {
        product: ProductUpdate,
    },
    PriceChanged {
        product_id: String,
        price: i64,
    },
    SlotUpdated {
        slot_id: usize,
        product_id: Option<String>,
    },
    CustomerStateChanged {
        customer: CustomerUpdate,
        /// Previous state code; None when the customer just spawned
        previous: Option<u8>,
        state: u8,
    },
    CustomerThought {
        customer_id: String,
        text: String,
    },
    SaleMade {
        customer_id: String,
        product_id: String,
        product_name: String,
        price: i64,
        slot_id: usize,
        coins: i64,
    },
    CustomerLeft {
        customer_id: String,
        made_a_sale: bool,
    },
    DayStarted {
        day_number: u32,
    },
    DayEnded {
        day_number: u32,
        items_sold: u32,
        revenue: i64,
        customers_visited: u32,
    },
    /// A player action was refused; always user-correctable
    ActionFailed {
        action: String,
        reason: String,
    },
}

/// Display slot view for network sync
#[derive(Debug, Clone, Serialize)]
pub struct SlotData {
    pub slot_id: usize,
    pub product_id: Option<String>,
}

impl From<&DisplaySlot> for SlotData {
    fn from(slot: &DisplaySlot) -> Self {
        Self {
            slot_id: slot.id,
            product_id: slot.product_id.clone(),
        }
    }
}

impl ServerMessage {
    pub fn msg_type(&self) -> &'static str {
        match self {
            ServerMessage::Welcome { .. } => "welcome",
            ServerMessage::StateSync { .. } => "stateSync",
            ServerMessage::ProductCreated { .. } => "productCreated",
            ServerMessage::PriceChanged { .. } => "priceChanged",
            ServerMessage::SlotUpdated { .. } => "slotUpdated",
            ServerMessage::CustomerStateChanged { .. } => "customerStateChanged",
            ServerMessage::CustomerThought { .. } => "customerThought",
            ServerMessage::SaleMade { .. } => "saleMade",
            ServerMessage::CustomerLeft { .. } => "customerLeft",
            ServerMessage::DayStarted { .. } => "dayStarted",
            ServerMessage::DayEnded { .. } => "dayEnded",
            ServerMessage::ActionFailed { .. } => "actionFailed",
        }
    }

    pub fn day_ended(summary: &DaySummary) -> Self {
        ServerMessage::DayEnded {
            day_number: summary.day_number,
            items_sold: summary.items_sold,
            revenue: summary.revenue,
            customers_visited: summary.customers_visited,
        }
    }
}

// ============================================================================
// Encoding/Decoding
// ============================================================================

use rmpv::Value;

fn entry(key: &str, value: Value) -> (Value, Value) {
    (Value::String(key.into()), value)
}

fn str_value(v: &str) -> Value {
    Value::String(v.into())
}

fn int_value(v: i64) -> Value {
    Value::Integer(v.into())
}

fn opt_str_value(v: &Option<String>) -> Value {
    match v {
        Some(s) => str_value(s),
        None => Value::Nil,
    }
}

fn customer_value(customer: &CustomerUpdate) -> Value {
    Value::Map(vec![
        entry("id", str_value(&customer.id)),
        entry("displayName", str_value(&customer.display_name)),
        entry("sprite", str_value(&customer.sprite)),
        entry("state", int_value(customer.state as i64)),
        entry(
            "interestedProductId",
            opt_str_value(&customer.interested_product_id),
        ),
    ])
}

fn product_value(product: &ProductUpdate) -> Value {
    Value::Map(vec![
        entry("id", str_value(&product.id)),
        entry("templateId", str_value(&product.template_id)),
        entry("name", str_value(&product.name)),
        entry("price", int_value(product.price)),
        entry("artRef", str_value(&product.art_ref)),
        entry("displayed", Value::Boolean(product.displayed)),
    ])
}

fn slot_value(slot: &SlotData) -> Value {
    Value::Map(vec![
        entry("slotId", int_value(slot.slot_id as i64)),
        entry("productId", opt_str_value(&slot.product_id)),
    ])
}

/// Encode a server message to MessagePack format
/// Format: [13, "msg_type", {data}] (matching Colyseus ROOM_DATA protocol)
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, String> {
    let data = match msg {
        ServerMessage::Welcome { shop_id, shop_name } => Value::Map(vec![
            entry("shopId", str_value(shop_id)),
            entry("shopName", str_value(shop_name)),
        ]),
        ServerMessage::StateSync {
            tick,
            coins,
            day_number,
            day_in_progress,
            slots,
            products,
            customers,
        } => Value::Map(vec![
            entry("tick", Value::Integer((*tick).into())),
            entry("coins", int_value(*coins)),
            entry("dayNumber", int_value(*day_number as i64)),
            entry("dayInProgress", Value::Boolean(*day_in_progress)),
            entry("slots", Value::Array(slots.iter().map(slot_value).collect())),
            entry(
                "products",
                Value::Array(products.iter().map(product_value).collect()),
            ),
            entry(
                "customers",
                Value::Array(customers.iter().map(customer_value).collect()),
            ),
        ]),
        ServerMessage::ProductCreated { product } => {
            Value::Map(vec![entry("product", product_value(product))])
        }
        ServerMessage::PriceChanged { product_id, price } => Value::Map(vec![
            entry("productId", str_value(product_id)),
            entry("price", int_value(*price)),
        ]),
        ServerMessage::SlotUpdated { slot_id, product_id } => Value::Map(vec![
            entry("slotId", int_value(*slot_id as i64)),
            entry("productId", opt_str_value(product_id)),
        ]),
        ServerMessage::CustomerStateChanged { customer, previous, state } => Value::Map(vec![
            entry("customer", customer_value(customer)),
            entry(
                "previous",
                match previous {
                    Some(p) => int_value(*p as i64),
                    None => Value::Nil,
                },
            ),
            entry("state", int_value(*state as i64)),
        ]),
        ServerMessage::CustomerThought { customer_id, text } => Value::Map(vec![
            entry("customerId", str_value(customer_id)),
            entry("text", str_value(text)),
        ]),
        ServerMessage::SaleMade {
            customer_id,
            product_id,
            product_name,
            price,
            slot_id,
            coins,
        } => Value::Map(vec![
            entry("customerId", str_value(customer_id)),
            entry("productId", str_value(product_id)),
            entry("productName", str_value(product_name)),
            entry("price", int_value(*price)),
            entry("slotId", int_value(*slot_id as i64)),
            entry("coins", int_value(*coins)),
        ]),
        ServerMessage::CustomerLeft { customer_id, made_a_sale } => Value::Map(vec![
            entry("customerId", str_value(customer_id)),
            entry("madeASale", Value::Boolean(*made_a_sale)),
        ]),
        ServerMessage::DayStarted { day_number } => {
            Value::Map(vec![entry("dayNumber", int_value(*day_number as i64))])
        }
        ServerMessage::DayEnded {
            day_number,
            items_sold,
            revenue,
            customers_visited,
        } => Value::Map(vec![
            entry("dayNumber", int_value(*day_number as i64)),
            entry("itemsSold", int_value(*items_sold as i64)),
            entry("revenue", int_value(*revenue)),
            entry("customersVisited", int_value(*customers_visited as i64)),
        ]),
        ServerMessage::ActionFailed { action, reason } => Value::Map(vec![
            entry("action", str_value(action)),
            entry("reason", str_value(reason)),
        ]),
    };

    // Encode as [13, "msg_type", data] - matching Colyseus ROOM_DATA format
    let array = Value::Array(vec![
        Value::Integer(13.into()), // Protocol.RoomData
        Value::String(msg.msg_type().into()),
        data,
    ]);

    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &array)
        .map_err(|e| format!("Failed to encode message: {}", e))?;

    Ok(buf)
}

/// Decode a client message from MessagePack format
/// Expected format: [13, "msg_type", {data}]
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, String> {
    use std::io::Cursor;

    let mut cursor = Cursor::new(data);
    let value = rmpv::decode::read_value(&mut cursor)
        .map_err(|e| format!("Failed to decode MessagePack: {}", e))?;

    let array = value.as_array().ok_or("Expected array")?;

    if array.len() < 2 {
        return Err("Array too short".to_string());
    }

    let protocol = array[0].as_u64().ok_or("Protocol code must be integer")? as u8;

    if protocol != 13 {
        return Err(format!("Unexpected protocol code: {}", protocol));
    }

    let msg_type = array[1].as_str().ok_or("Message type must be string")?;

    let msg_data = if array.len() > 2 { &array[2] } else { &Value::Nil };

    match msg_type {
        "createProduct" => {
            let template_id = extract_string(msg_data, "templateId").unwrap_or_default();
            let name = extract_string(msg_data, "name").unwrap_or_default();
            let price = extract_i64(msg_data, "price").unwrap_or(0);
            let art_ref = extract_string(msg_data, "artRef").unwrap_or_default();
            Ok(ClientMessage::CreateProduct { template_id, name, price, art_ref })
        }
        "setPrice" => {
            let product_id = extract_string(msg_data, "productId").unwrap_or_default();
            let price = extract_i64(msg_data, "price").unwrap_or(0);
            Ok(ClientMessage::SetPrice { product_id, price })
        }
        "displayProduct" => {
            let slot_id = extract_i64(msg_data, "slotId").unwrap_or(0).max(0) as usize;
            let product_id = extract_string(msg_data, "productId").unwrap_or_default();
            Ok(ClientMessage::DisplayProduct { slot_id, product_id })
        }
        "clearSlot" => {
            let slot_id = extract_i64(msg_data, "slotId").unwrap_or(0).max(0) as usize;
            Ok(ClientMessage::ClearSlot { slot_id })
        }
        "startDay" => Ok(ClientMessage::StartDay),
        "endDay" => Ok(ClientMessage::EndDay),
        "walkIn" => Ok(ClientMessage::WalkIn),
        "pitchProduct" => {
            let customer_id = extract_string(msg_data, "customerId").unwrap_or_default();
            let product_id = extract_string(msg_data, "productId").unwrap_or_default();
            Ok(ClientMessage::PitchProduct { customer_id, product_id })
        }
        "requestState" => Ok(ClientMessage::RequestState),
        _ => Err(format!("Unknown message type: {}", msg_type)),
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn extract_string(value: &Value, key: &str) -> Option<String> {
    value.as_map().and_then(|map| {
        map.iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .and_then(|(_, v)| v.as_str().map(|s| s.to_string()))
    })
}

fn extract_i64(value: &Value, key: &str) -> Option<i64> {
    value.as_map().and_then(|map| {
        map.iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .and_then(|(_, v)| v.as_i64().or_else(|| v.as_u64().map(|u| u as i64)))
    })
}
