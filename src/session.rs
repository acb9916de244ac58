use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::CatalogRegistry;
use crate::display::{DEFAULT_DISPLAY_CAPACITY, DisplayRack};
use crate::inventory::{Inventory, Product, Wallet};
use crate::sim::Trend;

// ============================================================================
// Constants
// ============================================================================

const STARTING_COINS: i64 = 50;

// ============================================================================
// Shop Session
// ============================================================================

/// One player's shop: wallet, inventory, display rack, trend, and day
/// counter. Threaded explicitly through every simulator call; there is no
/// ambient game state.
#[derive(Debug, Clone)]
pub struct ShopSession {
    pub shop_id: String,
    pub shop_name: String,
    pub wallet: Wallet,
    pub inventory: Inventory,
    pub display: DisplayRack,
    pub trend: Trend,
    /// 1-based; advanced at every day end
    pub day_number: u32,
    pub lifetime_items_sold: u64,
    pub lifetime_customers_served: u64,
}

/// Why a player action was refused. All of these are user-correctable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShopActionError {
    #[error("unknown product template: {0}")]
    UnknownTemplate(String),

    #[error("unknown product: {0}")]
    UnknownProduct(String),

    #[error("price {price} is below the template base price {base_price}")]
    PriceBelowBase { price: i64, base_price: i64 },

    #[error("display slot {0} does not exist or is occupied")]
    SlotUnavailable(usize),

    #[error("product {0} is already on display")]
    AlreadyDisplayed(String),
}

impl ShopSession {
    pub fn new(shop_name: &str, trend: Trend) -> Self {
        Self {
            shop_id: Uuid::new_v4().to_string(),
            shop_name: shop_name.to_string(),
            wallet: Wallet::new(STARTING_COINS),
            inventory: Inventory::new(),
            display: DisplayRack::new(DEFAULT_DISPLAY_CAPACITY),
            trend,
            day_number: 1,
            lifetime_items_sold: 0,
            lifetime_customers_served: 0,
        }
    }

    /// Finish a design: mint a product from a template and the player's
    /// artwork. The price must cover the template's base price.
    pub fn create_product(
        &mut self,
        catalog: &CatalogRegistry,
        template_id: &str,
        name: &str,
        price: i64,
        art_ref: &str,
    ) -> Result<Product, ShopActionError> {
        let template = catalog
            .get(template_id)
            .ok_or_else(|| ShopActionError::UnknownTemplate(template_id.to_string()))?;

        if price < template.base_price {
            return Err(ShopActionError::PriceBelowBase {
                price,
                base_price: template.base_price,
            });
        }

        let name = if name.trim().is_empty() {
            format!("My {}", template.display_name)
        } else {
            name.trim().chars().take(60).collect()
        };

        let product = Product::new(template_id, &name, price, art_ref);
        self.inventory.add(product.clone());
        Ok(product)
    }

    /// Re-price an existing product, still respecting the template floor
    pub fn set_price(
        &mut self,
        catalog: &CatalogRegistry,
        product_id: &str,
        price: i64,
    ) -> Result<(), ShopActionError> {
        let template_id = self
            .inventory
            .find_by_id(product_id)
            .map(|p| p.template_id.clone())
            .ok_or_else(|| ShopActionError::UnknownProduct(product_id.to_string()))?;

        let base_price = catalog
            .get(&template_id)
            .map(|t| t.base_price)
            .ok_or(ShopActionError::UnknownTemplate(template_id))?;

        if price < base_price {
            return Err(ShopActionError::PriceBelowBase { price, base_price });
        }

        if let Some(product) = self.inventory.find_by_id_mut(product_id) {
            product.price = price;
        }
        Ok(())
    }

    /// Put a product on a display slot
    pub fn display_product(
        &mut self,
        slot_id: usize,
        product_id: &str,
    ) -> Result<(), ShopActionError> {
        let product = self
            .inventory
            .find_by_id(product_id)
            .ok_or_else(|| ShopActionError::UnknownProduct(product_id.to_string()))?;

        if product.displayed {
            return Err(ShopActionError::AlreadyDisplayed(product_id.to_string()));
        }

        if !self.display.assign(slot_id, product_id) {
            return Err(ShopActionError::SlotUnavailable(slot_id));
        }

        if let Some(product) = self.inventory.find_by_id_mut(product_id) {
            product.displayed = true;
        }
        Ok(())
    }

    /// Take whatever is in a slot back off display. Returns the product id
    /// that was there, if any.
    pub fn clear_slot(&mut self, slot_id: usize) -> Option<String> {
        let product_id = self.display.clear(slot_id)?;
        if let Some(product) = self.inventory.find_by_id_mut(&product_id) {
            product.displayed = false;
        }
        Some(product_id)
    }

    /// Products currently on display, resolved against inventory in slot
    /// order. Skips dangling slot references rather than failing; the
    /// simulator treats those as "product gone".
    pub fn displayed_products(&self) -> Vec<&Product> {
        self.display
            .displayed_product_ids()
            .into_iter()
            .filter_map(|id| self.inventory.find_by_id(id))
            .collect()
    }

    pub fn to_save_data(&self) -> ShopSaveData {
        ShopSaveData {
            shop_id: self.shop_id.clone(),
            shop_name: self.shop_name.clone(),
            coins: self.wallet.coins(),
            day_number: self.day_number,
            lifetime_items_sold: self.lifetime_items_sold as i64,
            lifetime_customers_served: self.lifetime_customers_served as i64,
            inventory_json: serde_json::to_string(&self.inventory).unwrap_or_else(|_| "{}".into()),
            display_json: serde_json::to_string(&self.display).unwrap_or_else(|_| "{}".into()),
            trend_json: serde_json::to_string(&self.trend).unwrap_or_else(|_| "{}".into()),
        }
    }

    /// Rebuild a session from a saved row. Invalid JSON falls back to empty
    /// state for that piece rather than refusing the load.
    pub fn from_save_data(data: &ShopSaveData, fallback_trend: Trend) -> Self {
        let inventory: Inventory =
            serde_json::from_str(&data.inventory_json).unwrap_or_default();
        let display: DisplayRack = serde_json::from_str(&data.display_json)
            .unwrap_or_else(|_| DisplayRack::new(DEFAULT_DISPLAY_CAPACITY));
        let trend: Trend =
            serde_json::from_str(&data.trend_json).unwrap_or(fallback_trend);

        Self {
            shop_id: data.shop_id.clone(),
            shop_name: data.shop_name.clone(),
            wallet: Wallet::new(data.coins),
            inventory,
            display,
            trend,
            day_number: data.day_number.max(1),
            lifetime_items_sold: data.lifetime_items_sold.max(0) as u64,
            lifetime_customers_served: data.lifetime_customers_served.max(0) as u64,
        }
    }
}

/// Flattened session snapshot for database persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopSaveData {
    pub shop_id: String,
    pub shop_name: String,
    pub coins: i64,
    pub day_number: u32,
    pub lifetime_items_sold: i64,
    pub lifetime_customers_served: i64,
    pub inventory_json: String,
    pub display_json: String,
    pub trend_json: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ArtAnchor, PaintColor, ProductTemplate};

    fn test_catalog() -> CatalogRegistry {
        CatalogRegistry::with_data(
            [("mug", 8), ("tote", 12), ("shirt", 15), ("poster", 10)]
                .iter()
                .map(|(id, base)| ProductTemplate {
                    id: id.to_string(),
                    display_name: id.to_string(),
                    base_price: *base,
                    art_anchor: ArtAnchor { x: 0.0, y: 0.0, width: 64.0, height: 64.0, rotation: 0.0 },
                })
                .collect(),
            ["sage", "blush", "sky", "butter"]
                .iter()
                .map(|id| PaintColor {
                    id: id.to_string(),
                    display_name: id.to_string(),
                    hex: "#cccccc".to_string(),
                })
                .collect(),
        )
    }

    fn test_trend() -> Trend {
        Trend {
            popular_product_types: vec!["mug".to_string()],
            popular_colors: vec!["sage".to_string()],
        }
    }

    #[test]
    fn test_create_product_enforces_base_price() {
        let catalog = test_catalog();
        let mut session = ShopSession::new("Test Shop", test_trend());

        let err = session
            .create_product(&catalog, "mug", "Cheap Mug", 5, "art_1")
            .unwrap_err();
        assert_eq!(err, ShopActionError::PriceBelowBase { price: 5, base_price: 8 });

        let product = session
            .create_product(&catalog, "mug", "Fair Mug", 8, "art_1")
            .unwrap();
        assert_eq!(product.price, 8);
        assert_eq!(session.inventory.len(), 1);

        let err = session
            .create_product(&catalog, "vase", "No Such Thing", 20, "art_2")
            .unwrap_err();
        assert_eq!(err, ShopActionError::UnknownTemplate("vase".to_string()));
    }

    #[test]
    fn test_display_and_clear_round_trip() {
        let catalog = test_catalog();
        let mut session = ShopSession::new("Test Shop", test_trend());
        let product = session
            .create_product(&catalog, "tote", "Leafy Tote", 14, "art_1")
            .unwrap();

        session.display_product(2, &product.id).unwrap();
        assert!(session.inventory.find_by_id(&product.id).unwrap().displayed);
        assert_eq!(session.display.filled_count(), 1);

        // Can't display the same product twice
        let err = session.display_product(3, &product.id).unwrap_err();
        assert_eq!(err, ShopActionError::AlreadyDisplayed(product.id.clone()));

        assert_eq!(session.clear_slot(2), Some(product.id.clone()));
        assert!(!session.inventory.find_by_id(&product.id).unwrap().displayed);
        assert_eq!(session.clear_slot(2), None);
    }

    #[test]
    fn test_set_price_respects_floor() {
        let catalog = test_catalog();
        let mut session = ShopSession::new("Test Shop", test_trend());
        let product = session
            .create_product(&catalog, "poster", "Print", 10, "art_1")
            .unwrap();

        session.set_price(&catalog, &product.id, 25).unwrap();
        assert_eq!(session.inventory.find_by_id(&product.id).unwrap().price, 25);

        let err = session.set_price(&catalog, &product.id, 9).unwrap_err();
        assert_eq!(err, ShopActionError::PriceBelowBase { price: 9, base_price: 10 });
    }

    #[test]
    fn test_save_data_round_trip() {
        let catalog = test_catalog();
        let mut session = ShopSession::new("Round Trip", test_trend());
        let product = session
            .create_product(&catalog, "mug", "Keeper", 9, "art_1")
            .unwrap();
        session.display_product(0, &product.id).unwrap();
        session.wallet.credit(25);
        session.day_number = 4;

        let saved = session.to_save_data();
        let restored = ShopSession::from_save_data(&saved, test_trend());

        assert_eq!(restored.shop_id, session.shop_id);
        assert_eq!(restored.wallet.coins(), 75);
        assert_eq!(restored.day_number, 4);
        assert_eq!(restored.inventory.len(), 1);
        assert_eq!(restored.display.slot_of(&product.id), Some(0));
        assert!(restored.inventory.find_by_id(&product.id).unwrap().displayed);
    }
}
