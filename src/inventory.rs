use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Products
// ============================================================================

/// A player-made product: a template plus the artwork painted onto it.
///
/// The artwork itself lives with the presentation layer; the server only
/// carries an opaque reference to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub template_id: String,
    pub name: String,
    pub price: i64,
    pub art_ref: String,
    pub created_at: DateTime<Utc>,
    pub displayed: bool,
}

impl Product {
    pub fn new(template_id: &str, name: &str, price: i64, art_ref: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            template_id: template_id.to_string(),
            name: name.to_string(),
            price,
            art_ref: art_ref.to_string(),
            created_at: Utc::now(),
            displayed: false,
        }
    }
}

// ============================================================================
// Inventory
// ============================================================================

/// Everything the player has made and not yet sold.
///
/// Products keep creation order so display lists and match tie-breaks are
/// stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    products: Vec<Product>,
}

impl Inventory {
    pub fn new() -> Self {
        Self { products: Vec::new() }
    }

    pub fn add(&mut self, product: Product) {
        self.products.push(product);
    }

    pub fn find_by_id(&self, product_id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == product_id)
    }

    pub fn find_by_id_mut(&mut self, product_id: &str) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| p.id == product_id)
    }

    /// Remove a product, returning it if it existed
    pub fn remove(&mut self, product_id: &str) -> Option<Product> {
        let idx = self.products.iter().position(|p| p.id == product_id)?;
        Some(self.products.remove(idx))
    }

    pub fn list_undisplayed(&self) -> Vec<&Product> {
        self.products.iter().filter(|p| !p.displayed).collect()
    }

    pub fn all(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Product view for network sync
#[derive(Debug, Clone, Serialize)]
pub struct ProductUpdate {
    pub id: String,
    pub template_id: String,
    pub name: String,
    pub price: i64,
    pub art_ref: String,
    pub displayed: bool,
}

impl From<&Product> for ProductUpdate {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            template_id: product.template_id.clone(),
            name: product.name.clone(),
            price: product.price,
            art_ref: product.art_ref.clone(),
            displayed: product.displayed,
        }
    }
}

// ============================================================================
// Wallet
// ============================================================================

/// The player's coin balance. Sales only ever credit it; debits come from
/// player actions outside this subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Wallet {
    coins: i64,
}

impl Wallet {
    pub fn new(coins: i64) -> Self {
        Self { coins }
    }

    pub fn coins(&self) -> i64 {
        self.coins
    }

    pub fn credit(&mut self, amount: i64) {
        self.coins += amount;
    }

    /// Debit if the balance covers it. Returns false without mutating
    /// otherwise.
    pub fn debit(&mut self, amount: i64) -> bool {
        if amount > self.coins {
            return false;
        }
        self.coins -= amount;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_add_find_remove() {
        let mut inv = Inventory::new();
        let product = Product::new("mug", "Sunset Mug", 10, "art_1");
        let id = product.id.clone();
        inv.add(product);

        assert_eq!(inv.len(), 1);
        assert_eq!(inv.find_by_id(&id).unwrap().name, "Sunset Mug");

        let removed = inv.remove(&id).unwrap();
        assert_eq!(removed.id, id);
        assert!(inv.is_empty());

        // Removing again is a clean miss
        assert!(inv.remove(&id).is_none());
    }

    #[test]
    fn test_list_undisplayed() {
        let mut inv = Inventory::new();
        let mut a = Product::new("mug", "A", 10, "art_a");
        a.displayed = true;
        let b = Product::new("tote", "B", 12, "art_b");
        let b_id = b.id.clone();
        inv.add(a);
        inv.add(b);

        let undisplayed = inv.list_undisplayed();
        assert_eq!(undisplayed.len(), 1);
        assert_eq!(undisplayed[0].id, b_id);
    }

    #[test]
    fn test_wallet_credit_debit() {
        let mut wallet = Wallet::new(5);
        wallet.credit(10);
        assert_eq!(wallet.coins(), 15);

        assert!(wallet.debit(15));
        assert_eq!(wallet.coins(), 0);

        assert!(!wallet.debit(1));
        assert_eq!(wallet.coins(), 0);
    }
}
