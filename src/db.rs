use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::session::ShopSaveData;

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        // Run migrations
        Self::migrate(&pool).await?;

        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS shops (
                shop_id TEXT PRIMARY KEY,
                shop_name TEXT UNIQUE NOT NULL,
                coins INTEGER DEFAULT 0,
                day_number INTEGER DEFAULT 1,
                lifetime_items_sold INTEGER DEFAULT 0,
                lifetime_customers_served INTEGER DEFAULT 0,
                inventory_json TEXT DEFAULT '{}',
                display_json TEXT DEFAULT '{}',
                trend_json TEXT DEFAULT '{}',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                last_saved DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Database migrations complete");
        Ok(())
    }

    /// Insert or refresh a shop snapshot
    pub async fn upsert_shop(&self, data: &ShopSaveData) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO shops (
                shop_id, shop_name, coins, day_number,
                lifetime_items_sold, lifetime_customers_served,
                inventory_json, display_json, trend_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(shop_id) DO UPDATE SET
                coins = excluded.coins,
                day_number = excluded.day_number,
                lifetime_items_sold = excluded.lifetime_items_sold,
                lifetime_customers_served = excluded.lifetime_customers_served,
                inventory_json = excluded.inventory_json,
                display_json = excluded.display_json,
                trend_json = excluded.trend_json,
                last_saved = CURRENT_TIMESTAMP"#,
        )
        .bind(&data.shop_id)
        .bind(&data.shop_name)
        .bind(data.coins)
        .bind(data.day_number as i64)
        .bind(data.lifetime_items_sold)
        .bind(data.lifetime_customers_served)
        .bind(&data.inventory_json)
        .bind(&data.display_json)
        .bind(&data.trend_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_shop_by_name(&self, shop_name: &str) -> Result<Option<ShopSaveData>, sqlx::Error> {
        let row = sqlx::query(
            r#"SELECT shop_id, shop_name, coins, day_number,
                lifetime_items_sold, lifetime_customers_served,
                inventory_json, display_json, trend_json
            FROM shops WHERE shop_name = ?"#,
        )
        .bind(shop_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::row_to_save_data))
    }

    pub async fn get_shop(&self, shop_id: &str) -> Result<Option<ShopSaveData>, sqlx::Error> {
        let row = sqlx::query(
            r#"SELECT shop_id, shop_name, coins, day_number,
                lifetime_items_sold, lifetime_customers_served,
                inventory_json, display_json, trend_json
            FROM shops WHERE shop_id = ?"#,
        )
        .bind(shop_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::row_to_save_data))
    }

    pub async fn delete_shop(&self, shop_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM shops WHERE shop_id = ?")
            .bind(shop_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_save_data(row: sqlx::sqlite::SqliteRow) -> ShopSaveData {
        ShopSaveData {
            shop_id: row.get("shop_id"),
            shop_name: row.get("shop_name"),
            coins: row.get("coins"),
            day_number: row.get::<i64, _>("day_number").max(1) as u32,
            lifetime_items_sold: row.get("lifetime_items_sold"),
            lifetime_customers_served: row.get("lifetime_customers_served"),
            inventory_json: row.get("inventory_json"),
            display_json: row.get("display_json"),
            trend_json: row.get("trend_json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::new("sqlite::memory:").await.unwrap()
    }

    fn save_data(shop_id: &str, shop_name: &str) -> ShopSaveData {
        ShopSaveData {
            shop_id: shop_id.to_string(),
            shop_name: shop_name.to_string(),
            coins: 72,
            day_number: 3,
            lifetime_items_sold: 5,
            lifetime_customers_served: 5,
            inventory_json: r#"{"products":[]}"#.to_string(),
            display_json: r#"{"slots":[]}"#.to_string(),
            trend_json: r#"{"popular_product_types":["mug"],"popular_colors":["sage"]}"#.to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_load_round_trip() {
        let db = test_db().await;
        let data = save_data("shop_1", "Brush & Bloom");

        db.upsert_shop(&data).await.unwrap();
        let loaded = db.get_shop("shop_1").await.unwrap().unwrap();
        assert_eq!(loaded.shop_name, "Brush & Bloom");
        assert_eq!(loaded.coins, 72);
        assert_eq!(loaded.day_number, 3);

        // Second upsert updates in place
        let mut updated = data.clone();
        updated.coins = 100;
        db.upsert_shop(&updated).await.unwrap();
        let loaded = db.get_shop_by_name("Brush & Bloom").await.unwrap().unwrap();
        assert_eq!(loaded.coins, 100);
    }

    #[tokio::test]
    async fn test_missing_shop_is_none() {
        let db = test_db().await;
        assert!(db.get_shop("nope").await.unwrap().is_none());
        assert!(db.get_shop_by_name("nope").await.unwrap().is_none());
        assert!(!db.delete_shop("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_shop() {
        let db = test_db().await;
        db.upsert_shop(&save_data("shop_2", "Second Shop")).await.unwrap();
        assert!(db.delete_shop("shop_2").await.unwrap());
        assert!(db.get_shop("shop_2").await.unwrap().is_none());
    }
}
