//! Preference Generation
//!
//! Builds a new customer's tastes from the current trend data. Pure function
//! of the trend, the catalog, and the RNG state.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::archetype::CustomerArchetype;
use crate::catalog::CatalogRegistry;
use crate::sim::Trend;

/// What a customer is willing to spend, in coins
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Budget {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerPreferences {
    /// Template IDs this customer is looking for (1-2 entries)
    pub liked_product_types: Vec<String>,
    /// Palette color IDs this customer gravitates to (1-2 entries)
    pub liked_colors: Vec<String>,
    pub budget: Budget,
    pub patience_ms: u64,
}

/// Which generation path to use for patience.
///
/// Walk-ins roll their own patience; shop-day customers take the fixed
/// patience from their archetype.
pub enum ProfileMode<'a> {
    WalkIn,
    Archetype(&'a CustomerArchetype),
}

pub fn generate_preferences<R: Rng>(
    trend: &Trend,
    catalog: &CatalogRegistry,
    mode: ProfileMode<'_>,
    rng: &mut R,
) -> CustomerPreferences {
    // Candidate types: trending types plus one wildcard from the catalog
    let mut type_pool: Vec<String> = trend.popular_product_types.clone();
    if let Some(wildcard) = catalog.random_template_id(rng) {
        if !type_pool.contains(&wildcard) {
            type_pool.push(wildcard);
        }
    }
    let type_count = if rng.gen_bool(0.3) { 1 } else { 2 };
    let liked_product_types: Vec<String> = type_pool
        .choose_multiple(rng, type_count.min(type_pool.len()))
        .cloned()
        .collect();

    // Candidate colors: trending colors plus two wildcards from the palette
    let mut color_pool: Vec<String> = trend.popular_colors.clone();
    for wildcard in catalog.random_color_ids(rng, 2) {
        if !color_pool.contains(&wildcard) {
            color_pool.push(wildcard);
        }
    }
    let color_count = if rng.gen_bool(0.5) { 1 } else { 2 };
    let liked_colors: Vec<String> = color_pool
        .choose_multiple(rng, color_count.min(color_pool.len()))
        .cloned()
        .collect();

    // Budget floor always lands in 5..=9, ceiling in 15..=29, so min < max
    // by construction
    let budget = Budget {
        min: 5 + rng.gen_range(0..5),
        max: 15 + rng.gen_range(0..15),
    };

    let patience_ms = match mode {
        ProfileMode::WalkIn => 10_000 + rng.gen_range(0..10_000),
        ProfileMode::Archetype(archetype) => archetype.patience_ms,
    };

    CustomerPreferences {
        liked_product_types,
        liked_colors,
        budget,
        patience_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ArtAnchor, PaintColor, ProductTemplate};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn test_catalog() -> CatalogRegistry {
        CatalogRegistry::with_data(
            ["mug", "tote", "shirt", "poster"]
                .iter()
                .map(|id| ProductTemplate {
                    id: id.to_string(),
                    display_name: id.to_string(),
                    base_price: 8,
                    art_anchor: ArtAnchor { x: 0.0, y: 0.0, width: 64.0, height: 64.0, rotation: 0.0 },
                })
                .collect(),
            ["sage", "blush", "sky", "butter"]
                .iter()
                .map(|id| PaintColor {
                    id: id.to_string(),
                    display_name: id.to_string(),
                    hex: "#000000".to_string(),
                })
                .collect(),
        )
    }

    fn test_trend() -> Trend {
        Trend {
            popular_product_types: vec!["mug".to_string(), "tote".to_string()],
            popular_colors: vec!["sage".to_string(), "blush".to_string()],
        }
    }

    #[test]
    fn test_generated_preferences_are_well_formed() {
        let catalog = test_catalog();
        let trend = test_trend();

        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let prefs =
                generate_preferences(&trend, &catalog, ProfileMode::WalkIn, &mut rng);

            assert!(prefs.budget.min < prefs.budget.max);
            assert!((5..=9).contains(&prefs.budget.min));
            assert!((15..=29).contains(&prefs.budget.max));

            assert!((1..=2).contains(&prefs.liked_product_types.len()));
            assert!((1..=2).contains(&prefs.liked_colors.len()));

            // Draws are without replacement
            if prefs.liked_product_types.len() == 2 {
                assert_ne!(prefs.liked_product_types[0], prefs.liked_product_types[1]);
            }
            if prefs.liked_colors.len() == 2 {
                assert_ne!(prefs.liked_colors[0], prefs.liked_colors[1]);
            }

            assert!((10_000..20_000).contains(&prefs.patience_ms));
        }
    }

    #[test]
    fn test_archetype_mode_uses_fixed_patience() {
        let catalog = test_catalog();
        let trend = test_trend();
        let archetype = CustomerArchetype {
            id: "collector".to_string(),
            display_name: "Collector".to_string(),
            sprite: "customer_collector".to_string(),
            patience_ms: 20_000,
            tagline: String::new(),
        };

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let prefs = generate_preferences(
                &trend,
                &catalog,
                ProfileMode::Archetype(&archetype),
                &mut rng,
            );
            assert_eq!(prefs.patience_ms, 20_000);
        }
    }

    #[test]
    fn test_liked_types_come_from_trend_or_catalog() {
        let catalog = test_catalog();
        let trend = test_trend();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..50 {
            let prefs =
                generate_preferences(&trend, &catalog, ProfileMode::WalkIn, &mut rng);
            for t in &prefs.liked_product_types {
                assert!(catalog.contains(t));
            }
        }
    }
}
