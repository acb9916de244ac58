//! Trend Model
//!
//! The pair of "what's popular right now" lists that bias new customer
//! preferences. Drifts a little at the end of every day: each list keeps
//! one prior entry and rotates one new random entry in.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogRegistry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trend {
    pub popular_product_types: Vec<String>,
    pub popular_colors: Vec<String>,
}

impl Trend {
    /// Seed an initial trend from the catalog: two random product types and
    /// two random colors
    pub fn seed<R: Rng>(catalog: &CatalogRegistry, rng: &mut R) -> Self {
        let template_ids: Vec<String> = catalog.ids().cloned().collect();
        let popular_product_types = template_ids
            .choose_multiple(rng, 2)
            .cloned()
            .collect();
        let popular_colors = catalog.random_color_ids(rng, 2);

        Self {
            popular_product_types,
            popular_colors,
        }
    }

    /// Day-end drift: keep one entry from each list, rotate one new one in
    pub fn drift<R: Rng>(&mut self, catalog: &CatalogRegistry, rng: &mut R) {
        let template_ids: Vec<String> = catalog.ids().cloned().collect();
        self.popular_product_types = rotate(&self.popular_product_types, &template_ids, rng);

        let color_ids: Vec<String> = catalog.colors().iter().map(|c| c.id.clone()).collect();
        self.popular_colors = rotate(&self.popular_colors, &color_ids, rng);
    }
}

/// Keep one random entry of `current`, then add one random entry of `pool`
/// that differs from the kept one
fn rotate<R: Rng>(current: &[String], pool: &[String], rng: &mut R) -> Vec<String> {
    let mut next = Vec::with_capacity(2);
    if let Some(kept) = current.choose(rng) {
        next.push(kept.clone());
    }

    let fresh: Vec<&String> = pool.iter().filter(|id| !next.contains(*id)).collect();
    if let Some(new_entry) = fresh.choose(rng) {
        next.push((*new_entry).clone());
    }

    next
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

    #[test]
    fn test_seed_draws_two_of_each() {
        let catalog = test_catalog();
        let mut rng = StdRng::seed_from_u64(11);
        let trend = Trend::seed(&catalog, &mut rng);

        assert_eq!(trend.popular_product_types.len(), 2);
        assert_eq!(trend.popular_colors.len(), 2);
        assert_ne!(trend.popular_product_types[0], trend.popular_product_types[1]);
    }

    #[test]
    fn test_drift_keeps_one_prior_entry() {
        let catalog = test_catalog();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut trend = Trend::seed(&catalog, &mut rng);
            let before_types = trend.popular_product_types.clone();
            let before_colors = trend.popular_colors.clone();

            trend.drift(&catalog, &mut rng);

            assert_eq!(trend.popular_product_types.len(), 2);
            assert_eq!(trend.popular_colors.len(), 2);
            assert!(before_types.contains(&trend.popular_product_types[0]));
            assert!(before_colors.contains(&trend.popular_colors[0]));
            assert_ne!(trend.popular_product_types[0], trend.popular_product_types[1]);
            assert_ne!(trend.popular_colors[0], trend.popular_colors[1]);
        }
    }
}
