//! Match Scoring and Purchase Decisions
//!
//! How well a product fits a customer, and whether the customer actually
//! buys it. Two decision formulas coexist on purpose: walk-ins use the
//! exploratory policy, shop-day customers use the shop-floor policy.
//! Colors exist in the preference model but are not scored.

use rand::Rng;

use crate::customer::{Budget, CustomerPreferences};
use crate::inventory::Product;

const TYPE_MATCH_BONUS: f64 = 3.0;
const OVER_BUDGET_PENALTY: f64 = -2.0;
const BARGAIN_BONUS: f64 = 2.0;

/// Score a product against a customer's preferences and budget.
///
/// Anything priced above the budget ceiling sits in the reject band: it
/// scores negative no matter how well the type matches.
pub fn match_score(product: &Product, prefs: &CustomerPreferences) -> f64 {
    let Budget { min, max } = prefs.budget;
    if product.price > max {
        return OVER_BUDGET_PENALTY;
    }

    let mut score = 0.0;
    if prefs.liked_product_types.iter().any(|t| t == &product.template_id) {
        score += TYPE_MATCH_BONUS;
    }

    if product.price <= min {
        score += BARGAIN_BONUS;
    } else {
        // Linear falloff from just-above-min toward the budget ceiling
        score += 1.0 + (max - product.price) as f64 / (max - min) as f64;
    }

    score
}

/// Pick the best-scoring product. Returns None when nothing scores above
/// zero. Ties keep the earliest candidate in iteration order.
pub fn best_match<'a>(
    candidates: impl IntoIterator<Item = &'a Product>,
    prefs: &CustomerPreferences,
) -> Option<&'a Product> {
    let mut best: Option<(&Product, f64)> = None;
    for product in candidates {
        let score = match_score(product, prefs);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((product, score)),
        }
    }
    best.filter(|(_, score)| *score > 0.0).map(|(p, _)| p)
}

/// Whether a shop-day browser will even consider a product: it must be a
/// liked type and fit the budget ceiling.
pub fn is_eligible(product: &Product, prefs: &CustomerPreferences) -> bool {
    prefs.liked_product_types.iter().any(|t| t == &product.template_id)
        && product.price <= prefs.budget.max
}

// ============================================================================
// Purchase Decision
// ============================================================================

/// The two purchase-probability formulas, kept as distinct named policies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Walk-in path: score-weighted around a 0.5 base rate
    Exploratory,
    /// Shop-day path: flat 0.7 base rate with type/price nudges
    ShopFloor,
}

/// Probability that this customer buys this product under the given policy
pub fn purchase_probability(policy: Policy, product: &Product, prefs: &CustomerPreferences) -> f64 {
    let Budget { min, max } = prefs.budget;
    match policy {
        Policy::Exploratory => {
            if product.price > max {
                // Way over budget: pity chance only
                return 0.05;
            }
            let price_bonus = if product.price <= min {
                0.2
            } else {
                0.1 * (max - product.price) as f64 / (max - min) as f64
            };
            let p = 0.5 + 0.1 * match_score(product, prefs) + price_bonus;
            p.clamp(0.05, 0.95)
        }
        Policy::ShopFloor => {
            let mut p = 0.7;
            if prefs.liked_product_types.iter().any(|t| t == &product.template_id) {
                p += 0.1;
            }
            if (product.price as f64) <= 0.8 * max as f64 {
                p += 0.1;
            }
            p
        }
    }
}

/// Roll the dice: does the sale happen?
pub fn decide_purchase<R: Rng>(
    policy: Policy,
    product: &Product,
    prefs: &CustomerPreferences,
    rng: &mut R,
) -> bool {
    rng.gen_bool(purchase_probability(policy, product, prefs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn prefs(liked: &[&str], min: i64, max: i64) -> CustomerPreferences {
        CustomerPreferences {
            liked_product_types: liked.iter().map(|s| s.to_string()).collect(),
            liked_colors: vec!["sage".to_string()],
            budget: Budget { min, max },
            patience_ms: 15_000,
        }
    }

    fn product(template: &str, price: i64) -> Product {
        Product::new(template, "Test Piece", price, "art_test")
    }

    #[test]
    fn test_liked_cheap_product_scores_five() {
        // Liked type (+3) at or below budget.min (+2)
        let p = product("mug", 8);
        let score = match_score(&p, &prefs(&["mug"], 8, 15));
        assert_eq!(score, 5.0);
    }

    #[test]
    fn test_unliked_cheap_product_scores_two() {
        let p = product("poster", 8);
        let score = match_score(&p, &prefs(&["mug"], 8, 15));
        assert_eq!(score, 2.0);
    }

    #[test]
    fn test_mid_band_price_interpolates() {
        // price 10 in budget (5, 15): 1 + (15-10)/(15-5) = 1.5
        let p = product("tote", 10);
        let score = match_score(&p, &prefs(&["tote"], 5, 15));
        assert_eq!(score, 3.0 + 1.5);
    }

    #[test]
    fn test_over_budget_scores_negative_and_never_matches() {
        let customer = prefs(&["mug"], 5, 15);
        for price in 16..40 {
            // Even a liked type can't escape the reject band
            assert!(match_score(&product("mug", price), &customer) < 0.0);
            assert!(match_score(&product("poster", price), &customer) < 0.0);
        }

        let expensive = product("mug", 50);
        let products = vec![expensive];
        assert!(best_match(products.iter(), &customer).is_none());
    }

    #[test]
    fn test_best_match_prefers_highest_score_and_breaks_ties_first() {
        let customer = prefs(&["mug"], 5, 15);
        let cheap_liked = product("mug", 5); // score 5
        let dear_liked = product("mug", 14); // score 3 + something small
        let first_tie = product("mug", 5); // also score 5, but later
        let products = vec![cheap_liked.clone(), dear_liked, first_tie];

        let winner = best_match(products.iter(), &customer).unwrap();
        assert_eq!(winner.id, cheap_liked.id);
    }

    #[test]
    fn test_best_match_none_when_all_unappealing() {
        let customer = prefs(&["mug"], 5, 15);
        let products = vec![product("poster", 20), product("shirt", 99)];
        assert!(best_match(products.iter(), &customer).is_none());
    }

    #[test]
    fn test_shop_floor_probability_tops_out_at_nine_tenths() {
        // Liked type, price 8 <= 0.8 * 15 = 12
        let customer = prefs(&["mug"], 5, 15);
        let p = product("mug", 8);
        assert_eq!(purchase_probability(Policy::ShopFloor, &p, &customer), 0.9);

        // Unliked and pricey: base rate only
        let dear = product("poster", 14);
        assert_eq!(purchase_probability(Policy::ShopFloor, &dear, &customer), 0.7);
    }

    #[test]
    fn test_exploratory_probability_is_clamped() {
        let customer = prefs(&["mug"], 8, 15);
        // score 5 product: 0.5 + 0.5 + 0.2 would be 1.2, clamps to 0.95
        let great = product("mug", 8);
        assert_eq!(purchase_probability(Policy::Exploratory, &great, &customer), 0.95);

        // Over budget forces the floor regardless of other terms
        let over = product("mug", 30);
        assert_eq!(purchase_probability(Policy::Exploratory, &over, &customer), 0.05);
    }

    #[test]
    fn test_decide_purchase_respects_extremes() {
        let customer = prefs(&["mug"], 8, 15);
        let over = product("mug", 30);
        let mut rng = StdRng::seed_from_u64(3);

        // p = 0.05: over 200 rolls nearly all decline
        let buys = (0..200)
            .filter(|_| decide_purchase(Policy::Exploratory, &over, &customer, &mut rng))
            .count();
        assert!(buys < 40);
    }

    #[test]
    fn test_eligibility_needs_liked_type_and_budget_fit() {
        let customer = prefs(&["mug"], 5, 15);
        assert!(is_eligible(&product("mug", 15), &customer));
        assert!(!is_eligible(&product("mug", 16), &customer));
        assert!(!is_eligible(&product("poster", 10), &customer));
    }
}
