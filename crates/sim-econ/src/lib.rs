#![deny(warnings)]

//! Economic models for the retail simulator: demand estimation, handling
//! economics and the greedy initial-inventory planner.
//!
//! The planner is a one-shot allocator over a candidate catalog under three
//! simultaneous constraints (budget, warehouse space and buffered demand),
//! with a feedback loop between allocated volume and derived staffing cost.
//! All randomness is taken from an injected [`Rng`], so a seeded generator
//! makes the whole plan reproducible.

use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{costs, Catalog, LedgerError, Product, ProductCategory, ProductId, Store};
use tracing::debug;

/// Retail markup over the wholesale price (50%).
pub const RETAIL_MARKUP: Decimal = Decimal::from_parts(15, 0, 0, false, 1);

/// Demand buffer applied to the per-product allocation cap (+50%).
const DEMAND_BUFFER_NUM: u64 = 3;
const DEMAND_BUFFER_DEN: u64 = 2;

/// Fragility surcharge on handling cost per unit of fragility factor.
const FRAGILITY_SURCHARGE: f64 = 0.25;

/// Estimated monthly demand for a product category: a uniform draw from the
/// category's demand band.
pub fn estimate_demand<R: Rng + ?Sized>(category: ProductCategory, rng: &mut R) -> u32 {
    let (lo, hi) = category.demand_band();
    rng.gen_range(lo..hi)
}

/// Retail price under the standard markup.
pub fn retail_price(product: &Product) -> Decimal {
    product.price * RETAIL_MARKUP
}

/// Handling hours one unit costs the warehouse per month, driven by weight,
/// footprint and the product's pick-effort factor.
pub fn handling_hours(product: &Product) -> f64 {
    let weight_term = f64::from(product.weight_g) / 8_000.0;
    let size_term = f64::from(product.size_cm2) / 15_000.0;
    (weight_term + size_term) * product.handling_factor
}

/// Handling cost per unit in USD: handling hours priced at the warehouse
/// hourly wage, with a fragility surcharge.
pub fn handling_cost(product: &Product) -> f64 {
    let hourly_wage = costs::WAREHOUSE_MONTHLY_WAGE.to_f64().unwrap_or(0.0)
        / costs::STAFF_MONTHLY_CAPACITY_HOURS;
    handling_hours(product) * hourly_wage * (1.0 + FRAGILITY_SURCHARGE * product.fragility_factor)
}

/// Profit per m² of shelf space: (retail − wholesale − handling) / footprint.
pub fn profit_density(product: &Product) -> f64 {
    let margin = (retail_price(product) - product.price).to_f64().unwrap_or(0.0);
    let profit = margin - handling_cost(product);
    let size_m2 = f64::from(product.size_cm2) / 10_000.0;
    profit / size_m2
}

/// A candidate scored for the greedy walk.
#[derive(Clone, Debug)]
pub struct ScoredCandidate<'a> {
    /// The candidate product.
    pub product: &'a Product,
    /// Fresh demand estimate for this planning run.
    pub estimated_demand: u32,
    /// Profit density; higher ranks earlier.
    pub score: f64,
}

/// Score every candidate and sort descending by profit density. The sort is
/// stable: ties keep catalog pool order.
pub fn rank_candidates<'a, R: Rng + ?Sized>(
    catalog: &'a Catalog,
    rng: &mut R,
) -> Vec<ScoredCandidate<'a>> {
    let mut scored: Vec<ScoredCandidate<'a>> = catalog
        .iter()
        .map(|product| ScoredCandidate {
            product,
            estimated_demand: estimate_demand(product.category, rng),
            score: profit_density(product),
        })
        .collect();
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored
}

/// One committed purchase line.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanLine {
    /// Product to purchase.
    pub product: ProductId,
    /// Units to purchase (> 0).
    pub quantity: u32,
    /// Wholesale unit cost at planning time.
    pub unit_cost: Decimal,
}

/// The initial purchase plan: committed lines plus the derived staffing that
/// the allocated volume requires.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PurchasePlan {
    /// Committed lines in commit order (highest profit density first).
    pub lines: Vec<PlanLine>,
    /// Σ quantity × unit cost.
    pub goods_cost: Decimal,
    /// Warehouse headcount the allocated volume requires.
    pub required_staff: u32,
    /// required_staff × monthly warehouse wage.
    pub staffing_cost: Decimal,
}

impl PurchasePlan {
    /// Goods plus staffing.
    pub fn total_cost(&self) -> Decimal {
        self.goods_cost + self.staffing_cost
    }

    /// True when nothing was committed.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total committed units.
    pub fn total_units(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Committed quantity for one product (0 when absent).
    pub fn quantity_of(&self, id: &ProductId) -> u32 {
        self.lines
            .iter()
            .find(|l| &l.product == id)
            .map_or(0, |l| l.quantity)
    }

    /// Apply the plan to a store: receive every line into the warehouse,
    /// debit the goods cost from the budget and install the derived staff.
    pub fn apply_to(&self, store: &mut Store, catalog: &Catalog) -> Result<(), LedgerError> {
        for line in &self.lines {
            let product = catalog
                .get(&line.product)
                .ok_or_else(|| LedgerError::UnknownProduct(line.product.clone()))?;
            store.warehouse.ledger.receive(product, line.quantity)?;
        }
        store.budget -= self.goods_cost;
        store.warehouse.staff = self.required_staff;
        Ok(())
    }
}

fn required_staff_for(hours: f64) -> u32 {
    if hours <= 0.0 {
        return 0;
    }
    let staff = (hours / costs::STAFF_MONTHLY_CAPACITY_HOURS).ceil();
    if staff >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        staff as u32
    }
}

/// Greedy initial-inventory allocation.
///
/// Walks the candidates in descending profit-density order. Each candidate's
/// quantity is capped by remaining budget, remaining space and buffered
/// demand (estimate × 1.5); each commit re-derives the warehouse staffing
/// the cumulative handling volume requires and recomputes the remaining
/// budget as `budget − goods − staffing`. Iteration stops as soon as the
/// remaining budget is exhausted.
///
/// A commit whose derived staffing would push total cost past the original
/// budget is trimmed unit-by-unit until it fits, so the returned plan always
/// satisfies `goods_cost + staffing_cost ≤ budget` and the allocated volume
/// never exceeds `capacity_cm2`. An empty candidate pool or a non-positive
/// budget yields an empty plan.
pub fn plan_initial_inventory<R: Rng + ?Sized>(
    catalog: &Catalog,
    budget: Decimal,
    capacity_cm2: u64,
    rng: &mut R,
) -> PurchasePlan {
    if catalog.is_empty() || budget <= Decimal::ZERO {
        return PurchasePlan::default();
    }

    let ranked = rank_candidates(catalog, rng);

    let mut plan = PurchasePlan::default();
    let mut remaining_budget = budget;
    let mut remaining_space = capacity_cm2;
    let mut total_hours = 0.0_f64;

    for candidate in ranked {
        let product = candidate.product;

        let max_by_budget = (remaining_budget / product.price)
            .floor()
            .to_u64()
            .unwrap_or(0);
        let max_by_space = remaining_space / u64::from(product.size_cm2);
        let max_by_demand =
            u64::from(candidate.estimated_demand) * DEMAND_BUFFER_NUM / DEMAND_BUFFER_DEN;

        let mut quantity = max_by_budget.min(max_by_space).min(max_by_demand);

        // Trim until goods plus derived staffing fit the original budget.
        let (goods, hours, staff, staffing) = loop {
            if quantity == 0 {
                break (plan.goods_cost, total_hours, plan.required_staff, plan.staffing_cost);
            }
            let goods = plan.goods_cost + product.price * Decimal::from(quantity);
            let hours = total_hours + handling_hours(product) * quantity as f64;
            let staff = required_staff_for(hours);
            let staffing = costs::WAREHOUSE_MONTHLY_WAGE * Decimal::from(staff);
            if goods + staffing <= budget {
                break (goods, hours, staff, staffing);
            }
            quantity -= 1;
        };
        if quantity == 0 {
            continue;
        }
        let quantity = quantity.min(u64::from(u32::MAX)) as u32;

        plan.goods_cost = goods;
        plan.required_staff = staff;
        plan.staffing_cost = staffing;
        total_hours = hours;
        remaining_space -= u64::from(quantity) * u64::from(product.size_cm2);
        remaining_budget = budget - plan.goods_cost - plan.staffing_cost;
        plan.lines.push(PlanLine {
            product: product.id.clone(),
            quantity,
            unit_cost: product.price,
        });
        debug!(
            product = %product.id,
            quantity,
            score = candidate.score,
            remaining_budget = %remaining_budget,
            "committed plan line"
        );

        if remaining_budget <= Decimal::ZERO {
            break;
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::{generate_catalog, StoreSize};

    fn product(id: &str, price: i64, size: u32, category: ProductCategory) -> Product {
        Product {
            id: ProductId(id.to_string()),
            name: format!("Test {id}"),
            category,
            price: Decimal::new(price, 0),
            size_cm2: size,
            weight_g: 400,
            handling_factor: 1.0,
            fragility_factor: 0.2,
            estimated_demand: 60,
        }
    }

    #[test]
    fn demand_estimates_stay_in_band() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..200 {
            let d = estimate_demand(ProductCategory::Computers, &mut rng);
            assert!((30..100).contains(&d));
        }
    }

    #[test]
    fn denser_profit_ranks_first_and_ties_keep_pool_order() {
        // Same price and economics, the second twice the footprint: the
        // smaller product carries the higher profit density.
        let catalog = Catalog::new(vec![
            product("PROD-WIDE", 200, 800, ProductCategory::Audio),
            product("PROD-DENSE", 200, 400, ProductCategory::Audio),
            product("PROD-TIE-A", 100, 500, ProductCategory::Wearables),
            product("PROD-TIE-B", 100, 500, ProductCategory::Wearables),
        ])
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let ranked = rank_candidates(&catalog, &mut rng);

        assert_eq!(ranked[0].product.id.0, "PROD-DENSE");
        let pos_a = ranked.iter().position(|c| c.product.id.0 == "PROD-TIE-A");
        let pos_b = ranked.iter().position(|c| c.product.id.0 == "PROD-TIE-B");
        assert!(pos_a < pos_b, "stable sort must keep pool order on ties");
    }

    #[test]
    fn empty_pool_and_zero_budget_yield_empty_plans() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let empty = Catalog::default();
        assert!(plan_initial_inventory(&empty, Decimal::new(1_000, 0), 10_000, &mut rng).is_empty());

        let catalog = Catalog::new(vec![product("PROD-A", 100, 10, ProductCategory::Audio)]).unwrap();
        assert!(plan_initial_inventory(&catalog, Decimal::ZERO, 10_000, &mut rng).is_empty());
        assert!(plan_initial_inventory(&catalog, Decimal::new(-50, 0), 10_000, &mut rng).is_empty());
    }

    #[test]
    fn tight_budget_scenario_never_overshoots() {
        // Budget 1000, one candidate priced 100, unit size 1, capacity 10.
        let catalog = Catalog::new(vec![product("PROD-A", 100, 1, ProductCategory::Audio)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let budget = Decimal::new(1_000, 0);
        let plan = plan_initial_inventory(&catalog, budget, 10, &mut rng);

        assert!(plan.quantity_of(&ProductId("PROD-A".into())) <= 10);
        assert!(plan.total_cost() <= budget);
        assert!(budget - plan.total_cost() >= Decimal::ZERO);
    }

    #[test]
    fn funded_plan_commits_goods_and_staff() {
        let catalog = Catalog::new(vec![
            product("PROD-A", 100, 50, ProductCategory::Audio),
            product("PROD-B", 60, 40, ProductCategory::Wearables),
        ])
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let budget = Decimal::new(30_000, 0);
        let plan = plan_initial_inventory(&catalog, budget, 100_000, &mut rng);

        assert!(!plan.is_empty());
        assert!(plan.total_units() > 0);
        // Enough volume was allocated to need at least one pair of hands.
        assert!(plan.required_staff >= 1);
        assert_eq!(
            plan.staffing_cost,
            costs::WAREHOUSE_MONTHLY_WAGE * Decimal::from(plan.required_staff)
        );
        assert!(plan.total_cost() <= budget);
    }

    #[test]
    fn space_constraint_binds() {
        // Capacity fits at most 3 units regardless of money or demand.
        let catalog =
            Catalog::new(vec![product("PROD-A", 10, 1_000, ProductCategory::Audio)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let plan = plan_initial_inventory(&catalog, Decimal::new(50_000, 0), 3_500, &mut rng);
        assert!(plan.total_units() <= 3);
    }

    #[test]
    fn demand_cap_bounds_each_line() {
        let catalog = Catalog::new(vec![product("PROD-A", 1, 1, ProductCategory::Accessories)])
            .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let plan = plan_initial_inventory(&catalog, Decimal::new(100_000, 0), 1_000_000, &mut rng);
        // Accessories demand band tops out below 70; buffered cap is < 105.
        assert!(plan.quantity_of(&ProductId("PROD-A".into())) < 105);
    }

    #[test]
    fn apply_to_moves_stock_and_budget() {
        let catalog = Catalog::new(vec![product("PROD-A", 100, 50, ProductCategory::Audio)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut store = Store::new("TestMart", StoreSize::Medium);
        let plan = plan_initial_inventory(
            &catalog,
            store.budget,
            store.warehouse.ledger.capacity_cm2(),
            &mut rng,
        );
        assert!(!plan.is_empty());

        let budget_before = store.budget;
        plan.apply_to(&mut store, &catalog).unwrap();
        assert_eq!(store.budget, budget_before - plan.goods_cost);
        assert_eq!(store.warehouse.staff, plan.required_staff);
        assert_eq!(
            store.warehouse.ledger.quantity_of(&ProductId("PROD-A".into())),
            plan.quantity_of(&ProductId("PROD-A".into()))
        );
    }

    proptest! {
        #[test]
        fn plan_respects_budget_and_capacity(
            seed in 0u64..1_000,
            budget_units in 0i64..500_000,
            capacity in 0u64..2_000_000,
        ) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let catalog = generate_catalog(30, &mut rng);
            let budget = Decimal::new(budget_units, 0);
            let plan = plan_initial_inventory(&catalog, budget, capacity, &mut rng);

            prop_assert!(plan.total_cost() <= budget.max(Decimal::ZERO));

            let volume: u64 = plan
                .lines
                .iter()
                .map(|l| {
                    let p = catalog.get(&l.product).expect("plan references catalog");
                    u64::from(l.quantity) * u64::from(p.size_cm2)
                })
                .sum();
            prop_assert!(volume <= capacity);

            // Goods cost matches the committed lines.
            let goods: Decimal = plan
                .lines
                .iter()
                .map(|l| l.unit_cost * Decimal::from(l.quantity))
                .sum();
            prop_assert_eq!(goods, plan.goods_cost);
        }
    }
}
