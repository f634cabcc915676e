//! Monthly report aggregation: running totals per simulated month, rendered
//! at the boundary and cleared for the next one.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sim_core::{Catalog, Order, ProductId};

/// How many products the best/least-seller sections list.
const RANKING_DEPTH: usize = 5;

/// Accumulates order statistics for one simulated month.
///
/// Per-product ranking ties are broken by first-encounter order, which the
/// aggregator tracks explicitly so rendering is deterministic.
#[derive(Debug, Default)]
pub struct ReportAggregator {
    total_orders: u64,
    total_revenue: Decimal,
    units_sold: BTreeMap<ProductId, u64>,
    revenue_by_product: BTreeMap<ProductId, Decimal>,
    encounter_order: Vec<ProductId>,
}

impl ReportAggregator {
    /// Record one completed order: order count, revenue and per-product
    /// units, keyed by product identity.
    pub fn record_order(&mut self, order: &Order) {
        self.total_orders += 1;
        self.total_revenue += order.total;
        for item in &order.items {
            if !self.units_sold.contains_key(&item.product) {
                self.encounter_order.push(item.product.clone());
            }
            *self.units_sold.entry(item.product.clone()).or_insert(0) +=
                u64::from(item.quantity);
            *self
                .revenue_by_product
                .entry(item.product.clone())
                .or_insert(Decimal::ZERO) += item.subtotal;
        }
    }

    /// Orders recorded this month.
    pub fn total_orders(&self) -> u64 {
        self.total_orders
    }

    /// Revenue recorded this month.
    pub fn total_revenue(&self) -> Decimal {
        self.total_revenue
    }

    /// Units recorded for one product this month.
    pub fn units_of(&self, id: &ProductId) -> u64 {
        self.units_sold.get(id).copied().unwrap_or(0)
    }

    /// Average order value; zero when no orders were recorded.
    pub fn average_order_value(&self) -> Decimal {
        if self.total_orders == 0 {
            return Decimal::ZERO;
        }
        (self.total_revenue / Decimal::from(self.total_orders)).round_dp(2)
    }

    /// Products sold this month ranked by units descending; ties keep
    /// first-encounter order (stable sort).
    fn ranked(&self) -> Vec<(&ProductId, u64)> {
        let mut ranked: Vec<(&ProductId, u64)> = self
            .encounter_order
            .iter()
            .map(|id| (id, self.units_of(id)))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    /// The top sellers by units, best first.
    pub fn top_sellers(&self) -> Vec<(ProductId, u64)> {
        self.ranked()
            .into_iter()
            .take(RANKING_DEPTH)
            .map(|(id, units)| (id.clone(), units))
            .collect()
    }

    /// The least-selling products by the same ranking, lowest units first.
    pub fn bottom_sellers(&self) -> Vec<(ProductId, u64)> {
        self.ranked()
            .into_iter()
            .rev()
            .take(RANKING_DEPTH)
            .map(|(id, units)| (id.clone(), units))
            .collect()
    }

    /// Render the monthly summary as of `as_of`. `monthly_costs` is the
    /// store's fixed spending for the month (wages, rent, utilities) and
    /// feeds the net-result line.
    pub fn render(&self, as_of: NaiveDateTime, catalog: &Catalog, monthly_costs: Decimal) -> String {
        let mut out = String::new();
        let name_of = |id: &ProductId| {
            catalog
                .get(id)
                .map_or_else(|| id.0.clone(), |p| p.name.clone())
        };

        let _ = writeln!(out, "=====================================");
        let _ = writeln!(out, "   MONTHLY SUMMARY REPORT");
        let _ = writeln!(out, "   {}", as_of.format("%B %Y"));
        let _ = writeln!(out, "=====================================");
        let _ = writeln!(out);
        let _ = writeln!(out, "REVENUE SUMMARY:");
        let _ = writeln!(out, "  Total Orders: {}", self.total_orders);
        let _ = writeln!(out, "  Total Revenue: ${:.2}", self.total_revenue);
        let _ = writeln!(out, "  Average Order Value: ${:.2}", self.average_order_value());
        let _ = writeln!(out);

        let _ = writeln!(out, "TOP {RANKING_DEPTH} BEST SELLING PRODUCTS:");
        for (rank, (id, units)) in self.top_sellers().iter().enumerate() {
            let revenue = self
                .revenue_by_product
                .get(id)
                .copied()
                .unwrap_or(Decimal::ZERO);
            let _ = writeln!(
                out,
                "  {}. {}: {} units (Revenue: ${:.2})",
                rank + 1,
                name_of(id),
                units,
                revenue
            );
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "TOP {RANKING_DEPTH} LEAST SELLING PRODUCTS:");
        for (rank, (id, units)) in self.bottom_sellers().iter().enumerate() {
            let revenue = self
                .revenue_by_product
                .get(id)
                .copied()
                .unwrap_or(Decimal::ZERO);
            let _ = writeln!(
                out,
                "  {}. {}: {} units (Revenue: ${:.2})",
                rank + 1,
                name_of(id),
                units,
                revenue
            );
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "NET RESULT: ${:.2}", self.total_revenue - monthly_costs);
        out
    }

    /// Clear every running total for the next month. Called exactly once
    /// per boundary, after rendering.
    pub fn reset(&mut self) {
        self.total_orders = 0;
        self.total_revenue = Decimal::ZERO;
        self.units_sold.clear();
        self.revenue_by_product.clear();
        self.encounter_order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sim_core::{Customer, OrderId, Product, ProductCategory};

    fn product(id: &str, name: &str, price: i64) -> Product {
        Product {
            id: ProductId(id.to_string()),
            name: name.to_string(),
            category: ProductCategory::Audio,
            price: Decimal::new(price, 0),
            size_cm2: 100,
            weight_g: 300,
            handling_factor: 1.0,
            fragility_factor: 0.2,
            estimated_demand: 60,
        }
    }

    fn order(id: u64, lines: Vec<(&Product, u32)>) -> Order {
        Order::new(
            OrderId(id),
            Customer {
                name: "Maria Garcia".into(),
                email: "mgarcia@example.com".into(),
            },
            NaiveDate::from_ymd_opt(2024, 7, 31)
                .unwrap()
                .and_hms_opt(23, 59, 0)
                .unwrap(),
            lines,
        )
        .unwrap()
    }

    #[test]
    fn two_product_ranking_scenario() {
        // 5 units at $100 vs 2 units at $50: the first is the top seller
        // and both appear when fewer than five products sold.
        let a = product("PROD-A", "Max Phone", 100);
        let b = product("PROD-B", "Go Router", 50);
        let mut agg = ReportAggregator::default();
        agg.record_order(&order(1, vec![(&a, 5)]));
        agg.record_order(&order(2, vec![(&b, 2)]));

        let top = agg.top_sellers();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0], (a.id.clone(), 5));
        assert_eq!(top[1], (b.id.clone(), 2));

        let bottom = agg.bottom_sellers();
        assert_eq!(bottom[0], (b.id.clone(), 2));

        assert_eq!(agg.total_orders(), 2);
        assert_eq!(agg.total_revenue(), Decimal::new(600, 0));
        assert_eq!(agg.average_order_value(), Decimal::new(300, 0));
    }

    #[test]
    fn ties_break_by_encounter_order() {
        let a = product("PROD-A", "Max Phone", 100);
        let b = product("PROD-B", "Go Router", 50);
        let c = product("PROD-C", "Air Tablet", 75);
        let mut agg = ReportAggregator::default();
        agg.record_order(&order(1, vec![(&b, 3)]));
        agg.record_order(&order(2, vec![(&a, 3)]));
        agg.record_order(&order(3, vec![(&c, 3)]));

        let top = agg.top_sellers();
        assert_eq!(top[0].0, b.id);
        assert_eq!(top[1].0, a.id);
        assert_eq!(top[2].0, c.id);
    }

    #[test]
    fn empty_month_has_zero_average() {
        let agg = ReportAggregator::default();
        assert_eq!(agg.average_order_value(), Decimal::ZERO);
        assert!(agg.top_sellers().is_empty());
    }

    #[test]
    fn render_carries_all_sections_and_reset_clears() {
        let a = product("PROD-A", "Max Phone", 100);
        let catalog = Catalog::new(vec![a.clone()]).unwrap();
        let mut agg = ReportAggregator::default();
        agg.record_order(&order(1, vec![(&a, 2)]));

        let as_of = NaiveDate::from_ymd_opt(2024, 7, 31)
            .unwrap()
            .and_hms_opt(23, 59, 0)
            .unwrap();
        let text = agg.render(as_of, &catalog, Decimal::new(150, 0));
        assert!(text.contains("MONTHLY SUMMARY REPORT"));
        assert!(text.contains("July 2024"));
        assert!(text.contains("Total Orders: 1"));
        assert!(text.contains("Total Revenue: $200.00"));
        assert!(text.contains("TOP 5 BEST SELLING PRODUCTS:"));
        assert!(text.contains("1. Max Phone: 2 units (Revenue: $200.00)"));
        assert!(text.contains("TOP 5 LEAST SELLING PRODUCTS:"));
        assert!(text.contains("NET RESULT: $50.00"));

        agg.reset();
        assert_eq!(agg.total_orders(), 0);
        assert_eq!(agg.total_revenue(), Decimal::ZERO);
        assert_eq!(agg.units_of(&a.id), 0);
        assert!(agg.top_sellers().is_empty());
    }
}
