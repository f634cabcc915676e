//! Synthetic order generation and order execution against the shared ledger.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use sim_core::{generate_customer, Catalog, LedgerError, Order, OrderId, ProductId, Store};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::report::ReportAggregator;

/// Builds candidate orders from whatever is currently in stock.
#[derive(Debug)]
pub struct OrderGenerator {
    rng: ChaCha8Rng,
    next_id: u64,
}

impl OrderGenerator {
    /// Generator drawing from the given seeded rng; ids start at 1.
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self { rng, next_id: 1 }
    }

    /// Build one candidate order: 1–4 draws from the in-stock products,
    /// 1–3 units each; repeated draws of one product merge into a single
    /// line. Returns `None` when nothing is in stock (silent skip).
    pub fn build_order(
        &mut self,
        catalog: &Catalog,
        in_stock: &[ProductId],
        now: NaiveDateTime,
    ) -> Option<Order> {
        if in_stock.is_empty() {
            trace!("no products in stock, skipping order generation");
            return None;
        }

        let draws = self.rng.gen_range(1..=4usize);
        let mut basket: BTreeMap<ProductId, u32> = BTreeMap::new();
        for _ in 0..draws {
            let id = &in_stock[self.rng.gen_range(0..in_stock.len())];
            let quantity = self.rng.gen_range(1..=3u32);
            *basket.entry(id.clone()).or_insert(0) += quantity;
        }

        let mut lines = Vec::with_capacity(basket.len());
        for (id, quantity) in &basket {
            let product = catalog.get(id)?;
            lines.push((product, *quantity));
        }

        let id = OrderId(self.next_id);
        let customer = generate_customer(&mut self.rng);
        match Order::new(id, customer, now, lines) {
            Ok(order) => {
                self.next_id += 1;
                Some(order)
            }
            Err(err) => {
                warn!(%err, "generated order failed validation, skipping");
                None
            }
        }
    }
}

/// Executes orders against the shared store ledger and feeds the monthly
/// report. The store mutex serializes all stock mutation, which keeps each
/// order's decrements atomic with respect to concurrent orders.
#[derive(Debug)]
pub struct OrderProcessor {
    store: Arc<Mutex<Store>>,
    report: Arc<Mutex<ReportAggregator>>,
}

impl OrderProcessor {
    /// Processor over the shared store and report aggregator.
    pub fn new(store: Arc<Mutex<Store>>, report: Arc<Mutex<ReportAggregator>>) -> Self {
        Self { store, report }
    }

    /// The shared report aggregator.
    pub fn report(&self) -> &Arc<Mutex<ReportAggregator>> {
        &self.report
    }

    /// Execute an order all-or-nothing. On success the stock is decremented
    /// per line and the order is recorded with the aggregator; on failure
    /// the typed error is returned and the ledger is untouched.
    pub async fn process(&self, order: &Order) -> Result<(), LedgerError> {
        {
            let mut store = self.store.lock().await;
            store.warehouse.ledger.execute(order)?;
        }
        self.report.lock().await.record_order(order);
        debug!(order = %order.id, total = %order.total, "order fulfilled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rust_decimal::Decimal;
    use sim_core::{generate_catalog, Customer, Product, ProductCategory, StoreSize};

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn generator(seed: u64) -> OrderGenerator {
        OrderGenerator::new(ChaCha8Rng::seed_from_u64(seed))
    }

    #[test]
    fn empty_stock_skips_silently() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let catalog = generate_catalog(5, &mut rng);
        let mut gen = generator(2);
        assert!(gen.build_order(&catalog, &[], noon()).is_none());
    }

    #[test]
    fn generated_orders_stay_within_draw_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let catalog = generate_catalog(10, &mut rng);
        let in_stock: Vec<ProductId> = catalog.iter().map(|p| p.id.clone()).collect();
        let mut gen = generator(4);

        for expected_id in 1..=50u64 {
            let order = gen.build_order(&catalog, &in_stock, noon()).unwrap();
            assert_eq!(order.id, OrderId(expected_id));
            assert!((1..=4).contains(&order.items.len()));
            for item in &order.items {
                assert!(item.quantity >= 1);
                // 4 draws of 3 units collapsing onto one product at most.
                assert!(item.quantity <= 12);
                assert!(in_stock.contains(&item.product));
                let product = catalog.get(&item.product).unwrap();
                assert_eq!(item.unit_price, product.price);
            }
            let sum: Decimal = order.items.iter().map(|i| i.subtotal).sum();
            assert_eq!(order.total, sum);
        }
    }

    #[tokio::test]
    async fn processing_decrements_stock_and_records() {
        let product = Product {
            id: ProductId("PROD-A".into()),
            name: "Plus Speaker".into(),
            category: ProductCategory::Audio,
            price: Decimal::new(120, 0),
            size_cm2: 400,
            weight_g: 900,
            handling_factor: 1.1,
            fragility_factor: 0.3,
            estimated_demand: 60,
        };
        let mut store = Store::new("TestMart", StoreSize::Medium);
        store.warehouse.ledger.receive(&product, 4).unwrap();
        let store = Arc::new(Mutex::new(store));
        let report = Arc::new(Mutex::new(ReportAggregator::default()));
        let processor = OrderProcessor::new(store.clone(), report.clone());

        let order = Order::new(
            OrderId(1),
            Customer {
                name: "John Jones".into(),
                email: "jjones@example.com".into(),
            },
            noon(),
            vec![(&product, 3)],
        )
        .unwrap();

        processor.process(&order).await.unwrap();
        assert_eq!(store.lock().await.warehouse.ledger.quantity_of(&product.id), 1);
        assert_eq!(report.lock().await.total_orders(), 1);
        assert_eq!(report.lock().await.total_revenue(), Decimal::new(360, 0));

        // A second oversized order fails atomically and records nothing.
        let too_big = Order::new(
            OrderId(2),
            Customer {
                name: "John Jones".into(),
                email: "jjones@example.com".into(),
            },
            noon(),
            vec![(&product, 2)],
        )
        .unwrap();
        let err = processor.process(&too_big).await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientStock { .. }));
        assert_eq!(store.lock().await.warehouse.ledger.quantity_of(&product.id), 1);
        assert_eq!(report.lock().await.total_orders(), 1);
    }
}
