#![deny(warnings)]

//! Core domain models and invariants for the retail simulator.
//!
//! This crate defines the serializable types shared across the simulation
//! (products, orders, the warehouse stock ledger) together with validation
//! helpers that guarantee basic invariants. Stock quantities live only in the
//! [`StockLedger`]; every other entity is immutable after construction.

use chrono::NaiveDateTime;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Monthly cost constants shared by the store model and the planner.
pub mod costs {
    use rust_decimal::Decimal;

    /// Monthly wage for store-floor staff, USD.
    pub const STORE_MONTHLY_WAGE: Decimal = Decimal::from_parts(2000, 0, 0, false, 0);
    /// Monthly wage for warehouse staff, USD.
    pub const WAREHOUSE_MONTHLY_WAGE: Decimal = Decimal::from_parts(2400, 0, 0, false, 0);
    /// Productive handling hours one warehouse employee covers per month.
    pub const STAFF_MONTHLY_CAPACITY_HOURS: f64 = 160.0;
}

/// Unique identifier for a product, e.g. "PROD-5A0F113C".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for an order within one simulation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ORD-{:06}", self.0)
    }
}

/// Retail categories carried by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProductCategory {
    /// Headphones, speakers.
    Audio,
    /// Laptops, monitors, printers, routers.
    Computers,
    /// Phones and tablets.
    Handhelds,
    /// Smartwatches.
    Wearables,
    /// Everything else (cameras, peripherals).
    Accessories,
}

impl ProductCategory {
    /// Expected monthly demand band (inclusive low, exclusive high) in units.
    pub fn demand_band(self) -> (u32, u32) {
        match self {
            ProductCategory::Audio | ProductCategory::Handhelds => (50, 150),
            ProductCategory::Computers => (30, 100),
            ProductCategory::Wearables => (40, 120),
            ProductCategory::Accessories => (20, 70),
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProductCategory::Audio => "Audio",
            ProductCategory::Computers => "Computers",
            ProductCategory::Handhelds => "Handhelds",
            ProductCategory::Wearables => "Wearables",
            ProductCategory::Accessories => "Accessories",
        };
        f.write_str(name)
    }
}

/// A sellable product. Immutable after construction; current stock is held
/// by the [`StockLedger`], not here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier.
    pub id: ProductId,
    /// Display name, e.g. "Ultra Laptop".
    pub name: String,
    /// Retail category.
    pub category: ProductCategory,
    /// Wholesale unit price in USD.
    pub price: Decimal,
    /// Shelf footprint in cm².
    pub size_cm2: u32,
    /// Unit weight in grams.
    pub weight_g: u32,
    /// Pick-effort multiplier (~0.8..1.6) applied to handling time.
    pub handling_factor: f64,
    /// Fragility in [0, 1]; raises shipping care cost.
    pub fragility_factor: f64,
    /// Expected units per month, stamped at catalog generation.
    pub estimated_demand: u32,
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<15} {:<20} {:<12} ${:<9.2} {:<9} {:<8} {:<6}",
            self.id.0,
            self.name,
            self.category.to_string(),
            self.price,
            format!("{}cm2", self.size_cm2),
            format!("{}g", self.weight_g),
            self.estimated_demand
        )
    }
}

/// The candidate pool supplied to the planner and the order generator.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate ids and invalid products.
    pub fn new(products: Vec<Product>) -> Result<Self, ValidationError> {
        let catalog = Self { products };
        validate_catalog(&catalog)?;
        Ok(catalog)
    }

    /// Look up a product by id.
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    /// Iterate products in pool order.
    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    /// Number of products in the pool.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// True when the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// A synthetic customer attached to generated orders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Full name.
    pub name: String,
    /// Contact email.
    pub email: String,
}

/// One order line: quantity and the unit price captured at order creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderItem {
    /// Ordered product.
    pub product: ProductId,
    /// Units ordered (> 0).
    pub quantity: u32,
    /// Wholesale price per unit at order-creation time.
    pub unit_price: Decimal,
    /// quantity × unit_price.
    pub subtotal: Decimal,
}

/// A customer order. Immutable once constructed; the money fields are sealed
/// at creation and never re-read from the catalog.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier.
    pub id: OrderId,
    /// Simulated time the order was placed.
    pub placed_at: NaiveDateTime,
    /// Ordering customer.
    pub customer: Customer,
    /// Order lines, one per distinct product.
    pub items: Vec<OrderItem>,
    /// Σ item.subtotal.
    pub total: Decimal,
}

impl Order {
    /// Build an order from `(product, quantity)` lines, capturing each unit
    /// price and computing subtotals and the order total.
    pub fn new(
        id: OrderId,
        customer: Customer,
        placed_at: NaiveDateTime,
        lines: Vec<(&Product, u32)>,
    ) -> Result<Self, ValidationError> {
        if lines.is_empty() {
            return Err(ValidationError::EmptyOrder);
        }
        let mut items = Vec::with_capacity(lines.len());
        let mut total = Decimal::ZERO;
        for (product, quantity) in lines {
            if quantity == 0 {
                return Err(ValidationError::ZeroQuantity(product.id.clone()));
            }
            let subtotal = product.price * Decimal::from(quantity);
            total += subtotal;
            items.push(OrderItem {
                product: product.id.clone(),
                quantity,
                unit_price: product.price,
                subtotal,
            });
        }
        Ok(Self {
            id,
            placed_at,
            customer,
            items,
            total,
        })
    }

    /// Total units across all lines.
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// Stock held for one product: quantity plus the unit footprint captured at
/// intake so the capacity invariant needs no catalog lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSlot {
    /// Units on hand.
    pub quantity: u32,
    /// Footprint per unit in cm².
    pub unit_size_cm2: u32,
}

/// Errors raised by stock-ledger mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// An order line asked for more units than are on hand.
    #[error("insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Product the failing line refers to.
        product: ProductId,
        /// Units the order asked for.
        requested: u32,
        /// Units actually on hand.
        available: u32,
    },
    /// Intake would overflow warehouse capacity.
    #[error("warehouse capacity exceeded: need {required_cm2}cm2, free {free_cm2}cm2")]
    CapacityExceeded {
        /// Space the intake requires.
        required_cm2: u64,
        /// Space currently free.
        free_cm2: u64,
    },
    /// An order line refers to a product the ledger has never stocked.
    #[error("unknown product: {0}")]
    UnknownProduct(ProductId),
}

/// Per-product stock ledger: the single mutable resource shared between the
/// planner (at init) and order processing (per order).
///
/// Invariant: Σ quantity × unit size ≤ capacity, at all times.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StockLedger {
    capacity_cm2: u64,
    slots: BTreeMap<ProductId, StockSlot>,
}

impl StockLedger {
    /// Empty ledger with the given capacity.
    pub fn new(capacity_cm2: u64) -> Self {
        Self {
            capacity_cm2,
            slots: BTreeMap::new(),
        }
    }

    /// Total capacity in cm².
    pub fn capacity_cm2(&self) -> u64 {
        self.capacity_cm2
    }

    /// Occupied space, Σ quantity × unit size.
    pub fn occupied_cm2(&self) -> u64 {
        self.slots
            .values()
            .map(|s| u64::from(s.quantity) * u64::from(s.unit_size_cm2))
            .sum()
    }

    /// Free space remaining.
    pub fn free_cm2(&self) -> u64 {
        self.capacity_cm2 - self.occupied_cm2()
    }

    /// Units on hand for a product (0 when never stocked).
    pub fn quantity_of(&self, id: &ProductId) -> u32 {
        self.slots.get(id).map_or(0, |s| s.quantity)
    }

    /// Total units across all slots.
    pub fn total_units(&self) -> u64 {
        self.slots.values().map(|s| u64::from(s.quantity)).sum()
    }

    /// Ids of products with at least one unit on hand, in ledger order.
    pub fn in_stock_ids(&self) -> Vec<ProductId> {
        self.slots
            .iter()
            .filter(|(_, s)| s.quantity > 0)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Take delivery of `quantity` units, checked against free capacity.
    pub fn receive(&mut self, product: &Product, quantity: u32) -> Result<(), LedgerError> {
        let required = u64::from(quantity) * u64::from(product.size_cm2);
        let free = self.free_cm2();
        if required > free {
            return Err(LedgerError::CapacityExceeded {
                required_cm2: required,
                free_cm2: free,
            });
        }
        let slot = self.slots.entry(product.id.clone()).or_insert(StockSlot {
            quantity: 0,
            unit_size_cm2: product.size_cm2,
        });
        slot.quantity += quantity;
        Ok(())
    }

    /// Execute an order atomically: every line is checked against available
    /// stock before any decrement, so a failing order leaves the ledger
    /// untouched (all-or-nothing).
    pub fn execute(&mut self, order: &Order) -> Result<(), LedgerError> {
        for item in &order.items {
            let slot = self
                .slots
                .get(&item.product)
                .ok_or_else(|| LedgerError::UnknownProduct(item.product.clone()))?;
            if item.quantity > slot.quantity {
                return Err(LedgerError::InsufficientStock {
                    product: item.product.clone(),
                    requested: item.quantity,
                    available: slot.quantity,
                });
            }
        }
        for item in &order.items {
            // Presence and bounds proven above.
            if let Some(slot) = self.slots.get_mut(&item.product) {
                slot.quantity -= item.quantity;
            }
        }
        Ok(())
    }
}

/// A storage facility owned by exactly one store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Warehouse {
    /// Stock ledger, capacity included.
    pub ledger: StockLedger,
    /// Warehouse headcount (set from the planner's staffing derivation).
    pub staff: u32,
    /// Monthly rent in USD.
    pub rent: Decimal,
}

impl Warehouse {
    /// Empty warehouse with the given capacity and rent, no staff yet.
    pub fn new(capacity_cm2: u64, rent: Decimal) -> Self {
        Self {
            ledger: StockLedger::new(capacity_cm2),
            staff: 0,
            rent,
        }
    }
}

/// Store size class; drives budget, warehouse capacity and order cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreSize {
    /// Corner shop.
    Small,
    /// High-street store.
    Medium,
    /// Flagship store.
    Large,
}

impl StoreSize {
    /// Starting budget in USD.
    pub fn starting_budget(self) -> Decimal {
        match self {
            StoreSize::Small => Decimal::new(50_000, 0),
            StoreSize::Medium => Decimal::new(150_000, 0),
            StoreSize::Large => Decimal::new(400_000, 0),
        }
    }

    /// Warehouse capacity in cm².
    pub fn warehouse_capacity_cm2(self) -> u64 {
        match self {
            StoreSize::Small => 200_000,
            StoreSize::Medium => 600_000,
            StoreSize::Large => 1_600_000,
        }
    }

    /// Monthly warehouse rent in USD.
    pub fn warehouse_rent(self) -> Decimal {
        match self {
            StoreSize::Small => Decimal::new(1_500, 0),
            StoreSize::Medium => Decimal::new(4_000, 0),
            StoreSize::Large => Decimal::new(9_000, 0),
        }
    }

    /// Monthly utilities in USD.
    pub fn monthly_utilities(self) -> Decimal {
        match self {
            StoreSize::Small => Decimal::new(300, 0),
            StoreSize::Medium => Decimal::new(800, 0),
            StoreSize::Large => Decimal::new(1_800, 0),
        }
    }

    /// Store-floor headcount.
    pub fn store_staff(self) -> u32 {
        match self {
            StoreSize::Small => 2,
            StoreSize::Medium => 5,
            StoreSize::Large => 12,
        }
    }

    /// Real seconds between generated orders at 1× speed.
    pub fn order_interval_secs(self) -> u64 {
        match self {
            StoreSize::Small => 7,
            StoreSize::Medium => 5,
            StoreSize::Large => 3,
        }
    }

    /// Pick a size class at random.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        match rng.gen_range(0..3u8) {
            0 => StoreSize::Small,
            1 => StoreSize::Medium,
            _ => StoreSize::Large,
        }
    }
}

impl fmt::Display for StoreSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreSize::Small => "small",
            StoreSize::Medium => "medium",
            StoreSize::Large => "large",
        };
        f.write_str(name)
    }
}

/// A retail store owning exactly one warehouse.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Store {
    /// Store brand name.
    pub name: String,
    /// Size class.
    pub size: StoreSize,
    /// Remaining budget in USD; debited by purchases.
    pub budget: Decimal,
    /// Store-floor headcount.
    pub staff: u32,
    /// The owned warehouse.
    pub warehouse: Warehouse,
}

impl Store {
    /// Build a store of the given size with derived budget, staff and
    /// warehouse.
    pub fn new(name: impl Into<String>, size: StoreSize) -> Self {
        Self {
            name: name.into(),
            size,
            budget: size.starting_budget(),
            staff: size.store_staff(),
            warehouse: Warehouse::new(size.warehouse_capacity_cm2(), size.warehouse_rent()),
        }
    }

    /// Fixed monthly running costs: wages for both staff pools, rent and
    /// utilities.
    pub fn monthly_spending(&self) -> Decimal {
        let store_wages = costs::STORE_MONTHLY_WAGE * Decimal::from(self.staff);
        let warehouse_wages = costs::WAREHOUSE_MONTHLY_WAGE * Decimal::from(self.warehouse.staff);
        store_wages + warehouse_wages + self.warehouse.rent + self.size.monthly_utilities()
    }
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Product price must be strictly positive.
    #[error("product {0} has a non-positive price")]
    NonPositivePrice(ProductId),
    /// Product size must be strictly positive.
    #[error("product {0} has zero size")]
    ZeroSize(ProductId),
    /// Factors must be finite and non-negative.
    #[error("product {0} has a non-finite or negative factor")]
    InvalidFactor(ProductId),
    /// Catalog ids must be unique.
    #[error("duplicate product id: {0}")]
    DuplicateId(ProductId),
    /// Orders must carry at least one line.
    #[error("order has no items")]
    EmptyOrder,
    /// Order lines must carry at least one unit.
    #[error("order line for {0} has zero quantity")]
    ZeroQuantity(ProductId),
}

/// Validate a single product.
pub fn validate_product(product: &Product) -> Result<(), ValidationError> {
    if product.price <= Decimal::ZERO {
        return Err(ValidationError::NonPositivePrice(product.id.clone()));
    }
    if product.size_cm2 == 0 {
        return Err(ValidationError::ZeroSize(product.id.clone()));
    }
    let factors_ok = product.handling_factor.is_finite()
        && product.handling_factor >= 0.0
        && product.fragility_factor.is_finite()
        && product.fragility_factor >= 0.0;
    if !factors_ok {
        return Err(ValidationError::InvalidFactor(product.id.clone()));
    }
    Ok(())
}

/// Validate a catalog: every product valid, ids unique.
pub fn validate_catalog(catalog: &Catalog) -> Result<(), ValidationError> {
    let mut seen = std::collections::BTreeSet::new();
    for product in catalog.iter() {
        validate_product(product)?;
        if !seen.insert(&product.id) {
            return Err(ValidationError::DuplicateId(product.id.clone()));
        }
    }
    Ok(())
}

mod generate;

pub use generate::{generate_catalog, generate_customer, generate_product};
