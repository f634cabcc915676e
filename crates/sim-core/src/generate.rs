//! Synthetic catalog and customer generation.
//!
//! All randomness flows through the caller's [`Rng`], so a seeded generator
//! yields a reproducible catalog.

use rand::Rng;
use rust_decimal::Decimal;
use std::collections::BTreeSet;

use crate::{Catalog, Customer, Product, ProductCategory, ProductId};

/// Version tier: display name, price percent, size/weight percent.
const VERSIONS: &[(&str, u32, u32)] = &[
    ("Pro", 130, 105),
    ("Max", 150, 115),
    ("Ultra", 170, 120),
    ("Mini", 80, 70),
    ("Plus", 120, 110),
    ("Air", 110, 85),
    ("Go", 70, 75),
    ("Lite", 60, 80),
    ("Prime", 140, 105),
    ("Edge", 125, 95),
];

/// Product type: name, category, base price USD, base size cm², base weight
/// grams, base fragility.
const TYPES: &[(&str, ProductCategory, u32, u32, u32, f64)] = &[
    ("Phone", ProductCategory::Handhelds, 600, 80, 180, 0.5),
    ("Laptop", ProductCategory::Computers, 900, 900, 1600, 0.6),
    ("Tablet", ProductCategory::Handhelds, 450, 350, 500, 0.5),
    ("Headphones", ProductCategory::Audio, 150, 250, 300, 0.3),
    ("Camera", ProductCategory::Accessories, 500, 300, 650, 0.9),
    ("Smartwatch", ProductCategory::Wearables, 250, 60, 90, 0.4),
    ("Speaker", ProductCategory::Audio, 120, 400, 900, 0.3),
    ("Monitor", ProductCategory::Computers, 300, 1800, 3500, 0.8),
    ("Printer", ProductCategory::Computers, 200, 2200, 5200, 0.4),
    ("Router", ProductCategory::Computers, 90, 350, 420, 0.2),
];

const FIRST_NAMES: &[&str] = &[
    "Simon", "Anna", "Peter", "Maria", "John", "Linda", "James", "Susan", "Robert", "Karen",
];

const LAST_NAMES: &[&str] = &[
    "Smith",
    "Johnson",
    "Williams",
    "Brown",
    "Jones",
    "Garcia",
    "Miller",
    "Davis",
    "Rodriguez",
    "Martinez",
    "Hernandez",
    "Lopez",
    "Gonzalez",
    "Wilson",
];

const EMAIL_PROVIDERS: &[&str] = &[
    "fmail.com",
    "ahooy.com",
    "inlook.com",
    "example.com",
    "notmail.com",
];

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Generate one random product from the version × type pools.
pub fn generate_product<R: Rng + ?Sized>(rng: &mut R) -> Product {
    let (version, price_pct, metric_pct) = VERSIONS[rng.gen_range(0..VERSIONS.len())];
    let (type_name, category, base_price, base_size, base_weight, base_fragility) =
        TYPES[rng.gen_range(0..TYPES.len())];

    let price_cents = i64::from(base_price) * i64::from(price_pct);
    let (lo, hi) = category.demand_band();

    Product {
        id: ProductId(format!("PROD-{:08X}", rng.gen::<u32>())),
        name: format!("{version} {type_name}"),
        category,
        price: Decimal::new(price_cents, 2),
        size_cm2: (base_size * metric_pct / 100).max(1),
        weight_g: (base_weight * metric_pct / 100).max(1),
        handling_factor: round2(rng.gen_range(0.8..1.6)),
        fragility_factor: round2(base_fragility + rng.gen_range(0.0..0.1)),
        estimated_demand: rng.gen_range(lo..hi),
    }
}

/// Generate a catalog of `count` distinct products. Id collisions are
/// re-drawn so the catalog always validates.
pub fn generate_catalog<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Catalog {
    let mut seen: BTreeSet<ProductId> = BTreeSet::new();
    let mut products = Vec::with_capacity(count);
    while products.len() < count {
        let mut product = generate_product(rng);
        while seen.contains(&product.id) {
            product.id = ProductId(format!("PROD-{:08X}", rng.gen::<u32>()));
        }
        seen.insert(product.id.clone());
        products.push(product);
    }
    Catalog { products }
}

/// Generate a random customer with a matching email address.
pub fn generate_customer<R: Rng + ?Sized>(rng: &mut R) -> Customer {
    let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
    let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
    let provider = EMAIL_PROVIDERS[rng.gen_range(0..EMAIL_PROVIDERS.len())];
    let initial = first
        .chars()
        .next()
        .map(|c| c.to_ascii_lowercase())
        .unwrap_or('x');
    Customer {
        name: format!("{first} {last}"),
        email: format!("{}{}@{}", initial, last.to_lowercase(), provider),
    }
}
