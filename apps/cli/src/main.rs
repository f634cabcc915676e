#![deny(warnings)]

//! Interactive retail-simulation CLI: provisions a store, spawns the
//! runtime loops and drives them from stdin commands.

use anyhow::Result;
use chrono::Local;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sim_core::{generate_catalog, Store, StoreSize};
use sim_runtime::{
    parse_command, provision_initial_inventory, BusinessHours, Command, SimConfig, Simulation,
    StdoutSink, DEFAULT_BASE_QUANTUM_MS, USAGE,
};
use std::io::{BufRead, Write};
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

struct Args {
    size: Option<StoreSize>,
    seed: Option<u64>,
    speed: u32,
    products: usize,
}

fn parse_size(s: &str) -> Option<StoreSize> {
    match s.to_ascii_lowercase().as_str() {
        "small" => Some(StoreSize::Small),
        "medium" => Some(StoreSize::Medium),
        "large" => Some(StoreSize::Large),
        _ => None,
    }
}

fn parse_args() -> Args {
    let mut args = Args {
        size: None,
        seed: None,
        speed: 4,
        products: 50,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--size" => args.size = it.next().and_then(|s| parse_size(&s)),
            "--seed" => args.seed = it.next().and_then(|s| s.parse().ok()),
            "--speed" => {
                if let Some(v) = it.next().and_then(|s| s.parse().ok()) {
                    args.speed = v;
                }
            }
            "--products" => {
                if let Some(v) = it.next().and_then(|s| s.parse().ok()) {
                    args.products = v;
                }
            }
            _ => {}
        }
    }
    args
}

fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let size = args.size.unwrap_or_else(|| StoreSize::random(&mut rng));
    let mut store = Store::new("Main Street Electronics", size);
    let catalog = generate_catalog(args.products, &mut rng);

    info!(git_sha = env!("GIT_SHA"), seed, %size, "starting retail-sim");
    println!("Starting shop simulator: {} ({} store)", store.name, size);

    let plan = provision_initial_inventory(&mut store, &catalog, &mut rng)?;
    println!("=== INITIAL PRODUCTS ===");
    println!(
        "{:<15} {:<20} {:<12} {:<10} {:<9} {:<8} {:<6}",
        "PRODUCT ID", "NAME", "CATEGORY", "PRICE", "SIZE", "WEIGHT", "DEMAND"
    );
    for product in catalog.iter().filter(|p| plan.quantity_of(&p.id) > 0) {
        println!("{product}");
    }
    println!(
        "Initial inventory purchased for ${:.2} ({} units, {} warehouse staff)",
        plan.goods_cost,
        plan.total_units(),
        plan.required_staff
    );
    println!("Remaining budget: ${:.2}\n", store.budget);

    let config = SimConfig {
        start: Local::now().naive_local(),
        base_quantum_ms: DEFAULT_BASE_QUANTUM_MS,
        initial_speed: args.speed,
        hours: BusinessHours::default(),
        order_interval_ms: size.order_interval_secs() * 1_000,
    };
    let sim = Simulation::start(
        store,
        catalog,
        config,
        ChaCha8Rng::seed_from_u64(seed.wrapping_add(1)),
        Box::new(StdoutSink),
    );

    println!("{USAGE}");
    let mut lines = spawn_stdin_reader();
    prompt();
    while let Some(line) = lines.recv().await {
        match parse_command(&line) {
            Command::SetSpeed(multiplier) => {
                if sim.set_speed(multiplier) {
                    println!("Speed set to {multiplier}x");
                } else {
                    println!("Invalid speed. Use 1, 4, 8, 16, 32, 64, 128 or 720.");
                }
            }
            Command::Report => println!("{}", sim.render_report_now().await),
            Command::Queue => println!("Orders in queue: {}", sim.queue_len().await),
            Command::Time => println!("Current simulated time: {}", sim.now()),
            Command::Quit => {
                println!("Shutting down simulation...");
                break;
            }
            Command::Help => println!("Unknown command. {USAGE}"),
        }
        prompt();
    }

    sim.shutdown().await;
    Ok(())
}
