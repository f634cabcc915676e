//! Simulation runner: wires the virtual clock, order generation, the
//! business-hours gate and the month-end watcher into cooperating tokio
//! tasks sharing `Arc` state, plus the textual command surface.
//!
//! All loops honor the clock's cooperative running flag: on stop each
//! finishes its current sleep and exits, no hard preemption.

use std::sync::Arc;

use chrono::{Datelike, NaiveDateTime, Timelike};
use rand_chacha::ChaCha8Rng;
use sim_core::{Catalog, LedgerError, Store};
use sim_econ::PurchasePlan;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::clock::{self, SimClock};
use crate::hours::{BusinessHours, BusinessHoursGate};
use crate::orders::{OrderGenerator, OrderProcessor};
use crate::report::ReportAggregator;

/// Consumer of rendered monthly reports (a log sink, a UI, a test capture).
pub trait ReportSink: Send {
    /// Receive one formatted report.
    fn publish(&mut self, report: &str);
}

/// Prints reports to standard output.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl ReportSink for StdoutSink {
    fn publish(&mut self, report: &str) {
        println!("{report}");
    }
}

/// Runtime configuration for one simulation run.
#[derive(Clone, Copy, Debug)]
pub struct SimConfig {
    /// Simulated start instant.
    pub start: NaiveDateTime,
    /// Real milliseconds per simulated minute at 1× speed.
    pub base_quantum_ms: u64,
    /// Initial speed multiplier (validated against the allowed set).
    pub initial_speed: u32,
    /// Open/close window for immediate order processing.
    pub hours: BusinessHours,
    /// Real milliseconds between generated orders at 1× speed.
    pub order_interval_ms: u64,
}

/// Run the planner against the store's budget and capacity and stock the
/// warehouse with the result.
pub fn provision_initial_inventory<R: rand::Rng + ?Sized>(
    store: &mut Store,
    catalog: &Catalog,
    rng: &mut R,
) -> Result<PurchasePlan, LedgerError> {
    let plan = sim_econ::plan_initial_inventory(
        catalog,
        store.budget,
        store.warehouse.ledger.capacity_cm2(),
        rng,
    );
    plan.apply_to(store, catalog)?;
    info!(
        lines = plan.lines.len(),
        units = plan.total_units(),
        goods_cost = %plan.goods_cost,
        staff = plan.required_staff,
        remaining_budget = %store.budget,
        "initial inventory provisioned"
    );
    Ok(plan)
}

/// A running simulation: shared state handles plus the spawned worker tasks.
pub struct Simulation {
    clock: Arc<SimClock>,
    store: Arc<Mutex<Store>>,
    catalog: Arc<Catalog>,
    gate: Arc<BusinessHoursGate>,
    processor: Arc<OrderProcessor>,
    tasks: Vec<JoinHandle<()>>,
}

impl Simulation {
    /// Spawn the clock loop, the order-generation loop and the month-end
    /// watcher over the given store and catalog.
    pub fn start(
        store: Store,
        catalog: Catalog,
        config: SimConfig,
        rng: ChaCha8Rng,
        sink: Box<dyn ReportSink>,
    ) -> Self {
        let clock = Arc::new(SimClock::new(config.start, config.base_quantum_ms));
        clock.set_speed(config.initial_speed);

        let store = Arc::new(Mutex::new(store));
        let catalog = Arc::new(catalog);
        let gate = Arc::new(BusinessHoursGate::new(config.hours));
        let report = Arc::new(Mutex::new(ReportAggregator::default()));
        let processor = Arc::new(OrderProcessor::new(store.clone(), report));

        let (month_end_tx, month_end_rx) = mpsc::unbounded_channel();
        let mut tasks = Vec::with_capacity(3);
        tasks.push(tokio::spawn(clock::run(clock.clone(), month_end_tx)));
        tasks.push(tokio::spawn(generation_loop(
            clock.clone(),
            store.clone(),
            catalog.clone(),
            gate.clone(),
            processor.clone(),
            OrderGenerator::new(rng),
            config.order_interval_ms,
        )));
        tasks.push(tokio::spawn(month_end_watch(
            month_end_rx,
            store.clone(),
            catalog.clone(),
            gate.clone(),
            processor.clone(),
            sink,
        )));

        Self {
            clock,
            store,
            catalog,
            gate,
            processor,
            tasks,
        }
    }

    /// The shared clock.
    pub fn clock(&self) -> &Arc<SimClock> {
        &self.clock
    }

    /// Current simulated time.
    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Request a speed change; invalid multipliers are rejected with a
    /// warning and leave the speed unchanged.
    pub fn set_speed(&self, multiplier: u32) -> bool {
        self.clock.set_speed(multiplier)
    }

    /// Orders currently deferred by the business-hours gate.
    pub async fn queue_len(&self) -> usize {
        self.gate.queue.len().await
    }

    /// Render the report accumulated so far without resetting it.
    pub async fn render_report_now(&self) -> String {
        let monthly_costs = self.store.lock().await.monthly_spending();
        let report = self.processor.report().lock().await;
        report.render(self.clock.now(), &self.catalog, monthly_costs)
    }

    /// Stop every loop cooperatively and wait for the tasks to finish.
    pub async fn shutdown(self) {
        self.clock.stop();
        for task in self.tasks {
            let _ = task.await;
        }
        info!("simulation stopped");
    }
}

async fn generation_loop(
    clock: Arc<SimClock>,
    store: Arc<Mutex<Store>>,
    catalog: Arc<Catalog>,
    gate: Arc<BusinessHoursGate>,
    processor: Arc<OrderProcessor>,
    mut generator: OrderGenerator,
    interval_ms: u64,
) {
    while clock.is_running() {
        let sleep_ms = (interval_ms / u64::from(clock.speed().multiplier())).max(1);
        tokio::time::sleep(std::time::Duration::from_millis(sleep_ms)).await;
        if !clock.is_running() {
            break;
        }

        let now = clock.now();
        let in_stock = store.lock().await.warehouse.ledger.in_stock_ids();
        if in_stock.is_empty() {
            debug!("nothing in stock, no order generated");
            continue;
        }
        let Some(order) = generator.build_order(&catalog, &in_stock, now) else {
            continue;
        };
        info!(
            order = %order.id,
            customer = %order.customer.name,
            total = %order.total,
            "new order generated"
        );
        let _ = gate.submit(order, now.hour(), &processor).await;
    }
    info!("order generation stopped");
}

async fn month_end_watch(
    mut month_end: mpsc::UnboundedReceiver<NaiveDateTime>,
    store: Arc<Mutex<Store>>,
    catalog: Arc<Catalog>,
    gate: Arc<BusinessHoursGate>,
    processor: Arc<OrderProcessor>,
    mut sink: Box<dyn ReportSink>,
) {
    let mut last_reported: Option<(i32, u32)> = None;
    while let Some(at) = month_end.recv().await {
        let month = (at.year(), at.month());
        if last_reported == Some(month) {
            continue;
        }
        last_reported = Some(month);

        let monthly_costs = store.lock().await.monthly_spending();
        let text = {
            let report = processor.report().lock().await;
            report.render(at, &catalog, monthly_costs)
        };
        sink.publish(&text);
        processor.report().lock().await.reset();

        let drained = gate.queue.drain(&processor).await;
        if drained > 0 {
            info!(drained, "queued orders processed at month end");
        }
    }
    info!("month-end watcher stopped");
}

/// A parsed operator command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Change the clock speed to the given multiplier.
    SetSpeed(u32),
    /// Print the report accumulated so far.
    Report,
    /// Print the deferred-order queue length.
    Queue,
    /// Print the current simulated time.
    Time,
    /// Stop the simulation and exit.
    Quit,
    /// Anything unrecognized: print the usage hint.
    Help,
}

/// One-line usage hint for unknown input.
pub const USAGE: &str =
    "Commands: realtime | 4x | 8x | 32x | turbo | report | queue | time | quit";

/// Parse one line of operator input, case-insensitively. `<n>x` forms map
/// to speed requests and are validated by the clock on application.
pub fn parse_command(input: &str) -> Command {
    let normalized = input.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "realtime" => Command::SetSpeed(1),
        "turbo" => Command::SetSpeed(720),
        "report" => Command::Report,
        "queue" => Command::Queue,
        "time" => Command::Time,
        "quit" => Command::Quit,
        other => match other.strip_suffix('x').and_then(|n| n.parse::<u32>().ok()) {
            Some(multiplier) => Command::SetSpeed(multiplier),
            None => Command::Help,
        },
    }
}
