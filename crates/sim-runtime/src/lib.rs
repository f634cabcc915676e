#![deny(warnings)]

//! Concurrent runtime for the retail simulator.
//!
//! A virtual clock advances simulated time in one-minute quanta at a
//! runtime-adjustable speed; independent tokio tasks generate orders, gate
//! them by business hours, execute them against the shared warehouse ledger
//! and aggregate monthly statistics. A month-end watcher publishes the
//! report, resets the counters and drains the deferred-order queue.

pub mod clock;
pub mod hours;
pub mod orders;
pub mod report;
pub mod runner;

pub use clock::{is_month_end, SimClock, Speed, DEFAULT_BASE_QUANTUM_MS};
pub use hours::{BusinessHours, BusinessHoursGate, OrderQueue, Submission};
pub use orders::{OrderGenerator, OrderProcessor};
pub use report::ReportAggregator;
pub use runner::{
    parse_command, provision_initial_inventory, Command, ReportSink, SimConfig, Simulation,
    StdoutSink, USAGE,
};
