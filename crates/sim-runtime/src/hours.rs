//! Business-hours gate: orders placed inside the open window go straight to
//! the processor; anything else waits in an unbounded FIFO queue until the
//! month-end watcher (or an operator) drains it.

use std::collections::VecDeque;

use sim_core::{LedgerError, Order};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::orders::OrderProcessor;

/// Open/close window in whole hours, `open_hour` inclusive, `close_hour`
/// exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusinessHours {
    /// First open hour (inclusive).
    pub open_hour: u32,
    /// First closed hour (exclusive).
    pub close_hour: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            open_hour: 9,
            close_hour: 17,
        }
    }
}

impl BusinessHours {
    /// Whether an order arriving at `hour` is processed immediately.
    pub fn is_open(&self, hour: u32) -> bool {
        hour >= self.open_hour && hour < self.close_hour
    }
}

/// Unbounded FIFO queue of deferred orders.
#[derive(Debug, Default)]
pub struct OrderQueue {
    inner: Mutex<VecDeque<Order>>,
}

impl OrderQueue {
    /// Append an order at the back.
    pub async fn enqueue(&self, order: Order) {
        self.inner.lock().await.push_back(order);
    }

    /// Orders currently waiting.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// True when nothing is waiting.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Pop and process queued orders in arrival order until the queue is
    /// empty. An order failing on insufficient stock is surfaced and
    /// dropped; the drain continues. Returns the number processed.
    pub async fn drain(&self, processor: &OrderProcessor) -> usize {
        let mut processed = 0;
        loop {
            let next = self.inner.lock().await.pop_front();
            let Some(order) = next else {
                break;
            };
            info!(order = %order.id, "processing queued order");
            match processor.process(&order).await {
                Ok(()) => processed += 1,
                Err(err) => warn!(order = %order.id, %err, "queued order failed, dropped"),
            }
        }
        processed
    }
}

/// What the gate did with a submitted order.
#[derive(Debug)]
pub enum Submission {
    /// Processed immediately inside business hours.
    Processed,
    /// Deferred to the queue until the next drain.
    Queued,
    /// Processing was attempted and failed.
    Rejected(LedgerError),
}

/// The gate pairing a business-hours window with its deferred-order queue.
#[derive(Debug)]
pub struct BusinessHoursGate {
    /// The configured open window.
    pub hours: BusinessHours,
    /// Deferred orders in FIFO arrival order.
    pub queue: OrderQueue,
}

impl BusinessHoursGate {
    /// Gate with the given window and an empty queue.
    pub fn new(hours: BusinessHours) -> Self {
        Self {
            hours,
            queue: OrderQueue::default(),
        }
    }

    /// Route an order: process now inside the window, queue otherwise.
    pub async fn submit(
        &self,
        order: Order,
        hour: u32,
        processor: &OrderProcessor,
    ) -> Submission {
        if self.hours.is_open(hour) {
            match processor.process(&order).await {
                Ok(()) => Submission::Processed,
                Err(err) => {
                    warn!(order = %order.id, %err, "order rejected");
                    Submission::Rejected(err)
                }
            }
        } else {
            info!(order = %order.id, hour, "outside business hours, order queued");
            self.queue.enqueue(order).await;
            Submission::Queued
        }
    }
}
