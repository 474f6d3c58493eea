use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};

/// Source of propagation ticks. Returns `false` once no more ticks will come.
#[async_trait]
pub trait Scheduler: Send {
    async fn next_tick(&mut self) -> bool;
}

/// Fixed-period ticks. A late tick is delayed rather than bursted, so a slow
/// tick is never followed by a catch-up run.
pub struct IntervalScheduler {
    interval: Interval,
}

impl IntervalScheduler {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl Scheduler for IntervalScheduler {
    async fn next_tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Ticks on demand. Dropping every [`ManualTicker`] ends the schedule once
/// the queued ticks are consumed.
pub struct ManualScheduler {
    rx: mpsc::UnboundedReceiver<()>,
}

#[derive(Clone)]
pub struct ManualTicker {
    tx: mpsc::UnboundedSender<()>,
}

impl ManualScheduler {
    pub fn new() -> (ManualTicker, ManualScheduler) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ManualTicker { tx }, ManualScheduler { rx })
    }
}

impl ManualTicker {
    pub fn tick(&self) {
        let _ = self.tx.send(());
    }
}

#[async_trait]
impl Scheduler for ManualScheduler {
    async fn next_tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}
