//! Time sources for the sync loop
//!
//! The loop never calls the system clock or sleeps directly. Both go through
//! these traits so tests can drive cycles without waiting.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Local};

/// Source of commit timestamps
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

/// Wall clock in the local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Blocks the loop between cycles
pub trait Scheduler {
    fn sleep(&mut self, interval: Duration) -> impl Future<Output = ()> + Send;
}

/// Plain timed sleep on the tokio runtime
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    async fn sleep(&mut self, interval: Duration) {
        tokio::time::sleep(interval).await;
    }
}
