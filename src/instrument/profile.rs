use chrono::{DateTime, Duration, Utc};
use std::cell::Cell;
use tracing::debug;

/// Counters provided by the host running the validator
pub trait HostMeter: Send + Sync {
    fn current_time(&self) -> DateTime<Utc>;

    /// Gas charged for one signature oracle call
    fn signature_check_cost(&self) -> u64;
}

/// Wall clock with a fixed price per signature check
#[derive(Debug, Clone, Copy)]
pub struct SystemMeter {
    cost_per_check: u64,
}

impl SystemMeter {
    pub fn new(cost_per_check: u64) -> Self {
        Self { cost_per_check }
    }
}

impl HostMeter for SystemMeter {
    fn current_time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn signature_check_cost(&self) -> u64 {
        self.cost_per_check
    }
}

/// Resources consumed by one validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    pub elapsed: Duration,
    pub gas: u64,
}

/// Profiles a single validation call
///
/// The gas counter belongs to the scope, so validations running at the same
/// time on other threads never show up in each other's profile.
pub struct ProfileScope<'a> {
    meter: &'a dyn HostMeter,
    started_at: DateTime<Utc>,
    gas: Cell<u64>,
}

impl<'a> ProfileScope<'a> {
    pub fn enter(meter: &'a dyn HostMeter) -> Self {
        Self {
            meter,
            started_at: meter.current_time(),
            gas: Cell::new(0),
        }
    }

    /// Charge the cost of one signature oracle call to this scope
    pub fn charge_signature_check(&self) {
        let cost = self.meter.signature_check_cost();
        self.gas.set(self.gas.get().saturating_add(cost));
    }

    /// Gas charged so far
    pub fn gas_used(&self) -> u64 {
        self.gas.get()
    }

    pub fn finish(self) -> Profile {
        let profile = Profile {
            elapsed: self.meter.current_time() - self.started_at,
            gas: self.gas.get(),
        };
        debug!(
            "Validation used {} gas in {}us",
            profile.gas,
            profile.elapsed.num_microseconds().unwrap_or(i64::MAX)
        );
        profile
    }
}
