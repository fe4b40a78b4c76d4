//! Instrumentation Module
//!
//! Scoped wrappers placed around a single validation call:
//! - `TraceScope`: logs entry and exit through `tracing`
//! - `ProfileScope`: samples host time and gas before and after
//!
//! Neither contributes to the decision.

mod profile;
mod trace;

pub use profile::{HostMeter, Profile, ProfileScope, SystemMeter};
pub use trace::TraceScope;
