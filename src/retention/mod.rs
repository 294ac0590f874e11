//! Retention of AIS reports.
//!
//! Provides two prune paths:
//! 1. **On demand** (RetentionManager): called with a caller-supplied reference time
//! 2. **Scheduled** (RetentionScheduler): periodic background task owned by the server binary

pub mod manager;
pub mod scheduler;

pub use manager::{parse_reference_time, PruneStats, RetentionManager};
pub use scheduler::RetentionScheduler;
