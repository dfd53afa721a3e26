//! Daily OFF/ON triggers and the polling loop that fires them.

pub mod cron;
pub mod engine;

// Re-export common types
pub use self::cron::{Scheduler, Trigger};
pub use self::engine::{poll_until, run_pending, run_scheduler_loop, JobDefaults};
