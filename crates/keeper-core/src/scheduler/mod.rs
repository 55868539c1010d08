//! Cron-driven execution of configured jobs.

pub mod cron;
mod engine;

pub use cron::{CronExpr, CronField, CronParseError};
pub use engine::{Scheduler, SchedulerError, SchedulerState};
