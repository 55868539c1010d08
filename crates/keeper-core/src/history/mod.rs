//! Run history: an append-only JSON-lines log of finished runs, plus
//! aggregate statistics over it.

mod record;
pub mod stats;
mod store;

pub use record::RunRecord;
pub use stats::{calculate_stats, job_stats, Stats};
pub use store::{HistoryError, HistoryStore, HISTORY_FILE};
