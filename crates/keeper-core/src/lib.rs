pub mod config;
pub mod logging;

pub mod backend;
pub mod control;
pub mod history;
pub mod job;
pub mod orchestrator;
pub mod report;
pub mod scheduler;
