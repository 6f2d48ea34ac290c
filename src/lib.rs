//! Watches one host's SSH port and posts reachability transitions to chat.
//!
//! A run probes the target, compares the result with the status saved by the
//! previous run, notifies on a change and saves the new status. Repeated
//! observations of the same state stay quiet.

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod hostname;
pub mod models;
pub mod notify;
pub mod probe;
pub mod store;

pub use classifier::classify;
pub use config::MonitorConfig;
pub use engine::Monitor;
pub use error::{MonitorError, Result};
pub use models::{NotifyOutcome, PreviousStatus, RunReport, Status, Target, TransitionEvent};
