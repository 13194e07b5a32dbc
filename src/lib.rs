//! Rainfall monitoring service.
//!
//! Tracks user-defined geographic regions ("monitors"), each with a
//! monitoring window and a rainfall trigger. An hourly evaluation cycle
//! polls the weather provider for every active monitor, accumulates the
//! reading into an append-only log, recomputes the trailing 24-hour sum,
//! and fires a single webhook notification when the sum first crosses the
//! configured trigger.

pub mod alert;
pub mod analysis;
pub mod config;
pub mod dev_mode;
pub mod engine;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod store;
pub mod verify;
