//! PulseBot Library
//!
//! Periodic multi-source market snapshot worker:
//!
//! ```text
//! Scheduler → Worker → Aggregator → {Ticker, Candles, OpenInterest, Bias}
//!                         │
//!                         ▼
//!                    Snapshot(s) → render → Notifier → Telegram
//! ```
//!
//! Sources are polled concurrently each cycle; a failing source degrades
//! the snapshot instead of blocking the others, and delivery failures
//! never stop the schedule.

pub mod config;
pub mod error;
pub mod notify;
pub mod scheduler;
pub mod snapshot;
pub mod sources;
pub mod types;
pub mod worker;
