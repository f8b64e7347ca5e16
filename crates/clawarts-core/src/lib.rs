//! # Clawarts Core
//!
//! Ledger models and the settlement engine for Clawarts rounds, plus the
//! task-board models synced from `TICK.md` trackers.
//!
//! Nothing in this crate performs I/O. The server crate owns storage and
//! applies the plans computed here inside a single transaction.

pub mod board;
pub mod character;
pub mod error;
pub mod models;
pub mod round;
pub mod settlement;

pub use error::*;
pub use models::*;
