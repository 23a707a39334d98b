//! Persisted collections, each implemented as methods on [`Database`].
//!
//! - `licenses`  → license store and the conditional hwid binding
//! - `ledger`    → append-only usage ledger and its aggregation
//! - `blocklist` → blocked hardware identifiers
//!
//! [`Database`]: crate::server::database::Database

mod blocklist;
mod ledger;
mod licenses;

pub use blocklist::BlockedHwid;
pub use ledger::{UsageEntry, UsageRow};
