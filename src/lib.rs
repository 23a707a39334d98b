//! Keystone - a single-node license authority with hardware binding
//!
//! A license key is issued with an expiry date and, optionally, a hardware
//! identifier (hwid). The first client to validate an unbound license binds
//! its hwid permanently; every later validation must present that hwid.
//! Hardware can be blocked outright, and every validation attempt is kept in
//! an append-only usage ledger.
//!
//! # Features
//!
//! - `server` - Store, validation engine, HTTP handlers. Enabled by default.
//! - `sqlite` - SQLite database backend. Enabled by default.
//! - `postgres` - PostgreSQL database backend.
//! - `admin-api` - License, block list and usage management endpoints. Enabled by default.
//!
//! # Example
//!
//! ```toml
//! # Use defaults (server + sqlite + admin-api)
//! keystone-license = "0.1"
//!
//! # Domain types and CSV export only
//! keystone-license = { version = "0.1", default-features = false }
//!
//! # Server with PostgreSQL
//! keystone-license = { version = "0.1", features = ["postgres"] }
//! ```

// Core modules (always available)
pub mod config;
pub mod errors;
pub mod export;
pub mod license;

// Server-related modules (requires "server" feature)
#[cfg(feature = "server")]
#[path = "server/mod.rs"]
pub mod server;
