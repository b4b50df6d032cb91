//! Grocery list server, admin tool and client.
//!
//! The domain lives in `grocery-list-core`; this crate adds SQLite
//! persistence, the HTTP API and the command-line front ends.

pub mod client;
pub mod config;
pub mod db;
pub mod server;
