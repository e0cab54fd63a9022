//! `hkpassenger` - REST API over border-crossing passenger flow records
//!
//! Daily arrival and departure counts per traveller category are kept in a
//! `SQLite` store and served over HTTP: paired reads for a run of days, net
//! flow aggregates per day or month, and duplicate-safe bulk inserts.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod aggregator;
pub mod api;
pub mod cli;
pub mod config;
pub mod dates;
pub mod error;
pub mod logging;
pub mod params;
pub mod reader;
pub mod record;
pub mod server;
pub mod storage;
pub mod store;
pub mod writer;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::{Flow, FlowEntry, FlowRecord};
pub use storage::{Storage, StorageStats};
pub use store::FlowStore;
