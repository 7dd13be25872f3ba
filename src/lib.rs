#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod config;
pub mod error;
pub mod ledger;
pub mod monitor;
mod pinger;
pub mod policy;
pub mod state;

pub use config::MonitorConfig;
pub use error::{Error, Kind};
pub use monitor::Monitor;
pub use policy::{RetryDecision, RetryLimit};
pub use state::SessionState;

pub type Result<T> = std::result::Result<T, Error>;
