//! gymlog - workout and weight logging on top of `gymlog-store`.
//!
//! The binary in `main.rs` is a thin shell around [`cli::execute`]; the
//! modules here hold the tracker operations so they can be tested without a
//! process boundary.

pub mod analytics;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod records;
pub mod tracker;

pub use config::{Config, ConfigError};
pub use error::{AppError, Result};
pub use tracker::Tracker;
