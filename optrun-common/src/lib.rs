//! # optrun Common Library
//!
//! Shared code for the optrun tools including:
//! - Store access over SQLite result databases
//! - Validated identifiers and dynamically typed values
//! - Configuration loading

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
