//! Shared types and utilities for the Clauseguard service crates
//!
//! Contains the common error type, configuration resolution, database
//! initialization, and the domain types exchanged between the analysis
//! pipeline and the HTTP surface.

pub mod config;
pub mod db;
pub mod error;
pub mod types;

pub use error::{Error, Result};
