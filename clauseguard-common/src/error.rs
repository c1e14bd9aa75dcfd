//! Errors shared by the Clauseguard crates
//!
//! Covers the concerns this crate owns: storage, filesystem access
//! during database setup, and configuration resolution. Request-level
//! failures carry their own type in the service crate.

use thiserror::Error;

/// Result type for shared operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing required key, unparseable file, or invalid value
    #[error("Configuration error: {0}")]
    Config(String),
}
