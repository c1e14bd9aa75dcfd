//! Database initialization and schema

pub mod init;

pub use init::{create_tables, init_database, init_memory_database};
