//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Database initialization and connection management
//! - Busy timeout and WAL configuration
//! - Explicit transaction control for the tree operations
//!
//! Table creation and indexing belong to the application; the tree engine only
//! reads and rewrites rows of tables that already exist.

mod database;
mod error;

pub use database::DatabaseService;
pub use error::DatabaseError;
