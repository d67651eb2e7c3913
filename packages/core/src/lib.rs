//! Nested-Set Core
//!
//! A generic nested-set tree engine on top of libsql. Any record type that
//! declares which of its columns play the tree roles (id, parent, left and
//! right bounds, optional depth and children count, zero or more scope
//! columns) can be created, deleted and moved as a subtree, with every
//! structural change applied atomically.
//!
//! # Architecture
//!
//! - **Role registration**: record types implement [`models::TreeRecord`] and
//!   declare a [`models::TreeMapping`]; nothing is discovered at runtime
//! - **Rendered once per type**: statement templates are rendered against the
//!   type's columns and cached by [`operations::StatementCache`]
//! - **Scopes**: an ordered list of `(column, value)` filters partitions one
//!   table into independent forests
//! - **libsql**: embedded SQLite; every operation runs inside one explicit
//!   transaction
//!
//! # Modules
//!
//! - [`models`] - Roles, mappings, value conversions, node descriptor, move direction
//! - [`operations`] - Resolver, statement templater and the tree algorithms
//! - [`services`] - `NestedSetService`, the public entry points
//! - [`db`] - Database layer with libsql integration
//! - [`config`] - Storage configuration

pub mod config;
pub mod db;
pub mod models;
pub mod operations;
pub mod services;

// Re-export commonly used types
pub use config::{NestedSetConfig, TransactionMode};
pub use db::{DatabaseError, DatabaseService};
pub use models::*;
pub use operations::NestedSetError;
pub use services::*;
