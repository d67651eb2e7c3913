//! Nested-Set Operations
//!
//! The structural algorithms behind create, delete, move and rebuild. Each
//! function here works through a [`ScopedQuery`] and assumes the caller has
//! already opened a transaction; [`NestedSetService`](crate::services::NestedSetService)
//! owns connection and transaction handling.
//!
//! # Architecture
//!
//! - `template`: role placeholders rendered into per-type SQL
//! - `resolver`: record → descriptor, scope-bound statement handle, statement cache
//! - `create` / `delete` / `move_node` / `rebuild`: the tree mutations

pub(crate) mod create;
pub(crate) mod delete;
pub mod error;
pub(crate) mod move_node;
pub(crate) mod rebuild;
pub mod resolver;
pub mod template;

pub use error::{NestedSetError, Result};
pub use resolver::{apply_id, apply_to_record, parse_node, resolve_schema, ScopedQuery, StatementCache};
pub use template::{render, render_for, TreeStatements};
