//! Nested-Set Service - Public Entry Points
//!
//! `NestedSetService` is what callers hold. It owns the database handle and
//! the per-type statement cache, and wraps every structural operation in a
//! single transaction:
//!
//! 1. take a connection with the configured busy timeout
//! 2. resolve the record(s) into descriptors bound to their scope
//! 3. `BEGIN` (IMMEDIATE by default, so same-scope writers queue up)
//! 4. run the operation
//! 5. `COMMIT`, or `ROLLBACK` and return the original error
//!
//! `create` writes the stored state onto the caller's record before the
//! commit, so a record that refuses a value rolls the insert back. No other
//! operation writes to caller records.
//!
//! # Examples
//!
//! ```no_run
//! # use nestedset_core::db::DatabaseService;
//! # use nestedset_core::services::NestedSetService;
//! # use nestedset_core::models::{Role, TreeMapping, TreeRecord};
//! # use libsql::Value;
//! # use std::path::PathBuf;
//! # use std::sync::Arc;
//! # #[derive(Default)]
//! # struct Category { id: i64, parent_id: Option<i64>, lft: i64, rgt: i64 }
//! # impl TreeRecord for Category {
//! #     fn tree_mapping() -> TreeMapping {
//! #         TreeMapping::new("categories").id("id").parent_id("parent_id").lft("lft").rgt("rgt")
//! #     }
//! #     fn read_role(&self, role: Role) -> Value {
//! #         match role {
//! #             Role::Id => Value::Integer(self.id),
//! #             Role::ParentId => self.parent_id.map(Value::Integer).unwrap_or(Value::Null),
//! #             Role::Lft => Value::Integer(self.lft),
//! #             Role::Rgt => Value::Integer(self.rgt),
//! #             _ => Value::Null,
//! #         }
//! #     }
//! #     fn write_role(&mut self, _role: Role, _value: Value) -> Result<(), String> { Ok(()) }
//! # }
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseService::new(PathBuf::from("./data/tree.db")).await?;
//! let service = NestedSetService::new(Arc::new(db));
//!
//! let mut root = Category { id: 1, ..Default::default() };
//! service.create(&mut root, None).await?;
//!
//! let mut child = Category { id: 2, ..Default::default() };
//! service.create(&mut child, Some(&root)).await?;
//! # Ok(())
//! # }
//! ```

use crate::db::DatabaseService;
use crate::models::{MoveDirection, NodeDescriptor, TreeRecord};
use crate::operations::create::create_node;
use crate::operations::delete::delete_node;
use crate::operations::move_node::move_node;
use crate::operations::rebuild::rebuild_scope;
use crate::operations::{apply_id, apply_to_record, parse_node, Result, StatementCache};
use libsql::{Connection, Value};
use std::sync::Arc;

/// Copy the inserted node's state onto the caller's record
fn write_back<T: TreeRecord>(
    record: &mut T,
    node: &NodeDescriptor,
    generated_id: bool,
) -> Result<()> {
    if generated_id {
        apply_id(record, node.id.clone())?;
    }
    apply_to_record(record, node)?;
    Ok(())
}

/// Nested-set engine bound to one database
pub struct NestedSetService {
    db: Arc<DatabaseService>,
    cache: StatementCache,
}

impl NestedSetService {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self {
            db,
            cache: StatementCache::new(),
        }
    }

    pub fn database(&self) -> &Arc<DatabaseService> {
        &self.db
    }

    /// Number of record types whose statements have been rendered
    pub async fn cached_types(&self) -> usize {
        self.cache.len().await
    }

    /// Commit on success, roll back on failure; the operation's own error
    /// always wins over a rollback error
    async fn finish<R>(&self, conn: &Connection, operation: &str, outcome: Result<R>) -> Result<R> {
        match outcome {
            Ok(value) => {
                self.db.commit(conn).await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.db.rollback(conn).await {
                    tracing::warn!(
                        operation,
                        error = %rollback_err,
                        "Rollback failed after nested-set operation error"
                    );
                }
                tracing::warn!(operation, error = %e, "Nested-set operation rolled back");
                Err(e)
            }
        }
    }

    /// Insert `record` as the last child of `parent`, or as a new root in its
    /// own scope when `parent` is `None`
    ///
    /// On success the record's tree fields hold the stored values; an id
    /// that was NULL receives the generated row id. If the record rejects
    /// one of those values the insert is rolled back, and the fields written
    /// before the rejected one keep their new values.
    ///
    /// # Errors
    ///
    /// - `ScopeMismatch` if `parent` lives in another scope
    /// - `ParentNotFound` if `parent` is not stored
    /// - `Mapping` when the record rejects a written-back value
    /// - `Mapping` / `Storage` as for every operation
    pub async fn create<T: TreeRecord>(&self, record: &mut T, parent: Option<&T>) -> Result<()> {
        let statements = self.cache.statements_for::<T>().await?;
        let conn = self.db.connect_with_timeout().await?;

        let (query, mut node) = parse_node(&conn, statements.clone(), &*record)?;
        let parent = match parent {
            Some(parent) => Some(parse_node(&conn, statements, parent)?.1),
            None => None,
        };
        let generated_id = matches!(node.id, Value::Null);

        self.db.begin(&conn).await?;
        let created = create_node(&query, &mut node, &*record, parent.as_ref()).await;
        let outcome = created.and_then(|()| write_back(record, &node, generated_id));
        self.finish(&conn, "create", outcome).await
    }

    /// Delete `record` and its whole subtree
    ///
    /// Returns the number of rows removed; 0 when the node was already gone.
    pub async fn delete<T: TreeRecord>(&self, record: &T) -> Result<u64> {
        let statements = self.cache.statements_for::<T>().await?;
        let conn = self.db.connect_with_timeout().await?;
        let (query, node) = parse_node(&conn, statements, record)?;

        self.db.begin(&conn).await?;
        let outcome = delete_node(&query, &node).await;
        self.finish(&conn, "delete", outcome).await
    }

    /// Move `source` and its subtree relative to `target`
    ///
    /// Bounds of both nodes are re-read inside the transaction. Other
    /// in-memory records in the scope are stale afterwards; use
    /// [`refresh`](Self::refresh) to observe their new positions.
    ///
    /// # Errors
    ///
    /// `InvalidMove` when the target is the source, lies inside the source's
    /// subtree, belongs to another scope, or either node is not stored. No
    /// row is touched in that case.
    pub async fn move_to<T: TreeRecord>(
        &self,
        source: &T,
        target: &T,
        direction: MoveDirection,
    ) -> Result<()> {
        let statements = self.cache.statements_for::<T>().await?;
        let conn = self.db.connect_with_timeout().await?;
        let (query, source_node) = parse_node(&conn, statements.clone(), source)?;
        let (_, target_node) = parse_node(&conn, statements, target)?;

        self.db.begin(&conn).await?;
        let outcome = move_node(&query, &source_node, &target_node, direction).await;
        self.finish(&conn, "move", outcome).await?;
        Ok(())
    }

    /// Recompute the nested-set columns of `record`'s scope from parent links
    ///
    /// Returns the number of rows that were (or, without `do_update`, would
    /// be) rewritten.
    pub async fn rebuild<T: TreeRecord>(&self, record: &T, do_update: bool) -> Result<usize> {
        let statements = self.cache.statements_for::<T>().await?;
        let conn = self.db.connect_with_timeout().await?;
        let (query, _) = parse_node(&conn, statements, record)?;

        self.db.begin(&conn).await?;
        let outcome = rebuild_scope(&query, do_update).await;
        self.finish(&conn, "rebuild", outcome).await
    }

    /// Reload `record`'s tree fields from storage
    ///
    /// Returns `false`, leaving the record untouched, when its row no longer
    /// exists in its scope.
    pub async fn refresh<T: TreeRecord>(&self, record: &mut T) -> Result<bool> {
        let statements = self.cache.statements_for::<T>().await?;
        let conn = self.db.connect_with_timeout().await?;
        let (query, node) = parse_node(&conn, statements, &*record)?;

        match query.load(&node.id).await? {
            Some(stored) => {
                apply_to_record(record, &stored)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
