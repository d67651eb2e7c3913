//! Field-Role Resolver
//!
//! Turns a concrete [`TreeRecord`] into a [`NodeDescriptor`] plus a
//! [`ScopedQuery`]: a handle bound to the operation's transaction whose every
//! statement is already filtered by the record's scope values.
//!
//! Role resolution is a pure function of the record type, so the rendered
//! statements live in a [`StatementCache`] keyed by `TypeId`. Only the scope
//! values are read per instance.

use crate::models::{MappingError, NodeDescriptor, Role, TreeRecord, TreeSchema, TreeValue};
use crate::operations::error::Result;
use crate::operations::template::TreeStatements;
use libsql::params::Params;
use libsql::{Connection, Row, Value};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Short type name used in mapping error messages
fn record_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Validate `T`'s role declaration
pub fn resolve_schema<T: TreeRecord>() -> std::result::Result<TreeSchema, MappingError> {
    TreeSchema::from_mapping(record_type_name::<T>(), T::tree_mapping())
}

/// Per-type cache of rendered statements
#[derive(Debug, Default)]
pub struct StatementCache {
    entries: RwLock<HashMap<TypeId, Arc<TreeStatements>>>,
}

impl StatementCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered statements for `T`, resolving and caching them on first use
    ///
    /// Declarations that fail validation are not cached; every call reports
    /// the error again.
    pub async fn statements_for<T: TreeRecord>(
        &self,
    ) -> std::result::Result<Arc<TreeStatements>, MappingError> {
        let key = TypeId::of::<T>();
        if let Some(statements) = self.entries.read().await.get(&key) {
            return Ok(statements.clone());
        }

        let schema = resolve_schema::<T>()?;
        let statements = Arc::new(TreeStatements::new(Arc::new(schema)));

        tracing::debug!(
            record_type = record_type_name::<T>(),
            table = statements.schema().table_name(),
            "Cached nested-set statements"
        );

        let mut entries = self.entries.write().await;
        Ok(entries.entry(key).or_insert(statements).clone())
    }

    /// Number of record types resolved so far
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Statement handle bound to one connection and one scope
pub struct ScopedQuery<'c> {
    conn: &'c Connection,
    statements: Arc<TreeStatements>,
    scope: Vec<(String, Value)>,
}

impl<'c> ScopedQuery<'c> {
    pub fn new(
        conn: &'c Connection,
        statements: Arc<TreeStatements>,
        scope: Vec<(String, Value)>,
    ) -> Self {
        Self {
            conn,
            statements,
            scope,
        }
    }

    pub fn statements(&self) -> &TreeStatements {
        &self.statements
    }

    pub fn schema(&self) -> &Arc<TreeSchema> {
        self.statements.schema()
    }

    pub fn scope(&self) -> &[(String, Value)] {
        &self.scope
    }

    /// The scope filter as a standalone WHERE clause; empty when unscoped
    pub fn where_clause(&self) -> String {
        match self.statements.scope_clause() {
            "" => String::new(),
            clause => format!("WHERE {}", clause),
        }
    }

    fn params(&self, mut values: Vec<Value>) -> Params {
        values.extend(self.scope.iter().map(|(_, value)| value.clone()));
        Params::Positional(values)
    }

    /// Execute a scoped statement; scope values are appended to `values`
    pub async fn execute(&self, sql: &str, values: Vec<Value>) -> Result<u64> {
        let affected = self.conn.execute(sql, self.params(values)).await?;
        Ok(affected)
    }

    /// Execute a statement that carries no scope filter
    pub async fn execute_unscoped(&self, sql: &str, values: Vec<Value>) -> Result<u64> {
        let affected = self
            .conn
            .execute(sql, Params::Positional(values))
            .await?;
        Ok(affected)
    }

    pub fn last_insert_rowid(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    /// Current stored state of the node with `id` in this scope
    pub async fn load(&self, id: &Value) -> Result<Option<NodeDescriptor>> {
        let mut rows = self
            .conn
            .query(&self.statements.select_node, self.params(vec![id.clone()]))
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(self.descriptor_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Every node in this scope, ordered by lft then id
    pub async fn load_all(&self) -> Result<Vec<NodeDescriptor>> {
        let mut rows = self
            .conn
            .query(&self.statements.select_scope, self.params(Vec::new()))
            .await?;

        let mut nodes = Vec::new();
        while let Some(row) = rows.next().await? {
            nodes.push(self.descriptor_from_row(&row)?);
        }
        Ok(nodes)
    }

    /// Largest right bound in the scope, 0 when the scope is empty
    pub async fn max_rgt(&self) -> Result<i64> {
        let mut rows = self
            .conn
            .query(&self.statements.max_rgt, self.params(Vec::new()))
            .await?;

        match rows.next().await? {
            Some(row) => integer_column(&row, 0, Role::Rgt),
            None => Ok(0),
        }
    }

    /// Add `delta` to every lft and every rgt that is `>= from`
    ///
    /// A positive delta opens a gap at `from`; a negative one closes the gap
    /// that ends just before `from`.
    pub async fn shift(&self, from: i64, delta: i64) -> Result<()> {
        let params = || vec![Value::Integer(delta), Value::Integer(from)];
        self.execute(&self.statements.shift_lft, params()).await?;
        self.execute(&self.statements.shift_rgt, params()).await?;
        Ok(())
    }

    /// Add `delta` to the stored children count of `id`; no-op for types
    /// without a children-count column
    pub async fn adjust_children_count(&self, id: &Value, delta: i64) -> Result<()> {
        if let Some(sql) = &self.statements.adjust_children_count {
            self.execute(sql, vec![Value::Integer(delta), id.clone()])
                .await?;
        }
        Ok(())
    }

    fn descriptor_from_row(&self, row: &Row) -> Result<NodeDescriptor> {
        let id = row.get_value(0)?;
        let mut node = NodeDescriptor::new(self.schema().clone(), id, self.scope.clone());
        node.parent_id = match row.get_value(1)? {
            Value::Null => None,
            parent => Some(parent),
        };
        node.lft = integer_column(row, 2, Role::Lft)?;
        node.rgt = integer_column(row, 3, Role::Rgt)?;
        node.depth = integer_column(row, 4, Role::Depth)?;
        node.children_count = integer_column(row, 5, Role::ChildrenCount)?;
        Ok(node)
    }
}

fn integer_column(row: &Row, idx: i32, role: Role) -> Result<i64> {
    let value = row.get_value(idx)?;
    i64::from_value(value).map_err(|reason| MappingError::invalid_value(role, reason).into())
}

fn integer_role<T: TreeRecord>(record: &T, role: Role) -> std::result::Result<i64, MappingError> {
    match record.read_role(role) {
        Value::Null => Ok(0),
        value => i64::from_value(value).map_err(|reason| MappingError::invalid_value(role, reason)),
    }
}

/// Resolve `record` into a descriptor and a scoped query handle on `conn`
///
/// # Errors
///
/// `MappingError::ScopeArity` if the record supplies a different number of
/// scope values than its type declares, `MappingError::InvalidValue` if a
/// bound field does not hold an integer.
pub fn parse_node<'c, T: TreeRecord>(
    conn: &'c Connection,
    statements: Arc<TreeStatements>,
    record: &T,
) -> Result<(ScopedQuery<'c>, NodeDescriptor)> {
    let schema = statements.schema().clone();

    let values = record.scope_values();
    if values.len() != schema.scope_columns().len() {
        return Err(MappingError::ScopeArity {
            type_name: schema.type_name().to_string(),
            expected: schema.scope_columns().len(),
            actual: values.len(),
        }
        .into());
    }
    let scope: Vec<(String, Value)> = schema
        .scope_columns()
        .iter()
        .cloned()
        .zip(values)
        .collect();

    let mut node = NodeDescriptor::new(schema.clone(), record.read_role(Role::Id), scope.clone());
    node.parent_id = match record.read_role(Role::ParentId) {
        Value::Null => None,
        parent => Some(parent),
    };
    node.lft = integer_role(record, Role::Lft)?;
    node.rgt = integer_role(record, Role::Rgt)?;
    if schema.has_depth() {
        node.depth = integer_role(record, Role::Depth)?;
    }
    if schema.has_children_count() {
        node.children_count = integer_role(record, Role::ChildrenCount)?;
    }

    Ok((ScopedQuery::new(conn, statements, scope), node))
}

fn write<T: TreeRecord>(
    record: &mut T,
    role: Role,
    value: Value,
) -> std::result::Result<(), MappingError> {
    record
        .write_role(role, value)
        .map_err(|reason| MappingError::invalid_value(role, reason))
}

/// Copy the descriptor's tree state onto the caller's record
pub fn apply_to_record<T: TreeRecord>(
    record: &mut T,
    node: &NodeDescriptor,
) -> std::result::Result<(), MappingError> {
    write(record, Role::ParentId, node.parent_id.clone().unwrap_or(Value::Null))?;
    write(record, Role::Lft, Value::Integer(node.lft))?;
    write(record, Role::Rgt, Value::Integer(node.rgt))?;
    if node.schema().has_depth() {
        write(record, Role::Depth, Value::Integer(node.depth))?;
    }
    if node.schema().has_children_count() {
        write(record, Role::ChildrenCount, Value::Integer(node.children_count))?;
    }
    Ok(())
}

/// Store a generated id onto the caller's record
pub fn apply_id<T: TreeRecord>(
    record: &mut T,
    id: Value,
) -> std::result::Result<(), MappingError> {
    write(record, Role::Id, id)
}
