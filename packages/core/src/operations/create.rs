//! Create: insert a node as the last child of a parent, or as a new root

use crate::models::{NodeDescriptor, Role, TreeRecord};
use crate::operations::error::{describe_scope, describe_value, NestedSetError, Result};
use crate::operations::resolver::ScopedQuery;
use libsql::Value;

/// Insert `record` (described by `node`) under `parent`, or as a root
///
/// Must run inside a transaction. On success `node` carries the stored
/// bounds, depth, parent and id.
pub(crate) async fn create_node<T: TreeRecord>(
    query: &ScopedQuery<'_>,
    node: &mut NodeDescriptor,
    record: &T,
    parent: Option<&NodeDescriptor>,
) -> Result<()> {
    match parent {
        Some(parent) => {
            if !parent.same_scope(node) {
                return Err(NestedSetError::ScopeMismatch {
                    node_scope: describe_scope(&node.scope),
                    parent_scope: describe_scope(&parent.scope),
                });
            }

            // The caller's copy of the parent may be stale
            let stored = query.load(&parent.id).await?.ok_or_else(|| {
                NestedSetError::ParentNotFound {
                    parent_id: describe_value(&parent.id),
                }
            })?;

            query.shift(stored.rgt, 2).await?;

            node.lft = stored.rgt;
            node.depth = stored.depth + 1;
            node.parent_id = Some(stored.id.clone());
        }
        None => {
            node.lft = query.max_rgt().await? + 1;
            node.depth = 0;
            node.parent_id = None;
        }
    }
    node.rgt = node.lft + 1;
    node.children_count = 0;

    insert_row(query, node, record).await?;

    if let Some(parent_id) = &node.parent_id {
        query.adjust_children_count(parent_id, 1).await?;
    }

    tracing::debug!(
        table = node.table_name(),
        lft = node.lft,
        rgt = node.rgt,
        depth = node.depth,
        "Inserted nested-set node"
    );

    Ok(())
}

async fn insert_row<T: TreeRecord>(
    query: &ScopedQuery<'_>,
    node: &mut NodeDescriptor,
    record: &T,
) -> Result<()> {
    let schema = query.schema().clone();
    let generated_id = matches!(node.id, Value::Null);

    let mut columns: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    let mut tree_columns: Vec<(&str, Value)> = Vec::new();
    if !generated_id {
        tree_columns.push((schema.id_column(), node.id.clone()));
    }
    tree_columns.push((
        schema.parent_id_column(),
        node.parent_id.clone().unwrap_or(Value::Null),
    ));
    tree_columns.push((schema.lft_column(), Value::Integer(node.lft)));
    tree_columns.push((schema.rgt_column(), Value::Integer(node.rgt)));
    if let Some(column) = schema.column(Role::Depth) {
        tree_columns.push((column, Value::Integer(node.depth)));
    }
    if let Some(column) = schema.column(Role::ChildrenCount) {
        tree_columns.push((column, Value::Integer(node.children_count)));
    }
    for (column, value) in &node.scope {
        tree_columns.push((column.as_str(), value.clone()));
    }

    for (column, value) in tree_columns {
        columns.push(column.to_string());
        values.push(value);
    }

    // Tree columns are owned by the engine; a data column of the same name is ignored
    for (column, value) in record.data_columns() {
        if !columns.contains(&column) {
            columns.push(column);
            values.push(value);
        }
    }

    let sql = query.statements().insert(&columns);
    query.execute_unscoped(&sql, values).await?;

    if generated_id {
        node.id = Value::Integer(query.last_insert_rowid());
    }

    Ok(())
}
