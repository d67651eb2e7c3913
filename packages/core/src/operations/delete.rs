//! Delete: remove a node together with its whole subtree

use crate::models::NodeDescriptor;
use crate::operations::error::Result;
use crate::operations::resolver::ScopedQuery;
use libsql::Value;

/// Delete `node` and every descendant, then close the gap they leave
///
/// Bounds are re-read from storage first; the caller's copy may be stale.
/// Deleting a node that no longer exists is a no-op. Returns the number of
/// rows removed.
pub(crate) async fn delete_node(query: &ScopedQuery<'_>, node: &NodeDescriptor) -> Result<u64> {
    let Some(stored) = query.load(&node.id).await? else {
        tracing::debug!(table = node.table_name(), "Delete target already gone");
        return Ok(0);
    };

    let removed = query
        .execute(
            &query.statements().delete_range,
            vec![Value::Integer(stored.lft), Value::Integer(stored.rgt)],
        )
        .await?;

    query.shift(stored.rgt + 1, -stored.width()).await?;

    if let Some(parent_id) = &stored.parent_id {
        query.adjust_children_count(parent_id, -1).await?;
    }

    tracing::debug!(
        table = stored.table_name(),
        lft = stored.lft,
        rgt = stored.rgt,
        removed,
        "Deleted nested-set subtree"
    );

    Ok(removed)
}
