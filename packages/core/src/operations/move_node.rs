//! Move: relocate a subtree next to, or inside, a target node
//!
//! # Architecture
//!
//! The subtree is taken out of the numbering by negating its bounds, which
//! keeps it addressable (`lft < 0`) while both gap updates run over the rest
//! of the scope:
//!
//! 1. negate the source interval `[sl, sr]`
//! 2. close the hole it left: every bound `> sr` drops by the width
//! 3. open a hole of the same width at the destination
//! 4. bring the negated rows back, offset into the hole, adjusting depth
//!
//! The parent link and the children counts of the old and new parent are
//! updated last.

use crate::models::{same_value, MoveDirection, NodeDescriptor};
use crate::operations::error::{describe_value, NestedSetError, Result};
use crate::operations::resolver::ScopedQuery;
use libsql::Value;

/// Where the source ends up, computed against the pre-move numbering
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MovePlan {
    /// Left bound of the hole, expressed after the source gap is closed
    pub destination: i64,
    pub width: i64,
    pub depth_delta: i64,
    pub new_parent: Option<Value>,
}

/// Check that `source` may be moved relative to `target` and work out where
///
/// Both descriptors must reflect stored state.
pub(crate) fn plan_move(
    source: &NodeDescriptor,
    target: &NodeDescriptor,
    direction: MoveDirection,
) -> Result<MovePlan> {
    if !source.same_scope(target) {
        return Err(NestedSetError::invalid_move(
            "source and target belong to different scopes",
        ));
    }
    if source.same_id(target) {
        return Err(NestedSetError::invalid_move(
            "a node cannot be moved relative to itself",
        ));
    }
    if source.contains(target) {
        return Err(NestedSetError::invalid_move(format!(
            "target {} lies inside the subtree of {}",
            describe_value(&target.id),
            describe_value(&source.id)
        )));
    }

    let width = source.width();
    let anchor = direction.anchor(target.lft, target.rgt);
    let destination = if anchor > source.rgt {
        anchor - width
    } else {
        anchor
    };

    let new_parent = if direction.nests_under_target() {
        Some(target.id.clone())
    } else {
        target.parent_id.clone()
    };

    Ok(MovePlan {
        destination,
        width,
        depth_delta: direction.destination_depth(target.depth) - source.depth,
        new_parent,
    })
}

fn same_parent(a: &Option<Value>, b: &Option<Value>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => same_value(a, b),
        _ => false,
    }
}

/// Move `source` relative to `target`
///
/// Must run inside a transaction. Validation happens before any write, so an
/// `InvalidMove` never leaves partial changes behind even without rollback.
/// Returns the source's stored state after the move.
pub(crate) async fn move_node(
    query: &ScopedQuery<'_>,
    source: &NodeDescriptor,
    target: &NodeDescriptor,
    direction: MoveDirection,
) -> Result<NodeDescriptor> {
    if !source.same_scope(target) {
        return Err(NestedSetError::invalid_move(
            "source and target belong to different scopes",
        ));
    }

    let source = query.load(&source.id).await?.ok_or_else(|| {
        NestedSetError::invalid_move(format!(
            "source node {} does not exist",
            describe_value(&source.id)
        ))
    })?;
    let target = query.load(&target.id).await?.ok_or_else(|| {
        NestedSetError::invalid_move(format!(
            "target node {} does not exist",
            describe_value(&target.id)
        ))
    })?;

    let plan = plan_move(&source, &target, direction)?;
    let statements = query.statements();

    query
        .execute(
            &statements.detach_range,
            vec![Value::Integer(source.lft), Value::Integer(source.rgt)],
        )
        .await?;

    query.shift(source.rgt + 1, -plan.width).await?;
    query.shift(plan.destination, plan.width).await?;

    let offset = plan.destination - source.lft;
    let mut params = vec![Value::Integer(offset), Value::Integer(offset)];
    if source.schema().has_depth() {
        params.push(Value::Integer(plan.depth_delta));
    }
    query.execute(&statements.reattach, params).await?;

    query
        .execute(
            &statements.set_parent,
            vec![
                plan.new_parent.clone().unwrap_or(Value::Null),
                source.id.clone(),
            ],
        )
        .await?;

    if !same_parent(&source.parent_id, &plan.new_parent) {
        if let Some(old_parent) = &source.parent_id {
            query.adjust_children_count(old_parent, -1).await?;
        }
        if let Some(new_parent) = &plan.new_parent {
            query.adjust_children_count(new_parent, 1).await?;
        }
    }

    tracing::debug!(
        table = source.table_name(),
        %direction,
        from = source.lft,
        to = plan.destination,
        width = plan.width,
        "Moved nested-set subtree"
    );

    query.load(&source.id).await?.ok_or_else(|| {
        NestedSetError::invalid_move("source node vanished during the move")
    })
}
