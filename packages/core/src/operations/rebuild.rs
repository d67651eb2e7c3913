//! Rebuild: recompute the nested-set columns of a scope from parent links

use crate::models::{NodeDescriptor, ValueKey};
use crate::operations::error::Result;
use crate::operations::resolver::ScopedQuery;
use libsql::Value;
use std::collections::{HashMap, HashSet};

/// Bounds, depth and child count a node should have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    lft: i64,
    rgt: i64,
    depth: i64,
    children_count: i64,
    /// Laid out as a root although its stored parent is in the scope
    detached: bool,
}

/// Lay out `nodes` (ordered by current lft, then id) from their parent links
///
/// A node whose parent is missing from the scope is a root. Siblings keep
/// their current relative order. Nodes caught in a parent cycle are never
/// reached from a root; each such group is laid out as an extra tree,
/// starting from its first node in the current order. That node, like one
/// that names itself as parent, is marked `detached` so its parent link can
/// be cleared.
fn compute_layout(nodes: &[NodeDescriptor]) -> Vec<Layout> {
    let index: HashMap<ValueKey, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (ValueKey::from(&node.id), i))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut roots = Vec::new();
    let mut self_parented = HashSet::new();
    for (i, node) in nodes.iter().enumerate() {
        let parent = node
            .parent_id
            .as_ref()
            .and_then(|parent| index.get(&ValueKey::from(parent)).copied());
        match parent {
            Some(parent) if parent != i => children[parent].push(i),
            Some(_) => {
                self_parented.insert(i);
                roots.push(i);
            }
            None => roots.push(i),
        }
    }

    let mut layout = vec![
        Layout {
            lft: 0,
            rgt: 0,
            depth: 0,
            children_count: 0,
            detached: false,
        };
        nodes.len()
    ];
    let mut visited = HashSet::new();
    let mut counter = 0;

    let root_count = roots.len();
    let starts = roots.into_iter().chain(0..nodes.len());
    for (pass, start) in starts.enumerate() {
        if visited.contains(&start) {
            continue;
        }
        // Anything still unvisited after the roots sits on a parent cycle
        layout[start].detached = pass >= root_count || self_parented.contains(&start);

        // (node, depth, next child to visit)
        let mut stack = vec![(start, 0i64, 0usize)];
        visited.insert(start);
        counter += 1;
        layout[start].lft = counter;

        while let Some(frame) = stack.last_mut() {
            let (node, depth, next) = *frame;
            match children[node].get(next) {
                Some(&child) => {
                    frame.2 += 1;
                    if visited.insert(child) {
                        layout[node].children_count += 1;
                        counter += 1;
                        layout[child].lft = counter;
                        layout[child].depth = depth + 1;
                        stack.push((child, depth + 1, 0));
                    }
                }
                None => {
                    counter += 1;
                    layout[node].rgt = counter;
                    layout[node].depth = depth;
                    stack.pop();
                }
            }
        }
    }

    layout
}

/// Recompute lft, rgt, depth and children count for every node in the scope
///
/// Returns how many rows differ from the recomputed layout. Rows are only
/// written when `do_update` is set; otherwise this is a consistency check.
pub(crate) async fn rebuild_scope(query: &ScopedQuery<'_>, do_update: bool) -> Result<usize> {
    let nodes = query.load_all().await?;
    let layout = compute_layout(&nodes);
    let detached = layout.iter().filter(|wanted| wanted.detached).count();

    let schema = query.schema().clone();
    let mut affected = 0;

    for (node, wanted) in nodes.iter().zip(&layout) {
        let unchanged = node.lft == wanted.lft
            && node.rgt == wanted.rgt
            && (!schema.has_depth() || node.depth == wanted.depth)
            && (!schema.has_children_count() || node.children_count == wanted.children_count)
            && !wanted.detached;
        if unchanged {
            continue;
        }
        affected += 1;

        if do_update {
            let mut params = vec![Value::Integer(wanted.lft), Value::Integer(wanted.rgt)];
            if schema.has_depth() {
                params.push(Value::Integer(wanted.depth));
            }
            if schema.has_children_count() {
                params.push(Value::Integer(wanted.children_count));
            }
            params.push(node.id.clone());
            query.execute(&query.statements().rewrite_node, params).await?;

            if wanted.detached {
                query
                    .execute(
                        &query.statements().set_parent,
                        vec![Value::Null, node.id.clone()],
                    )
                    .await?;
            }
        }
    }

    if detached > 0 {
        tracing::warn!(
            table = schema.table_name(),
            detached,
            do_update,
            "Parent cycle found during rebuild; cycle entry nodes become roots"
        );
    }

    tracing::info!(
        table = schema.table_name(),
        nodes = nodes.len(),
        affected,
        do_update,
        "Rebuilt nested-set scope"
    );

    Ok(affected)
}
