//! Reconstruction of a discussion's operation forest from flat records.

use std::collections::HashMap;

use crate::models::{Discussion, DiscussionTree, Operation, OperationNode};

/// Nest `operations` under their parents and attach the roots to `discussion`.
///
/// Sibling order follows input order. An operation whose parent id is not among
/// `operations` is dropped along with its descendants.
pub fn materialize(discussion: Discussion, operations: Vec<Operation>) -> DiscussionTree {
    // Index pass: id -> position in input order.
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(operations.len());
    for (position, operation) in operations.iter().enumerate() {
        index.entry(operation.id.as_str()).or_insert(position);
    }

    // Link pass: record child positions under each parent.
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); operations.len()];
    let mut roots = Vec::new();
    for (position, operation) in operations.iter().enumerate() {
        match operation.parent_operation_id.as_deref() {
            None => roots.push(position),
            Some(parent_id) => match index.get(parent_id) {
                Some(&parent) => children[parent].push(position),
                None => tracing::debug!(
                    operation_id = %operation.id,
                    parent_id,
                    discussion_id = %discussion.id,
                    "Dropping operation with unknown parent"
                ),
            },
        }
    }

    // Post-order build with an explicit stack so chain depth never touches the call stack.
    // Each position has at most one parent, so the walk from a root cannot revisit a node.
    let mut slots: Vec<Option<Operation>> = operations.into_iter().map(Some).collect();
    let mut built: Vec<Option<OperationNode>> = Vec::with_capacity(slots.len());
    built.resize_with(slots.len(), || None);

    let mut forest = Vec::with_capacity(roots.len());
    for root in roots {
        let mut stack = vec![(root, false)];
        while let Some((position, expanded)) = stack.pop() {
            if !expanded {
                stack.push((position, true));
                stack.extend(children[position].iter().rev().map(|&child| (child, false)));
                continue;
            }
            let Some(operation) = slots[position].take() else {
                continue;
            };
            let child_operations = children[position]
                .iter()
                .filter_map(|&child| built[child].take())
                .collect();
            built[position] = Some(OperationNode {
                operation,
                child_operations,
            });
        }
        forest.extend(built[root].take());
    }

    DiscussionTree {
        discussion,
        operations: forest,
    }
}
