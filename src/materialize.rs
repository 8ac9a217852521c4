//! Turning a reconciled tree into storage operations.
//!
//! [`plan`] compares the stored tree with the result of a merge pass and lists the [`TreeOp`]s that
//! transform one into the other. The order is safe for any [`NodeStore`]:
//!
//! - the target tree is walked parents first, so a node is created or moved only once its new
//!   parent sits at its final position, which also means a node is never moved below one of its
//!   own descendants;
//! - deletions come last, deepest first, once every surviving child has been moved away.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::{
    error::LanguoidError,
    properties::{Glottocode, NodeAttrs},
    store::NodeStore,
    tree::LanguoidTree,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeOp {
    Create {
        id: Glottocode,
        parent: Option<Glottocode>,
        attrs: NodeAttrs,
    },
    Move {
        id: Glottocode,
        parent: Option<Glottocode>,
    },
    Update {
        id: Glottocode,
        attrs: NodeAttrs,
    },
    Delete {
        id: Glottocode,
    },
}

impl TreeOp {
    pub fn id(&self) -> &Glottocode {
        match self {
            TreeOp::Create { id, .. }
            | TreeOp::Move { id, .. }
            | TreeOp::Update { id, .. }
            | TreeOp::Delete { id } => id,
        }
    }
}

fn parent_label(parent: &Option<Glottocode>) -> String {
    match parent {
        Some(parent) => parent.to_string(),
        None => "root".to_string(),
    }
}

impl Display for TreeOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeOp::Create { id, parent, attrs } => write!(
                f,
                "create {} {} [{id}] below {}",
                attrs.level,
                attrs.name,
                parent_label(parent)
            ),
            TreeOp::Move { id, parent } => write!(f, "move {id} below {}", parent_label(parent)),
            TreeOp::Update { id, attrs } => write!(
                f,
                "update {id} to {} {}{}",
                attrs.level,
                attrs.name,
                attrs
                    .code
                    .as_ref()
                    .map(|c| format!(" ({c})"))
                    .unwrap_or_default()
            ),
            TreeOp::Delete { id } => write!(f, "delete {id}"),
        }
    }
}

/// Counts of applied (or planned) operations per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpSummary {
    pub created: usize,
    pub moved: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl OpSummary {
    pub fn from_ops(ops: &[TreeOp]) -> Self {
        let mut summary = OpSummary::default();
        for op in ops {
            summary.count(op);
        }
        summary
    }

    fn count(&mut self, op: &TreeOp) {
        match op {
            TreeOp::Create { .. } => self.created += 1,
            TreeOp::Move { .. } => self.moved += 1,
            TreeOp::Update { .. } => self.updated += 1,
            TreeOp::Delete { .. } => self.deleted += 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == OpSummary::default()
    }
}

impl Display for OpSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} moved, {} updated, {} deleted",
            self.created, self.moved, self.updated, self.deleted
        )
    }
}

/// List the operations that turn `stored` into `target`.
pub fn plan(stored: &LanguoidTree, target: &LanguoidTree) -> Vec<TreeOp> {
    let mut ops = Vec::new();
    for node in target.depth_first() {
        let attrs = node.attrs();
        match stored.get(&node.id) {
            None => ops.push(TreeOp::Create {
                id: node.id.clone(),
                parent: node.parent.clone(),
                attrs,
            }),
            Some(previous) => {
                if previous.parent != node.parent {
                    ops.push(TreeOp::Move {
                        id: node.id.clone(),
                        parent: node.parent.clone(),
                    });
                }
                if previous.attrs() != attrs {
                    ops.push(TreeOp::Update {
                        id: node.id.clone(),
                        attrs,
                    });
                }
            }
        }
    }

    let mut removed = stored
        .ids()
        .filter(|id| !target.contains(id))
        .map(|id| (stored.depth(id), id.clone()))
        .collect::<Vec<(usize, Glottocode)>>();
    removed.sort_by(|a, b| b.cmp(a));
    ops.extend(removed.into_iter().map(|(_, id)| TreeOp::Delete { id }));
    ops
}

/// Execute `ops` against `store`, stopping at the first failing operation.
pub fn apply<S: NodeStore + ?Sized>(
    store: &mut S,
    ops: &[TreeOp],
) -> Result<OpSummary, LanguoidError> {
    let mut summary = OpSummary::default();
    for op in ops {
        tracing::debug!("{op}");
        match op {
            TreeOp::Create { id, parent, attrs } => store.create(parent.as_ref(), id, attrs)?,
            TreeOp::Move { id, parent } => store.move_node(id, parent.as_ref())?,
            TreeOp::Update { id, attrs } => store.update(id, attrs)?,
            TreeOp::Delete { id } => store.delete(id)?,
        }
        summary.count(op);
    }
    Ok(summary)
}
