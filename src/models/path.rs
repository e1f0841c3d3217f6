//! Grid path produced by exact search.

use serde::{Deserialize, Serialize};

use super::Node;

/// Hard cap on the number of nodes in a [`Path`].
pub const MAX_PATH_LEN: usize = 1024;

/// An ordered node sequence with a validity flag.
///
/// `cost` is the accumulated risk-weighted edge cost of the steps. An
/// invalid path carries no steps unless it was truncated at
/// [`MAX_PATH_LEN`], in which case the retained prefix is kept for display.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Path {
    pub steps: Vec<Node>,
    pub cost: f64,
    pub valid: bool,
}

impl Path {
    /// An invalid, empty path.
    pub fn invalid() -> Self {
        Self::default()
    }

    /// A one-node path (start equals goal).
    pub fn trivial(node: Node) -> Self {
        Self {
            steps: vec![node],
            cost: 0.0,
            valid: true,
        }
    }

    /// Number of nodes, including both endpoints.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the path has no nodes.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// First node, if any.
    pub fn start(&self) -> Option<Node> {
        self.steps.first().copied()
    }

    /// Last node, if any.
    pub fn end(&self) -> Option<Node> {
        self.steps.last().copied()
    }
}
