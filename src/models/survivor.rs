//! Detected survivor.

use serde::{Deserialize, Serialize};

use super::Node;

/// Survivor identifier: the position in the scan-ordered survivor list.
pub type SurvivorId = usize;

/// A survivor detected in the grid.
///
/// Immutable once listed for a run. Ids are assigned sequentially in scan
/// order (z, then y, then x), so `id` doubles as an index into the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survivor {
    /// Cell where the survivor was detected.
    pub position: Node,
    /// Sequential id.
    pub id: SurvivorId,
    /// Rescue priority, `3 - risk` of the survivor's cell (higher = safer to reach).
    pub priority: i32,
}

impl Survivor {
    /// Creates a survivor record.
    pub fn new(id: SurvivorId, position: Node, priority: i32) -> Self {
        Self {
            position,
            id,
            priority,
        }
    }
}
