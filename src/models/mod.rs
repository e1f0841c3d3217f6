//! Rescue domain models.
//!
//! Value types shared by every layer: grid coordinates, detected survivors
//! and grid paths. Missions and chromosomes live in [`crate::ga`] because
//! they are the optimizer's encoding, not world facts.
//!
//! # Domain Mappings
//!
//! | u-rescue | Vehicle routing | Scheduling |
//! |----------|-----------------|------------|
//! | Node | Location | - |
//! | Survivor | Customer | Task |
//! | Robot | Vehicle | Resource |
//! | Path | Route leg | - |

mod node;
mod path;
mod survivor;

pub use node::Node;
pub use path::{MAX_PATH_LEN, Path};
pub use survivor::{Survivor, SurvivorId};
