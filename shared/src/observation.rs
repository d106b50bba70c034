//! Per-tick entity observation record.

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::ids::{ClassId, EntityId};
use crate::math::PodPose;

/// One live entity's authoritative state, as reported by the host's
/// per-tick callback.
///
/// The host builds one of these for every live entity it wants considered
/// for compensation each tick. Entities whose class is not eligible are
/// ignored by the engine; eligible entities are tracked from the first tick
/// they are observed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct EntityObservation {
    /// Entity slot index.
    pub id: EntityId,
    /// Host-defined entity class (drives eligibility filtering).
    pub class: ClassId,
    /// Authoritative transform and hitbox this tick.
    pub pose: PodPose,
}

impl EntityObservation {
    /// Create an observation record.
    pub const fn new(id: EntityId, class: ClassId, pose: PodPose) -> Self {
        Self { id, class, pose }
    }
}
