//! POD math types for the host boundary.
//!
//! Provides plain-data pose and bounds types that are serializable and can
//! cross the host boundary without requiring the engine's math stack. The
//! engine converts these to its native math types (glam) internally; host
//! integrations can do the same with whatever math library they use.

use bitcode::{Decode, Encode};
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box (POD type).
///
/// `mins`/`maxs` are entity-local corner offsets, matching the hitbox
/// convention of most physics engines.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, Encode, Decode, Pod, Zeroable,
)]
#[repr(C)]
pub struct PodBounds {
    /// Minimum corner `[x, y, z]`
    pub mins: [f32; 3],
    /// Maximum corner `[x, y, z]`
    pub maxs: [f32; 3],
}

impl PodBounds {
    /// Zero-size bounds at the origin.
    pub const ZERO: Self = Self {
        mins: [0.0; 3],
        maxs: [0.0; 3],
    };

    /// Create from corner arrays.
    pub const fn new(mins: [f32; 3], maxs: [f32; 3]) -> Self {
        Self { mins, maxs }
    }

    /// Symmetric bounds from half-extents.
    pub const fn from_half_extents(half: [f32; 3]) -> Self {
        Self {
            mins: [-half[0], -half[1], -half[2]],
            maxs: half,
        }
    }
}

/// Entity transform and hitbox at one instant (POD type).
///
/// Memory layout (52 bytes): position, rotation quaternion `[x, y, z, w]`,
/// then bounds. This is the serialization-friendly mirror of the engine's
/// internal pose; conversion is lossless.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Encode, Decode, Pod, Zeroable)]
#[repr(C)]
pub struct PodPose {
    /// World position `[x, y, z]`
    pub position: [f32; 3],
    /// Orientation quaternion `[x, y, z, w]`
    pub rotation: [f32; 4],
    /// Entity-local hitbox bounds
    pub bounds: PodBounds,
}

impl PodPose {
    /// Identity pose (origin, no rotation, zero-size bounds).
    pub const IDENTITY: Self = Self {
        position: [0.0; 3],
        rotation: [0.0, 0.0, 0.0, 1.0],
        bounds: PodBounds::ZERO,
    };

    /// Create from components.
    pub const fn new(position: [f32; 3], rotation: [f32; 4], bounds: PodBounds) -> Self {
        Self {
            position,
            rotation,
            bounds,
        }
    }

    /// A pose at `position` with identity rotation and zero-size bounds.
    pub const fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            rotation: [0.0, 0.0, 0.0, 1.0],
            bounds: PodBounds::ZERO,
        }
    }
}

impl Default for PodPose {
    fn default() -> Self {
        Self::IDENTITY
    }
}
