//! Rewind reconstruction
//!
//! Rebuilds an entity's state as it appeared at a target past instant and
//! temporarily applies it to the live slot, returning the session record
//! the restoration guard later consumes. History is strictly read-only
//! here; the only mutation is the live pose override plus the rewound flag.

use hindsight_shared::EntityId;
use thiserror::Error;

use crate::flags::{EntityFlag, FlagRegistry};
use crate::history::{HistoryQuery, HistoryRing, Pose};
use crate::registry::EntityRegistry;
use crate::session::RewindSession;

/// Error opening a rewind session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RewindError {
    /// A session is already active for this entity. Caller-ordering bug:
    /// the previous interaction did not restore before the next rewind.
    #[error("rewind session already active for {0}")]
    SessionConflict(EntityId),
}

/// A reconstructed past pose, tagged with how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Reconstruction {
    pub pose: Pose,
    /// Target fell outside the recorded range and clamped to an end
    pub clamped: bool,
}

/// Reconstruct the pose at `target` from recorded history.
///
/// Returns `None` when no samples exist yet. Applies the edge-case policy
/// of [`HistoryRing::query`]: exact match within `epsilon`, clamp at either
/// end of the recorded range, otherwise linear interpolation by time
/// fraction between the bracketing records.
pub(crate) fn reconstruct(
    history: &HistoryRing,
    target: f64,
    epsilon: f64,
) -> Option<Reconstruction> {
    match history.query(target, epsilon) {
        HistoryQuery::Empty => None,
        HistoryQuery::Exact(snapshot) => Some(Reconstruction {
            pose: snapshot.pose,
            clamped: false,
        }),
        HistoryQuery::ClampedOldest(snapshot) | HistoryQuery::ClampedNewest(snapshot) => {
            Some(Reconstruction {
                pose: snapshot.pose,
                clamped: true,
            })
        }
        HistoryQuery::Bracketed { before, after } => {
            // after.time > target >= before.time, so the span is positive.
            let span = after.time - before.time;
            let t = ((target - before.time) / span) as f32;
            Some(Reconstruction {
                pose: before.pose.interpolate(&after.pose, t),
                clamped: false,
            })
        }
    }
}

/// Open a rewind session for `entity` at `target` time.
///
/// Returns `Ok(None)` (no compensation, live state untouched) when the
/// entity is untracked, ineligible, blacklisted, or has no history yet.
/// On success the live pose is overridden with the reconstruction, the
/// rewound flag is set, and the returned session holds the saved live pose
/// for restoration.
pub(crate) fn rewind_entity(
    registry: &mut EntityRegistry,
    flags: &mut FlagRegistry,
    entity: EntityId,
    target: f64,
    epsilon: f64,
) -> Result<Option<RewindSession>, RewindError> {
    if !registry.in_range(entity) {
        log::debug!("rewind requested for {entity} outside slot range; skipped");
        return Ok(None);
    }
    if !registry.is_occupied(entity)
        || !flags.check(entity, EntityFlag::Compensate)
        || flags.check(entity, EntityFlag::Blacklisted)
    {
        return Ok(None);
    }
    if flags.check(entity, EntityFlag::Rewound) {
        return Err(RewindError::SessionConflict(entity));
    }

    let history = registry.history(entity).expect("occupied slot has history");
    let Some(reconstruction) = reconstruct(history, target, epsilon) else {
        return Ok(None);
    };

    let saved = registry.live_pose(entity).expect("occupied slot has live pose");
    registry.set_live_pose(entity, reconstruction.pose);
    flags.set(entity, EntityFlag::Rewound);

    Ok(Some(RewindSession::open(
        entity,
        registry.generation(entity),
        saved,
        reconstruction.clamped,
    )))
}
