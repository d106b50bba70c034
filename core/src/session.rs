//! Rewind sessions and guaranteed restoration
//!
//! A [`RewindSession`] records the live pose an entity had before a rewind
//! overrode it. Sessions are collected by a [`RewindScope`], which restores
//! every one of them when the scope ends - explicitly via
//! [`RewindScope::restore_all`] on the normal path, or from `Drop` on any
//! other path, so a panicking evaluator cannot leave an entity stuck in its
//! rewound state. Restoration is idempotent per session.

use hindsight_shared::EntityId;
use smallvec::SmallVec;

use crate::compensator::CompensationStats;
use crate::flags::{EntityFlag, FlagRegistry};
use crate::history::Pose;
use crate::registry::EntityRegistry;
use crate::rewind::{self, RewindError};

/// Saved live state for one rewound entity.
///
/// Created by the rewind engine, consumed exactly once by the restoration
/// path. At most one session can be active per entity at a time.
#[derive(Debug, Clone)]
pub struct RewindSession {
    entity: EntityId,
    /// Slot generation at open time; a mismatch at restore means the slot
    /// was reset (and possibly reused) while the session was active
    generation: u32,
    saved: Pose,
    /// Reconstruction clamped to an end of the recorded range
    pub(crate) clamped: bool,
    active: bool,
}

impl RewindSession {
    pub(crate) fn open(entity: EntityId, generation: u32, saved: Pose, clamped: bool) -> Self {
        Self {
            entity,
            generation,
            saved,
            clamped,
            active: true,
        }
    }

    /// Entity this session belongs to.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Whether the session has not been restored yet.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The live pose saved when the session opened.
    pub fn saved_pose(&self) -> Pose {
        self.saved
    }
}

/// Restore one session onto the registry.
///
/// No-op if the session is already inactive. Abandons the write when the
/// slot was reset since the session opened; the saved pose must never land
/// on a different occupant reusing the slot.
fn restore_session(
    registry: &mut EntityRegistry,
    flags: &mut FlagRegistry,
    stats: &mut CompensationStats,
    session: &mut RewindSession,
) {
    if !session.active {
        return;
    }
    session.active = false;

    let entity = session.entity;
    if !registry.in_range(entity)
        || !registry.is_occupied(entity)
        || registry.generation(entity) != session.generation
    {
        stats.stale_restores += 1;
        log::warn!("{entity} slot reset while rewound; restore abandoned");
        return;
    }

    registry.set_live_pose(entity, session.saved);
    flags.clear(entity, EntityFlag::Rewound);
}

/// Scoped collection of rewind sessions for one interaction.
///
/// Borrows the registry exclusively for the interaction, which also pins
/// the sequential model: nothing can mutate entity slots behind an open
/// scope's back. The evaluator reads the rewound world through
/// [`RewindScope::view`].
pub struct RewindScope<'a> {
    registry: &'a mut EntityRegistry,
    flags: &'a mut FlagRegistry,
    stats: &'a mut CompensationStats,
    epsilon: f64,
    sessions: SmallVec<[RewindSession; 8]>,
}

impl<'a> RewindScope<'a> {
    pub(crate) fn new(
        registry: &'a mut EntityRegistry,
        flags: &'a mut FlagRegistry,
        stats: &'a mut CompensationStats,
        epsilon: f64,
    ) -> Self {
        Self {
            registry,
            flags,
            stats,
            epsilon,
            sessions: SmallVec::new(),
        }
    }

    /// Attempt to rewind `entity` to `target` time, collecting the session
    /// on success.
    ///
    /// Ineligible entities are skipped silently (no compensation); a
    /// session conflict is counted and logged but never propagates - the
    /// interaction proceeds against whatever state the entity is in.
    pub(crate) fn rewind(&mut self, entity: EntityId, target: f64) {
        match rewind::rewind_entity(self.registry, self.flags, entity, target, self.epsilon) {
            Ok(Some(session)) => {
                self.stats.rewinds += 1;
                if session.clamped {
                    self.stats.clamped_rewinds += 1;
                }
                self.sessions.push(session);
            }
            Ok(None) => {}
            Err(err @ RewindError::SessionConflict(_)) => {
                self.stats.session_conflicts += 1;
                log::warn!("{err}; entity left at live state");
            }
        }
    }

    /// Number of sessions currently collected.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Read-only view of the (rewound) world for the evaluator.
    pub fn view(&self) -> WorldView<'_> {
        WorldView {
            registry: &*self.registry,
            flags: &*self.flags,
        }
    }

    /// Restore every collected session. Safe to call more than once.
    pub fn restore_all(&mut self) {
        for session in &mut self.sessions {
            restore_session(self.registry, self.flags, self.stats, session);
        }
    }
}

impl Drop for RewindScope<'_> {
    fn drop(&mut self) {
        // Unconditional release: normal completion, early return, and
        // unwinding evaluators all end up here.
        self.restore_all();
    }
}

/// Read-only world access handed to the interaction evaluator.
///
/// Poses read through the view reflect any active rewind sessions; this is
/// the only place rewound state is observable.
#[derive(Clone, Copy)]
pub struct WorldView<'a> {
    registry: &'a EntityRegistry,
    flags: &'a FlagRegistry,
}

impl WorldView<'_> {
    /// Current (possibly rewound) pose of a tracked entity.
    pub fn pose(&self, entity: EntityId) -> Option<Pose> {
        if !self.registry.in_range(entity) {
            return None;
        }
        self.registry.live_pose(entity)
    }

    /// Whether `entity` is currently overridden by a rewind session.
    pub fn is_rewound(&self, entity: EntityId) -> bool {
        self.registry.in_range(entity) && self.flags.check(entity, EntityFlag::Rewound)
    }

    /// Ids of all tracked entities, ascending.
    pub fn tracked(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.registry.occupied_ids()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use hindsight_shared::ClassId;

    use super::*;
    use crate::history::Snapshot;
    use crate::rewind::rewind_entity;

    fn pose_at(x: f32) -> Pose {
        Pose {
            position: Vec3::new(x, 0.0, 0.0),
            ..Pose::IDENTITY
        }
    }

    fn tracked_registry() -> (EntityRegistry, FlagRegistry, EntityId) {
        let mut registry = EntityRegistry::new(8, 8);
        let mut flags = FlagRegistry::new(8);
        let id = EntityId::new(0);
        registry.occupy(id, ClassId::new(0), pose_at(2.0));
        flags.set(id, EntityFlag::Compensate);
        for (time, x) in [(0.0, 0.0), (0.1, 1.0), (0.2, 2.0)] {
            registry
                .history_mut(id)
                .unwrap()
                .push(Snapshot::new(time, pose_at(x)));
        }
        (registry, flags, id)
    }

    #[test]
    fn restore_returns_live_state_bit_exact() {
        let (mut registry, mut flags, id) = tracked_registry();
        let mut stats = CompensationStats::default();
        let before = registry.live_pose(id).unwrap();

        let mut scope = RewindScope::new(&mut registry, &mut flags, &mut stats, 0.0005);
        scope.rewind(id, 0.15);
        assert_eq!(scope.session_count(), 1);
        scope.restore_all();
        drop(scope);

        assert_eq!(registry.live_pose(id).unwrap(), before);
        assert!(!flags.check(id, EntityFlag::Rewound));
    }

    #[test]
    fn drop_restores_without_explicit_call() {
        let (mut registry, mut flags, id) = tracked_registry();
        let mut stats = CompensationStats::default();
        let before = registry.live_pose(id).unwrap();

        {
            let mut scope = RewindScope::new(&mut registry, &mut flags, &mut stats, 0.0005);
            scope.rewind(id, 0.15);
            // No restore_all: the drop path must handle it.
        }

        assert_eq!(registry.live_pose(id).unwrap(), before);
        assert!(!flags.check(id, EntityFlag::Rewound));
    }

    #[test]
    fn double_restore_is_noop() {
        let (mut registry, mut flags, id) = tracked_registry();
        let mut stats = CompensationStats::default();

        let mut scope = RewindScope::new(&mut registry, &mut flags, &mut stats, 0.0005);
        scope.rewind(id, 0.15);
        scope.restore_all();

        // Mutate the live pose after the first restore; a second restore
        // must not write the saved pose again.
        scope.registry.set_live_pose(id, pose_at(42.0));
        scope.restore_all();
        assert_eq!(scope.registry.live_pose(id).unwrap(), pose_at(42.0));
    }

    #[test]
    fn stale_session_never_touches_slot_reuser() {
        let (mut registry, mut flags, id) = tracked_registry();
        let mut stats = CompensationStats::default();

        let mut session = rewind_entity(&mut registry, &mut flags, id, 0.15, 0.0005)
            .unwrap()
            .expect("session opened");

        // Entity destroyed mid-session, slot reused by a new occupant.
        registry.release(id);
        flags.clear_slot(id);
        registry.occupy(id, ClassId::new(1), pose_at(77.0));

        restore_session(&mut registry, &mut flags, &mut stats, &mut session);
        assert_eq!(stats.stale_restores, 1);
        assert_eq!(registry.live_pose(id).unwrap(), pose_at(77.0));
        assert!(!session.is_active());
    }

    #[test]
    fn conflict_is_counted_not_fatal() {
        let (mut registry, mut flags, id) = tracked_registry();
        let mut stats = CompensationStats::default();

        let mut scope = RewindScope::new(&mut registry, &mut flags, &mut stats, 0.0005);
        scope.rewind(id, 0.15);
        scope.rewind(id, 0.05);
        assert_eq!(scope.session_count(), 1);
        drop(scope);

        assert_eq!(stats.session_conflicts, 1);
        assert_eq!(stats.rewinds, 1);
    }

    #[test]
    fn view_reflects_rewound_pose() {
        let (mut registry, mut flags, id) = tracked_registry();
        let mut stats = CompensationStats::default();

        let mut scope = RewindScope::new(&mut registry, &mut flags, &mut stats, 0.0005);
        scope.rewind(id, 0.15);

        let view = scope.view();
        assert!(view.is_rewound(id));
        let p = view.pose(id).unwrap().position;
        assert!((p.x - 1.5).abs() < 1e-5);
        assert_eq!(view.tracked().count(), 1);
    }
}
