//! Entity slot arena
//!
//! Fixed-size storage for every tracked entity: occupancy, a generation
//! counter, the entity's class, its live (authoritative) pose, and its
//! snapshot history. Slots are addressed directly by entity index and are
//! explicitly reset on entity destruction before any reuse; the generation
//! counter lets stale references to a previous occupant be detected instead
//! of silently corrupting the new one.

use hindsight_shared::{ClassId, EntityId};

use crate::history::{HistoryRing, Pose};

#[derive(Debug, Clone)]
struct EntitySlot {
    occupied: bool,
    /// Bumped on every release; identifies one occupancy of this slot
    generation: u32,
    class: ClassId,
    live: Pose,
    history: HistoryRing,
}

impl EntitySlot {
    fn new(history_capacity: usize) -> Self {
        Self {
            occupied: false,
            generation: 0,
            class: ClassId::new(0),
            live: Pose::IDENTITY,
            history: HistoryRing::new(history_capacity),
        }
    }
}

/// Arena of entity slots, sized at construction.
///
/// All storage is allocated up front; tracking and resetting entities never
/// allocates. Methods taking an [`EntityId`] panic on out-of-range indices;
/// the host boundary (capture driver, orchestrator) validates ids first.
#[derive(Debug)]
pub struct EntityRegistry {
    slots: Vec<EntitySlot>,
}

impl EntityRegistry {
    /// Create an arena with `max_entities` slots, each holding up to
    /// `history_capacity` snapshots.
    pub fn new(max_entities: usize, history_capacity: usize) -> Self {
        let slots = (0..max_entities)
            .map(|_| EntitySlot::new(history_capacity))
            .collect();
        Self { slots }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Whether `entity` addresses a slot at all (host-boundary check).
    pub fn in_range(&self, entity: EntityId) -> bool {
        entity.index() < self.slots.len()
    }

    fn slot(&self, entity: EntityId) -> &EntitySlot {
        &self.slots[entity.index()]
    }

    fn slot_mut(&mut self, entity: EntityId) -> &mut EntitySlot {
        &mut self.slots[entity.index()]
    }

    /// Whether the slot currently holds a tracked entity.
    pub fn is_occupied(&self, entity: EntityId) -> bool {
        self.slot(entity).occupied
    }

    /// Current generation of the slot.
    pub fn generation(&self, entity: EntityId) -> u32 {
        self.slot(entity).generation
    }

    /// Begin tracking an entity in its slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot is already occupied; callers check occupancy
    /// before tracking.
    pub fn occupy(&mut self, entity: EntityId, class: ClassId, live: Pose) {
        let slot = self.slot_mut(entity);
        assert!(!slot.occupied, "{entity} slot already occupied");
        slot.occupied = true;
        slot.class = class;
        slot.live = live;
        debug_assert!(slot.history.is_empty(), "released slot kept history");
    }

    /// Stop tracking and reset the slot for reuse.
    ///
    /// Clears the history, forgets the live pose, and bumps the generation
    /// so references into the previous occupancy can no longer match.
    /// Releasing an unoccupied slot is a no-op.
    pub fn release(&mut self, entity: EntityId) {
        let slot = self.slot_mut(entity);
        if !slot.occupied {
            return;
        }
        slot.occupied = false;
        slot.generation = slot.generation.wrapping_add(1);
        slot.live = Pose::IDENTITY;
        slot.history.clear();
    }

    /// Release every occupied slot (round-restart path).
    pub fn reset_all(&mut self) {
        for index in 0..self.slots.len() {
            self.release(EntityId::new(index as u16));
        }
    }

    /// Class of the tracked entity, if the slot is occupied.
    pub fn class(&self, entity: EntityId) -> Option<ClassId> {
        let slot = self.slot(entity);
        slot.occupied.then_some(slot.class)
    }

    /// Live (authoritative) pose, if the slot is occupied.
    pub fn live_pose(&self, entity: EntityId) -> Option<Pose> {
        let slot = self.slot(entity);
        slot.occupied.then_some(slot.live)
    }

    /// Overwrite the live pose.
    ///
    /// # Panics
    ///
    /// Panics if the slot is unoccupied.
    pub fn set_live_pose(&mut self, entity: EntityId, pose: Pose) {
        let slot = self.slot_mut(entity);
        assert!(slot.occupied, "{entity} slot not occupied");
        slot.live = pose;
    }

    /// Snapshot history, if the slot is occupied.
    pub fn history(&self, entity: EntityId) -> Option<&HistoryRing> {
        let slot = self.slot(entity);
        if slot.occupied { Some(&slot.history) } else { None }
    }

    /// Mutable snapshot history, if the slot is occupied.
    pub fn history_mut(&mut self, entity: EntityId) -> Option<&mut HistoryRing> {
        let slot = self.slot_mut(entity);
        if slot.occupied {
            Some(&mut slot.history)
        } else {
            None
        }
    }

    /// Ids of all occupied slots, ascending.
    pub fn occupied_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.occupied)
            .map(|(index, _)| EntityId::new(index as u16))
    }
}
