//! Identifier types shared between the engine and host integrations.
//!
//! Entities are addressed by slot index into fixed-size engine arrays, so
//! `EntityId` is deliberately a thin index wrapper; the engine validates it
//! against its configured slot count at the host boundary. Clients are
//! opaque host keys and carry no slot semantics.

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of distinct entity classes a host may register (bits in a
/// [`ClassMask`]).
pub const MAX_ENTITY_CLASSES: usize = 32;

/// Errors constructing identifier types from raw host values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdError {
    /// Class index does not fit in a [`ClassMask`].
    #[error("entity class {0} out of range (max {max})", max = MAX_ENTITY_CLASSES - 1)]
    ClassOutOfRange(u8),
}

/// Entity slot index.
///
/// Identifies an entity's storage within the engine's bounded arrays. The
/// engine only accepts ids below its configured `max_entities`; ids are
/// stable for the lifetime of the entity occupying the slot, and slots are
/// reused after an explicit reset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Encode, Decode,
)]
pub struct EntityId(u16);

impl EntityId {
    /// Wrap a raw slot index.
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    /// The slot index as a usize, for array addressing.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The raw index value.
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity #{}", self.0)
    }
}

/// Opaque host client key.
///
/// The engine never interprets this value; it is only used to look up
/// latency and per-client settings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Encode, Decode,
)]
pub struct ClientId(u64);

impl ClientId {
    /// Wrap a raw host client key.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw key value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client {}", self.0)
    }
}

/// Host-defined entity class, `0..MAX_ENTITY_CLASSES`.
///
/// The meaning of each class is up to the host (e.g. physics props vs.
/// doors); the engine only uses classes to filter which entities are
/// eligible for tracking via [`ClassMask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct ClassId(u8);

impl ClassId {
    /// Create a class id.
    ///
    /// # Panics
    ///
    /// Panics if `class` is not below [`MAX_ENTITY_CLASSES`].
    pub const fn new(class: u8) -> Self {
        assert!((class as usize) < MAX_ENTITY_CLASSES);
        Self(class)
    }

    /// Fallible constructor for unvalidated host input.
    pub const fn try_new(class: u8) -> Result<Self, IdError> {
        if (class as usize) < MAX_ENTITY_CLASSES {
            Ok(Self(class))
        } else {
            Err(IdError::ClassOutOfRange(class))
        }
    }

    /// The raw class index.
    pub const fn raw(self) -> u8 {
        self.0
    }
}

/// Bitmask selecting a set of entity classes (bit N = class N).
///
/// # Examples
///
/// ```
/// use hindsight_shared::{ClassId, ClassMask};
///
/// let props = ClassId::new(0);
/// let doors = ClassId::new(3);
///
/// let mask = ClassMask::NONE.with(props).with(doors);
/// assert!(mask.contains(props));
/// assert!(mask.contains(doors));
/// assert!(!mask.contains(ClassId::new(1)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct ClassMask(u32);

impl ClassMask {
    /// No classes selected.
    pub const NONE: Self = Self(0);

    /// Every class selected.
    pub const ALL: Self = Self(u32::MAX);

    /// Create a mask from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// The raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// This mask with `class` added.
    pub const fn with(self, class: ClassId) -> Self {
        Self(self.0 | 1 << class.raw())
    }

    /// This mask with `class` removed.
    pub const fn without(self, class: ClassId) -> Self {
        Self(self.0 & !(1 << class.raw()))
    }

    /// Whether `class` is selected.
    pub const fn contains(self, class: ClassId) -> bool {
        self.0 & 1 << class.raw() != 0
    }

    /// Whether no class is selected.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_round_trip() {
        let id = EntityId::new(42);
        assert_eq!(id.index(), 42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.to_string(), "entity #42");
    }

    #[test]
    fn class_id_accepts_valid_range() {
        assert_eq!(ClassId::new(0).raw(), 0);
        assert_eq!(ClassId::new(31).raw(), 31);
        assert!(ClassId::try_new(31).is_ok());
    }

    #[test]
    fn class_id_rejects_out_of_range() {
        assert_eq!(ClassId::try_new(32), Err(IdError::ClassOutOfRange(32)));
        assert_eq!(ClassId::try_new(255), Err(IdError::ClassOutOfRange(255)));
    }

    #[test]
    fn class_mask_with_without() {
        let a = ClassId::new(2);
        let b = ClassId::new(7);

        let mask = ClassMask::NONE.with(a).with(b);
        assert!(mask.contains(a));
        assert!(mask.contains(b));
        assert!(!mask.contains(ClassId::new(3)));

        let mask = mask.without(a);
        assert!(!mask.contains(a));
        assert!(mask.contains(b));
    }

    #[test]
    fn class_mask_all_and_none() {
        assert!(ClassMask::NONE.is_empty());
        assert!(!ClassMask::ALL.is_empty());
        for class in 0..MAX_ENTITY_CLASSES as u8 {
            assert!(ClassMask::ALL.contains(ClassId::new(class)));
            assert!(!ClassMask::NONE.contains(ClassId::new(class)));
        }
    }
}
