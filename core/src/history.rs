//! Snapshot history storage
//!
//! Provides the engine's native pose/snapshot types and the fixed-capacity
//! ring each tracked entity records into. The ring is allocated once at
//! construction and overwrites its oldest record on overflow; records are
//! readable oldest-to-newest through cursor arithmetic, so ordering by
//! timestamp survives wraparound.

use glam::{Quat, Vec3};
use hindsight_shared::{PodBounds, PodPose};

/// Axis-aligned bounding box in entity-local space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    /// Minimum corner
    pub mins: Vec3,
    /// Maximum corner
    pub maxs: Vec3,
}

impl Bounds {
    /// Zero-size bounds at the origin.
    pub const ZERO: Self = Self {
        mins: Vec3::ZERO,
        maxs: Vec3::ZERO,
    };

    /// Convert from the POD host-boundary type.
    pub fn from_pod(pod: PodBounds) -> Self {
        Self {
            mins: Vec3::from_array(pod.mins),
            maxs: Vec3::from_array(pod.maxs),
        }
    }

    /// Convert to the POD host-boundary type.
    pub fn to_pod(self) -> PodBounds {
        PodBounds {
            mins: self.mins.to_array(),
            maxs: self.maxs.to_array(),
        }
    }

    /// Component-wise linear interpolation toward `other`.
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            mins: self.mins.lerp(other.mins, t),
            maxs: self.maxs.lerp(other.maxs, t),
        }
    }
}

/// Entity transform and hitbox at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// World position
    pub position: Vec3,
    /// Orientation
    pub rotation: Quat,
    /// Entity-local hitbox bounds
    pub bounds: Bounds,
}

impl Pose {
    /// Identity pose (origin, no rotation, zero-size bounds).
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        bounds: Bounds::ZERO,
    };

    /// Convert from the POD host-boundary type.
    pub fn from_pod(pod: PodPose) -> Self {
        Self {
            position: Vec3::from_array(pod.position),
            rotation: Quat::from_array(pod.rotation),
            bounds: Bounds::from_pod(pod.bounds),
        }
    }

    /// Convert to the POD host-boundary type.
    pub fn to_pod(self) -> PodPose {
        PodPose {
            position: self.position.to_array(),
            rotation: self.rotation.to_array(),
            bounds: self.bounds.to_pod(),
        }
    }

    /// Interpolate toward `other` by fraction `t` in `[0, 1]`.
    ///
    /// Position and bounds interpolate component-wise; orientation uses
    /// shortest-path spherical interpolation. The endpoints are returned
    /// bit-exact: `t = 0` is exactly `self` and `t = 1` exactly `other`.
    pub fn interpolate(&self, other: &Self, t: f32) -> Self {
        if t <= 0.0 {
            return *self;
        }
        if t >= 1.0 {
            return *other;
        }
        Self {
            position: self.position.lerp(other.position, t),
            rotation: self.rotation.slerp(other.rotation, t),
            bounds: self.bounds.lerp(other.bounds, t),
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One recorded instant for one entity. Immutable once written.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    /// Simulation time this state was captured at
    pub time: f64,
    /// Recorded transform and hitbox
    pub pose: Pose,
    /// Whether this ring cell has been written
    pub valid: bool,
}

impl Snapshot {
    /// Create a written snapshot.
    pub fn new(time: f64, pose: Pose) -> Self {
        Self {
            time,
            pose,
            valid: true,
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            time: 0.0,
            pose: Pose::IDENTITY,
            valid: false,
        }
    }
}

/// Result of locating a rewind target within a history ring.
///
/// Owned copies are returned (`Snapshot` is `Copy`), so the caller can
/// mutate live state without holding a borrow of the ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HistoryQuery {
    /// No samples recorded yet
    Empty,
    /// Target within the exact-match window of a recorded sample
    Exact(Snapshot),
    /// Target older than the oldest record; no backward extrapolation
    ClampedOldest(Snapshot),
    /// Target newer than the newest record; no forward extrapolation
    ClampedNewest(Snapshot),
    /// Target falls between two adjacent records
    Bracketed {
        /// Nearest record with `time <= target`
        before: Snapshot,
        /// Nearest record with `time > target`
        after: Snapshot,
    },
}

/// Fixed-capacity ring of timestamped snapshots for one entity.
///
/// `push` is O(1) and overwrites the oldest record when full. Timestamps
/// are expected monotonically non-decreasing; the capture driver enforces
/// this before appending.
#[derive(Debug, Clone)]
pub struct HistoryRing {
    records: Vec<Snapshot>,
    /// Index the next record will be written to
    head: usize,
    /// Number of written records, `<= capacity`
    len: usize,
}

impl HistoryRing {
    /// Create an empty ring holding up to `capacity` records.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; the engine validates configured
    /// capacities before any ring is built.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be non-zero");
        Self {
            records: vec![Snapshot::default(); capacity],
            head: 0,
            len: 0,
        }
    }

    /// Maximum record count.
    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    /// Current record count.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no records have been written.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Forget all records. Capacity is retained.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
        self.records.fill(Snapshot::default());
    }

    /// Append a record, overwriting the oldest when full.
    pub fn push(&mut self, snapshot: Snapshot) {
        debug_assert!(snapshot.valid, "only written snapshots belong in the ring");
        let capacity = self.capacity();
        self.records[self.head] = snapshot;
        self.head = (self.head + 1) % capacity;
        if self.len < capacity {
            self.len += 1;
        }
    }

    /// Record at logical position `index` (0 = oldest).
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        if index >= self.len {
            return None;
        }
        let capacity = self.capacity();
        let oldest = (self.head + capacity - self.len) % capacity;
        Some(&self.records[(oldest + index) % capacity])
    }

    /// Oldest record, if any.
    pub fn oldest(&self) -> Option<&Snapshot> {
        self.get(0)
    }

    /// Newest record, if any.
    pub fn newest(&self) -> Option<&Snapshot> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    /// Records in logical (oldest-to-newest) order.
    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        (0..self.len).map(|i| self.get(i).expect("index in bounds"))
    }

    /// Locate `target` time within the ring.
    ///
    /// Edge-case policy: targets within `epsilon` of a recorded sample
    /// match that sample exactly; targets outside the recorded range clamp
    /// to the nearest end (no extrapolation in either direction); anything
    /// else brackets between two adjacent records. A linear scan is
    /// deliberate: capacity is at most
    /// [`MAX_HISTORY_CAPACITY`](crate::config::MAX_HISTORY_CAPACITY).
    pub fn query(&self, target: f64, epsilon: f64) -> HistoryQuery {
        if self.len == 0 {
            return HistoryQuery::Empty;
        }

        // Nearest-sample pass for the exact-match window.
        let mut nearest = *self.get(0).expect("non-empty ring");
        let mut nearest_dist = (nearest.time - target).abs();
        for i in 1..self.len {
            let record = self.get(i).expect("index in bounds");
            let dist = (record.time - target).abs();
            if dist < nearest_dist {
                nearest = *record;
                nearest_dist = dist;
            }
        }
        if nearest_dist <= epsilon {
            return HistoryQuery::Exact(nearest);
        }

        let oldest = *self.oldest().expect("non-empty ring");
        if target < oldest.time {
            return HistoryQuery::ClampedOldest(oldest);
        }
        let newest = *self.newest().expect("non-empty ring");
        if target > newest.time {
            return HistoryQuery::ClampedNewest(newest);
        }

        for i in 1..self.len {
            let after = *self.get(i).expect("index in bounds");
            if after.time > target {
                let before = *self.get(i - 1).expect("index in bounds");
                return HistoryQuery::Bracketed { before, after };
            }
        }

        // Target equals the newest timestamp with epsilon disabled.
        HistoryQuery::ClampedNewest(newest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose_at(x: f32) -> Pose {
        Pose {
            position: Vec3::new(x, 0.0, 0.0),
            ..Pose::IDENTITY
        }
    }

    fn snap(time: f64, x: f32) -> Snapshot {
        Snapshot::new(time, pose_at(x))
    }

    #[test]
    fn push_and_read_in_order() {
        let mut ring = HistoryRing::new(4);
        ring.push(snap(0.0, 0.0));
        ring.push(snap(0.1, 1.0));
        ring.push(snap(0.2, 2.0));

        assert_eq!(ring.len(), 3);
        assert_eq!(ring.oldest().unwrap().time, 0.0);
        assert_eq!(ring.newest().unwrap().time, 0.2);
        let times: Vec<f64> = ring.iter().map(|s| s.time).collect();
        assert_eq!(times, vec![0.0, 0.1, 0.2]);
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut ring = HistoryRing::new(3);
        for i in 0..5 {
            ring.push(snap(i as f64 * 0.1, i as f32));
        }

        // Only the last 3 of 5 appends remain, oldest first.
        assert_eq!(ring.len(), 3);
        let times: Vec<f64> = ring.iter().map(|s| s.time).collect();
        let expected: Vec<f64> = (2..5).map(|i| i as f64 * 0.1).collect();
        assert_eq!(times, expected);
        assert_eq!(ring.oldest().unwrap().pose.position.x, 2.0);
        assert_eq!(ring.newest().unwrap().pose.position.x, 4.0);
    }

    #[test]
    fn clear_forgets_records() {
        let mut ring = HistoryRing::new(3);
        ring.push(snap(0.0, 0.0));
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.query(0.0, 0.0), HistoryQuery::Empty);
    }

    #[test]
    fn query_empty() {
        let ring = HistoryRing::new(8);
        assert_eq!(ring.query(1.0, 0.001), HistoryQuery::Empty);
    }

    #[test]
    fn query_clamps_too_old() {
        let mut ring = HistoryRing::new(8);
        ring.push(snap(1.0, 0.0));
        ring.push(snap(1.1, 1.0));

        match ring.query(-5.0, 0.001) {
            HistoryQuery::ClampedOldest(s) => assert_eq!(s.time, 1.0),
            other => panic!("expected ClampedOldest, got {other:?}"),
        }
    }

    #[test]
    fn query_clamps_too_new() {
        let mut ring = HistoryRing::new(8);
        ring.push(snap(1.0, 0.0));
        ring.push(snap(1.1, 1.0));

        match ring.query(99.0, 0.001) {
            HistoryQuery::ClampedNewest(s) => assert_eq!(s.time, 1.1),
            other => panic!("expected ClampedNewest, got {other:?}"),
        }
    }

    #[test]
    fn query_exact_within_epsilon() {
        let mut ring = HistoryRing::new(8);
        ring.push(snap(1.0, 0.0));
        ring.push(snap(1.1, 1.0));

        match ring.query(1.1002, 0.0005) {
            HistoryQuery::Exact(s) => assert_eq!(s.time, 1.1),
            other => panic!("expected Exact, got {other:?}"),
        }
    }

    #[test]
    fn query_brackets_between_samples() {
        let mut ring = HistoryRing::new(8);
        ring.push(snap(1.0, 0.0));
        ring.push(snap(1.1, 1.0));
        ring.push(snap(1.2, 2.0));

        match ring.query(1.15, 0.0005) {
            HistoryQuery::Bracketed { before, after } => {
                assert_eq!(before.time, 1.1);
                assert_eq!(after.time, 1.2);
            }
            other => panic!("expected Bracketed, got {other:?}"),
        }
    }

    #[test]
    fn query_brackets_across_wraparound() {
        let mut ring = HistoryRing::new(3);
        for i in 0..5 {
            ring.push(snap(i as f64, i as f32));
        }

        // Ring now holds t = 2, 3, 4.
        match ring.query(3.5, 0.0) {
            HistoryQuery::Bracketed { before, after } => {
                assert_eq!(before.time, 3.0);
                assert_eq!(after.time, 4.0);
            }
            other => panic!("expected Bracketed, got {other:?}"),
        }
    }

    #[test]
    fn interpolate_endpoints_are_bit_exact() {
        let a = pose_at(1.0);
        let b = Pose {
            position: Vec3::new(2.0, 3.0, 4.0),
            rotation: Quat::from_rotation_y(1.2),
            bounds: Bounds {
                mins: Vec3::splat(-1.0),
                maxs: Vec3::splat(1.0),
            },
        };

        assert_eq!(a.interpolate(&b, 0.0), a);
        assert_eq!(a.interpolate(&b, 1.0), b);
    }

    #[test]
    fn interpolate_midpoint_position() {
        let a = pose_at(1.0);
        let b = pose_at(2.0);
        let mid = a.interpolate(&b, 0.5);
        assert_eq!(mid.position, Vec3::new(1.5, 0.0, 0.0));
    }

    #[test]
    fn interpolate_is_monotonic_per_component() {
        let a = Pose {
            position: Vec3::new(0.0, 10.0, -4.0),
            ..Pose::IDENTITY
        };
        let b = Pose {
            position: Vec3::new(8.0, -2.0, 6.0),
            ..Pose::IDENTITY
        };

        let mut previous = a.position;
        for step in 1..=10 {
            let t = step as f32 / 10.0;
            let p = a.interpolate(&b, t).position;
            assert!(p.x >= previous.x);
            assert!(p.y <= previous.y);
            assert!(p.z >= previous.z);
            previous = p;
        }
    }

    #[test]
    fn interpolate_rotation_takes_shortest_path() {
        let a = Pose {
            rotation: Quat::from_rotation_z(0.0),
            ..Pose::IDENTITY
        };
        let b = Pose {
            rotation: Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            ..Pose::IDENTITY
        };

        let mid = a.interpolate(&b, 0.5).rotation;
        let expected = Quat::from_rotation_z(std::f32::consts::FRAC_PI_4);
        assert!(mid.dot(expected).abs() > 0.9999);
    }

    #[test]
    fn pod_round_trip_is_lossless() {
        let pose = Pose {
            position: Vec3::new(1.5, -2.25, 3.125),
            rotation: Quat::from_rotation_x(0.7),
            bounds: Bounds {
                mins: Vec3::new(-1.0, -2.0, -3.0),
                maxs: Vec3::new(1.0, 2.0, 3.0),
            },
        };
        assert_eq!(Pose::from_pod(pose.to_pod()), pose);
    }
}
