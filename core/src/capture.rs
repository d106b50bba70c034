//! Per-tick snapshot capture
//!
//! Runs once per simulation tick over the host's observation list. Newly
//! observed entities of an eligible class are tracked from that tick on;
//! tracked entities get one snapshot appended per tick regardless of
//! whether they moved, so history stays densely and uniformly sampled in
//! time. Entities that stop being observed simply stop accumulating
//! history; their existing records remain until the slot is reset.

use hindsight_shared::EntityObservation;

use crate::compensator::CompensationStats;
use crate::config::CompensationConfig;
use crate::flags::{EntityFlag, FlagRegistry};
use crate::history::{Pose, Snapshot};
use crate::registry::EntityRegistry;

/// Capture one tick's observations into the entity registry.
///
/// Timestamps must be monotonically non-decreasing per entity; a regressing
/// `sim_time` is clamped to the entity's newest record so ring ordering is
/// never violated.
pub(crate) fn capture_tick(
    registry: &mut EntityRegistry,
    flags: &mut FlagRegistry,
    config: &CompensationConfig,
    stats: &mut CompensationStats,
    sim_time: f64,
    observations: &[EntityObservation],
) {
    for observation in observations {
        let id = observation.id;
        if !registry.in_range(id) {
            log::warn!(
                "observation for {id} outside configured slot range ({}); dropped",
                registry.capacity()
            );
            continue;
        }

        let pose = Pose::from_pod(observation.pose);

        if !registry.is_occupied(id) {
            if !config.eligible_classes.contains(observation.class) {
                continue;
            }
            registry.occupy(id, observation.class, pose);
            flags.set(id, EntityFlag::Compensate);
            log::debug!("tracking {id} (class {})", observation.class.raw());
        } else if flags.check(id, EntityFlag::Rewound) {
            // Capture must never run against a rewound entity; the host is
            // violating the capture-before-rewind tick ordering.
            log::warn!("{id} observed while rewound; observation dropped");
            continue;
        } else {
            registry.set_live_pose(id, pose);
        }

        if !flags.check(id, EntityFlag::Compensate) || flags.check(id, EntityFlag::Blacklisted) {
            continue;
        }

        let history = registry
            .history_mut(id)
            .expect("occupied slot has history");
        let time = match history.newest() {
            Some(newest) if sim_time < newest.time => {
                log::warn!(
                    "tick time {sim_time:.6} behind {id} newest record {:.6}; clamping",
                    newest.time
                );
                newest.time
            }
            _ => sim_time,
        };
        history.push(Snapshot::new(time, pose));
        stats.snapshots_captured += 1;
    }
}
