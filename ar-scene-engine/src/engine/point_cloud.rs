//! Bounded pool of reusable feature-point visuals and the per-frame
//! tracker that diffs them against the collaborator's latest point cloud.
//!
//! The full visible set is replaced whenever a new cloud arrives — points
//! have no cross-frame identity. Redraw is deliberately rate-limited: at
//! full frame rate the cloud is skipped entirely to bound per-frame cost,
//! which is bounded staleness by design, not a bug.

use bevy::prelude::*;

use crate::engine::frame::{FrameUpdate, SessionStatus};

/// Hard cap on simultaneously displayed feature points.
pub const MAX_VISIBLE_POINTS: usize = 1000;

/// Pool entities are spawned lazily in batches of this size.
pub const POOL_BATCH_SIZE: usize = 250;

/// Point-cloud frames are only processed below this measured frame rate.
pub const REDRAW_FPS_THRESHOLD: f32 = 10.0;

/// One displayed feature point. The index is frame-local.
#[derive(Component, Debug, Clone, Copy)]
pub struct FeaturePoint {
    pub index: usize,
    pub confidence: f32,
}

/// Confidence-derived display tint, red through green.
#[derive(Component, Debug, Clone, Copy)]
pub struct PointTint(pub Color);

pub fn confidence_tint(confidence: f32) -> Color {
    let c = confidence.clamp(0.0, 1.0);
    Color::srgb(1.0 - c, c, 0.2)
}

/// Reusable visual instances. Entities are spawned in batches when the
/// free list runs dry and are never despawned — release just returns them
/// to the free list.
#[derive(Resource)]
pub struct PointCloudPool {
    free: Vec<Entity>,
    allocated: usize,
    capacity: usize,
    batch_size: usize,
}

impl Default for PointCloudPool {
    fn default() -> Self {
        Self {
            free: Vec::new(),
            allocated: 0,
            capacity: MAX_VISIBLE_POINTS,
            batch_size: POOL_BATCH_SIZE,
        }
    }
}

impl PointCloudPool {
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn allocated(&self) -> usize {
        self.allocated
    }

    fn acquire(&mut self, commands: &mut Commands) -> Option<Entity> {
        if self.free.is_empty() && self.allocated < self.capacity {
            let batch = self.batch_size.min(self.capacity - self.allocated);
            for _ in 0..batch {
                let entity = commands
                    .spawn((
                        FeaturePoint {
                            index: 0,
                            confidence: 0.0,
                        },
                        PointTint(confidence_tint(0.0)),
                        Transform::default(),
                    ))
                    .id();
                self.free.push(entity);
            }
            self.allocated += batch;
            debug!("point pool grew to {} instances", self.allocated);
        }
        self.free.pop()
    }

    fn release(&mut self, entity: Entity) {
        self.free.push(entity);
    }
}

/// Per-frame dedup and display bookkeeping for the point cloud.
#[derive(Resource)]
pub struct PointCloudTracker {
    active: Vec<Entity>,
    last_timestamp: Option<i64>,
    pub enabled: bool,
    pub fps_threshold: f32,
}

impl Default for PointCloudTracker {
    fn default() -> Self {
        Self {
            active: Vec::new(),
            last_timestamp: None,
            enabled: false,
            fps_threshold: REDRAW_FPS_THRESHOLD,
        }
    }
}

impl PointCloudTracker {
    pub fn visible_count(&self) -> usize {
        self.active.len()
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.last_timestamp
    }
}

/// Returns every displayed point to the pool. Used on frame replacement,
/// on visibility toggle-off and on teardown.
pub fn release_all_points(tracker: &mut PointCloudTracker, pool: &mut PointCloudPool) {
    for entity in tracker.active.drain(..) {
        pool.release(entity);
    }
}

/// Replaces the displayed point set when a genuinely new cloud arrives.
///
/// A frame is skipped when the session is paused, display is disabled, the
/// measured frame rate is at or above the threshold, or the cloud carries
/// the timestamp already processed (the collaborator redelivers the same
/// cloud across polls).
pub fn track_point_cloud(
    mut commands: Commands,
    mut frames: EventReader<FrameUpdate>,
    status: Res<SessionStatus>,
    mut tracker: ResMut<PointCloudTracker>,
    mut pool: ResMut<PointCloudPool>,
) {
    for frame in frames.read() {
        if status.paused || !tracker.enabled {
            continue;
        }
        if frame.frame_rate >= tracker.fps_threshold {
            continue;
        }
        let Some(cloud) = &frame.point_cloud else {
            continue;
        };
        if tracker.last_timestamp == Some(cloud.timestamp) {
            continue;
        }
        tracker.last_timestamp = Some(cloud.timestamp);

        release_all_points(&mut tracker, &mut pool);

        for (index, sample) in cloud.points.iter().take(pool.capacity()).enumerate() {
            let Some(entity) = pool.acquire(&mut commands) else {
                break;
            };
            commands.entity(entity).insert((
                FeaturePoint {
                    index,
                    confidence: sample.confidence,
                },
                PointTint(confidence_tint(sample.confidence)),
                Transform::from_translation(sample.position),
            ));
            tracker.active.push(entity);
        }
        debug!(
            "point cloud {} displayed with {} points",
            cloud.timestamp,
            tracker.active.len()
        );
    }
}
