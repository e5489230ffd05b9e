//! Host-tick smoothing of the fast-channel samples into the visible
//! transform fields.
//!
//! Two-stage smoothing: the received sample pair is interpolated at
//! sample-space alpha, then the visible field eases toward that target at a
//! fixed factor per tick. This decouples the visual update rate from the
//! network sample rate and hides jitter up to [`MAX_STEP_MS`]; once the
//! older sample of a pair is more than [`STALE_MS`] behind, the field snaps
//! straight to the latest sample instead.

use serde_json::Value;

use super::document::DocumentState;
use super::motion::{array_value, lerp, quat_from, slerp, vec3_from, SampleTrack};

/// Ticks longer than this indicate a clock jump or a long pause; skip them.
pub const MAX_STEP_MS: f64 = 200.0;
/// Samples older than this snap instead of easing.
pub const STALE_MS: f64 = 1000.0;
/// Per-tick easing factor toward the interpolated target.
pub const EASING: f64 = 0.07;

/// Whether a tick of length `dt` should interpolate at all.
pub fn steppable(dt: f64) -> bool {
    dt > 0.0 && dt <= MAX_STEP_MS
}

/// Advance every smoothed field of every entity in the document.
pub fn step(state: &mut DocumentState, now: f64) {
    let DocumentState { doc, motion, .. } = state;
    let Some(entities) = doc.get_mut("entities").and_then(Value::as_object_mut) else {
        return;
    };
    for (entity_id, entity) in entities.iter_mut() {
        let Some(tracks) = motion.get_mut(entity_id) else {
            continue;
        };
        let Some(entity) = entity.as_object_mut() else {
            continue;
        };
        if tracks.position.ready() {
            ease_vec(entity, "position", &tracks.position, now);
            tracks.changed.insert("position".to_owned(), now);
        }
        if tracks.rotation.ready() {
            ease_quat(entity, "rotation", &tracks.rotation, now);
            tracks.changed.insert("rotation".to_owned(), now);
        }
        if tracks.scale.ready() {
            ease_vec(entity, "sca", &tracks.scale, now);
            tracks.changed.insert("sca".to_owned(), now);
        }
    }
}

fn alpha(elapsed: f64, interval: f64) -> f64 {
    if interval > 0.0 {
        (elapsed / interval).max(0.0)
    } else {
        1.0
    }
}

fn ease_vec(
    entity: &mut serde_json::Map<String, Value>,
    field: &str,
    track: &SampleTrack<3>,
    now: f64,
) {
    let (Some(last), Some(prev_time)) = (track.last, track.prev_time) else {
        return;
    };
    let elapsed = now - prev_time;
    let eased = if elapsed > STALE_MS {
        last
    } else {
        let target = lerp(
            track.prev,
            last,
            alpha(elapsed, track.last_time - prev_time),
        );
        let current = vec3_from(entity.get(field)).unwrap_or(last);
        lerp(current, target, EASING)
    };
    entity.insert(field.to_owned(), array_value(eased));
}

fn ease_quat(
    entity: &mut serde_json::Map<String, Value>,
    field: &str,
    track: &SampleTrack<4>,
    now: f64,
) {
    let (Some(last), Some(prev_time)) = (track.last, track.prev_time) else {
        return;
    };
    let elapsed = now - prev_time;
    let eased = if elapsed > STALE_MS {
        last
    } else {
        let target = slerp(
            track.prev,
            last,
            alpha(elapsed, track.last_time - prev_time),
        );
        let current = quat_from(entity.get(field)).unwrap_or(last);
        slerp(current, target, EASING)
    };
    entity.insert(field.to_owned(), array_value(eased));
}
