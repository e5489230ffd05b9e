//! Per-entity motion state: the sample pairs backing the fast channel and
//! the small vector/quaternion helpers used to smooth them.
//!
//! Samples live in a side-table keyed by entity id rather than inside the
//! user-visible document tree, so private replication state never mixes with
//! user fields and is never mirrored outbound.

use std::collections::HashMap;

/// The last two received samples for one smoothed field.
///
/// `prev_time` stays unset until a second sample arrives; the interpolator
/// only eases fields whose track has both timestamps.
#[derive(Debug, Clone)]
pub struct SampleTrack<const N: usize> {
    pub prev: [f64; N],
    pub prev_time: Option<f64>,
    pub last: Option<[f64; N]>,
    pub last_time: f64,
}

impl<const N: usize> SampleTrack<N> {
    pub fn new(identity: [f64; N]) -> Self {
        Self {
            prev: identity,
            prev_time: None,
            last: None,
            last_time: 0.0,
        }
    }

    /// Record a new sample, shifting the previous one down.
    pub fn push(&mut self, sample: [f64; N], now: f64) {
        if let Some(last) = self.last.take() {
            self.prev = last;
            self.prev_time = Some(self.last_time);
        }
        self.last = Some(sample);
        self.last_time = now;
    }

    /// Whether the track holds two timestamped samples.
    pub fn ready(&self) -> bool {
        self.last.is_some() && self.prev_time.is_some()
    }
}

/// Motion side-table entry for one entity.
#[derive(Debug, Clone)]
pub struct MotionState {
    pub position: SampleTrack<3>,
    pub rotation: SampleTrack<4>,
    pub scale: SampleTrack<3>,
    /// Field name → wall time of the last inbound change.
    pub changed: HashMap<String, f64>,
}

impl MotionState {
    pub fn new() -> Self {
        Self {
            position: SampleTrack::new([0.0; 3]),
            rotation: SampleTrack::new([0.0, 0.0, 0.0, 1.0]),
            scale: SampleTrack::new([0.0; 3]),
            changed: HashMap::new(),
        }
    }
}

impl Default for MotionState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn lerp<const N: usize>(from: [f64; N], to: [f64; N], t: f64) -> [f64; N] {
    let mut out = [0.0; N];
    for i in 0..N {
        out[i] = from[i] + (to[i] - from[i]) * t;
    }
    out
}

pub fn normalize4(q: [f64; 4]) -> [f64; 4] {
    let magnitude = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if magnitude <= f64::EPSILON {
        return [0.0, 0.0, 0.0, 1.0];
    }
    [
        q[0] / magnitude,
        q[1] / magnitude,
        q[2] / magnitude,
        q[3] / magnitude,
    ]
}

/// Spherical interpolation between two unit quaternions, taking the short
/// way around. Falls back to a normalized lerp when the arc is tiny.
pub fn slerp(from: [f64; 4], mut to: [f64; 4], t: f64) -> [f64; 4] {
    let mut dot = from[0] * to[0] + from[1] * to[1] + from[2] * to[2] + from[3] * to[3];
    if dot < 0.0 {
        for component in &mut to {
            *component = -*component;
        }
        dot = -dot;
    }
    if dot > 0.9995 {
        return normalize4(lerp(from, to, t));
    }
    let theta0 = dot.clamp(-1.0, 1.0).acos();
    let theta = theta0 * t;
    let sin_theta0 = theta0.sin();
    let scale_from = ((theta0 - theta).sin()) / sin_theta0;
    let scale_to = theta.sin() / sin_theta0;
    normalize4([
        from[0] * scale_from + to[0] * scale_to,
        from[1] * scale_from + to[1] * scale_to,
        from[2] * scale_from + to[2] * scale_to,
        from[3] * scale_from + to[3] * scale_to,
    ])
}

pub fn vec3_from(value: Option<&serde_json::Value>) -> Option<[f64; 3]> {
    let items = value?.as_array()?;
    if items.len() < 3 {
        return None;
    }
    Some([
        items[0].as_f64()?,
        items[1].as_f64()?,
        items[2].as_f64()?,
    ])
}

pub fn quat_from(value: Option<&serde_json::Value>) -> Option<[f64; 4]> {
    let items = value?.as_array()?;
    if items.len() < 4 {
        return None;
    }
    Some([
        items[0].as_f64()?,
        items[1].as_f64()?,
        items[2].as_f64()?,
        items[3].as_f64()?,
    ])
}

pub fn array_value<const N: usize>(components: [f64; N]) -> serde_json::Value {
    serde_json::Value::Array(
        components
            .iter()
            .map(|component| {
                serde_json::Number::from_f64(*component)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            })
            .collect(),
    )
}
