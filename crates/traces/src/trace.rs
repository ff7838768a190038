use foundation::ids::TraceId;
use foundation::math::{LatLng, haversine_m, path_length_km};
use serde::{Deserialize, Serialize};

/// Default distance under which a click snaps to a trace point.
pub const SPLIT_THRESHOLD_M: f64 = 100.0;

/// Named, persisted polyline with a cached length in kilometers.
///
/// `distance_km` always equals [`compute_distance`] of `route`; every edit
/// below recomputes it before returning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(default)]
    pub id: TraceId,
    pub name: String,
    #[serde(rename = "distance")]
    pub distance_km: f64,
    pub route: Vec<LatLng>,
}

/// Great-circle length of a point sequence in kilometers; 0 below two points.
pub fn compute_distance(route: &[LatLng]) -> f64 {
    path_length_km(route)
}

impl Trace {
    pub fn new(id: TraceId, name: impl Into<String>, route: Vec<LatLng>) -> Self {
        Self {
            id,
            name: name.into(),
            distance_km: compute_distance(&route),
            route,
        }
    }

    pub fn recompute_distance(&mut self) {
        self.distance_km = compute_distance(&self.route);
    }

    /// Index of the point nearest to `click`, lowest index on ties, with its
    /// distance in meters.
    pub fn nearest_point(&self, click: LatLng) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, p) in self.route.iter().enumerate() {
            let d = haversine_m(*p, click);
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((i, d)),
            }
        }
        best
    }

    /// Splits at the point nearest to `click`, which ends up in both halves.
    ///
    /// Returns `None` when no point lies within `threshold_m`. Both halves
    /// get their distance recomputed from their own points.
    pub fn split_at(&self, click: LatLng, threshold_m: f64) -> Option<(Trace, Trace)> {
        let (index, d) = self.nearest_point(click)?;
        if d > threshold_m {
            return None;
        }
        let head = Trace::new(self.id, self.name.clone(), self.route[..=index].to_vec());
        let tail = Trace::new(self.id, self.name.clone(), self.route[index..].to_vec());
        Some((head, tail))
    }

    /// Appends `other`'s points. The distance covers the joined polyline,
    /// including the segment bridging the two ends.
    pub fn append_trace(&mut self, other: &Trace) {
        self.route.extend_from_slice(&other.route);
        self.recompute_distance();
    }

    /// Replaces the stretch between `patch`'s first and last point with `patch`.
    ///
    /// Anchors are matched by exact coordinate equality: the first point equal
    /// to `patch`'s start, then the first point at or after it equal to
    /// `patch`'s end. Returns `false` and leaves `self` untouched when either
    /// anchor is missing.
    pub fn insert_patch(&mut self, patch: &Trace) -> bool {
        let (Some(first), Some(last)) = (patch.route.first(), patch.route.last()) else {
            return false;
        };
        let Some(start) = self.route.iter().position(|p| p == first) else {
            return false;
        };
        let Some(end) = self.route[start..]
            .iter()
            .position(|p| p == last)
            .map(|offset| start + offset)
        else {
            return false;
        };

        let removed = compute_distance(&self.route[start..=end]);
        self.route
            .splice(start..=end, patch.route.iter().copied());
        self.distance_km = self.distance_km + patch.distance_km - removed;
        true
    }
}
