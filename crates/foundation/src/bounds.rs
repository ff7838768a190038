use crate::math::LatLng;

/// Geographic rectangle described by its north-west and south-east corners.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LatLngBounds {
    pub north_west: LatLng,
    pub south_east: LatLng,
}

impl LatLngBounds {
    /// Builds bounds from two arbitrary corners.
    pub fn from_corners(a: LatLng, b: LatLng) -> Self {
        Self {
            north_west: LatLng::new(a.lat.max(b.lat), a.lon.min(b.lon)),
            south_east: LatLng::new(a.lat.min(b.lat), a.lon.max(b.lon)),
        }
    }

    pub fn north(&self) -> f64 {
        self.north_west.lat
    }

    pub fn south(&self) -> f64 {
        self.south_east.lat
    }

    pub fn west(&self) -> f64 {
        self.north_west.lon
    }

    pub fn east(&self) -> f64 {
        self.south_east.lon
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: LatLng) -> bool {
        p.lat <= self.north() && p.lat >= self.south() && p.lon >= self.west() && p.lon <= self.east()
    }

    pub fn extend(&mut self, p: LatLng) {
        *self = Self::from_corners(
            LatLng::new(self.north().max(p.lat), self.west().min(p.lon)),
            LatLng::new(self.south().min(p.lat), self.east().max(p.lon)),
        );
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut out = *self;
        out.extend(other.north_west);
        out.extend(other.south_east);
        out
    }
}
