//! Web-Mercator tile indexing at a fixed zoom level.
//!
//! Latitudes are not clamped: at the poles the projection diverges and the
//! results are meaningless.

use std::collections::BTreeSet;
use std::f64::consts::PI;

use super::LatLng;
use crate::bounds::LatLngBounds;
use crate::ids::TileId;

/// Zoom level of the tile grid.
pub const TILE_ZOOM: u32 = 14;
/// Number of tiles along each axis (2^14).
pub const GRID_SIZE: u32 = 1 << TILE_ZOOM;

/// Tile containing `p`.
pub fn tile_of(p: LatLng) -> TileId {
    let n = GRID_SIZE as f64;
    let x = (n * (p.lon + 180.0) / 360.0).floor();
    let lat_r = p.lat.to_radians();
    let y = (n * (1.0 - (lat_r.tan() + 1.0 / lat_r.cos()).ln() / PI) / 2.0).floor();
    // Float-to-int casts saturate, so out-of-range input lands on the grid edge.
    TileId::new(x as u32, y as u32)
}

/// North-west corner of the tile at grid position `(x, y)`.
pub fn tile_corner(x: u32, y: u32) -> LatLng {
    let n = GRID_SIZE as f64;
    let lat = (PI * (1.0 - 2.0 * y as f64 / n)).sinh().atan().to_degrees();
    let lon = x as f64 / n * 360.0 - 180.0;
    LatLng::new(lat, lon)
}

/// Geographic bounds of a tile: its own corner and the corner of `(x+1, y+1)`.
pub fn bounds_of(tile: TileId) -> LatLngBounds {
    LatLngBounds {
        north_west: tile_corner(tile.x, tile.y),
        south_east: tile_corner(tile.x.saturating_add(1), tile.y.saturating_add(1)),
    }
}

/// Midpoint of a tile's bounds.
pub fn tile_center(tile: TileId) -> LatLng {
    let b = bounds_of(tile);
    LatLng::new((b.north() + b.south()) / 2.0, (b.west() + b.east()) / 2.0)
}

/// Number of tiles [`tiles_covering`] would return, without building the set.
pub fn covering_count(a: LatLng, b: LatLng) -> u64 {
    let ta = tile_of(a);
    let tb = tile_of(b);
    (u64::from(ta.x.abs_diff(tb.x)) + 1) * (u64::from(ta.y.abs_diff(tb.y)) + 1)
}

/// Every tile of the inclusive rectangle spanned by the tiles of two corners.
///
/// The corners may be given in any order.
pub fn tiles_covering(a: LatLng, b: LatLng) -> BTreeSet<TileId> {
    let ta = tile_of(a);
    let tb = tile_of(b);
    let (min_x, max_x) = (ta.x.min(tb.x), ta.x.max(tb.x));
    let (min_y, max_y) = (ta.y.min(tb.y), ta.y.max(tb.y));

    let mut out = BTreeSet::new();
    for x in min_x..=max_x {
        for y in min_y..=max_y {
            out.insert(TileId::new(x, y));
        }
    }
    out
}
