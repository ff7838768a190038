use std::collections::BTreeMap;

use foundation::bounds::LatLngBounds;
use foundation::ids::TileId;
use foundation::math::{LatLng, bounds_of, tile_of, tiles_covering};
use tracing::debug;

use crate::facets::{Progress, TileFacets};
use crate::style::TileStyle;
use crate::tile_set::TileSet;

/// Below this zoom level no tile is materialized.
pub const MIN_TILE_ZOOM: u8 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileError {
    NotMaterialized(TileId),
    ZoomedOut { zoom: u8, min_zoom: u8 },
}

impl std::fmt::Display for TileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TileError::NotMaterialized(t) => write!(f, "tile {t} is not displayed"),
            TileError::ZoomedOut { zoom, min_zoom } => {
                write!(f, "zoom {zoom} is below the tile threshold {min_zoom}")
            }
        }
    }
}

impl std::error::Error for TileError {}

/// Change the map widget must apply.
#[derive(Debug, Clone, PartialEq)]
pub enum TileUpdate {
    /// Drop every tile rectangle.
    Clear,
    /// Create or restyle the rectangle of one tile.
    Upsert {
        tile: TileId,
        bounds: LatLngBounds,
        style: TileStyle,
    },
}

/// Materialized tiles plus the viewport-independent membership sets.
///
/// Facets only exist for tiles currently in view; membership lives in the
/// sets and survives re-materialization.
#[derive(Debug)]
pub struct TileRegistry {
    min_zoom: u8,
    zoom: Option<u8>,
    materialized: BTreeMap<TileId, TileFacets>,
    selected: TileSet,
    visited: TileSet,
    missing: TileSet,
    error: TileSet,
    route_highlighted: TileSet,
    updates: Vec<TileUpdate>,
}

impl Default for TileRegistry {
    fn default() -> Self {
        Self::new(MIN_TILE_ZOOM)
    }
}

impl TileRegistry {
    pub fn new(min_zoom: u8) -> Self {
        Self {
            min_zoom,
            zoom: None,
            materialized: BTreeMap::new(),
            selected: TileSet::new(),
            visited: TileSet::new(),
            missing: TileSet::new(),
            error: TileSet::new(),
            route_highlighted: TileSet::new(),
            updates: Vec::new(),
        }
    }

    pub fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    pub fn materialized_len(&self) -> usize {
        self.materialized.len()
    }

    pub fn is_materialized(&self, tile: TileId) -> bool {
        self.materialized.contains_key(&tile)
    }

    pub fn facets(&self, tile: TileId) -> Option<&TileFacets> {
        self.materialized.get(&tile)
    }

    pub fn style(&self, tile: TileId) -> Option<TileStyle> {
        self.materialized.get(&tile).map(TileStyle::compose)
    }

    pub fn materialized(&self) -> impl Iterator<Item = (TileId, &TileFacets)> + '_ {
        self.materialized.iter().map(|(t, f)| (*t, f))
    }

    pub fn selected(&self) -> &TileSet {
        &self.selected
    }

    pub fn visited(&self) -> &TileSet {
        &self.visited
    }

    pub fn error_tiles(&self) -> &TileSet {
        &self.error
    }

    pub fn route_highlighted(&self) -> &TileSet {
        &self.route_highlighted
    }

    pub fn progress_of(&self, tile: TileId) -> Progress {
        if self.visited.contains(tile) {
            Progress::Visited
        } else if self.missing.contains(tile) {
            Progress::Missing
        } else {
            Progress::Unvisited
        }
    }

    /// Pending widget updates, oldest first.
    pub fn drain_updates(&mut self) -> Vec<TileUpdate> {
        std::mem::take(&mut self.updates)
    }

    /// Re-materializes tiles for a new viewport.
    ///
    /// Below the zoom threshold every materialized tile is dropped. Otherwise
    /// new tiles get facets from the membership sets, and tiles already in
    /// view only have their `selected` facet refreshed.
    pub fn set_viewport(&mut self, bounds: LatLngBounds, zoom: u8) {
        self.zoom = Some(zoom);
        if zoom < self.min_zoom {
            if !self.materialized.is_empty() {
                debug!(
                    "zoom {zoom} < {}: clearing {} tiles",
                    self.min_zoom,
                    self.materialized.len()
                );
                self.materialized.clear();
                self.updates.push(TileUpdate::Clear);
            }
            return;
        }

        let mut created = 0usize;
        for tile in tiles_covering(bounds.north_west, bounds.south_east) {
            let selected = self.selected.contains(tile);
            if let Some(facets) = self.materialized.get_mut(&tile) {
                if facets.selected != selected {
                    facets.selected = selected;
                    let facets = *facets;
                    self.push_upsert(tile, &facets);
                }
                continue;
            }

            let facets = TileFacets {
                selected,
                progress: self.progress_of(tile),
                error: self.error.contains(tile),
                highlighted: self.route_highlighted.contains(tile),
            };
            self.materialized.insert(tile, facets);
            self.push_upsert(tile, &facets);
            created += 1;
        }
        debug!(
            "viewport at zoom {zoom}: {created} tiles created, {} materialized",
            self.materialized.len()
        );
    }

    /// Flips selection of a displayed tile. Returns the new membership.
    pub fn toggle_selection(&mut self, tile: TileId) -> Result<bool, TileError> {
        if let Some(zoom) = self.zoom
            && zoom < self.min_zoom
        {
            return Err(TileError::ZoomedOut {
                zoom,
                min_zoom: self.min_zoom,
            });
        }
        let Some(facets) = self.materialized.get_mut(&tile) else {
            return Err(TileError::NotMaterialized(tile));
        };

        let selected = self.selected.toggle(tile);
        facets.selected = selected;
        let facets = *facets;
        self.push_upsert(tile, &facets);
        Ok(selected)
    }

    /// Toggles the tile under a clicked map position.
    pub fn toggle_at(&mut self, p: LatLng) -> Result<(TileId, bool), TileError> {
        let tile = tile_of(p);
        self.toggle_selection(tile).map(|selected| (tile, selected))
    }

    /// Replaces the selection (e.g. restored from storage).
    pub fn set_selection(&mut self, selected: TileSet) {
        self.selected = selected;
        self.refresh_selected_facets();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
        self.refresh_selected_facets();
    }

    /// Replaces the tiles marked by a routing failure.
    ///
    /// Tiles out of view are remembered and painted once they materialize.
    pub fn set_error_tiles(&mut self, tiles: impl IntoIterator<Item = TileId>) {
        let previous = std::mem::replace(&mut self.error, tiles.into_iter().collect());
        let touched: Vec<TileId> = previous.iter().chain(self.error.iter()).collect();
        for tile in touched {
            let marked = self.error.contains(tile);
            self.set_facet(tile, |f| f.error = marked);
        }
    }

    pub fn clear_error_tiles(&mut self) {
        let previous = std::mem::take(&mut self.error);
        for tile in previous.iter() {
            self.set_facet(tile, |f| f.error = false);
        }
    }

    /// Replaces the visited/missing sets. Materialized tiles are dropped so
    /// they rebuild with the new borders on the next viewport update.
    pub fn set_progress_tiles(&mut self, visited: TileSet, missing: TileSet) {
        self.visited = visited;
        self.missing = missing;
        if !self.materialized.is_empty() {
            self.materialized.clear();
            self.updates.push(TileUpdate::Clear);
        }
    }

    pub fn reset_progress_tiles(&mut self) {
        self.set_progress_tiles(TileSet::new(), TileSet::new());
    }

    /// Highlights every tile crossed by `points`. Returns how many were new.
    pub fn highlight_route(&mut self, points: &[LatLng]) -> usize {
        let mut added = 0usize;
        for p in points {
            let tile = tile_of(*p);
            if self.route_highlighted.insert(tile) {
                added += 1;
                self.set_facet(tile, |f| f.highlighted = true);
            }
        }
        added
    }

    /// Union of the bounds of every selected tile.
    pub fn selection_bounds(&self) -> Option<LatLngBounds> {
        self.selected
            .iter()
            .map(bounds_of)
            .reduce(|acc, b| acc.union(&b))
    }

    fn refresh_selected_facets(&mut self) {
        let tiles: Vec<TileId> = self.materialized.keys().copied().collect();
        for tile in tiles {
            let selected = self.selected.contains(tile);
            self.set_facet(tile, |f| f.selected = selected);
        }
    }

    fn set_facet(&mut self, tile: TileId, apply: impl FnOnce(&mut TileFacets)) {
        let Some(facets) = self.materialized.get_mut(&tile) else {
            return;
        };
        let before = *facets;
        apply(facets);
        let after = *facets;
        if after != before {
            self.push_upsert(tile, &after);
        }
    }

    fn push_upsert(&mut self, tile: TileId, facets: &TileFacets) {
        self.updates.push(TileUpdate::Upsert {
            tile,
            bounds: bounds_of(tile),
            style: TileStyle::compose(facets),
        });
    }
}
