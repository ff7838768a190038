use std::collections::BTreeSet;

use foundation::ids::TileId;
use tracing::warn;

/// Ordered set of tile ids.
///
/// Ordering contract: iteration yields tiles in ascending `(x, y)` order, so
/// persisted forms and request payloads are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileSet {
    tiles: BTreeSet<TileId>,
}

impl TileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, tile: TileId) -> bool {
        self.tiles.contains(&tile)
    }

    /// Returns `true` if the set changed.
    pub fn insert(&mut self, tile: TileId) -> bool {
        self.tiles.insert(tile)
    }

    /// Returns `true` if the set changed.
    pub fn remove(&mut self, tile: TileId) -> bool {
        self.tiles.remove(&tile)
    }

    /// Flips membership. Returns the new membership.
    pub fn toggle(&mut self, tile: TileId) -> bool {
        if self.tiles.remove(&tile) {
            false
        } else {
            self.tiles.insert(tile);
            true
        }
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = TileId> + '_ {
        self.tiles.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<TileId> {
        self.iter().collect()
    }

    /// Comma-joined `x_y` ids, the form used in persistent storage.
    pub fn to_storage_string(&self) -> String {
        self.iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parses the storage form. Malformed entries are logged and skipped.
    pub fn parse_storage(raw: &str) -> Self {
        let mut out = Self::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.parse::<TileId>() {
                Ok(tile) => {
                    out.insert(tile);
                }
                Err(e) => warn!("skipping stored tile: {e}"),
            }
        }
        out
    }
}

impl FromIterator<TileId> for TileSet {
    fn from_iter<I: IntoIterator<Item = TileId>>(iter: I) -> Self {
        Self {
            tiles: iter.into_iter().collect(),
        }
    }
}

impl Extend<TileId> for TileSet {
    fn extend<I: IntoIterator<Item = TileId>>(&mut self, iter: I) {
        self.tiles.extend(iter);
    }
}
