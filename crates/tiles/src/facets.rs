/// Exploration status of a tile.
///
/// Replaces the two historical polarities ("visited" list vs "missing" list)
/// with a single explicit value. Only `Visited` counts as done.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum Progress {
    #[default]
    Unvisited,
    Visited,
    /// Explicitly reported as still to collect.
    Missing,
}

impl Progress {
    pub fn is_visited(self) -> bool {
        self == Progress::Visited
    }
}

/// Display state of one materialized tile.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct TileFacets {
    pub selected: bool,
    pub progress: Progress,
    /// Reported by the routing service as the cause of a failure.
    pub error: bool,
    /// Crossed by a committed trace.
    pub highlighted: bool,
}
