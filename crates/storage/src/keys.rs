//! Storage keys shared by the planner components.

pub const SELECTED_TILES: &str = "selected_tiles";
pub const VISITED_TILES: &str = "visited_tiles";
pub const START: &str = "start";
pub const END: &str = "end";
pub const WAYPOINTS: &str = "waypoints";
pub const MODE: &str = "mode";
pub const TURNAROUND_COST: &str = "turnaround-cost";
pub const TRACES: &str = "traces";
pub const TRACE_NEXT_ID: &str = "trace_next_id";
pub const UNDO: &str = "undo";
