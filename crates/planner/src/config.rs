use routing::{CoordinatorConfig, DEBOUNCE_MS, POLL_INTERVAL_MS, TravelMode};
use serde::{Deserialize, Serialize};
use tiles::MIN_TILE_ZOOM;
use traces::{SPLIT_THRESHOLD_M, TraceStoreConfig, UNDO_DEPTH};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub debounce_ms: u64,
    pub poll_interval_ms: u64,
    pub min_tile_zoom: u8,
    pub undo_depth: usize,
    pub split_threshold_m: f64,
    /// Used until a mode has been persisted.
    pub mode: TravelMode,
    pub turnaround_cost: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEBOUNCE_MS,
            poll_interval_ms: POLL_INTERVAL_MS,
            min_tile_zoom: MIN_TILE_ZOOM,
            undo_depth: UNDO_DEPTH,
            split_threshold_m: SPLIT_THRESHOLD_M,
            mode: TravelMode::default(),
            turnaround_cost: 0.0,
        }
    }
}

impl PlannerConfig {
    pub fn coordinator(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            debounce_ms: self.debounce_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    pub fn trace_store(&self) -> TraceStoreConfig {
        TraceStoreConfig {
            undo_depth: self.undo_depth,
            split_threshold_m: self.split_threshold_m,
        }
    }
}
