use foundation::bounds::LatLngBounds;
use foundation::ids::{Generation, TileId};
use foundation::math::LatLng;
use foundation::time::Millis;
use routing::{
    RequestCoordinator, RouteEvent, RouteParams, RouteResult, RouteStatusResponse, RoutingService,
    ServiceCall, ServiceError, StartRouteResponse, TravelMode,
};
use runtime::event_bus::{Event, EventBus};
use storage::{KvStore, StorageError, keys};
use tiles::{TileError, TileRegistry, TileSet, TileUpdate};
use tracing::{debug, info};
use traces::{Trace, TraceError, TraceStore};

use crate::config::PlannerConfig;
use crate::inputs::RouteInputs;

#[derive(Debug, Clone, PartialEq)]
pub enum PlannerError {
    Storage(StorageError),
    Tile(TileError),
    Trace(TraceError),
}

impl std::fmt::Display for PlannerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlannerError::Storage(e) => write!(f, "{e}"),
            PlannerError::Tile(e) => write!(f, "{e}"),
            PlannerError::Trace(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PlannerError {}

impl From<StorageError> for PlannerError {
    fn from(e: StorageError) -> Self {
        PlannerError::Storage(e)
    }
}

impl From<TileError> for PlannerError {
    fn from(e: TileError) -> Self {
        PlannerError::Tile(e)
    }
}

impl From<TraceError> for PlannerError {
    fn from(e: TraceError) -> Self {
        PlannerError::Trace(e)
    }
}

/// Everything one map instance needs, owned in one place.
///
/// Time is passed in explicitly: the caller drives `fire_due`/`pump` from its
/// own clock and feeds service answers back through `on_*_response`.
#[derive(Debug)]
pub struct Planner<S: KvStore> {
    config: PlannerConfig,
    store: S,
    tiles: TileRegistry,
    inputs: RouteInputs,
    coordinator: RequestCoordinator,
    traces: TraceStore,
    events: EventBus<RouteEvent>,
}

impl<S: KvStore> Planner<S> {
    /// Restores selection, progress tiles, inputs and traces from `store`.
    pub fn open(store: S, config: PlannerConfig) -> Result<Self, PlannerError> {
        let mut tiles = TileRegistry::new(config.min_tile_zoom);
        if let Some(raw) = store.get(keys::SELECTED_TILES)? {
            tiles.set_selection(TileSet::parse_storage(&raw));
        }
        if let Some(raw) = store.get(keys::VISITED_TILES)? {
            tiles.set_progress_tiles(TileSet::parse_storage(&raw), TileSet::new());
        }

        let defaults = RouteInputs {
            mode: config.mode,
            turnaround_cost: config.turnaround_cost,
            ..RouteInputs::default()
        };
        let inputs = RouteInputs::load(&store, &defaults)?;
        let traces = TraceStore::load(&store, config.trace_store())?;
        info!(
            "planner opened: {} selected tiles, {} traces",
            tiles.selected().len(),
            traces.len()
        );

        Ok(Self {
            coordinator: RequestCoordinator::new(config.coordinator()),
            config,
            store,
            tiles,
            inputs,
            traces,
            events: EventBus::new(),
        })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn tiles(&self) -> &TileRegistry {
        &self.tiles
    }

    pub fn inputs(&self) -> &RouteInputs {
        &self.inputs
    }

    pub fn coordinator(&self) -> &RequestCoordinator {
        &self.coordinator
    }

    pub fn traces(&self) -> &TraceStore {
        &self.traces
    }

    pub fn drain_tile_updates(&mut self) -> Vec<TileUpdate> {
        self.tiles.drain_updates()
    }

    pub fn drain_events(&mut self) -> Vec<Event<RouteEvent>> {
        self.events.drain()
    }

    /// Current inputs as a start-route parameter snapshot.
    pub fn route_params(&self) -> RouteParams {
        RouteParams {
            start: self.inputs.start,
            end: self.inputs.end,
            waypoints: self.inputs.waypoints.clone(),
            tiles: self.tiles.selected().to_vec(),
            mode: self.inputs.mode,
            turnaround_cost: self.inputs.turnaround_cost,
        }
    }

    /// View to show at start-up: selected tiles plus the endpoints.
    pub fn selection_bounds(&self) -> Option<LatLngBounds> {
        let mut bounds = self.tiles.selection_bounds();
        for p in [self.inputs.start, self.inputs.end].into_iter().flatten() {
            match bounds.as_mut() {
                Some(b) => b.extend(p),
                None => bounds = Some(LatLngBounds::from_corners(p, p)),
            }
        }
        bounds
    }

    // Tiles

    pub fn set_viewport(&mut self, bounds: LatLngBounds, zoom: u8) {
        self.tiles.set_viewport(bounds, zoom);
    }

    /// Flips a displayed tile's selection, persists it and asks for a new route.
    pub fn toggle_tile(&mut self, tile: TileId, now: Millis) -> Result<bool, PlannerError> {
        let selected = self.tiles.toggle_selection(tile)?;
        self.save_selection()?;
        self.request_route(now);
        Ok(selected)
    }

    pub fn toggle_at(&mut self, p: LatLng, now: Millis) -> Result<(TileId, bool), PlannerError> {
        let (tile, selected) = self.tiles.toggle_at(p)?;
        self.save_selection()?;
        self.request_route(now);
        Ok((tile, selected))
    }

    pub fn clear_selection(&mut self, now: Millis) -> Result<(), PlannerError> {
        self.tiles.clear_selection();
        self.save_selection()?;
        self.request_route(now);
        Ok(())
    }

    /// Imports the tiles already visited (e.g. from an activity tracker).
    pub fn set_visited_tiles(&mut self, visited: TileSet) -> Result<(), PlannerError> {
        self.store
            .set(keys::VISITED_TILES, &visited.to_storage_string())?;
        self.tiles.set_progress_tiles(visited, TileSet::new());
        Ok(())
    }

    pub fn reset_visited_tiles(&mut self) -> Result<(), PlannerError> {
        self.store.remove(keys::VISITED_TILES)?;
        self.tiles.reset_progress_tiles();
        Ok(())
    }

    fn save_selection(&mut self) -> Result<(), PlannerError> {
        let raw = self.tiles.selected().to_storage_string();
        self.store.set(keys::SELECTED_TILES, &raw)?;
        Ok(())
    }

    // Route inputs

    pub fn set_start(&mut self, p: LatLng, now: Millis) -> Result<(), PlannerError> {
        self.edit_inputs(now, |i| i.start = Some(p))
    }

    pub fn set_end(&mut self, p: LatLng, now: Millis) -> Result<(), PlannerError> {
        self.edit_inputs(now, |i| i.end = Some(p))
    }

    pub fn clear_start(&mut self, now: Millis) -> Result<(), PlannerError> {
        self.edit_inputs(now, |i| i.start = None)
    }

    pub fn clear_end(&mut self, now: Millis) -> Result<(), PlannerError> {
        self.edit_inputs(now, |i| i.end = None)
    }

    /// Returns `false` (and changes nothing) unless both endpoints are set.
    pub fn swap_endpoints(&mut self, now: Millis) -> Result<bool, PlannerError> {
        if self.inputs.start.is_none() || self.inputs.end.is_none() {
            return Ok(false);
        }
        self.edit_inputs(now, |i| {
            i.swap_endpoints();
        })?;
        Ok(true)
    }

    pub fn add_waypoint(&mut self, p: LatLng, now: Millis) -> Result<(), PlannerError> {
        self.edit_inputs(now, |i| i.waypoints.push(p))
    }

    pub fn clear_waypoints(&mut self, now: Millis) -> Result<(), PlannerError> {
        self.edit_inputs(now, |i| i.waypoints.clear())
    }

    pub fn set_mode(&mut self, mode: TravelMode, now: Millis) -> Result<(), PlannerError> {
        self.edit_inputs(now, |i| i.mode = mode)
    }

    pub fn set_turnaround_cost(&mut self, cost: f64, now: Millis) -> Result<(), PlannerError> {
        self.edit_inputs(now, |i| i.turnaround_cost = cost)
    }

    fn edit_inputs(
        &mut self,
        now: Millis,
        edit: impl FnOnce(&mut RouteInputs),
    ) -> Result<(), PlannerError> {
        edit(&mut self.inputs);
        self.inputs.save(&mut self.store)?;
        self.request_route(now);
        Ok(())
    }

    // Route computation

    /// Re-arms the debounced route request with the current inputs.
    ///
    /// Marks of the previous failure are cleared. Missing inputs are
    /// reported as a `NotEnoughData` event, not an error.
    pub fn request_route(&mut self, now: Millis) {
        self.tiles.clear_error_tiles();
        let params = self.route_params();
        if let Err(missing) = self.coordinator.request_route(&params, now) {
            debug!("route not requested: {missing}");
        }
        self.react();
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        self.coordinator.next_deadline()
    }

    pub fn fire_due(&mut self, now: Millis) -> Vec<ServiceCall> {
        let params = self.route_params();
        let calls = self.coordinator.fire_due(now, &params);
        self.react();
        calls
    }

    pub fn on_start_response(
        &mut self,
        generation: Generation,
        response: Result<StartRouteResponse, ServiceError>,
        now: Millis,
    ) -> bool {
        let applied = self.coordinator.on_start_response(generation, response, now);
        self.react();
        applied
    }

    pub fn on_status_response(
        &mut self,
        generation: Generation,
        response: Result<RouteStatusResponse, ServiceError>,
        now: Millis,
    ) -> bool {
        let applied = self.coordinator.on_status_response(generation, response, now);
        self.react();
        applied
    }

    /// Fires due timers and answers them synchronously through `service`.
    pub fn pump<R: RoutingService + ?Sized>(&mut self, now: Millis, service: &mut R) -> usize {
        let params = self.route_params();
        let n = self.coordinator.pump(now, &params, service);
        self.react();
        n
    }

    pub fn current_route(&self) -> Option<&RouteResult> {
        self.coordinator.current_route()
    }

    /// Saves the completed route as a trace and highlights the tiles it crosses.
    pub fn commit_route(&mut self, name: impl Into<String>) -> Result<usize, PlannerError> {
        let index = self
            .traces
            .append(&mut self.store, self.coordinator.completed(), name)?;
        if let Some(result) = self.coordinator.take_completed() {
            let added = self.tiles.highlight_route(&result.route);
            debug!("trace {index} saved, {added} tiles newly highlighted");
        }
        Ok(index)
    }

    /// Moves coordinator events to the planner's bus and applies their tile effects.
    fn react(&mut self) {
        for event in self.coordinator.drain_events() {
            match &event.payload {
                RouteEvent::Started { .. } => self.tiles.clear_error_tiles(),
                RouteEvent::Failed(failure) => {
                    self.tiles.set_error_tiles(failure.tiles.iter().copied())
                }
                _ => {}
            }
            self.events.emit(event.at, event.payload);
        }
    }

    // Traces

    pub fn remove_trace(&mut self, index: usize) -> Result<Trace, PlannerError> {
        Ok(self.traces.remove(&mut self.store, index)?)
    }

    pub fn duplicate_trace(&mut self, index: usize) -> Result<usize, PlannerError> {
        Ok(self.traces.duplicate(&mut self.store, index)?)
    }

    pub fn merge_traces(&mut self, target: usize, source: usize) -> Result<bool, PlannerError> {
        Ok(self.traces.merge(&mut self.store, target, source)?)
    }

    pub fn insert_trace(&mut self, target: usize, patch: usize) -> Result<bool, PlannerError> {
        Ok(self.traces.insert(&mut self.store, target, patch)?)
    }

    pub fn split_trace(&mut self, index: usize, click: LatLng) -> Result<bool, PlannerError> {
        Ok(self.traces.split(&mut self.store, index, click)?)
    }

    pub fn rename_trace(&mut self, index: usize, name: impl Into<String>) -> Result<(), PlannerError> {
        Ok(self.traces.rename(&mut self.store, index, name)?)
    }

    pub fn undo(&mut self) -> Result<bool, PlannerError> {
        Ok(self.traces.undo(&mut self.store)?)
    }
}
