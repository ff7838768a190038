//! Ordered, persisted trace list with bounded undo.
//!
//! Every successful edit follows the same commit sequence: snapshot the
//! current list onto the undo stack, persist the new list, swap it in. Edits
//! that cannot apply (same index twice, missing anchors, click too far from
//! the trace) return `Ok(false)` and touch neither memory nor storage.

use foundation::ids::TraceId;
use foundation::math::LatLng;
use routing::RouteResult;
use storage::{KvStore, StorageError, get_json, keys, set_json};
use tracing::{debug, info, warn};

use crate::trace::{SPLIT_THRESHOLD_M, Trace};
use crate::undo::{UNDO_DEPTH, UndoStack};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    IndexOutOfRange { index: usize, len: usize },
    NoCompletedRoute,
    Storage(StorageError),
}

impl std::fmt::Display for TraceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceError::IndexOutOfRange { index, len } => {
                write!(f, "no trace at index {index} ({len} traces)")
            }
            TraceError::NoCompletedRoute => write!(f, "no completed route to save"),
            TraceError::Storage(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for TraceError {}

impl From<StorageError> for TraceError {
    fn from(e: StorageError) -> Self {
        TraceError::Storage(e)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TraceStoreConfig {
    pub undo_depth: usize,
    pub split_threshold_m: f64,
}

impl Default for TraceStoreConfig {
    fn default() -> Self {
        Self {
            undo_depth: UNDO_DEPTH,
            split_threshold_m: SPLIT_THRESHOLD_M,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TraceStore {
    config: TraceStoreConfig,
    traces: Vec<Trace>,
    undo: UndoStack,
    next_id: u64,
}

impl Default for TraceStore {
    fn default() -> Self {
        Self::new(TraceStoreConfig::default())
    }
}

impl TraceStore {
    pub fn new(config: TraceStoreConfig) -> Self {
        Self {
            config,
            traces: Vec::new(),
            undo: UndoStack::new(config.undo_depth),
            next_id: 1,
        }
    }

    /// Loads the trace list and undo window from `store`.
    ///
    /// Missing keys read as empty. A corrupt list or undo window is logged
    /// and replaced by an empty one; other storage errors propagate.
    pub fn load<S: KvStore + ?Sized>(
        store: &S,
        config: TraceStoreConfig,
    ) -> Result<Self, TraceError> {
        let traces: Vec<Trace> = recover(get_json(store, keys::TRACES))?.unwrap_or_default();
        let snapshots: Vec<String> = recover(get_json(store, keys::UNDO))?.unwrap_or_default();
        let persisted_next: u64 = recover(get_json(store, keys::TRACE_NEXT_ID))?.unwrap_or(1);

        let max_id = traces.iter().map(|t| t.id.0).max().unwrap_or(0);
        info!(
            "loaded {} traces, {} undo snapshots",
            traces.len(),
            snapshots.len()
        );
        Ok(Self {
            config,
            traces,
            undo: UndoStack::from_snapshots(config.undo_depth, snapshots),
            next_id: persisted_next.max(max_id + 1),
        })
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Trace> {
        self.traces.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trace> + '_ {
        self.traces.iter()
    }

    pub fn as_slice(&self) -> &[Trace] {
        &self.traces
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// Saves the completed route as a new trace and returns its index.
    pub fn append<S: KvStore + ?Sized>(
        &mut self,
        store: &mut S,
        completed: Option<&RouteResult>,
        name: impl Into<String>,
    ) -> Result<usize, TraceError> {
        let completed = completed.ok_or(TraceError::NoCompletedRoute)?;
        let trace = Trace::new(self.allocate_id(), name, completed.route.clone());
        info!("saving trace {:?}: {:.2} km", trace.name, trace.distance_km);

        let mut next = self.traces.clone();
        next.push(trace);
        self.commit(store, next)?;
        Ok(self.traces.len() - 1)
    }

    pub fn remove<S: KvStore + ?Sized>(
        &mut self,
        store: &mut S,
        index: usize,
    ) -> Result<Trace, TraceError> {
        self.check(index)?;
        let mut next = self.traces.clone();
        let removed = next.remove(index);
        self.commit(store, next)?;
        Ok(removed)
    }

    /// Appends a copy with a fresh identity; returns the copy's index.
    pub fn duplicate<S: KvStore + ?Sized>(
        &mut self,
        store: &mut S,
        index: usize,
    ) -> Result<usize, TraceError> {
        self.check(index)?;
        let copy = Trace {
            id: self.allocate_id(),
            ..self.traces[index].clone()
        };
        let mut next = self.traces.clone();
        next.push(copy);
        self.commit(store, next)?;
        Ok(self.traces.len() - 1)
    }

    /// Concatenates `source` onto `target` and removes `source`.
    ///
    /// A junction point shared by both ends is kept once. Returns `false`
    /// when both indices are the same.
    pub fn merge<S: KvStore + ?Sized>(
        &mut self,
        store: &mut S,
        target: usize,
        source: usize,
    ) -> Result<bool, TraceError> {
        self.check(target)?;
        self.check(source)?;
        if target == source {
            debug!("merge of trace {target} with itself ignored");
            return Ok(false);
        }

        let mut next = self.traces.clone();
        let mut tail = next[source].clone();
        if next[target].route.last().is_some() && next[target].route.last() == tail.route.first() {
            tail.route.remove(0);
        }
        next[target].append_trace(&tail);
        next.remove(source);
        self.commit(store, next)?;
        Ok(true)
    }

    /// Splices trace `patch` into trace `target`; see [`Trace::insert_patch`].
    pub fn insert<S: KvStore + ?Sized>(
        &mut self,
        store: &mut S,
        target: usize,
        patch: usize,
    ) -> Result<bool, TraceError> {
        self.check(target)?;
        self.check(patch)?;
        if target == patch {
            return Ok(false);
        }

        let mut edited = self.traces[target].clone();
        if !edited.insert_patch(&self.traces[patch]) {
            debug!("insert rejected: anchors of trace {patch} not found in trace {target}");
            return Ok(false);
        }
        let mut next = self.traces.clone();
        next[target] = edited;
        self.commit(store, next)?;
        Ok(true)
    }

    /// Splits trace `index` at the point nearest to `click`.
    ///
    /// The tail becomes a new trace right after the original. Returns `false`
    /// when no point is within the split threshold.
    pub fn split<S: KvStore + ?Sized>(
        &mut self,
        store: &mut S,
        index: usize,
        click: LatLng,
    ) -> Result<bool, TraceError> {
        self.check(index)?;
        let Some((head, mut tail)) =
            self.traces[index].split_at(click, self.config.split_threshold_m)
        else {
            debug!("split rejected: click {click} too far from trace {index}");
            return Ok(false);
        };
        tail.id = self.allocate_id();

        let mut next = self.traces.clone();
        next[index] = head;
        next.insert(index + 1, tail);
        self.commit(store, next)?;
        Ok(true)
    }

    pub fn rename<S: KvStore + ?Sized>(
        &mut self,
        store: &mut S,
        index: usize,
        name: impl Into<String>,
    ) -> Result<(), TraceError> {
        self.check(index)?;
        let mut next = self.traces.clone();
        next[index].name = name.into();
        self.commit(store, next)
    }

    /// Restores the list as it was before the last edit.
    ///
    /// Returns `false` when there is nothing to undo.
    pub fn undo<S: KvStore + ?Sized>(&mut self, store: &mut S) -> Result<bool, TraceError> {
        let mut undo = self.undo.clone();
        let Some(snapshot) = undo.pop() else {
            return Ok(false);
        };
        let restored: Vec<Trace> = match serde_json::from_str(&snapshot) {
            Ok(list) => list,
            Err(e) => {
                warn!("discarding unreadable undo snapshot: {e}");
                self.undo = undo;
                self.persist_undo(store)?;
                return Err(StorageError::Corrupt(format!("{}: {e}", keys::UNDO)).into());
            }
        };

        set_json(store, keys::TRACES, &restored)?;
        self.undo = undo;
        self.persist_undo(store)?;
        self.traces = restored;
        info!("undo: {} traces, {} snapshots left", self.traces.len(), self.undo.len());
        Ok(true)
    }

    fn check(&self, index: usize) -> Result<(), TraceError> {
        if index >= self.traces.len() {
            return Err(TraceError::IndexOutOfRange {
                index,
                len: self.traces.len(),
            });
        }
        Ok(())
    }

    fn allocate_id(&mut self) -> TraceId {
        let id = TraceId(self.next_id);
        self.next_id += 1;
        id
    }

    fn commit<S: KvStore + ?Sized>(
        &mut self,
        store: &mut S,
        next: Vec<Trace>,
    ) -> Result<(), TraceError> {
        let snapshot = serde_json::to_string(&self.traces)
            .map_err(|e| StorageError::Io(e.to_string()))?;
        let mut undo = self.undo.clone();
        undo.push(snapshot);

        set_json(store, keys::TRACES, &next)?;
        set_json(store, keys::TRACE_NEXT_ID, &self.next_id)?;
        self.undo = undo;
        self.persist_undo(store)?;
        self.traces = next;
        Ok(())
    }

    fn persist_undo<S: KvStore + ?Sized>(&self, store: &mut S) -> Result<(), TraceError> {
        let snapshots: Vec<&str> = self.undo.snapshots().collect();
        set_json(store, keys::UNDO, &snapshots)?;
        Ok(())
    }
}

/// Maps corrupt persisted values to "absent".
fn recover<T>(read: Result<Option<T>, StorageError>) -> Result<Option<T>, TraceError> {
    match read {
        Ok(value) => Ok(value),
        Err(StorageError::Corrupt(msg)) => {
            warn!("ignoring corrupt trace data: {msg}");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::compute_distance;
    use pretty_assertions::assert_eq;
    use storage::MemoryStore;

    fn assert_close(a: f64, b: f64, eps: f64) {
        assert!((a - b).abs() <= eps, "{a} != {b} (eps {eps})");
    }

    fn completed(route: Vec<LatLng>) -> RouteResult {
        RouteResult {
            length_km: compute_distance(&route),
            route,
            route_request_id: None,
        }
    }

    fn equator() -> RouteResult {
        completed(vec![
            LatLng::new(0.0, 0.0),
            LatLng::new(0.0, 0.01),
            LatLng::new(0.0, 0.02),
        ])
    }

    fn with_equator() -> (TraceStore, MemoryStore) {
        let mut store = MemoryStore::new();
        let mut traces = TraceStore::default();
        traces.append(&mut store, Some(&equator()), "equator").unwrap();
        (traces, store)
    }

    #[test]
    fn append_requires_a_completed_route() {
        let mut store = MemoryStore::new();
        let mut traces = TraceStore::default();
        assert_eq!(
            traces.append(&mut store, None, "nothing"),
            Err(TraceError::NoCompletedRoute)
        );
        assert!(traces.is_empty());
        assert!(!traces.can_undo());
        assert!(store.is_empty());
    }

    #[test]
    fn append_recomputes_distance_from_points() {
        let (traces, _) = with_equator();
        let t = traces.get(0).unwrap();
        assert_eq!(t.id, TraceId(1));
        assert_close(t.distance_km, 2.2239, 1e-3);
    }

    #[test]
    fn split_at_a_vertex_yields_two_halves() {
        let (mut traces, mut store) = with_equator();
        assert!(traces.split(&mut store, 0, LatLng::new(0.0, 0.01)).unwrap());

        assert_eq!(traces.len(), 2);
        let (a, b) = (traces.get(0).unwrap(), traces.get(1).unwrap());
        assert_eq!(a.route, vec![LatLng::new(0.0, 0.0), LatLng::new(0.0, 0.01)]);
        assert_eq!(b.route, vec![LatLng::new(0.0, 0.01), LatLng::new(0.0, 0.02)]);
        assert_close(a.distance_km, 1.1119, 1e-3);
        assert_close(b.distance_km, 1.1119, 1e-3);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn split_far_from_the_trace_is_a_no_op() {
        let (mut traces, mut store) = with_equator();
        let before = store.clone();
        assert!(!traces.split(&mut store, 0, LatLng::new(1.0, 1.0)).unwrap());
        assert_eq!(traces.len(), 1);
        assert_eq!(traces.undo_len(), 1);
        assert_eq!(store.get(keys::TRACES), before.get(keys::TRACES));
    }

    #[test]
    fn split_then_merge_round_trips() {
        let (mut traces, mut store) = with_equator();
        let original = traces.as_slice().to_vec();

        traces.split(&mut store, 0, LatLng::new(0.0, 0.01)).unwrap();
        assert!(traces.merge(&mut store, 0, 1).unwrap());

        assert_eq!(traces.len(), 1);
        let merged = traces.get(0).unwrap();
        assert_eq!(merged.id, original[0].id);
        assert_eq!(merged.name, original[0].name);
        assert_eq!(merged.route, original[0].route);
        assert_close(merged.distance_km, original[0].distance_km, 1e-9);
    }

    #[test]
    fn merge_with_itself_is_ignored() {
        let (mut traces, mut store) = with_equator();
        assert!(!traces.merge(&mut store, 0, 0).unwrap());
        assert_eq!(traces.undo_len(), 1);
    }

    #[test]
    fn merge_counts_the_bridging_segment() {
        let (mut traces, mut store) = with_equator();
        let far = completed(vec![LatLng::new(1.0, 0.0), LatLng::new(1.0, 0.01)]);
        traces.append(&mut store, Some(&far), "far").unwrap();
        let parts = traces.get(0).unwrap().distance_km + traces.get(1).unwrap().distance_km;

        traces.merge(&mut store, 1, 0).unwrap();
        let merged = traces.get(0).unwrap();
        assert_eq!(merged.name, "far");
        assert_eq!(merged.route.len(), 5);
        assert_close(merged.distance_km, compute_distance(&merged.route), 1e-9);
        // One degree of latitude separates the two ends.
        assert!(merged.distance_km > parts + 111.0);
    }

    #[test]
    fn insert_with_missing_anchors_changes_nothing() {
        let (mut traces, mut store) = with_equator();
        let stray = completed(vec![LatLng::new(5.0, 5.0), LatLng::new(5.0, 5.01)]);
        traces.append(&mut store, Some(&stray), "stray").unwrap();
        let before = traces.as_slice().to_vec();
        let persisted = store.get(keys::TRACES).unwrap();

        assert!(!traces.insert(&mut store, 0, 1).unwrap());
        assert_eq!(traces.as_slice(), before.as_slice());
        assert_eq!(store.get(keys::TRACES).unwrap(), persisted);
        assert_eq!(traces.undo_len(), 2);
    }

    #[test]
    fn insert_splices_the_detour() {
        let (mut traces, mut store) = with_equator();
        let detour = completed(vec![
            LatLng::new(0.0, 0.01),
            LatLng::new(0.001, 0.015),
            LatLng::new(0.0, 0.02),
        ]);
        traces.append(&mut store, Some(&detour), "detour").unwrap();

        assert!(traces.insert(&mut store, 0, 1).unwrap());
        let edited = traces.get(0).unwrap();
        assert_eq!(
            edited.route,
            vec![
                LatLng::new(0.0, 0.0),
                LatLng::new(0.0, 0.01),
                LatLng::new(0.001, 0.015),
                LatLng::new(0.0, 0.02),
            ]
        );
        assert_close(edited.distance_km, compute_distance(&edited.route), 1e-9);
        // The patch itself stays in the list.
        assert_eq!(traces.len(), 2);
    }

    #[test]
    fn duplicate_gets_a_new_identity() {
        let (mut traces, mut store) = with_equator();
        let i = traces.duplicate(&mut store, 0).unwrap();
        assert_eq!(i, 1);
        let (a, b) = (traces.get(0).unwrap(), traces.get(1).unwrap());
        assert_ne!(a.id, b.id);
        assert_eq!(a.route, b.route);
        assert_eq!(a.name, b.name);
        assert_eq!(a.distance_km, b.distance_km);
    }

    #[test]
    fn out_of_range_indices_are_errors() {
        let (mut traces, mut store) = with_equator();
        assert_eq!(
            traces.remove(&mut store, 3),
            Err(TraceError::IndexOutOfRange { index: 3, len: 1 })
        );
        assert!(traces.merge(&mut store, 0, 1).is_err());
        assert!(traces.rename(&mut store, 2, "x").is_err());
        assert_eq!(traces.len(), 1);
    }

    #[test]
    fn undo_window_keeps_the_last_ten_edits() {
        let mut store = MemoryStore::new();
        let mut traces = TraceStore::default();
        for i in 0..11 {
            traces
                .append(&mut store, Some(&equator()), format!("t{i}"))
                .unwrap();
        }
        assert_eq!(traces.undo_len(), 10);

        for _ in 0..10 {
            assert!(traces.undo(&mut store).unwrap());
        }
        // State as it was before the second edit, not the empty start.
        assert_eq!(traces.len(), 1);
        assert_eq!(traces.get(0).unwrap().name, "t0");
        assert!(!traces.undo(&mut store).unwrap());
    }

    #[test]
    fn undo_restores_memory_and_storage() {
        let (mut traces, mut store) = with_equator();
        traces.rename(&mut store, 0, "renamed").unwrap();
        traces.undo(&mut store).unwrap();

        assert_eq!(traces.get(0).unwrap().name, "equator");
        let reloaded = TraceStore::load(&store, TraceStoreConfig::default()).unwrap();
        assert_eq!(reloaded.as_slice(), traces.as_slice());
        assert_eq!(reloaded.undo_len(), 1);
    }

    #[test]
    fn ids_stay_unique_across_reloads() {
        let (mut traces, mut store) = with_equator();
        traces.remove(&mut store, 0).unwrap();
        let mut reloaded = TraceStore::load(&store, TraceStoreConfig::default()).unwrap();
        reloaded
            .append(&mut store, Some(&equator()), "again")
            .unwrap();
        assert_eq!(reloaded.get(0).unwrap().id, TraceId(2));
    }

    #[test]
    fn corrupt_list_loads_empty() {
        let mut store = MemoryStore::new();
        store.set(keys::TRACES, "{not json").unwrap();
        store.set(keys::UNDO, "[\"[]\"]").unwrap();
        let traces = TraceStore::load(&store, TraceStoreConfig::default()).unwrap();
        assert!(traces.is_empty());
        assert_eq!(traces.undo_len(), 1);
    }
}
