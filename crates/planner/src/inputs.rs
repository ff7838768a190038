use foundation::math::LatLng;
use routing::TravelMode;
use storage::{KvStore, StorageError, get_json, keys, set_json};
use tracing::warn;

/// User-chosen route endpoints and routing options.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteInputs {
    pub start: Option<LatLng>,
    pub end: Option<LatLng>,
    pub waypoints: Vec<LatLng>,
    pub mode: TravelMode,
    pub turnaround_cost: f64,
}

impl Default for RouteInputs {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            waypoints: Vec::new(),
            mode: TravelMode::default(),
            turnaround_cost: 0.0,
        }
    }
}

impl RouteInputs {
    /// Reads persisted inputs; unreadable values fall back to `defaults`.
    pub fn load<S: KvStore + ?Sized>(store: &S, defaults: &RouteInputs) -> Result<Self, StorageError> {
        let start = read_point(store, keys::START)?;
        let end = read_point(store, keys::END)?;
        let waypoints = match get_json::<Vec<LatLng>, _>(store, keys::WAYPOINTS) {
            Ok(w) => w.unwrap_or_default(),
            Err(StorageError::Corrupt(msg)) => {
                warn!("ignoring stored waypoints: {msg}");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        let mode = read_parsed(store, keys::MODE)?.unwrap_or(defaults.mode);
        let turnaround_cost =
            read_parsed(store, keys::TURNAROUND_COST)?.unwrap_or(defaults.turnaround_cost);

        Ok(Self {
            start,
            end,
            waypoints,
            mode,
            turnaround_cost,
        })
    }

    /// Writes every field. Unset endpoints are removed from the store.
    pub fn save<S: KvStore + ?Sized>(&self, store: &mut S) -> Result<(), StorageError> {
        write_point(store, keys::START, self.start)?;
        write_point(store, keys::END, self.end)?;
        set_json(store, keys::WAYPOINTS, &self.waypoints)?;
        store.set(keys::MODE, self.mode.as_str())?;
        store.set(keys::TURNAROUND_COST, &self.turnaround_cost.to_string())
    }

    /// Exchanges start and end; only when both are set.
    pub fn swap_endpoints(&mut self) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => {
                self.start = Some(end);
                self.end = Some(start);
                true
            }
            _ => false,
        }
    }
}

fn read_point<S: KvStore + ?Sized>(store: &S, key: &str) -> Result<Option<LatLng>, StorageError> {
    read_parsed(store, key)
}

fn write_point<S: KvStore + ?Sized>(
    store: &mut S,
    key: &str,
    point: Option<LatLng>,
) -> Result<(), StorageError> {
    match point {
        Some(p) => store.set(key, &p.to_string()),
        None => store.remove(key).map(|_| ()),
    }
}

fn read_parsed<T, S>(store: &S, key: &str) -> Result<Option<T>, StorageError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    S: KvStore + ?Sized,
{
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    match raw.parse() {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            warn!("ignoring stored {key} {raw:?}: {e}");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use storage::MemoryStore;

    #[test]
    fn round_trips_through_the_store() {
        let inputs = RouteInputs {
            start: Some(LatLng::new(48.85, 2.35)),
            end: None,
            waypoints: vec![LatLng::new(48.9, 2.4)],
            mode: TravelMode::Foot,
            turnaround_cost: 1.5,
        };
        let mut store = MemoryStore::new();
        inputs.save(&mut store).unwrap();
        assert_eq!(store.get(keys::START).unwrap().as_deref(), Some("48.85,2.35"));
        assert_eq!(store.get(keys::END).unwrap(), None);

        let loaded = RouteInputs::load(&store, &RouteInputs::default()).unwrap();
        assert_eq!(loaded, inputs);
    }

    #[test]
    fn garbage_values_fall_back() {
        let mut store = MemoryStore::new();
        store.set(keys::START, "north pole").unwrap();
        store.set(keys::MODE, "rocket").unwrap();
        store.set(keys::WAYPOINTS, "[[1.0").unwrap();
        let defaults = RouteInputs {
            mode: TravelMode::Car,
            ..RouteInputs::default()
        };
        let loaded = RouteInputs::load(&store, &defaults).unwrap();
        assert_eq!(loaded.start, None);
        assert_eq!(loaded.mode, TravelMode::Car);
        assert!(loaded.waypoints.is_empty());
    }

    #[test]
    fn swap_needs_both_endpoints() {
        let mut inputs = RouteInputs {
            start: Some(LatLng::new(1.0, 2.0)),
            ..RouteInputs::default()
        };
        assert!(!inputs.swap_endpoints());
        inputs.end = Some(LatLng::new(3.0, 4.0));
        assert!(inputs.swap_endpoints());
        assert_eq!(inputs.start, Some(LatLng::new(3.0, 4.0)));
        assert_eq!(inputs.end, Some(LatLng::new(1.0, 2.0)));
    }
}
