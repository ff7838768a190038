use foundation::ids::{Generation, TileId};
use foundation::math::LatLng;

/// Backend search started by one committed route request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSession {
    pub session_id: String,
    pub route_request_id: Option<String>,
    pub generation: Generation,
}

/// Route geometry as returned by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    pub route: Vec<LatLng>,
    pub length_km: f64,
    pub route_request_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteFailure {
    /// Stable message key: the backend message, `fail:<code>` or a transport error.
    pub message: String,
    pub tiles: Vec<TileId>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Debouncing,
    AwaitingStart,
    Polling,
    Complete,
    Failed,
}

/// Why a route request was not issued.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NotEnoughData {
    MissingStart,
    /// Neither an end point nor a selected tile.
    MissingDestination,
}

impl std::fmt::Display for NotEnoughData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotEnoughData::MissingStart => write!(f, "no start point"),
            NotEnoughData::MissingDestination => write!(f, "no end point and no selected tile"),
        }
    }
}

impl std::error::Error for NotEnoughData {}

/// User-visible progress messages.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteEvent {
    NotEnoughData(NotEnoughData),
    /// Debounce timer armed.
    Waiting,
    /// Start-route call dispatched.
    AskRoute,
    /// Backend accepted the request; previous error tiles no longer apply.
    Started { session_id: String },
    Searching { progress: Option<f64> },
    RouteUpdated { length_km: f64 },
    Complete { length_km: f64 },
    Failed(RouteFailure),
}
