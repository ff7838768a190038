//! Request/response types of the routing backend.
//!
//! Requests are sent as query strings (`start[]=lat&start[]=lon` style arrays);
//! responses are JSON objects with camelCase keys, except the historical
//! `error_code`/`error_args` fields.

use std::fmt;
use std::str::FromStr;

use foundation::ids::TileId;
use foundation::math::LatLng;
use serde::{Deserialize, Serialize};

/// Profile the backend routes for.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Car,
    #[default]
    Cycle,
    Foot,
}

impl TravelMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TravelMode::Car => "car",
            TravelMode::Cycle => "cycle",
            TravelMode::Foot => "foot",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "car" => Ok(TravelMode::Car),
            "cycle" | "bike" => Ok(TravelMode::Cycle),
            "foot" => Ok(TravelMode::Foot),
            other => Err(format!("unknown travel mode {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRouteRequest {
    pub session_id: Option<String>,
    pub start: LatLng,
    pub end: LatLng,
    pub waypoints: Vec<LatLng>,
    pub tiles: Vec<TileId>,
    pub mode: TravelMode,
    pub turnaround_cost: f64,
}

impl StartRouteRequest {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut q: Vec<(&'static str, String)> = Vec::new();
        if let Some(id) = &self.session_id {
            q.push(("sessionId", id.clone()));
        }
        q.push(("start[]", self.start.lat.to_string()));
        q.push(("start[]", self.start.lon.to_string()));
        q.push(("end[]", self.end.lat.to_string()));
        q.push(("end[]", self.end.lon.to_string()));
        for w in &self.waypoints {
            q.push(("waypoints[]", w.to_string()));
        }
        for t in &self.tiles {
            q.push(("tiles[]", t.to_string()));
        }
        q.push(("mode", self.mode.as_str().to_string()));
        q.push(("turnaroundCost", self.turnaround_cost.to_string()));
        q
    }
}

/// Outcome flag of every backend answer. Anything but `"OK"` is a failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServiceStatus {
    Ok,
    Fail,
}

impl From<String> for ServiceStatus {
    fn from(raw: String) -> Self {
        if raw == "OK" {
            ServiceStatus::Ok
        } else {
            ServiceStatus::Fail
        }
    }
}

impl From<ServiceStatus> for String {
    fn from(status: ServiceStatus) -> Self {
        match status {
            ServiceStatus::Ok => "OK".to_string(),
            ServiceStatus::Fail => "Fail".to_string(),
        }
    }
}

/// Progress of a backend search. Anything but `"complete"` is still searching.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SearchState {
    Complete,
    Searching,
}

impl From<String> for SearchState {
    fn from(raw: String) -> Self {
        if raw == "complete" {
            SearchState::Complete
        } else {
            SearchState::Searching
        }
    }
}

impl From<SearchState> for String {
    fn from(state: SearchState) -> Self {
        match state {
            SearchState::Complete => "complete".to_string(),
            SearchState::Searching => "searching".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRouteResponse {
    pub session_id: Option<String>,
    pub status: ServiceStatus,
    #[serde(default)]
    pub state: Option<SearchState>,
    #[serde(default)]
    pub find_route_id: Option<String>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub route: Option<Vec<LatLng>>,
    #[serde(default)]
    pub message: Option<String>,
    /// Tiles the backend could not route through.
    #[serde(default)]
    pub tiles: Vec<String>,
}

impl StartRouteResponse {
    pub fn ok(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            status: ServiceStatus::Ok,
            state: Some(SearchState::Searching),
            find_route_id: None,
            length: None,
            route: None,
            message: None,
            tiles: Vec::new(),
        }
    }

    pub fn fail(message: impl Into<String>, tiles: &[TileId]) -> Self {
        Self {
            session_id: None,
            status: ServiceStatus::Fail,
            state: None,
            find_route_id: None,
            length: None,
            route: None,
            message: Some(message.into()),
            tiles: tiles.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStatusRequest {
    pub session_id: String,
    /// Fingerprint of the last route received; the backend omits an unchanged route.
    pub find_route_id: Option<String>,
}

impl RouteStatusRequest {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("sessionId", self.session_id.clone()),
            ("findRouteId", self.find_route_id.clone().unwrap_or_default()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStatusResponse {
    pub status: ServiceStatus,
    #[serde(default)]
    pub state: Option<SearchState>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub find_route_id: Option<String>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub route: Option<Vec<LatLng>>,
    #[serde(default, rename = "error_code")]
    pub error_code: Option<i64>,
    #[serde(default, rename = "error_args")]
    pub error_args: Vec<serde_json::Value>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl RouteStatusResponse {
    pub fn searching() -> Self {
        Self {
            status: ServiceStatus::Ok,
            state: Some(SearchState::Searching),
            progress: None,
            find_route_id: None,
            length: None,
            route: None,
            error_code: None,
            error_args: Vec::new(),
            session_id: None,
        }
    }

    pub fn complete() -> Self {
        Self {
            state: Some(SearchState::Complete),
            ..Self::searching()
        }
    }

    pub fn with_route(mut self, find_route_id: &str, route: Vec<LatLng>, length_km: f64) -> Self {
        self.find_route_id = Some(find_route_id.to_string());
        self.route = Some(route);
        self.length = Some(length_km);
        self
    }

    pub fn fail(error_code: i64, tiles: &[TileId]) -> Self {
        Self {
            status: ServiceStatus::Fail,
            state: None,
            error_code: Some(error_code),
            error_args: tiles
                .iter()
                .map(|t| serde_json::Value::String(t.to_string()))
                .collect(),
            ..Self::searching()
        }
    }

    /// Error arguments that name tiles; other arguments are ignored.
    pub fn error_tiles(&self) -> Vec<TileId> {
        self.error_args
            .iter()
            .filter_map(|v| v.as_str())
            .filter_map(|s| s.parse().ok())
            .collect()
    }
}

/// Parses tile ids out of a start-route failure, skipping foreign values.
pub fn parse_error_tiles(raw: &[String]) -> Vec<TileId> {
    raw.iter().filter_map(|s| s.parse().ok()).collect()
}
