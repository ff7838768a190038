use crate::protocol::{RouteStatusRequest, RouteStatusResponse, StartRouteRequest, StartRouteResponse};

/// Transport-level failure talking to the routing backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    Transport(String),
    Decode(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Transport(msg) => write!(f, "routing service unreachable: {msg}"),
            ServiceError::Decode(msg) => write!(f, "invalid routing service answer: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {}

/// Blocking routing backend.
///
/// Asynchronous front ends drive [`crate::RequestCoordinator`] through its
/// `fire_due`/`on_*_response` methods instead.
pub trait RoutingService {
    fn start_route(&mut self, req: &StartRouteRequest) -> Result<StartRouteResponse, ServiceError>;
    fn route_status(&mut self, req: &RouteStatusRequest)
    -> Result<RouteStatusResponse, ServiceError>;
}
