//! Debounced, cancellable route computation.
//!
//! `RequestCoordinator` is a sans-IO state machine:
//!
//! ```text
//! Idle → Debouncing → AwaitingStart → Polling → {Complete | Failed}
//! ```
//!
//! Every timer and every service call is tagged with the [`Generation`] that
//! was current when it was scheduled. `request_route` advances the generation,
//! so anything tagged with an older one is dropped when it fires or answers,
//! whether or not its timer was cancelled.

use foundation::ids::{Generation, TileId};
use foundation::math::LatLng;
use foundation::time::Millis;
use runtime::event_bus::{Event, EventBus};
use runtime::timers::{TimerId, TimerQueue};
use tracing::{debug, info, warn};

use crate::protocol::{
    RouteStatusRequest, RouteStatusResponse, SearchState, ServiceStatus, StartRouteRequest,
    StartRouteResponse, TravelMode, parse_error_tiles,
};
use crate::service::{RoutingService, ServiceError};
use crate::session::{
    CoordinatorState, NotEnoughData, RouteEvent, RouteFailure, RouteResult, RouteSession,
};

pub const DEBOUNCE_MS: u64 = 2000;
pub const POLL_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub debounce_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEBOUNCE_MS,
            poll_interval_ms: POLL_INTERVAL_MS,
        }
    }
}

/// Snapshot of everything a start-route call is built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteParams {
    pub start: Option<LatLng>,
    pub end: Option<LatLng>,
    pub waypoints: Vec<LatLng>,
    pub tiles: Vec<TileId>,
    pub mode: TravelMode,
    pub turnaround_cost: f64,
}

impl RouteParams {
    pub fn check(&self) -> Result<LatLng, NotEnoughData> {
        let start = self.start.ok_or(NotEnoughData::MissingStart)?;
        if self.end.is_none() && self.tiles.is_empty() {
            return Err(NotEnoughData::MissingDestination);
        }
        Ok(start)
    }

    /// Builds the start-route call. Without an end point the route loops back
    /// to the start through the selected tiles.
    pub fn to_request(&self, session_id: Option<String>) -> Result<StartRouteRequest, NotEnoughData> {
        let start = self.check()?;
        Ok(StartRouteRequest {
            session_id,
            start,
            end: self.end.unwrap_or(start),
            waypoints: self.waypoints.clone(),
            tiles: self.tiles.clone(),
            mode: self.mode,
            turnaround_cost: self.turnaround_cost,
        })
    }
}

/// Outgoing call produced by a fired timer.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    StartRoute {
        generation: Generation,
        request: StartRouteRequest,
    },
    RouteStatus {
        generation: Generation,
        request: RouteStatusRequest,
    },
}

impl ServiceCall {
    pub fn generation(&self) -> Generation {
        match self {
            ServiceCall::StartRoute { generation, .. } | ServiceCall::RouteStatus { generation, .. } => {
                *generation
            }
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Timer {
    Start(Generation),
    Poll(Generation),
}

impl Timer {
    fn generation(self) -> Generation {
        match self {
            Timer::Start(g) | Timer::Poll(g) => g,
        }
    }
}

#[derive(Debug, Clone)]
enum Phase {
    Idle,
    Debouncing,
    AwaitingStart,
    Polling {
        session: RouteSession,
        latest: Option<RouteResult>,
        progress: Option<f64>,
    },
    Complete(RouteResult),
    Failed(RouteFailure),
}

#[derive(Debug)]
pub struct RequestCoordinator {
    config: CoordinatorConfig,
    generation: Generation,
    phase: Phase,
    timers: TimerQueue<Timer>,
    pending_timer: Option<TimerId>,
    /// Backend session id, reused across requests once assigned.
    backend_session: Option<String>,
    events: EventBus<RouteEvent>,
}

impl Default for RequestCoordinator {
    fn default() -> Self {
        Self::new(CoordinatorConfig::default())
    }
}

impl RequestCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            generation: Generation::default(),
            phase: Phase::Idle,
            timers: TimerQueue::new(),
            pending_timer: None,
            backend_session: None,
            events: EventBus::new(),
        }
    }

    pub fn config(&self) -> CoordinatorConfig {
        self.config
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn state(&self) -> CoordinatorState {
        match self.phase {
            Phase::Idle => CoordinatorState::Idle,
            Phase::Debouncing => CoordinatorState::Debouncing,
            Phase::AwaitingStart => CoordinatorState::AwaitingStart,
            Phase::Polling { .. } => CoordinatorState::Polling,
            Phase::Complete(_) => CoordinatorState::Complete,
            Phase::Failed(_) => CoordinatorState::Failed,
        }
    }

    pub fn session(&self) -> Option<&RouteSession> {
        match &self.phase {
            Phase::Polling { session, .. } => Some(session),
            _ => None,
        }
    }

    /// Route to display: the intermediate geometry while polling, or the
    /// terminal one once complete.
    pub fn current_route(&self) -> Option<&RouteResult> {
        match &self.phase {
            Phase::Polling { latest, .. } => latest.as_ref(),
            Phase::Complete(result) => Some(result),
            _ => None,
        }
    }

    pub fn completed(&self) -> Option<&RouteResult> {
        match &self.phase {
            Phase::Complete(result) => Some(result),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&RouteFailure> {
        match &self.phase {
            Phase::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn progress(&self) -> Option<f64> {
        match &self.phase {
            Phase::Polling { progress, .. } => *progress,
            _ => None,
        }
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        self.timers.next_deadline()
    }

    pub fn drain_events(&mut self) -> Vec<Event<RouteEvent>> {
        self.events.drain()
    }

    /// Hands the completed route over (to be saved as a trace) and returns to `Idle`.
    pub fn take_completed(&mut self) -> Option<RouteResult> {
        if !matches!(self.phase, Phase::Complete(_)) {
            return None;
        }
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Complete(result) => Some(result),
            _ => None,
        }
    }

    /// Asks for a (re)computation after the debounce delay.
    ///
    /// Supersedes everything scheduled or in flight. Fails without scheduling
    /// anything when there is no start point, or neither an end point nor a
    /// selected tile.
    pub fn request_route(&mut self, params: &RouteParams, now: Millis) -> Result<(), NotEnoughData> {
        if let Some(id) = self.pending_timer.take() {
            self.timers.cancel(id);
        }
        self.generation = self.generation.next();

        if let Err(missing) = params.check() {
            debug!("route request blocked: {missing}");
            self.phase = Phase::Idle;
            self.events.emit(now, RouteEvent::NotEnoughData(missing));
            return Err(missing);
        }

        let deadline = now.after(self.config.debounce_ms);
        self.pending_timer = Some(self.timers.schedule(deadline, Timer::Start(self.generation)));
        self.phase = Phase::Debouncing;
        self.events.emit(now, RouteEvent::Waiting);
        debug!(
            "route request debounced until {}ms (generation {})",
            deadline.0, self.generation.0
        );
        Ok(())
    }

    /// Drops any pending work and returns to `Idle`.
    pub fn cancel(&mut self) {
        if let Some(id) = self.pending_timer.take() {
            self.timers.cancel(id);
        }
        self.generation = self.generation.next();
        self.phase = Phase::Idle;
    }

    /// Fires every timer due at `now` and returns the calls to issue.
    ///
    /// `params` is read when the debounce fires, so the call carries the
    /// inputs current at that time.
    pub fn fire_due(&mut self, now: Millis, params: &RouteParams) -> Vec<ServiceCall> {
        let mut calls = Vec::new();
        while let Some((id, timer)) = self.timers.pop_due(now) {
            if self.pending_timer == Some(id) {
                self.pending_timer = None;
            }
            if timer.generation() != self.generation {
                debug!(
                    "dropping stale timer (generation {} != {})",
                    timer.generation().0,
                    self.generation.0
                );
                continue;
            }

            match timer {
                Timer::Start(generation) => {
                    if !matches!(self.phase, Phase::Debouncing) {
                        continue;
                    }
                    match params.to_request(self.backend_session.clone()) {
                        Ok(request) => {
                            info!(
                                "start route: {} tiles, mode {} (generation {})",
                                request.tiles.len(),
                                request.mode,
                                generation.0
                            );
                            self.phase = Phase::AwaitingStart;
                            self.events.emit(now, RouteEvent::AskRoute);
                            calls.push(ServiceCall::StartRoute {
                                generation,
                                request,
                            });
                        }
                        Err(missing) => {
                            self.phase = Phase::Idle;
                            self.events.emit(now, RouteEvent::NotEnoughData(missing));
                        }
                    }
                }
                Timer::Poll(generation) => {
                    let Phase::Polling { session, .. } = &self.phase else {
                        continue;
                    };
                    calls.push(ServiceCall::RouteStatus {
                        generation,
                        request: RouteStatusRequest {
                            session_id: session.session_id.clone(),
                            find_route_id: session.route_request_id.clone(),
                        },
                    });
                }
            }
        }
        calls
    }

    /// Applies a start-route answer. Returns `false` if it was stale or unexpected.
    pub fn on_start_response(
        &mut self,
        generation: Generation,
        response: Result<StartRouteResponse, ServiceError>,
        now: Millis,
    ) -> bool {
        if !self.is_current(generation) || !matches!(self.phase, Phase::AwaitingStart) {
            return false;
        }

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                self.fail(now, e.to_string(), Vec::new());
                return true;
            }
        };
        if let Some(id) = &response.session_id {
            self.backend_session = Some(id.clone());
        }

        if response.status != ServiceStatus::Ok {
            let message = response.message.clone().unwrap_or_else(|| "fail".to_string());
            self.fail(now, message, parse_error_tiles(&response.tiles));
            return true;
        }
        let Some(session_id) = response.session_id.clone() else {
            self.fail(now, "missing session id".to_string(), Vec::new());
            return true;
        };

        let latest = route_from(response.route, response.length, response.find_route_id.clone());
        self.phase = Phase::Polling {
            session: RouteSession {
                session_id: session_id.clone(),
                route_request_id: response.find_route_id,
                generation,
            },
            latest,
            progress: None,
        };
        self.events.emit(now, RouteEvent::Started { session_id });
        self.schedule_poll(now, generation);
        true
    }

    /// Applies a route-status answer. Returns `false` if it was stale or unexpected.
    pub fn on_status_response(
        &mut self,
        generation: Generation,
        response: Result<RouteStatusResponse, ServiceError>,
        now: Millis,
    ) -> bool {
        if !self.is_current(generation) || !matches!(self.phase, Phase::Polling { .. }) {
            return false;
        }

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                self.fail(now, e.to_string(), Vec::new());
                return true;
            }
        };
        if response.status != ServiceStatus::Ok {
            let code = response
                .error_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            self.fail(now, format!("fail:{code}"), response.error_tiles());
            return true;
        }

        let Phase::Polling {
            session,
            latest,
            progress,
        } = &mut self.phase
        else {
            return false;
        };
        *progress = response.progress;
        if let Some(id) = &response.find_route_id {
            session.route_request_id = Some(id.clone());
        }
        if let Some(update) = route_from(response.route, response.length, response.find_route_id) {
            self.events.emit(
                now,
                RouteEvent::RouteUpdated {
                    length_km: update.length_km,
                },
            );
            *latest = Some(update);
        }

        if response.state == Some(SearchState::Complete) {
            let Some(result) = latest.take() else {
                self.fail(now, "complete without route".to_string(), Vec::new());
                return true;
            };
            info!("route complete: {:.2} km", result.length_km);
            self.events.emit(
                now,
                RouteEvent::Complete {
                    length_km: result.length_km,
                },
            );
            self.phase = Phase::Complete(result);
            return true;
        }

        let progress = *progress;
        self.events.emit(now, RouteEvent::Searching { progress });
        self.schedule_poll(now, generation);
        true
    }

    /// Fires due timers and answers them synchronously through `service`.
    ///
    /// Returns the number of service calls made.
    pub fn pump<S: RoutingService + ?Sized>(
        &mut self,
        now: Millis,
        params: &RouteParams,
        service: &mut S,
    ) -> usize {
        let calls = self.fire_due(now, params);
        let n = calls.len();
        for call in calls {
            match call {
                ServiceCall::StartRoute {
                    generation,
                    request,
                } => {
                    let response = service.start_route(&request);
                    self.on_start_response(generation, response, now);
                }
                ServiceCall::RouteStatus {
                    generation,
                    request,
                } => {
                    let response = service.route_status(&request);
                    self.on_status_response(generation, response, now);
                }
            }
        }
        n
    }

    fn is_current(&self, generation: Generation) -> bool {
        if generation != self.generation {
            debug!(
                "dropping stale response (generation {} != {})",
                generation.0, self.generation.0
            );
            return false;
        }
        true
    }

    fn schedule_poll(&mut self, now: Millis, generation: Generation) {
        let deadline = now.after(self.config.poll_interval_ms);
        self.pending_timer = Some(self.timers.schedule(deadline, Timer::Poll(generation)));
    }

    fn fail(&mut self, now: Millis, message: String, tiles: Vec<TileId>) {
        warn!("route failed: {message} ({} tiles)", tiles.len());
        let failure = RouteFailure { message, tiles };
        // Any intermediate geometry goes away with the Polling phase.
        self.phase = Phase::Failed(failure.clone());
        self.events.emit(now, RouteEvent::Failed(failure));
    }
}

fn route_from(
    route: Option<Vec<LatLng>>,
    length: Option<f64>,
    route_request_id: Option<String>,
) -> Option<RouteResult> {
    let route = route?;
    let length_km = length.unwrap_or_else(|| foundation::math::path_length_km(&route));
    Some(RouteResult {
        route,
        length_km,
        route_request_id,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct FakeService {
        starts: Vec<StartRouteRequest>,
        polls: Vec<RouteStatusRequest>,
        start_answers: VecDeque<Result<StartRouteResponse, ServiceError>>,
        status_answers: VecDeque<Result<RouteStatusResponse, ServiceError>>,
    }

    impl RoutingService for FakeService {
        fn start_route(
            &mut self,
            req: &StartRouteRequest,
        ) -> Result<StartRouteResponse, ServiceError> {
            self.starts.push(req.clone());
            self.start_answers
                .pop_front()
                .unwrap_or_else(|| Ok(StartRouteResponse::ok("s1")))
        }

        fn route_status(
            &mut self,
            req: &RouteStatusRequest,
        ) -> Result<RouteStatusResponse, ServiceError> {
            self.polls.push(req.clone());
            self.status_answers
                .pop_front()
                .unwrap_or_else(|| Ok(RouteStatusResponse::searching()))
        }
    }

    fn params() -> RouteParams {
        RouteParams {
            start: Some(LatLng::new(0.0, 0.0)),
            end: Some(LatLng::new(0.0, 0.02)),
            ..RouteParams::default()
        }
    }

    fn line() -> Vec<LatLng> {
        vec![LatLng::new(0.0, 0.0), LatLng::new(0.0, 0.01), LatLng::new(0.0, 0.02)]
    }

    #[test]
    fn rapid_requests_collapse_into_one_call() {
        let mut c = RequestCoordinator::default();
        let mut svc = FakeService::default();
        let p = params();

        c.request_route(&p, Millis(0)).unwrap();
        c.request_route(&p, Millis(500)).unwrap();
        c.request_route(&p, Millis(1000)).unwrap();

        assert_eq!(c.pump(Millis(2999), &p, &mut svc), 0);
        assert_eq!(c.pump(Millis(3000), &p, &mut svc), 1);
        assert_eq!(c.pump(Millis(3001), &p, &mut svc), 0);
        assert_eq!(svc.starts.len(), 1);
        assert_eq!(c.state(), CoordinatorState::Polling);
    }

    #[test]
    fn missing_inputs_block_without_calls() {
        let mut c = RequestCoordinator::default();
        let mut svc = FakeService::default();

        let no_start = RouteParams::default();
        assert_eq!(
            c.request_route(&no_start, Millis(0)),
            Err(NotEnoughData::MissingStart)
        );

        let no_destination = RouteParams {
            start: Some(LatLng::new(1.0, 1.0)),
            ..RouteParams::default()
        };
        assert_eq!(
            c.request_route(&no_destination, Millis(0)),
            Err(NotEnoughData::MissingDestination)
        );

        assert_eq!(c.state(), CoordinatorState::Idle);
        assert_eq!(c.next_deadline(), None);
        assert_eq!(c.pump(Millis(10_000), &no_destination, &mut svc), 0);
        assert!(svc.starts.is_empty());
    }

    #[test]
    fn selected_tiles_stand_in_for_the_end_point() {
        let p = RouteParams {
            start: Some(LatLng::new(1.0, 1.0)),
            tiles: vec![TileId::new(3, 4)],
            ..RouteParams::default()
        };
        let req = p.to_request(None).unwrap();
        assert_eq!(req.end, LatLng::new(1.0, 1.0));
        assert_eq!(req.tiles, vec![TileId::new(3, 4)]);
    }

    #[test]
    fn polls_until_complete() {
        let mut c = RequestCoordinator::default();
        let mut svc = FakeService::default();
        svc.status_answers.push_back(Ok(RouteStatusResponse::searching()
            .with_route("A", line()[..2].to_vec(), 1.11)));
        svc.status_answers
            .push_back(Ok(RouteStatusResponse::complete().with_route("B", line(), 2.22)));
        let p = params();

        c.request_route(&p, Millis(0)).unwrap();
        c.pump(Millis(2000), &p, &mut svc);
        assert_eq!(c.session().unwrap().session_id, "s1");
        assert_eq!(c.next_deadline(), Some(Millis(3000)));

        c.pump(Millis(3000), &p, &mut svc);
        assert_eq!(c.state(), CoordinatorState::Polling);
        assert_eq!(c.current_route().unwrap().length_km, 1.11);
        assert_eq!(c.session().unwrap().route_request_id.as_deref(), Some("A"));

        c.pump(Millis(4000), &p, &mut svc);
        assert_eq!(c.state(), CoordinatorState::Complete);
        assert_eq!(c.completed().unwrap().route, line());
        assert_eq!(c.next_deadline(), None);

        // Second poll carried the fingerprint of the first route.
        assert_eq!(svc.polls.len(), 2);
        assert_eq!(svc.polls[0].find_route_id, None);
        assert_eq!(svc.polls[1].find_route_id.as_deref(), Some("A"));
    }

    #[test]
    fn complete_without_resent_route_keeps_the_last_geometry() {
        let mut c = RequestCoordinator::default();
        let mut svc = FakeService::default();
        svc.status_answers
            .push_back(Ok(RouteStatusResponse::searching().with_route("A", line(), 2.22)));
        svc.status_answers.push_back(Ok(RouteStatusResponse::complete()));
        let p = params();

        c.request_route(&p, Millis(0)).unwrap();
        c.pump(Millis(2000), &p, &mut svc);
        c.pump(Millis(3000), &p, &mut svc);
        c.pump(Millis(4000), &p, &mut svc);
        assert_eq!(c.completed().unwrap().length_km, 2.22);
    }

    #[test]
    fn stale_start_answer_is_ignored() {
        let mut c = RequestCoordinator::default();
        let p = params();

        c.request_route(&p, Millis(0)).unwrap();
        let calls = c.fire_due(Millis(2000), &p);
        assert_eq!(calls.len(), 1);
        let old = calls[0].generation();

        // User changes something while the call is in flight.
        c.request_route(&p, Millis(2100)).unwrap();
        assert!(!c.on_start_response(old, Ok(StartRouteResponse::ok("s-old")), Millis(2200)));
        assert_eq!(c.state(), CoordinatorState::Debouncing);
        assert!(c.session().is_none());
    }

    #[test]
    fn late_status_from_old_generation_does_not_touch_the_route() {
        let mut c = RequestCoordinator::default();
        let p = params();

        c.request_route(&p, Millis(0)).unwrap();
        let start = c.fire_due(Millis(2000), &p).remove(0);
        c.on_start_response(start.generation(), Ok(StartRouteResponse::ok("s1")), Millis(2000));
        let poll = c.fire_due(Millis(3000), &p).remove(0);
        let old = poll.generation();

        c.request_route(&p, Millis(3100)).unwrap();
        let start = c.fire_due(Millis(5100), &p).remove(0);
        c.on_start_response(start.generation(), Ok(StartRouteResponse::ok("s1")), Millis(5100));
        let poll = c.fire_due(Millis(6100), &p).remove(0);
        c.on_status_response(
            poll.generation(),
            Ok(RouteStatusResponse::searching().with_route("new", line(), 2.22)),
            Millis(6200),
        );

        let stale = RouteStatusResponse::complete().with_route("old", line()[..2].to_vec(), 1.11);
        assert!(!c.on_status_response(old, Ok(stale), Millis(6300)));
        assert_eq!(c.state(), CoordinatorState::Polling);
        assert_eq!(c.current_route().unwrap().route_request_id.as_deref(), Some("new"));
    }

    #[test]
    fn superseded_poll_timer_never_fires() {
        let mut c = RequestCoordinator::default();
        let mut svc = FakeService::default();
        let p = params();

        c.request_route(&p, Millis(0)).unwrap();
        c.pump(Millis(2000), &p, &mut svc);
        c.request_route(&p, Millis(2500)).unwrap();
        // The 3000ms poll belonged to the old generation.
        assert_eq!(c.pump(Millis(3000), &p, &mut svc), 0);
        assert!(svc.polls.is_empty());
    }

    #[test]
    fn start_failure_reports_tiles() {
        let mut c = RequestCoordinator::default();
        let mut svc = FakeService::default();
        svc.start_answers.push_back(Ok(StartRouteResponse::fail(
            "unreachable tile",
            &[TileId::new(10, 20)],
        )));
        let p = params();

        c.request_route(&p, Millis(0)).unwrap();
        c.pump(Millis(2000), &p, &mut svc);
        assert_eq!(c.state(), CoordinatorState::Failed);
        let failure = c.failure().unwrap();
        assert_eq!(failure.message, "unreachable tile");
        assert_eq!(failure.tiles, vec![TileId::new(10, 20)]);
        assert_eq!(c.next_deadline(), None);
    }

    #[test]
    fn status_failure_discards_partial_route() {
        let mut c = RequestCoordinator::default();
        let mut svc = FakeService::default();
        svc.status_answers
            .push_back(Ok(RouteStatusResponse::searching().with_route("A", line(), 2.22)));
        svc.status_answers
            .push_back(Ok(RouteStatusResponse::fail(4, &[TileId::new(1, 1)])));
        let p = params();

        c.request_route(&p, Millis(0)).unwrap();
        c.pump(Millis(2000), &p, &mut svc);
        c.pump(Millis(3000), &p, &mut svc);
        assert!(c.current_route().is_some());
        c.pump(Millis(4000), &p, &mut svc);

        assert_eq!(c.state(), CoordinatorState::Failed);
        assert!(c.current_route().is_none());
        assert_eq!(c.failure().unwrap().message, "fail:4");
        assert_eq!(c.failure().unwrap().tiles, vec![TileId::new(1, 1)]);
    }

    #[test]
    fn transport_errors_fail_the_request() {
        let mut c = RequestCoordinator::default();
        let mut svc = FakeService::default();
        svc.start_answers
            .push_back(Err(ServiceError::Transport("connection refused".to_string())));
        let p = params();

        c.request_route(&p, Millis(0)).unwrap();
        c.pump(Millis(2000), &p, &mut svc);
        assert_eq!(c.state(), CoordinatorState::Failed);
        assert!(c.failure().unwrap().message.contains("connection refused"));
    }

    #[test]
    fn backend_session_is_reused() {
        let mut c = RequestCoordinator::default();
        let mut svc = FakeService::default();
        let p = params();

        c.request_route(&p, Millis(0)).unwrap();
        c.pump(Millis(2000), &p, &mut svc);
        c.request_route(&p, Millis(2100)).unwrap();
        c.pump(Millis(4100), &p, &mut svc);
        assert_eq!(svc.starts[0].session_id, None);
        assert_eq!(svc.starts[1].session_id.as_deref(), Some("s1"));
    }

    #[test]
    fn take_completed_returns_to_idle() {
        let mut c = RequestCoordinator::default();
        let mut svc = FakeService::default();
        svc.status_answers
            .push_back(Ok(RouteStatusResponse::complete().with_route("A", line(), 2.22)));
        let p = params();

        assert!(c.take_completed().is_none());
        c.request_route(&p, Millis(0)).unwrap();
        c.pump(Millis(2000), &p, &mut svc);
        c.pump(Millis(3000), &p, &mut svc);
        let result = c.take_completed().unwrap();
        assert_eq!(result.route, line());
        assert_eq!(c.state(), CoordinatorState::Idle);
        assert!(c.take_completed().is_none());
    }

    #[test]
    fn cancel_drops_pending_work() {
        let mut c = RequestCoordinator::default();
        let mut svc = FakeService::default();
        let p = params();

        c.request_route(&p, Millis(0)).unwrap();
        let before = c.generation();
        c.cancel();
        assert!(c.generation() > before);
        assert_eq!(c.state(), CoordinatorState::Idle);
        assert_eq!(c.next_deadline(), None);
        assert_eq!(c.pump(Millis(5000), &p, &mut svc), 0);
    }

    #[test]
    fn events_follow_the_state_machine() {
        let mut c = RequestCoordinator::default();
        let mut svc = FakeService::default();
        svc.status_answers
            .push_back(Ok(RouteStatusResponse::complete().with_route("A", line(), 2.22)));
        let p = params();

        c.request_route(&p, Millis(0)).unwrap();
        c.pump(Millis(2000), &p, &mut svc);
        c.pump(Millis(3000), &p, &mut svc);
        let events: Vec<RouteEvent> = c.drain_events().into_iter().map(|e| e.payload).collect();
        assert_eq!(
            events,
            vec![
                RouteEvent::Waiting,
                RouteEvent::AskRoute,
                RouteEvent::Started {
                    session_id: "s1".to_string()
                },
                RouteEvent::RouteUpdated { length_km: 2.22 },
                RouteEvent::Complete { length_km: 2.22 },
            ]
        );
    }
}
