use reqwest::Client;
use routing::{
    RouteStatusRequest, RouteStatusResponse, ServiceError, StartRouteRequest, StartRouteResponse,
};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Routing backend reached over HTTP GET with query-string parameters.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn start_route(
        &self,
        req: &StartRouteRequest,
    ) -> Result<StartRouteResponse, ServiceError> {
        self.get("start_route", &req.query_pairs()).await
    }

    pub async fn route_status(
        &self,
        req: &RouteStatusRequest,
    ) -> Result<RouteStatusResponse, ServiceError> {
        self.get("route_status", &req.query_pairs()).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, ServiceError> {
        let url = format!("{}/{endpoint}", self.base_url);
        debug!("GET {url} ({} params)", query.len());
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ServiceError::Transport(format!(
                "{url} answered {}",
                resp.status()
            )));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| ServiceError::Decode(e.to_string()))
    }
}
