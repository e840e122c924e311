mod handlers;
mod ui;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    middleware,
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::coordinator::ExchangeCoordinator;

pub use handlers::NOT_AVAILABLE_BODY;
pub use ui::PageConfig;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<ExchangeCoordinator>,
    pub page: Arc<PageConfig>,
}

pub struct TandemServer {
    state: AppState,
    addr: String,
    max_body_bytes: usize,
}

impl TandemServer {
    pub fn new(coordinator: Arc<ExchangeCoordinator>, addr: String) -> Self {
        let defaults = Config::default();
        Self {
            state: AppState {
                coordinator,
                page: Arc::new(PageConfig {
                    meeting_path: defaults.server.meeting_path,
                    poll_interval_ms: defaults.webrtc.poll_interval_ms,
                    stun_servers: defaults.webrtc.stun_servers,
                }),
            },
            addr,
            max_body_bytes: defaults.server.max_body_bytes,
        }
    }

    /// Build a server from a loaded config
    pub fn from_config(coordinator: Arc<ExchangeCoordinator>, config: &Config) -> Self {
        Self::new(coordinator, config.server.bind_address.clone())
            .with_meeting_path(config.server.meeting_path.clone())
            .with_max_body_bytes(config.server.max_body_bytes)
            .with_page_settings(config.webrtc.poll_interval_ms, config.webrtc.stun_servers.clone())
    }

    pub fn with_meeting_path(mut self, path: String) -> Self {
        Arc::make_mut(&mut self.state.page).meeting_path = path;
        self
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn with_page_settings(mut self, poll_interval_ms: u64, stun_servers: Vec<String>) -> Self {
        let page = Arc::make_mut(&mut self.state.page);
        page.poll_interval_ms = poll_interval_ms;
        page.stun_servers = stun_servers;
        self
    }

    pub fn router(&self) -> Router {
        let meeting_path = self.state.page.meeting_path.clone();

        Router::new()
            .route("/", get(handlers::serve_root))
            .route(&meeting_path, get(handlers::arrive).post(handlers::publish))
            .route(&format!("{}/:role", meeting_path), get(handlers::fetch_other))
            .route("/api/reset", post(handlers::reset_pairing))
            .route("/api/status", get(handlers::pairing_status))
            .fallback(handlers::not_found)
            .layer(DefaultBodyLimit::max(self.max_body_bytes))
            .layer(middleware::map_response(no_store))
            .with_state(self.state.clone())
    }

    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(&self.addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.addr))?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!(
            "Serving on http://{}{}",
            local_addr, self.state.page.meeting_path
        );
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

// Polling clients must never be handed a cached "no offer yet"
async fn no_store(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Phase, SessionStore};
    use serde_json::{json, Value};
    use std::net::SocketAddr;

    async fn spawn_server(server: TandemServer) -> Result<SocketAddr> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = server.serve(listener).await;
        });
        Ok(addr)
    }

    fn coordinator() -> Arc<ExchangeCoordinator> {
        Arc::new(ExchangeCoordinator::new(Arc::new(SessionStore::new())))
    }

    #[tokio::test]
    async fn test_arrival_serves_pages_then_full() -> Result<()> {
        let addr = spawn_server(TandemServer::new(coordinator(), String::new())).await?;
        let client = reqwest::Client::new();

        let response = client.get(format!("http://{}/meet", addr)).send().await?;
        assert_eq!(response.status(), 200);
        assert!(response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()?
            .starts_with("text/html"));
        assert!(response.text().await?.contains(r#""role":1"#));

        let response = client.get(format!("http://{}/meet", addr)).send().await?;
        assert_eq!(response.status(), 200);
        assert!(response.text().await?.contains(r#""role":2"#));

        let response = client.get(format!("http://{}/meet", addr)).send().await?;
        assert_eq!(response.status(), 409);
        assert!(response.text().await?.contains("Pairing full"));

        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_not_available_and_no_store() -> Result<()> {
        let addr = spawn_server(TandemServer::new(coordinator(), String::new())).await?;
        let client = reqwest::Client::new();

        let response = client.get(format!("http://{}/meet/1", addr)).send().await?;
        assert_eq!(response.status(), 404);
        assert_eq!(response.headers().get("cache-control").unwrap(), "no-store");
        assert_eq!(response.text().await?, NOT_AVAILABLE_BODY);

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_role_rejected() -> Result<()> {
        let coord = coordinator();
        let addr = spawn_server(TandemServer::new(coord.clone(), String::new())).await?;
        let client = reqwest::Client::new();

        client.get(format!("http://{}/meet", addr)).send().await?;
        let before = coord.status();

        for path in ["0", "3", "abc", "01", "+1", "%201"] {
            let response = client
                .get(format!("http://{}/meet/{}", addr, path))
                .send()
                .await?;
            assert_eq!(response.status(), 400, "GET /meet/{}", path);
        }

        let response = client
            .post(format!("http://{}/meet", addr))
            .json(&json!({"id": 3, "offer": {"sdp": "x"}}))
            .send()
            .await?;
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await?;
        assert_eq!(body["success"], false);

        assert_eq!(coord.status(), before);
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_publish_leaves_state_unchanged() -> Result<()> {
        let coord = coordinator();
        let addr = spawn_server(TandemServer::new(coord.clone(), String::new())).await?;
        let client = reqwest::Client::new();

        client.get(format!("http://{}/meet", addr)).send().await?;
        let before = coord.status();

        for body in ["not json", r#"{"id": 1}"#, r#"{"id": 1, "offer": null}"#, "[]"] {
            let response = client
                .post(format!("http://{}/meet", addr))
                .header("content-type", "application/json")
                .body(body)
                .send()
                .await?;
            assert_eq!(response.status(), 400, "body {}", body);
        }

        assert_eq!(coord.status(), before);
        Ok(())
    }

    #[tokio::test]
    async fn test_publish_for_unclaimed_role_conflicts() -> Result<()> {
        let addr = spawn_server(TandemServer::new(coordinator(), String::new())).await?;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("http://{}/meet", addr))
            .json(&json!({"id": 1, "offer": {"sdp": "x"}}))
            .send()
            .await?;
        assert_eq!(response.status(), 409);
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_page_cannot_touch_next_pairing() -> Result<()> {
        let coord = coordinator();
        let addr = spawn_server(TandemServer::new(coord.clone(), String::new())).await?;
        let client = reqwest::Client::new();
        let meet = format!("http://{}/meet", addr);

        client.get(&meet).send().await?;
        client.get(&meet).send().await?;
        for (id, sdp) in [(1, "offer"), (2, "answer")] {
            let response = client
                .post(&meet)
                .json(&json!({"id": id, "offer": {"sdp": sdp}, "pairing": 0}))
                .send()
                .await?;
            assert_eq!(response.status(), 200);
        }
        client.get(format!("{}/2?pairing=0", meet)).send().await?;
        client.get(format!("{}/1?pairing=0", meet)).send().await?;
        assert_eq!(coord.status().phase, Phase::Negotiated);

        // a new visitor becomes First of pairing 1 and publishes
        client.get(&meet).send().await?;
        let response = client
            .post(&meet)
            .json(&json!({"id": 1, "offer": {"sdp": "fresh"}, "pairing": 1}))
            .send()
            .await?;
        assert_eq!(response.status(), 200);

        let response = client
            .post(&meet)
            .json(&json!({"id": 1, "offer": {"sdp": "stale"}, "pairing": 0}))
            .send()
            .await?;
        assert_eq!(response.status(), 409);
        let response = client.get(format!("{}/2?pairing=0", meet)).send().await?;
        assert_eq!(response.status(), 409);

        let offer: Value = client
            .get(format!("{}/2?pairing=1", meet))
            .send()
            .await?
            .json()
            .await?;
        assert_eq!(offer, json!({"sdp": "fresh"}));
        Ok(())
    }

    #[tokio::test]
    async fn test_oversized_publish_rejected() -> Result<()> {
        let server = TandemServer::new(coordinator(), String::new()).with_max_body_bytes(64);
        let addr = spawn_server(server).await?;
        let client = reqwest::Client::new();

        client.get(format!("http://{}/meet", addr)).send().await?;
        let response = client
            .post(format!("http://{}/meet", addr))
            .json(&json!({"id": 1, "offer": {"sdp": "x".repeat(256)}}))
            .send()
            .await?;
        assert_eq!(response.status(), 413);
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_and_status_endpoints() -> Result<()> {
        let addr = spawn_server(TandemServer::new(coordinator(), String::new())).await?;
        let client = reqwest::Client::new();

        client.get(format!("http://{}/meet", addr)).send().await?;
        client.get(format!("http://{}/meet", addr)).send().await?;

        let status: Value = client
            .get(format!("http://{}/api/status", addr))
            .send()
            .await?
            .json()
            .await?;
        assert_eq!(status["phase"], Phase::BothClaimed.to_string());
        assert_eq!(status["pairing"], 0);

        let response = client.post(format!("http://{}/api/reset", addr)).send().await?;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await?;
        assert_eq!(body["pairing"], 1);

        let response = client.get(format!("http://{}/meet", addr)).send().await?;
        assert_eq!(response.status(), 200);
        assert!(response.text().await?.contains(r#""role":1"#));
        Ok(())
    }

    #[tokio::test]
    async fn test_custom_meeting_path_and_fallback() -> Result<()> {
        let server = TandemServer::new(coordinator(), String::new())
            .with_meeting_path("/room".to_string());
        let addr = spawn_server(server).await?;
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let response = client.get(format!("http://{}/", addr)).send().await?;
        assert_eq!(response.status(), 307);
        assert_eq!(response.headers().get("location").unwrap(), "/room");

        let response = client.get(format!("http://{}/room", addr)).send().await?;
        assert_eq!(response.status(), 200);

        let response = client.get(format!("http://{}/meet", addr)).send().await?;
        assert_eq!(response.status(), 404);
        Ok(())
    }
}
