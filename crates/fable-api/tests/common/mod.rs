//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use fable_core::rng::SystemRng;
use fable_game::application::config::{DelayRange, GameConfig};
use fable_game::application::registry::SessionRegistry;
use fable_game::domain::session::SessionSettings;
use fable_test_support::{FixedClock, InMemoryDeck, StubMoralGenerator};
use http_body_util::BodyExt;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tower::ServiceExt;

use fable_api::hub::ConnectionHub;
use fable_api::protocol::{ClientMessage, ServerMessage};
use fable_api::routes::ws::{self, Connection};
use fable_api::state::AppState;

/// Build application state with test collaborators. The hub is the
/// registry's gateway, as in `main.rs`.
pub fn build_test_state() -> AppState {
    let hub = Arc::new(ConnectionHub::new());
    let config = GameConfig {
        settings: SessionSettings {
            rounds_to_play: 1,
            ..SessionSettings::default()
        },
        selection_delay: DelayRange::new(1000, 3000),
        vote_delay: DelayRange::new(300, 1200),
        moral_timeout: Duration::from_millis(5000),
    };
    let registry = Arc::new(SessionRegistry::new(
        Arc::new(InMemoryDeck::default()),
        Arc::new(StubMoralGenerator::new("Look before you leap.")),
        hub.clone(),
        Arc::new(FixedClock::standard()),
        Box::new(SystemRng::seeded(11)),
        config,
    ));
    AppState::new(registry, hub)
}

/// Build the full app router. Uses the same route structure as `main.rs`.
pub fn build_test_app() -> (Router, AppState) {
    let state = build_test_state();
    (fable_api::app(state.clone()), state)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// A simulated socket: connection state plus its outbound channel.
pub struct Client {
    pub connection: Connection,
    pub sender: UnboundedSender<ServerMessage>,
    pub outbox: UnboundedReceiver<ServerMessage>,
}

impl Client {
    pub fn new() -> Self {
        let (sender, outbox) = mpsc::unbounded_channel();
        Self {
            connection: Connection::default(),
            sender,
            outbox,
        }
    }

    /// Parses `raw` as a client frame and dispatches it, returning the ack
    /// as JSON.
    pub fn send(&mut self, state: &AppState, raw: serde_json::Value) -> serde_json::Value {
        let message: ClientMessage = serde_json::from_value(raw).unwrap();
        let ack = ws::dispatch(state, &mut self.connection, &self.sender, message);
        serde_json::to_value(&ack).unwrap()
    }

    /// Drains pushed messages, returning the snapshots as JSON.
    pub fn snapshots(&mut self) -> Vec<serde_json::Value> {
        let mut snapshots = Vec::new();
        while let Ok(message) = self.outbox.try_recv() {
            let json = serde_json::to_value(&message).unwrap();
            if json["type"] == "snapshot" {
                snapshots.push(json["session"].clone());
            }
        }
        snapshots
    }

    pub fn session_id(&self) -> String {
        self.connection
            .membership
            .as_ref()
            .map(|m| m.session_id.clone())
            .unwrap()
    }
}
