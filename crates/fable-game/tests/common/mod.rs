//! Shared helpers for registry integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use fable_core::moral::MoralGenerator;
use fable_core::rng::SystemRng;
use fable_game::application::command_handlers::{self, SessionCommandResult};
use fable_game::application::config::{DelayRange, GameConfig};
use fable_game::application::gateway::BroadcastGateway;
use fable_game::application::registry::SessionRegistry;
use fable_game::domain::commands::{CreateSession, JoinSession, SelectCard, StartSession};
use fable_game::domain::projection::SessionView;
use fable_game::domain::session::SessionSettings;
use fable_test_support::{FixedClock, InMemoryDeck, StubMoralGenerator};
use uuid::Uuid;

/// Gateway that keeps every snapshot it was asked to deliver.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<SessionView>>,
}

impl RecordingGateway {
    /// The most recent snapshot delivered to `participant_id`.
    pub fn last_for(&self, participant_id: Uuid) -> Option<SessionView> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|view| view.viewer_id == participant_id)
            .cloned()
    }

    /// Number of snapshots delivered to `participant_id`.
    pub fn count_for(&self, participant_id: Uuid) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|view| view.viewer_id == participant_id)
            .count()
    }
}

impl BroadcastGateway for RecordingGateway {
    fn send_to(&self, _participant_id: Uuid, view: SessionView) {
        self.sent.lock().unwrap().push(view);
    }
}

/// A registry wired to test collaborators.
pub struct Harness {
    pub registry: Arc<SessionRegistry>,
    pub gateway: Arc<RecordingGateway>,
}

pub fn config(rounds_to_play: u32) -> GameConfig {
    GameConfig {
        settings: SessionSettings {
            rounds_to_play,
            ..SessionSettings::default()
        },
        selection_delay: DelayRange::new(1000, 3000),
        vote_delay: DelayRange::new(300, 1200),
        moral_timeout: Duration::from_millis(5000),
    }
}

pub fn harness_with(config: GameConfig, moral_generator: Arc<dyn MoralGenerator>) -> Harness {
    let gateway = Arc::new(RecordingGateway::default());
    let registry = Arc::new(SessionRegistry::new(
        Arc::new(InMemoryDeck::default()),
        moral_generator,
        gateway.clone(),
        Arc::new(FixedClock::standard()),
        Box::new(SystemRng::seeded(7)),
        config,
    ));
    Harness { registry, gateway }
}

pub fn harness(rounds_to_play: u32) -> Harness {
    harness_with(
        config(rounds_to_play),
        Arc::new(StubMoralGenerator::new("Every story needs an ending.")),
    )
}

impl Harness {
    /// Creates a session with a host and `guests` more humans, returning the
    /// join code and the human ids, host first.
    pub fn lobby(&self, guests: usize) -> (String, Vec<Uuid>) {
        let created = command_handlers::handle_create_session(
            &CreateSession {
                correlation_id: Uuid::new_v4(),
                name: "Ada".to_owned(),
            },
            &self.registry,
        )
        .unwrap();
        let mut humans = vec![created.participant_id];
        for n in 0..guests {
            let SessionCommandResult { participant_id, .. } = command_handlers::handle_join_session(
                &JoinSession {
                    correlation_id: Uuid::new_v4(),
                    session_id: created.session_id.to_lowercase(),
                    name: format!("Guest {n}"),
                },
                &self.registry,
            )
            .unwrap();
            humans.push(participant_id);
        }
        (created.session_id, humans)
    }

    pub fn start(&self, session_id: &str, host: Uuid) {
        command_handlers::handle_start_session(
            &StartSession {
                correlation_id: Uuid::new_v4(),
                session_id: session_id.to_owned(),
                participant_id: host,
            },
            &self.registry,
        )
        .unwrap();
    }

    pub fn view(&self, participant_id: Uuid) -> SessionView {
        self.gateway
            .last_for(participant_id)
            .expect("participant has received a snapshot")
    }

    /// Selects the first non-blank card in the participant's hand.
    pub fn select_first(&self, session_id: &str, participant_id: Uuid) {
        let view = self.view(participant_id);
        let card = view
            .me()
            .unwrap()
            .hand
            .iter()
            .find_map(|slot| match slot {
                fable_game::domain::projection::CardSlot::Card(card) if !card.is_custom => {
                    Some(card.id)
                }
                _ => None,
            })
            .unwrap();
        command_handlers::handle_select_card(
            &SelectCard {
                correlation_id: Uuid::new_v4(),
                session_id: session_id.to_owned(),
                participant_id,
                card_id: card,
                custom_text: None,
            },
            &self.registry,
        )
        .unwrap();
    }
}
