//! Connection hub: routes snapshots to the socket of each participant.

use std::collections::HashMap;
use std::sync::RwLock;

use fable_game::application::gateway::BroadcastGateway;
use fable_game::domain::projection::SessionView;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use uuid::Uuid;

use crate::protocol::ServerMessage;

/// Outbound channels of connected participants.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    connections: RwLock<HashMap<Uuid, UnboundedSender<ServerMessage>>>,
}

impl ConnectionHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes future snapshots for `participant_id` to `sender`.
    pub fn register(&self, participant_id: Uuid, sender: UnboundedSender<ServerMessage>) {
        if let Ok(mut connections) = self.connections.write() {
            connections.insert(participant_id, sender);
        }
    }

    pub fn unregister(&self, participant_id: Uuid) {
        if let Ok(mut connections) = self.connections.write() {
            connections.remove(&participant_id);
        }
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.read().map_or(0, |c| c.len())
    }
}

impl BroadcastGateway for ConnectionHub {
    fn send_to(&self, participant_id: Uuid, view: SessionView) {
        let Ok(connections) = self.connections.read() else {
            return;
        };
        if let Some(sender) = connections.get(&participant_id) {
            if sender.send(ServerMessage::Snapshot { session: view }).is_err() {
                debug!(participant = %participant_id, "snapshot dropped, connection closed");
            }
        }
    }
}
