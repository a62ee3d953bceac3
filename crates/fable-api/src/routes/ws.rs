//! `WebSocket` transport for game sessions.
//!
//! Clients connect to `GET /ws`. Each text frame carries one
//! [`ClientMessage`]; each is answered with an ack. A connection becomes a
//! participant once it creates or joins a session, and from then on the
//! [`ConnectionHub`](crate::hub::ConnectionHub) routes that participant's
//! snapshots to it. Closing the socket counts as leaving the session.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::{Router, routing::get};
use fable_core::error::DomainError;
use fable_game::application::command_handlers::{self, SessionCommandResult};
use fable_game::application::registry::normalize_join_code;
use fable_game::domain::commands;
use fable_game::domain::projection::SessionView;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{ApiError, ErrorBody};
use crate::protocol::{AckResult, ClientMessage, ServerMessage};
use crate::state::AppState;

/// The session a connection plays in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub session_id: String,
    pub participant_id: Uuid,
}

/// Per-socket state.
#[derive(Debug, Default)]
pub struct Connection {
    pub membership: Option<Membership>,
}

impl Connection {
    fn member_of(&self, session_id: &str) -> Result<&Membership, DomainError> {
        let membership = self
            .membership
            .as_ref()
            .ok_or_else(|| DomainError::validation("create or join a session first"))?;
        if membership.session_id != normalize_join_code(session_id) {
            return Err(DomainError::validation("you are not part of that session"));
        }
        Ok(membership)
    }
}

/// GET /ws
async fn ws_session(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Returns the `WebSocket` router.
pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_session))
}

async fn handle_ws(mut socket: WebSocket, state: AppState) {
    debug!("WebSocket client connected");

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let mut connection = Connection::default();

    loop {
        tokio::select! {
            Some(outbound) = rx.recv() => {
                if send(&mut socket, &outbound).await.is_err() {
                    debug!("WebSocket client disconnected (send failed)");
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientMessage>(text.as_str()) {
                            Ok(message) => dispatch(&state, &mut connection, &tx, message),
                            Err(e) => ServerMessage::failed(
                                None,
                                ErrorBody {
                                    error: "invalid_message",
                                    message: e.to_string(),
                                },
                            ),
                        };
                        if send(&mut socket, &reply).await.is_err() {
                            debug!("WebSocket client disconnected (send failed)");
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Binary and pong frames carry nothing for us.
                    }
                }
            }
        }
    }

    disconnect(&state, &mut connection);
}

async fn send(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize server message: {e}");
            return Ok(());
        }
    };
    socket.send(Message::Text(json.into())).await
}

/// Treats a closed socket as the participant leaving.
pub fn disconnect(state: &AppState, connection: &mut Connection) {
    let Some(membership) = connection.membership.take() else {
        return;
    };
    state.hub.unregister(membership.participant_id);
    let command = commands::LeaveSession {
        correlation_id: Uuid::new_v4(),
        session_id: membership.session_id,
        participant_id: membership.participant_id,
    };
    if let Err(err) = command_handlers::handle_leave_session(&command, &state.registry) {
        debug!(error = %err, "leave on disconnect had nothing to do");
    }
}

/// Handles one inbound message and builds its acknowledgment.
///
/// Snapshots produced by the operation reach the client through `sender`.
#[instrument(skip_all, fields(operation = message.operation(), request_id = message.request_id()))]
pub fn dispatch(
    state: &AppState,
    connection: &mut Connection,
    sender: &UnboundedSender<ServerMessage>,
    message: ClientMessage,
) -> ServerMessage {
    let request_id = message.request_id().map(ToOwned::to_owned);
    match handle(state, connection, sender, message) {
        Ok(result) => ServerMessage::ok(
            request_id,
            AckResult {
                session_id: result.session_id,
                participant_id: result.participant_id,
            },
        ),
        Err(err) => {
            let err = ApiError(err);
            debug!(code = err.code(), error = %err.0, "request rejected");
            ServerMessage::failed(request_id, err.body())
        }
    }
}

fn handle(
    state: &AppState,
    connection: &mut Connection,
    sender: &UnboundedSender<ServerMessage>,
    message: ClientMessage,
) -> Result<SessionCommandResult, DomainError> {
    let correlation_id = Uuid::new_v4();
    let registry = &state.registry;

    match message {
        ClientMessage::CreateSession { name, .. } => {
            ensure_unattached(connection)?;
            let result = command_handlers::handle_create_session(
                &commands::CreateSession {
                    correlation_id,
                    name,
                },
                registry,
            )?;
            attach(state, connection, sender, &result)?;
            Ok(result)
        }
        ClientMessage::JoinSession {
            session_id, name, ..
        } => {
            ensure_unattached(connection)?;
            let result = command_handlers::handle_join_session(
                &commands::JoinSession {
                    correlation_id,
                    session_id,
                    name,
                },
                registry,
            )?;
            attach(state, connection, sender, &result)?;
            Ok(result)
        }
        ClientMessage::StartSession { session_id, .. } => {
            let participant_id = connection.member_of(&session_id)?.participant_id;
            command_handlers::handle_start_session(
                &commands::StartSession {
                    correlation_id,
                    session_id,
                    participant_id,
                },
                registry,
            )
        }
        ClientMessage::SelectCard {
            session_id,
            card_id,
            custom_text,
            ..
        } => {
            let participant_id = connection.member_of(&session_id)?.participant_id;
            command_handlers::handle_select_card(
                &commands::SelectCard {
                    correlation_id,
                    session_id,
                    participant_id,
                    card_id,
                    custom_text,
                },
                registry,
            )
        }
        ClientMessage::UpdateCustomCardText {
            session_id,
            card_id,
            text,
            ..
        } => {
            let participant_id = connection.member_of(&session_id)?.participant_id;
            command_handlers::handle_update_custom_card_text(
                &commands::UpdateCustomCardText {
                    correlation_id,
                    session_id,
                    participant_id,
                    card_id,
                    text,
                },
                registry,
            )
        }
        ClientMessage::SubmitMoral {
            session_id, text, ..
        } => {
            let participant_id = connection.member_of(&session_id)?.participant_id;
            command_handlers::handle_submit_moral(
                &commands::SubmitMoral {
                    correlation_id,
                    session_id,
                    participant_id,
                    text,
                },
                registry,
            )
        }
        ClientMessage::CastVote {
            session_id,
            votee_id,
            ..
        } => {
            let participant_id = connection.member_of(&session_id)?.participant_id;
            command_handlers::handle_cast_vote(
                &commands::CastVote {
                    correlation_id,
                    session_id,
                    participant_id,
                    votee_id,
                },
                registry,
            )
        }
        ClientMessage::NextRound { session_id, .. } => {
            let participant_id = connection.member_of(&session_id)?.participant_id;
            command_handlers::handle_next_round(
                &commands::NextRound {
                    correlation_id,
                    session_id,
                    participant_id,
                },
                registry,
            )
        }
        ClientMessage::LeaveSession { session_id, .. } => {
            let participant_id = connection.member_of(&session_id)?.participant_id;
            let result = command_handlers::handle_leave_session(
                &commands::LeaveSession {
                    correlation_id,
                    session_id,
                    participant_id,
                },
                registry,
            )?;
            state.hub.unregister(participant_id);
            connection.membership = None;
            Ok(result)
        }
    }
}

fn ensure_unattached(connection: &Connection) -> Result<(), DomainError> {
    if connection.membership.is_some() {
        return Err(DomainError::validation(
            "leave your current session before joining another",
        ));
    }
    Ok(())
}

/// Binds the connection to the participant and sends the first snapshot,
/// which was published before the connection was registered.
fn attach(
    state: &AppState,
    connection: &mut Connection,
    sender: &UnboundedSender<ServerMessage>,
    result: &SessionCommandResult,
) -> Result<(), DomainError> {
    state.hub.register(result.participant_id, sender.clone());
    connection.membership = Some(Membership {
        session_id: result.session_id.clone(),
        participant_id: result.participant_id,
    });
    info!(session = %result.session_id, participant = %result.participant_id, "connection attached");

    // Queued under the session lock, so a snapshot published by a concurrent
    // change cannot be overtaken by this older one.
    let participant_id = result.participant_id;
    state.registry.inspect(&result.session_id, |session| {
        session
            .participant(participant_id)
            .map(|_| {
                let view = SessionView::for_participant(session, participant_id);
                // The receiver lives as long as the socket loop.
                let _ = sender.send(ServerMessage::Snapshot { session: view });
            })
            .ok_or(DomainError::ParticipantNotFound(participant_id))
    })?
}
