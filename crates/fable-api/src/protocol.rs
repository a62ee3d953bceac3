//! WebSocket message protocol.
//!
//! Clients send one JSON object per text frame, tagged by `type`. Every
//! request is answered with an `ack` echoing its `requestId`. Snapshots are
//! pushed separately whenever the session changes.

use fable_game::domain::card::CardId;
use fable_game::domain::projection::SessionView;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorBody;

/// Inbound operations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    CreateSession {
        request_id: Option<String>,
        name: String,
    },
    JoinSession {
        request_id: Option<String>,
        session_id: String,
        name: String,
    },
    StartSession {
        request_id: Option<String>,
        session_id: String,
    },
    SelectCard {
        request_id: Option<String>,
        session_id: String,
        card_id: CardId,
        custom_text: Option<String>,
    },
    UpdateCustomCardText {
        request_id: Option<String>,
        session_id: String,
        card_id: CardId,
        text: String,
    },
    SubmitMoral {
        request_id: Option<String>,
        session_id: String,
        text: String,
    },
    CastVote {
        request_id: Option<String>,
        session_id: String,
        votee_id: Uuid,
    },
    NextRound {
        request_id: Option<String>,
        session_id: String,
    },
    LeaveSession {
        request_id: Option<String>,
        session_id: String,
    },
}

impl ClientMessage {
    /// The operation name as it appears in the `type` tag.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::CreateSession { .. } => "createSession",
            Self::JoinSession { .. } => "joinSession",
            Self::StartSession { .. } => "startSession",
            Self::SelectCard { .. } => "selectCard",
            Self::UpdateCustomCardText { .. } => "updateCustomCardText",
            Self::SubmitMoral { .. } => "submitMoral",
            Self::CastVote { .. } => "castVote",
            Self::NextRound { .. } => "nextRound",
            Self::LeaveSession { .. } => "leaveSession",
        }
    }

    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::CreateSession { request_id, .. }
            | Self::JoinSession { request_id, .. }
            | Self::StartSession { request_id, .. }
            | Self::SelectCard { request_id, .. }
            | Self::UpdateCustomCardText { request_id, .. }
            | Self::SubmitMoral { request_id, .. }
            | Self::CastVote { request_id, .. }
            | Self::NextRound { request_id, .. }
            | Self::LeaveSession { request_id, .. } => request_id.as_deref(),
        }
    }
}

/// Payload of a successful acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AckResult {
    pub session_id: String,
    pub participant_id: Uuid,
}

/// Outbound messages.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Ack {
        request_id: Option<String>,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<AckResult>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<ErrorBody>,
    },
    Snapshot {
        session: SessionView,
    },
}

impl ServerMessage {
    #[must_use]
    pub fn ok(request_id: Option<String>, result: AckResult) -> Self {
        Self::Ack {
            request_id,
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    #[must_use]
    pub fn failed(request_id: Option<String>, error: ErrorBody) -> Self {
        Self::Ack {
            request_id,
            ok: false,
            result: None,
            error: Some(error),
        }
    }
}
