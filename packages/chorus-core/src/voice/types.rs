//! Value types exchanged with the voice transport and the track resolver.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{ConversationId, Track, VoiceChannelId};

/// Opaque reference to a live voice connection owned by the transport.
///
/// Handles compare by value. A finished-notification carries the handle it
/// belongs to, which lets a session ignore events from a connection it has
/// already released.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionHandle {
    pub conversation_id: ConversationId,
    pub voice_channel: VoiceChannelId,
    /// Transport-assigned identifier, unique per connect.
    pub session_id: String,
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}#{}",
            self.conversation_id, self.voice_channel, self.session_id
        )
    }
}

/// Why the transport reported the end of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The track played to its end.
    Finished,
    /// Playback was stopped (skip or leave).
    Stopped,
    /// The transport could not load or stream the track.
    LoadFailed,
    /// The transport tore the player down on its own.
    Cleanup,
}

/// Payload of a finished-notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackFinished {
    pub handle: ConnectionHandle,
    pub track: Track,
    pub reason: FinishReason,
}

/// Events the transport raises on its own execution context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TransportEvent {
    /// A track ended or was stopped.
    TrackFinished(PlaybackFinished),
    /// The voice connection was closed by the platform or the node.
    ConnectionClosed {
        handle: ConnectionHandle,
        reason: String,
    },
}

impl TransportEvent {
    /// Conversation the event belongs to.
    #[must_use]
    pub fn conversation_id(&self) -> ConversationId {
        match self {
            Self::TrackFinished(finished) => finished.handle.conversation_id,
            Self::ConnectionClosed { handle, .. } => handle.conversation_id,
        }
    }
}

/// Result of resolving a free-text query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "data", rename_all = "snake_case")]
pub enum SearchOutcome {
    Found(Track),
    NoMatches,
    LoadFailed(String),
}
