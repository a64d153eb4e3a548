//! Event system for session observers.
//!
//! This module provides:
//! - [`EventEmitter`] trait for services to emit events
//! - [`BroadcastEventBridge`] for fan-out over a Tokio broadcast channel
//! - [`SessionEvent`], the lifecycle events of a playback session

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use serde::Serialize;

use crate::types::{ConversationId, Track, VoiceChannelId};
use crate::voice::FinishReason;

/// Lifecycle events of a playback session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// The session joined a voice channel.
    Connected {
        #[serde(rename = "conversationId")]
        conversation_id: ConversationId,
        #[serde(rename = "voiceChannel")]
        voice_channel: VoiceChannelId,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A track was appended behind the current one.
    TrackQueued {
        #[serde(rename = "conversationId")]
        conversation_id: ConversationId,
        track: Track,
        /// Queue length after the append.
        #[serde(rename = "queueLength")]
        queue_length: usize,
        timestamp: u64,
    },
    /// The transport accepted a play command.
    PlaybackStarted {
        #[serde(rename = "conversationId")]
        conversation_id: ConversationId,
        track: Track,
        timestamp: u64,
    },
    /// The transport reported the end of the current track.
    PlaybackFinished {
        #[serde(rename = "conversationId")]
        conversation_id: ConversationId,
        track: Track,
        reason: FinishReason,
        timestamp: u64,
    },
    /// Nothing left to play; the session is idle.
    QueueDrained {
        #[serde(rename = "conversationId")]
        conversation_id: ConversationId,
        timestamp: u64,
    },
    /// The session left its voice channel.
    Closed {
        #[serde(rename = "conversationId")]
        conversation_id: ConversationId,
        /// Queued tracks dropped by the teardown.
        #[serde(rename = "droppedTracks")]
        dropped_tracks: usize,
        timestamp: u64,
    },
}

impl SessionEvent {
    /// Conversation the event belongs to.
    #[must_use]
    pub fn conversation_id(&self) -> ConversationId {
        match self {
            Self::Connected {
                conversation_id, ..
            }
            | Self::TrackQueued {
                conversation_id, ..
            }
            | Self::PlaybackStarted {
                conversation_id, ..
            }
            | Self::PlaybackFinished {
                conversation_id, ..
            }
            | Self::QueueDrained {
                conversation_id, ..
            }
            | Self::Closed {
                conversation_id, ..
            } => *conversation_id,
        }
    }
}
