//! Playback session state.
//!
//! [`Session`] is the mutable triple (status, current track, connection
//! handle) plus the reply channel. It is only ever touched under the owning
//! controller's lock; nothing in here performs I/O.

use serde::Serialize;

use crate::types::{ConversationId, TextChannelId, Track};
use crate::voice::ConnectionHandle;

/// Status of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No connection. Initial state, and the state after `leave`.
    #[default]
    Disconnected,
    /// A connect call is in flight.
    Connecting,
    /// Connected, nothing playing.
    Idle,
    Playing,
    Paused,
}

impl SessionStatus {
    /// Whether the session holds a live connection handle.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Idle | Self::Playing | Self::Paused)
    }
}

/// Everything needed to issue a transport `play` outside the lock.
///
/// `seq` is the session's playback sequence number at the moment the track
/// was claimed; completion bookkeeping compares it to detect that the
/// session moved on while the call was in flight.
#[derive(Debug, Clone)]
pub(crate) struct PlaybackTicket {
    pub handle: ConnectionHandle,
    pub track: Track,
    pub seq: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Session {
    pub status: SessionStatus,
    pub connection: Option<ConnectionHandle>,
    /// Fixed to the requester's conversation when the session connects.
    pub reply_channel: Option<TextChannelId>,
    pub voice_channel_name: Option<String>,
    pub current_track: Option<Track>,
    /// Bumped on every playback start, stop-to-idle and teardown. Never reset.
    pub playback_seq: u64,
}

impl Session {
    /// Moves to `Playing` with `track` and returns the ticket for the
    /// transport call. Returns `None` (and changes nothing) without a handle.
    pub fn begin_playback(&mut self, track: Track) -> Option<PlaybackTicket> {
        let handle = self.connection.clone()?;
        self.playback_seq += 1;
        self.status = SessionStatus::Playing;
        self.current_track = Some(track.clone());
        Some(PlaybackTicket {
            handle,
            track,
            seq: self.playback_seq,
        })
    }

    /// Connected with nothing playing.
    pub fn go_idle(&mut self) {
        self.playback_seq += 1;
        self.status = SessionStatus::Idle;
        self.current_track = None;
    }

    /// Back to `Disconnected`, returning the released handle.
    pub fn reset(&mut self) -> Option<ConnectionHandle> {
        self.playback_seq += 1;
        self.status = SessionStatus::Disconnected;
        self.current_track = None;
        self.reply_channel = None;
        self.voice_channel_name = None;
        self.connection.take()
    }
}

/// Read-only copy of a session, for observers and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub conversation_id: ConversationId,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionHandle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_channel: Option<TextChannelId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_channel_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_track: Option<Track>,
    /// Pending tracks in queue order.
    pub queue: Vec<Track>,
}

impl SessionSnapshot {
    /// Checks the data-model invariants, returning a description of the first
    /// violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        match self.status {
            SessionStatus::Playing | SessionStatus::Paused => {
                if self.connection.is_none() {
                    return Err(format!("{:?} without a connection handle", self.status));
                }
                if self.current_track.is_none() {
                    return Err(format!("{:?} without a current track", self.status));
                }
            }
            SessionStatus::Idle => {
                if self.connection.is_none() {
                    return Err("Idle without a connection handle".to_string());
                }
                if self.current_track.is_some() {
                    return Err("Idle with a current track".to_string());
                }
                if !self.queue.is_empty() {
                    return Err(format!("Idle with {} queued track(s)", self.queue.len()));
                }
            }
            SessionStatus::Disconnected => {
                if self.connection.is_some() {
                    return Err("Disconnected but still holding a handle".to_string());
                }
                if self.current_track.is_some() {
                    return Err("Disconnected with a current track".to_string());
                }
                if !self.queue.is_empty() {
                    return Err(format!(
                        "Disconnected with {} queued track(s)",
                        self.queue.len()
                    ));
                }
            }
            SessionStatus::Connecting => {}
        }
        Ok(())
    }
}
