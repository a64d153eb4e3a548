//! User-facing status messages.
//!
//! A [`Notice`] is what the core hands to a
//! [`NotificationSink`](crate::voice::NotificationSink). Sinks may render it as
//! rich content using [`Notice::title`] and the structured fields, or just use
//! the `Display` text.

use std::fmt;

use serde::Serialize;

use crate::error::{ChorusError, ErrorCode};
use crate::types::Track;

/// A single reply or announcement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notice {
    /// Playback of a track started (sent to the session's reply channel).
    NowPlaying { track: Track },
    /// The track went to the back of the queue.
    AddedToQueue { track: Track },
    /// `join` connected to a voice channel.
    #[serde(rename_all = "camelCase")]
    Connected { channel_name: String },
    /// `join` while already connected.
    #[serde(rename_all = "camelCase")]
    AlreadyConnected { channel_name: String },
    Skipped,
    Paused,
    Resumed,
    /// `leave` tore the session down, or the connection was closed.
    Disconnected,
    /// `leave` while not connected.
    NotConnected,
    /// A command failed.
    Error { code: &'static str, message: String },
}

impl Notice {
    /// Short heading for rich renderers.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::NowPlaying { .. } => "Now playing",
            Self::AddedToQueue { .. } => "Queued",
            Self::Connected { .. } | Self::AlreadyConnected { .. } => "Connected",
            Self::Skipped => "Track Skipped!",
            Self::Paused => "Track Paused.",
            Self::Resumed => "Resumed",
            Self::Disconnected => "Disconnected",
            Self::NotConnected => "Not connected",
            Self::Error { .. } => "Error",
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl From<&ChorusError> for Notice {
    fn from(err: &ChorusError) -> Self {
        Self::Error {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NowPlaying { track } => write!(
                f,
                "Now Playing: {} \nAuthor: {} \nURL: {}",
                track.title, track.author, track.uri
            ),
            Self::AddedToQueue { track } => write!(f, "Added to queue: {}", track.title),
            Self::Connected { channel_name } => write!(f, "Connected to `{channel_name}`!"),
            Self::AlreadyConnected { channel_name } => {
                write!(f, "Already connected to `{channel_name}`.")
            }
            Self::Skipped => f.write_str("Skipped to the next track."),
            Self::Paused => f.write_str("Track paused."),
            Self::Resumed => f.write_str("Resumed."),
            Self::Disconnected => {
                f.write_str("The bot has disconnected from the voice channel.")
            }
            Self::NotConnected => f.write_str("I am not connected to a voice channel."),
            Self::Error { message, .. } => f.write_str(message),
        }
    }
}
