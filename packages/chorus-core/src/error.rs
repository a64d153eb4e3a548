//! Centralized error types for the Chorus core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Gives every error a machine-readable code
//! - Keeps `Display` output user-facing, since errors end up as chat replies

use serde::Serialize;
use thiserror::Error;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for logs and notices.
    fn code(&self) -> &'static str;
}

// ─────────────────────────────────────────────────────────────────────────────
// Collaborator Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Failures reported by a [`VoiceTransport`](crate::voice::VoiceTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// No transport node is connected.
    #[error("no voice node is available")]
    NoNodeAvailable,

    /// Joining the voice channel failed.
    #[error("failed to connect: {0}")]
    ConnectFailed(String),

    /// The handle no longer refers to a live connection.
    #[error("connection is gone: {0}")]
    ConnectionGone(String),

    /// A playback command (play/stop/pause/resume/disconnect) failed.
    #[error("{action} failed: {message}")]
    Command {
        action: &'static str,
        message: String,
    },
}

impl TransportError {
    /// Convenience constructor for [`TransportError::Command`].
    pub fn command(action: &'static str, message: impl Into<String>) -> Self {
        Self::Command {
            action,
            message: message.into(),
        }
    }
}

impl ErrorCode for TransportError {
    fn code(&self) -> &'static str {
        match self {
            Self::NoNodeAvailable => "no_voice_node",
            Self::ConnectFailed(_) => "voice_connect_failed",
            Self::ConnectionGone(_) => "voice_connection_gone",
            Self::Command { .. } => "voice_command_failed",
        }
    }
}

/// Failures reported by a [`TrackResolver`](crate::voice::TrackResolver) when
/// the search itself could not be carried out.
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("search backend unavailable: {0}")]
    Unavailable(String),

    #[error("search request failed: {0}")]
    Request(String),
}

/// Failures reported by a [`NotificationSink`](crate::voice::NotificationSink).
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to deliver message to channel {channel}: {reason}")]
    Delivery { channel: u64, reason: String },
}

pub type TransportResult<T> = Result<T, TransportError>;
pub type ResolverResult<T> = Result<T, ResolverError>;
pub type NotifyResult<T> = Result<T, NotifyError>;

// ─────────────────────────────────────────────────────────────────────────────
// Command Errors
// ─────────────────────────────────────────────────────────────────────────────

/// The caller or environment is not fit for the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Please join a voice channel first.")]
    NotInVoiceChannel,

    #[error("Connection to the voice node is not established.")]
    NoTransportNode,

    #[error("Please enter a valid voice channel.")]
    NotAVoiceChannel,

    #[error("Please provide a search query.")]
    EmptyQuery,
}

/// The command does not fit the session's current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateError {
    /// `skip` without a playing track.
    #[error("No track is currently playing.")]
    NothingPlaying,

    /// `pause`/`resume` without a current track.
    #[error("No tracks are playing.")]
    NoCurrentTrack,

    /// The session was torn down while the request was in flight.
    #[error("I am not connected to a voice channel.")]
    NotConnected,
}

/// Why a query did not produce a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum ResolutionFailure {
    NoMatches,
    LoadFailed(String),
}

/// Application-wide error type for session commands.
///
/// Every variant is caught at the command boundary and turned into exactly
/// one user-facing notice; none of them ever terminates the process.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum ChorusError {
    /// Caller not in a voice channel, wrong channel kind, or no transport node.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The query resolved to nothing.
    #[error("Failed to find music with query: {query}")]
    Resolution {
        query: String,
        failure: ResolutionFailure,
    },

    /// Any connect/play/stop/pause/resume/disconnect failure.
    #[error("Voice transport error: {0}")]
    Transport(String),

    /// Command issued while the session is in an incompatible status.
    #[error(transparent)]
    State(#[from] StateError),

    /// Invalid configuration at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ChorusError {
    pub fn no_matches(query: &str) -> Self {
        Self::Resolution {
            query: query.to_string(),
            failure: ResolutionFailure::NoMatches,
        }
    }

    pub fn load_failed(query: &str, reason: impl Into<String>) -> Self {
        Self::Resolution {
            query: query.to_string(),
            failure: ResolutionFailure::LoadFailed(reason.into()),
        }
    }
}

impl ErrorCode for ChorusError {
    fn code(&self) -> &'static str {
        match self {
            Self::Validation(ValidationError::NotInVoiceChannel) => "not_in_voice_channel",
            Self::Validation(ValidationError::NoTransportNode) => "no_transport_node",
            Self::Validation(ValidationError::NotAVoiceChannel) => "not_a_voice_channel",
            Self::Validation(ValidationError::EmptyQuery) => "empty_query",
            Self::Resolution {
                failure: ResolutionFailure::NoMatches,
                ..
            } => "no_matches",
            Self::Resolution {
                failure: ResolutionFailure::LoadFailed(_),
                ..
            } => "load_failed",
            Self::Transport(_) => "transport_error",
            Self::State(_) => "invalid_state",
            Self::Configuration(_) => "configuration_error",
        }
    }
}

impl From<TransportError> for ChorusError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Convenient Result alias for session operations.
pub type ChorusResult<T> = Result<T, ChorusError>;
