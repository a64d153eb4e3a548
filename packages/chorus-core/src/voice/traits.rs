//! Trait abstractions for the external collaborators.
//!
//! These traits enable dependency injection for testability and modularity.
//! Services depend on traits rather than concrete implementations.

use async_trait::async_trait;

use crate::error::{NotifyResult, ResolverResult, TransportResult};
use crate::notice::Notice;
use crate::types::{ConversationId, TextChannelId, Track, VoiceChannelId};
use crate::voice::types::{ConnectionHandle, SearchOutcome};

/// Trait for voice connection and playback control.
///
/// Implementations own the real-time connection. Completion is reported
/// asynchronously as a [`TransportEvent`](crate::voice::TransportEvent) on the
/// channel the implementation was built with, never as a return value.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Whether at least one transport node is reachable right now.
    fn is_available(&self) -> bool;

    /// Joins a voice channel.
    ///
    /// # Arguments
    /// * `conversation_id` - Conversation the connection belongs to
    /// * `channel` - Voice channel to join
    async fn connect(
        &self,
        conversation_id: ConversationId,
        channel: VoiceChannelId,
    ) -> TransportResult<ConnectionHandle>;

    /// Leaves the voice channel and releases the handle.
    async fn disconnect(&self, handle: &ConnectionHandle) -> TransportResult<()>;

    /// Starts playing a track, replacing whatever was playing.
    async fn play(&self, handle: &ConnectionHandle, track: &Track) -> TransportResult<()>;

    /// Stops the current track. The transport follows up with a
    /// finished-notification carrying [`FinishReason::Stopped`](crate::voice::FinishReason::Stopped).
    async fn stop(&self, handle: &ConnectionHandle) -> TransportResult<()>;

    /// Pauses the current track.
    async fn pause(&self, handle: &ConnectionHandle) -> TransportResult<()>;

    /// Resumes a paused track.
    async fn resume(&self, handle: &ConnectionHandle) -> TransportResult<()>;

    /// Track the transport believes is loaded on this connection.
    fn current_track(&self, handle: &ConnectionHandle) -> Option<Track>;
}

/// Trait for mapping a free-text query to a playable track.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Searches for a track. Returns `Err` only when the search could not run
    /// at all; "nothing found" is [`SearchOutcome::NoMatches`].
    async fn search(&self, query: &str) -> ResolverResult<SearchOutcome>;
}

/// Trait for delivering status messages back to a conversation.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Sends a notice to a text channel.
    async fn send(&self, channel: TextChannelId, notice: Notice) -> NotifyResult<()>;
}
