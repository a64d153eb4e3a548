//! Collaborator contracts for the voice side of the bot.
//!
//! The core never talks to a chat platform or an audio node directly. It
//! depends on the traits in [`traits`] and exchanges the value types in
//! [`types`] with whatever implements them.

pub mod traits;
pub mod types;

pub use traits::{NotificationSink, TrackResolver, VoiceTransport};
pub use types::{ConnectionHandle, FinishReason, PlaybackFinished, SearchOutcome, TransportEvent};
