//! Domain types shared by the queue, the session controller and the
//! collaborator traits.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Generates a `u64` identifier newtype with `Display` and transparent serde.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

define_id!(
    /// Conversation scope that owns exactly one playback session (a guild/server).
    ConversationId
);
define_id!(
    /// A voice-capable channel the transport can connect to.
    VoiceChannelId
);
define_id!(
    /// A text channel replies are delivered to.
    TextChannelId
);
define_id!(
    /// The user issuing a command.
    UserId
);

// ─────────────────────────────────────────────────────────────────────────────
// Track
// ─────────────────────────────────────────────────────────────────────────────

/// A resolved, playable audio item.
///
/// Tracks are immutable values. The resolver produces them, the queue owns
/// them until dequeued, and the session owns the current one until its
/// playback ends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Opaque identifier understood by the transport (e.g. an encoded track blob).
    pub id: String,
    pub title: String,
    pub author: String,
    /// Source locator shown to users.
    pub uri: String,
    /// Track length in milliseconds.
    pub duration_ms: u64,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        uri: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            uri: uri.into(),
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Returns the track length as a [`Duration`].
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Formats the length as `m:ss` (or `h:mm:ss` for long tracks).
    #[must_use]
    pub fn length_display(&self) -> String {
        let total = self.duration_ms / 1000;
        let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
        if hours > 0 {
            format!("{hours}:{minutes:02}:{seconds:02}")
        } else {
            format!("{minutes}:{seconds:02}")
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Caller Context
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of channel a caller is connected to.
///
/// Only [`VoiceChannelKind::Voice`] is accepted for playback; stage/broadcast
/// channels and anything else are rejected during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceChannelKind {
    #[default]
    Voice,
    Stage,
    Other,
}

/// The caller's current voice-channel membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceMembership {
    pub channel_id: VoiceChannelId,
    pub name: String,
    pub kind: VoiceChannelKind,
}

/// Everything the core needs to know about whoever issued a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerContext {
    pub user_id: UserId,
    pub conversation_id: ConversationId,
    /// Conversation the reply goes to.
    pub text_channel: TextChannelId,
    /// `None` when the caller is not in any voice channel.
    pub voice: Option<VoiceMembership>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_display_formats_minutes_and_hours() {
        let short = Track::new("a", "A", "x", "u", Duration::from_secs(185));
        assert_eq!(short.length_display(), "3:05");

        let long = Track::new("b", "B", "x", "u", Duration::from_secs(3 * 3600 + 61));
        assert_eq!(long.length_display(), "3:01:01");
    }

    #[test]
    fn ids_serialize_transparently() {
        assert_eq!(
            serde_json::to_string(&ConversationId(42)).unwrap(),
            "42"
        );
        assert_eq!(ConversationId(7).to_string(), "7");
    }

    #[test]
    fn channel_kind_serializes_to_snake_case() {
        assert_eq!(
            serde_json::to_string(&VoiceChannelKind::Stage).unwrap(),
            "\"stage\""
        );
    }

    #[test]
    fn track_serializes_camel_case() {
        let track = Track::new("id-1", "Song", "Band", "https://x/1", Duration::from_secs(1));
        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["durationMs"], 1000);
        assert_eq!(json["title"], "Song");
    }
}
