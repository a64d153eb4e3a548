//! Fixed defaults shared by the core and its hosts.

/// Capacity of the broadcast channel that carries [`SessionEvent`](crate::events::SessionEvent)s
/// to observers. Slow observers lag and drop events; sessions never block on them.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the mpsc channel a transport uses for finished-notifications.
pub const TRANSPORT_EVENT_CHANNEL_CAPACITY: usize = 128;

/// Default command prefix for text front-ends.
pub const DEFAULT_COMMAND_PREFIX: &str = "!";
