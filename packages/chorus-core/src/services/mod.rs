//! Application services layer.
//!
//! This module contains the session state machine and the services that
//! route commands and transport events to it.

pub mod music_service;
pub(crate) mod session;
pub mod session_controller;
pub mod session_registry;
pub mod transport_event_processor;

pub use music_service::{MusicCommand, MusicService};
pub use session::{SessionSnapshot, SessionStatus};
pub use session_controller::{SessionController, SessionDeps};
pub use session_registry::SessionRegistry;
pub use transport_event_processor::TransportEventProcessor;
