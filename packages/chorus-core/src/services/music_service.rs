//! Command entry point.
//!
//! Routes each user command to the caller's conversation session and turns
//! the outcome, success or failure, into at most one reply on the caller's
//! text channel. Nothing here ever propagates an error upwards.

use std::sync::Arc;

use crate::error::{ChorusResult, ErrorCode, StateError};
use crate::notice::Notice;
use crate::services::session_registry::SessionRegistry;
use crate::types::{CallerContext, TextChannelId};
use crate::voice::NotificationSink;

/// A user command addressed to the caller's conversation session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MusicCommand {
    /// Resolve a query and play or queue it.
    Play(String),
    Skip,
    Pause,
    Resume,
    Leave,
    /// Connect without playing.
    Join,
}

impl MusicCommand {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Play(_) => "play",
            Self::Skip => "skip",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Leave => "leave",
            Self::Join => "join",
        }
    }
}

pub struct MusicService {
    registry: Arc<SessionRegistry>,
    sink: Arc<dyn NotificationSink>,
}

impl MusicService {
    pub fn new(registry: Arc<SessionRegistry>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { registry, sink }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Runs a command and delivers its reply to the caller's text channel.
    ///
    /// Returns the reply that was sent, if any.
    pub async fn execute(&self, caller: &CallerContext, command: MusicCommand) -> Option<Notice> {
        let reply = match self.dispatch(caller, &command).await {
            Ok(reply) => reply,
            Err(e) => {
                log::info!(
                    "[MusicService] {} by {} in {} rejected ({}): {}",
                    command.name(),
                    caller.user_id,
                    caller.conversation_id,
                    e.code(),
                    e
                );
                Some(Notice::from(&e))
            }
        };

        if let Some(notice) = &reply {
            self.reply(caller.text_channel, notice.clone()).await;
        }
        reply
    }

    pub async fn play(&self, caller: &CallerContext, query: &str) -> Option<Notice> {
        self.execute(caller, MusicCommand::Play(query.to_string()))
            .await
    }

    pub async fn skip(&self, caller: &CallerContext) -> Option<Notice> {
        self.execute(caller, MusicCommand::Skip).await
    }

    pub async fn pause(&self, caller: &CallerContext) -> Option<Notice> {
        self.execute(caller, MusicCommand::Pause).await
    }

    pub async fn resume(&self, caller: &CallerContext) -> Option<Notice> {
        self.execute(caller, MusicCommand::Resume).await
    }

    pub async fn leave(&self, caller: &CallerContext) -> Option<Notice> {
        self.execute(caller, MusicCommand::Leave).await
    }

    pub async fn join(&self, caller: &CallerContext) -> Option<Notice> {
        self.execute(caller, MusicCommand::Join).await
    }

    async fn dispatch(
        &self,
        caller: &CallerContext,
        command: &MusicCommand,
    ) -> ChorusResult<Option<Notice>> {
        let conversation_id = caller.conversation_id;

        match command {
            MusicCommand::Play(query) => {
                self.registry
                    .get_or_create(conversation_id)
                    .play(caller, query)
                    .await
            }
            MusicCommand::Join => self.registry.get_or_create(conversation_id).join(caller).await,
            MusicCommand::Skip => match self.registry.get(conversation_id) {
                Some(session) => session.skip(caller).await,
                None => {
                    self.registry.validate(caller)?;
                    Err(StateError::NothingPlaying.into())
                }
            },
            MusicCommand::Pause => match self.registry.get(conversation_id) {
                Some(session) => session.pause(caller).await,
                None => {
                    self.registry.validate(caller)?;
                    Err(StateError::NoCurrentTrack.into())
                }
            },
            MusicCommand::Resume => match self.registry.get(conversation_id) {
                Some(session) => session.resume(caller).await,
                None => {
                    self.registry.validate(caller)?;
                    Err(StateError::NoCurrentTrack.into())
                }
            },
            MusicCommand::Leave => match self.registry.get(conversation_id) {
                Some(session) => session.leave(caller).await,
                None => {
                    self.registry.validate(caller)?;
                    Ok(Some(Notice::NotConnected))
                }
            },
        }
    }

    async fn reply(&self, channel: TextChannelId, notice: Notice) {
        if let Err(e) = self.sink.send(channel, notice).await {
            log::warn!("[MusicService] Reply to channel {} failed: {}", channel, e);
        }
    }
}
