//! Conversation-keyed registry of session controllers.
//!
//! One [`SessionController`] per conversation, created on first use and kept
//! for the life of the process. Controllers reset themselves on `leave`, so
//! entries are never removed.

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::ChorusResult;
use crate::services::session::SessionSnapshot;
use crate::services::session_controller::{validate_caller, SessionController, SessionDeps};
use crate::types::{CallerContext, ConversationId, VoiceMembership};

pub struct SessionRegistry {
    sessions: DashMap<ConversationId, Arc<SessionController>>,
    deps: SessionDeps,
}

impl SessionRegistry {
    pub fn new(deps: SessionDeps) -> Self {
        Self {
            sessions: DashMap::new(),
            deps,
        }
    }

    /// Returns the controller for `conversation_id`, creating it if needed.
    pub fn get_or_create(&self, conversation_id: ConversationId) -> Arc<SessionController> {
        if let Some(existing) = self.sessions.get(&conversation_id) {
            return Arc::clone(existing.value());
        }
        let entry = self.sessions.entry(conversation_id).or_insert_with(|| {
            log::debug!("[SessionRegistry] Creating session for conversation {}", conversation_id);
            Arc::new(SessionController::new(conversation_id, self.deps.clone()))
        });
        Arc::clone(entry.value())
    }

    pub fn get(&self, conversation_id: ConversationId) -> Option<Arc<SessionController>> {
        self.sessions
            .get(&conversation_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// All controllers, in no particular order.
    pub fn all(&self) -> Vec<Arc<SessionController>> {
        self.sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        let mut snapshots: Vec<_> = self.all().iter().map(|c| c.snapshot()).collect();
        snapshots.sort_by_key(|s| s.conversation_id);
        snapshots
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Caller validation without touching any session.
    pub fn validate<'a>(&self, caller: &'a CallerContext) -> ChorusResult<&'a VoiceMembership> {
        validate_caller(caller, self.deps.transport.as_ref())
    }

    /// Closes every connected session. Returns how many were torn down.
    pub async fn close_all(&self) -> usize {
        let mut closed = 0;
        for controller in self.all() {
            match controller.close().await {
                Ok(true) => closed += 1,
                Ok(false) => {}
                Err(e) => {
                    closed += 1;
                    log::warn!(
                        "[SessionRegistry] Closing conversation {} reported: {}",
                        controller.conversation_id(),
                        e
                    );
                }
            }
        }
        closed
    }
}
