//! Conversation state for the photo → mode choice → publish flow.
//!
//! State lives in teloxide's dialogue storage, one dialogue per chat. A chat
//! is either idle or waiting for the user who sent a photo to pick its
//! scaling mode. Updates of one chat reach the handlers one at a time, so a
//! read followed by an exit cannot interleave with another event of the
//! same chat.

use std::sync::Arc;
use std::time::{Duration, Instant};

use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use teloxide::types::{ChatId, MessageId, UserId};
use tracing::{debug, warn};

/// One user in one chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationId {
    pub chat: ChatId,
    pub user: UserId,
}

impl ConversationId {
    pub fn new(chat: ChatId, user: UserId) -> Self {
        Self { chat, user }
    }
}

/// A message the bot edits in place as the request progresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub chat: ChatId,
    pub id: MessageId,
}

/// Represents the conversation state of one sticker request
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingModeChoice {
        /// User who sent the photo and owns the keyboard
        requester: UserId,
        image: Vec<u8>,
        status: MessageRef,
        started_at: Instant,
    },
}

impl SessionState {
    fn is_expired(&self, ttl: Option<Duration>, now: Instant) -> bool {
        match (self, ttl) {
            (SessionState::AwaitingModeChoice { started_at, .. }, Some(ttl)) => {
                now.saturating_duration_since(*started_at) >= ttl
            }
            _ => false,
        }
    }
}

/// Type alias for our sticker dialogue
pub type StickerDialogue = Dialogue<SessionState, InMemStorage<SessionState>>;

/// Photo waiting for its scaling mode, handed over by `take_for_choice`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSticker {
    pub image: Vec<u8>,
    pub status: MessageRef,
}

/// Outcome of looking up the session a mode choice belongs to
#[derive(Debug, PartialEq, Eq)]
pub enum ChoiceLookup {
    /// The session was removed from the store and handed over
    Taken(PendingSticker),
    /// Nothing pending in the chat
    Idle,
    /// A newer photo is pending; the tapped keyboard belongs to an older one
    Superseded,
    /// The keyboard belongs to another user's pending request, left untouched
    Foreign,
}

/// Pending sticker requests kept in teloxide's in-memory dialogue storage
pub struct SessionStore {
    storage: Arc<InMemStorage<SessionState>>,
    ttl: Option<Duration>,
}

impl SessionStore {
    /// `ttl` of `None` keeps unanswered sessions forever
    pub fn new(ttl: Option<Duration>) -> Self {
        Self::with_storage(InMemStorage::new(), ttl)
    }

    pub fn with_storage(storage: Arc<InMemStorage<SessionState>>, ttl: Option<Duration>) -> Self {
        Self { storage, ttl }
    }

    fn dialogue(&self, chat: ChatId) -> StickerDialogue {
        StickerDialogue::new(self.storage.clone(), chat)
    }

    /// Current state of the chat, expired sessions are exited on the way
    async fn load(&self, chat: ChatId) -> SessionState {
        let dialogue = self.dialogue(chat);
        let state = match dialogue.get().await {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                warn!(chat_id = %chat, error = %e, "Failed to read dialogue state");
                return SessionState::Idle;
            }
        };

        if state.is_expired(self.ttl, Instant::now()) {
            debug!(chat_id = %chat, "Pending session expired");
            self.exit(chat).await;
            return SessionState::Idle;
        }
        state
    }

    /// Remove the chat's dialogue. Returns `false` if there was none.
    async fn exit(&self, chat: ChatId) -> bool {
        self.dialogue(chat).exit().await.is_ok()
    }

    /// Enter `AwaitingModeChoice`, replacing whatever was pending in the chat.
    ///
    /// Returns `true` if an earlier request was replaced.
    pub async fn begin(&self, conversation: ConversationId, image: Vec<u8>, status: MessageRef) -> bool {
        let replaced = matches!(
            self.load(conversation.chat).await,
            SessionState::AwaitingModeChoice { .. }
        );

        let state = SessionState::AwaitingModeChoice {
            requester: conversation.user,
            image,
            status,
            started_at: Instant::now(),
        };
        if let Err(e) = self.dialogue(conversation.chat).update(state).await {
            warn!(chat_id = %conversation.chat, error = %e, "Failed to store dialogue state");
        }
        replaced
    }

    /// Take the session a mode choice made on `origin` belongs to.
    ///
    /// A matching session is removed, so a second tap on the same keyboard
    /// finds the chat idle. Taps by anyone but the requester leave it alone.
    pub async fn take_for_choice(&self, conversation: ConversationId, origin: MessageRef) -> ChoiceLookup {
        let SessionState::AwaitingModeChoice {
            requester,
            image,
            status,
            ..
        } = self.load(conversation.chat).await
        else {
            return ChoiceLookup::Idle;
        };

        if status != origin {
            return ChoiceLookup::Superseded;
        }
        if requester != conversation.user {
            return ChoiceLookup::Foreign;
        }
        if !self.exit(conversation.chat).await {
            return ChoiceLookup::Idle;
        }
        ChoiceLookup::Taken(PendingSticker { image, status })
    }

    /// Return the chat to `Idle`. Returns `true` if something was cleared.
    pub async fn clear(&self, conversation: ConversationId) -> bool {
        self.exit(conversation.chat).await
    }

    /// Whether a non-expired request is waiting for a mode choice
    pub async fn is_pending(&self, conversation: ConversationId) -> bool {
        matches!(
            self.load(conversation.chat).await,
            SessionState::AwaitingModeChoice { .. }
        )
    }

    /// Snapshot of the conversation state
    pub async fn state(&self, conversation: ConversationId) -> SessionState {
        self.load(conversation.chat).await
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(None)
    }
}
