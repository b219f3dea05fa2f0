use std::collections::HashMap;
use std::sync::Mutex;

/// Conversation state for one user. One-shot states are cleared by the
/// handler that consumes them; `AiChat` persists across turns until another
/// flow replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatState {
    #[default]
    Idle,
    WaitingUpload,
    Searching,
    AiChat,
    CreatingPlaylist,
}

/// Per-user session store keyed by Telegram user id. Single writer per user,
/// no cross-user contention, so a plain mutex-guarded map is enough.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<i64, ChatState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: i64) -> ChatState {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.get(&user_id).copied().unwrap_or_default()
    }

    pub fn set(&self, user_id: i64, state: ChatState) {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(user_id, state);
    }

    pub fn clear(&self, user_id: i64) {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_idle() {
        let store = SessionStore::new();
        assert_eq!(store.get(1), ChatState::Idle);
    }

    #[test]
    fn set_get_clear_round_trip() {
        let store = SessionStore::new();
        store.set(1, ChatState::Searching);
        store.set(2, ChatState::AiChat);

        assert_eq!(store.get(1), ChatState::Searching);
        assert_eq!(store.get(2), ChatState::AiChat);

        store.clear(1);
        assert_eq!(store.get(1), ChatState::Idle);
        // Clearing one user leaves the other untouched.
        assert_eq!(store.get(2), ChatState::AiChat);
    }

    #[test]
    fn later_state_replaces_earlier() {
        let store = SessionStore::new();
        store.set(5, ChatState::WaitingUpload);
        store.set(5, ChatState::CreatingPlaylist);
        assert_eq!(store.get(5), ChatState::CreatingPlaylist);
    }
}
