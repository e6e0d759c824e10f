// File: ledgerbot-core/src/services/session_store.rs

use dashmap::DashMap;
use ledgerbot_common::models::AccountId;
use crate::engine::DialogState;

/// Where each account is in a multi-step dialog. Process-lifetime only;
/// nothing financial lives here.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<AccountId, DialogState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) a dialog, replacing any previous one.
    pub fn start(&self, account_id: AccountId, state: DialogState) {
        self.sessions.insert(account_id, state);
    }

    pub fn get(&self, account_id: AccountId) -> Option<DialogState> {
        self.sessions.get(&account_id).map(|s| s.value().clone())
    }

    pub fn end(&self, account_id: AccountId) -> Option<DialogState> {
        self.sessions.remove(&account_id).map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_overwrites_previous_dialog() {
        let store = SessionStore::new();
        store.start(1, DialogState::DepositAmount);
        store.start(1, DialogState::ClearUserId);
        assert_eq!(store.get(1), Some(DialogState::ClearUserId));
        assert_eq!(store.end(1), Some(DialogState::ClearUserId));
        assert!(store.is_empty());
    }
}
