// File: ledgerbot-core/src/services/access.rs

use std::sync::Arc;
use tracing::{debug, warn};
use ledgerbot_common::models::AccountId;
use ledgerbot_common::traits::collaborator_traits::MembershipChecker;
use crate::Error;

/// The one place admin privileges are decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminGate {
    admin_id: Option<AccountId>,
}

impl AdminGate {
    pub fn new(admin_id: Option<AccountId>) -> Self {
        Self { admin_id }
    }

    pub fn is_admin(&self, caller: AccountId) -> bool {
        self.admin_id == Some(caller)
    }

    pub fn authorize(&self, caller: AccountId) -> Result<(), Error> {
        if self.is_admin(caller) {
            Ok(())
        } else {
            debug!("Refusing admin operation for account {}", caller);
            Err(Error::Unauthorized)
        }
    }
}

/// Group membership requirement in front of every user-facing operation.
pub struct MembershipGate {
    checker: Arc<dyn MembershipChecker>,
    admin: AdminGate,
}

impl MembershipGate {
    pub fn new(checker: Arc<dyn MembershipChecker>, admin: AdminGate) -> Self {
        Self { checker, admin }
    }

    pub async fn ensure_member(&self, account_id: AccountId) -> Result<(), Error> {
        if self.admin.is_admin(account_id) {
            return Ok(());
        }
        match self.checker.is_member(account_id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(Error::NotMember),
            Err(e) => {
                warn!("Membership lookup for {} failed: {:?}", account_id, e);
                Err(Error::NotMember)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerbot_common::traits::collaborator_traits::MockMembershipChecker;

    #[test]
    fn test_gate_without_admin_refuses_everyone() {
        let gate = AdminGate::new(None);
        assert!(matches!(gate.authorize(1), Err(Error::Unauthorized)));
        assert!(!gate.is_admin(0));
    }

    #[tokio::test]
    async fn test_admin_skips_membership_lookup() {
        let mut checker = MockMembershipChecker::new();
        checker.expect_is_member().never();
        let gate = MembershipGate::new(Arc::new(checker), AdminGate::new(Some(7)));
        assert!(gate.ensure_member(7).await.is_ok());
    }

    #[tokio::test]
    async fn test_lookup_error_counts_as_not_member() {
        let mut checker = MockMembershipChecker::new();
        checker
            .expect_is_member()
            .returning(|_| Err(Error::Notify("upstream down".into())));
        let gate = MembershipGate::new(Arc::new(checker), AdminGate::new(Some(7)));
        assert!(matches!(gate.ensure_member(8).await, Err(Error::NotMember)));
    }
}
