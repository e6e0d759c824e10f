// File: ledgerbot-core/src/services/notification.rs

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};
use ledgerbot_common::models::{AccountId, Notification};
use ledgerbot_common::traits::collaborator_traits::Notifier;

/// Fire-and-forget delivery. Nothing here can fail the caller's operation.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
    admin_id: Option<AccountId>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, timeout: Duration, admin_id: Option<AccountId>) -> Self {
        Self { notifier, timeout, admin_id }
    }

    /// Spawns delivery to `recipient`. The handle is only useful to tests;
    /// callers normally drop it.
    pub fn dispatch(&self, recipient: AccountId, notification: Notification) -> JoinHandle<()> {
        let notifier = self.notifier.clone();
        let limit = self.timeout;
        tokio::spawn(async move {
            match timeout(limit, notifier.notify(recipient, &notification)).await {
                Ok(Ok(())) => debug!("Notified {}", recipient),
                Ok(Err(e)) => warn!("Notification to {} failed: {:?}", recipient, e),
                Err(_) => warn!("Notification to {} timed out after {:?}", recipient, limit),
            }
        })
    }

    pub fn notify_admin(&self, notification: Notification) -> Option<JoinHandle<()>> {
        match self.admin_id {
            Some(admin) => Some(self.dispatch(admin, notification)),
            None => {
                warn!("No admin configured; dropping '{}'", notification.text);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerbot_common::traits::collaborator_traits::MockNotifier;
    use ledgerbot_common::Error;

    #[tokio::test]
    async fn test_failed_delivery_is_swallowed() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .times(1)
            .returning(|_, _| Err(Error::Notify("chat not found".into())));
        let dispatcher = NotificationDispatcher::new(Arc::new(notifier), Duration::from_millis(50), None);
        let handle = dispatcher.dispatch(5, Notification::text("hi"));
        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn test_no_admin_means_nothing_sent() {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();
        let dispatcher = NotificationDispatcher::new(Arc::new(notifier), Duration::from_millis(50), None);
        assert!(dispatcher.notify_admin(Notification::text("pending")).is_none());
    }
}
