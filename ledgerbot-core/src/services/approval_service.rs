// File: ledgerbot-core/src/services/approval_service.rs

use std::sync::Arc;
use tracing::info;
use ledgerbot_common::models::{Decision, Notification, Request, RequestKind};
use ledgerbot_common::traits::repository_traits::RequestRepository;
use crate::services::notification::NotificationDispatcher;
use crate::Error;

/// Moves pending requests to approved or rejected. Authorization happens
/// in front of this service.
pub struct ApprovalService {
    requests: Arc<dyn RequestRepository + Send + Sync>,
    notifications: NotificationDispatcher,
}

impl ApprovalService {
    pub fn new(requests: Arc<dyn RequestRepository + Send + Sync>, notifications: NotificationDispatcher) -> Self {
        Self { requests, notifications }
    }

    pub async fn approve(&self, kind: RequestKind, request_id: i64) -> Result<Request, Error> {
        self.resolve(kind, request_id, Decision::Approve).await
    }

    pub async fn reject(&self, kind: RequestKind, request_id: i64) -> Result<Request, Error> {
        self.resolve(kind, request_id, Decision::Reject).await
    }

    async fn resolve(&self, kind: RequestKind, request_id: i64, decision: Decision) -> Result<Request, Error> {
        let request = self.requests.resolve_request(kind, request_id, decision).await?;
        info!(
            "{} request #{} {} (amount {}, requester {})",
            kind, request_id, request.status, request.amount, request.requester
        );
        self.notifications
            .dispatch(request.requester, Notification::text(outcome_text(&request, decision)));
        Ok(request)
    }

    pub async fn list_pending(&self, kind: RequestKind, limit: i64) -> Result<Vec<Request>, Error> {
        self.requests.list_pending(kind, limit).await
    }
}

fn outcome_text(request: &Request, decision: Decision) -> String {
    match (request.kind, decision) {
        (RequestKind::Deposit, Decision::Approve) => {
            format!("✅ Deposit of {} approved and added to your balance.", request.amount)
        }
        (RequestKind::Deposit, Decision::Reject) => {
            format!("❌ Deposit of {} was rejected.", request.amount)
        }
        (RequestKind::Withdrawal, Decision::Approve) => {
            format!("✅ Withdrawal of {} approved.", request.amount)
        }
        (RequestKind::Withdrawal, Decision::Reject) => {
            format!("❌ Withdrawal rejected. {} refunded to your balance.", request.amount)
        }
    }
}
