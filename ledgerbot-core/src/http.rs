//! Bot-API adapters for the collaborator traits.
//!
//! Everything that leaves the process over HTTP goes through [`HttpClient`],
//! so tests can swap in `MockHttpClient` and never touch the network.
//! [`BotApiNotifier`] delivers notifications with `sendMessage`;
//! [`BotApiMembership`] answers membership lookups with `getChatMember`.
//! [`LogNotifier`] and [`AllowAllMembership`] stand in when no bot token is
//! configured.

use std::time::Duration;
use async_trait::async_trait;
use mockall::automock;
use serde_json::{json, Value};
use tracing::info;
use ledgerbot_common::models::{AccountId, Notification};
use ledgerbot_common::traits::collaborator_traits::{MembershipChecker, Notifier};
use crate::Error;

/// A generic trait for making JSON HTTP requests.
#[automock]
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, Error>;
    async fn get_json(&self, url: &str) -> Result<Value, Error>;
}

#[derive(Clone)]
pub struct DefaultHttpClient {
    client: reqwest::Client,
}

impl DefaultHttpClient {
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for DefaultHttpClient {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, Error> {
        let response = self.client
            .post(url)
            .json(body)
            .send()
            .await?
            .json::<Value>()
            .await?;
        Ok(response)
    }

    async fn get_json(&self, url: &str) -> Result<Value, Error> {
        let response = self.client
            .get(url)
            .send()
            .await?
            .json::<Value>()
            .await?;
        Ok(response)
    }
}

/// `{base}/bot{token}/{method}`
fn method_url(base: &str, token: &str, method: &str) -> String {
    format!("{}/bot{}/{}", base.trim_end_matches('/'), token, method)
}

/// Unwraps the `{"ok": .., "result": .., "description": ..}` envelope.
fn api_result(response: Value) -> Result<Value, Error> {
    if response.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(response.get("result").cloned().unwrap_or(Value::Null));
    }
    let description = response
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    Err(Error::Notify(description.to_string()))
}

pub struct BotApiNotifier {
    client: Box<dyn HttpClient>,
    base_url: String,
    token: String,
}

impl BotApiNotifier {
    pub fn new(client: Box<dyn HttpClient>, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into(), token: token.into() }
    }

    fn payload(recipient: AccountId, notification: &Notification) -> Value {
        let mut body = json!({ "chat_id": recipient, "text": notification.text });
        if !notification.actions.is_empty() {
            let row: Vec<Value> = notification
                .actions
                .iter()
                .map(|a| json!({ "text": a.label(), "callback_data": a.to_string() }))
                .collect();
            body["reply_markup"] = json!({ "inline_keyboard": [row] });
        }
        body
    }
}

#[async_trait]
impl Notifier for BotApiNotifier {
    async fn notify(&self, recipient: AccountId, notification: &Notification) -> Result<(), Error> {
        let url = method_url(&self.base_url, &self.token, "sendMessage");
        let response = self.client.post_json(&url, &Self::payload(recipient, notification)).await?;
        api_result(response).map(|_| ())
    }
}

/// Checks that an account belongs to one channel or group.
pub struct BotApiMembership {
    client: Box<dyn HttpClient>,
    base_url: String,
    token: String,
    chat_id: String,
}

impl BotApiMembership {
    pub fn new(
        client: Box<dyn HttpClient>,
        base_url: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self { client, base_url: base_url.into(), token: token.into(), chat_id: chat_id.into() }
    }
}

#[async_trait]
impl MembershipChecker for BotApiMembership {
    async fn is_member(&self, account_id: AccountId) -> Result<bool, Error> {
        let url = format!(
            "{}?chat_id={}&user_id={}",
            method_url(&self.base_url, &self.token, "getChatMember"),
            urlencoding::encode(&self.chat_id),
            account_id
        );
        let member = api_result(self.client.get_json(&url).await?)?;
        let status = member.get("status").and_then(Value::as_str).unwrap_or_default();
        Ok(matches!(status, "creator" | "administrator" | "member" | "restricted"))
    }
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, recipient: AccountId, notification: &Notification) -> Result<(), Error> {
        let actions: Vec<String> = notification.actions.iter().map(|a| a.to_string()).collect();
        info!("[notify {}] {} {:?}", recipient, notification.text, actions);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllMembership;

#[async_trait]
impl MembershipChecker for AllowAllMembership {
    async fn is_member(&self, _account_id: AccountId) -> Result<bool, Error> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerbot_common::models::RequestKind;

    #[tokio::test]
    async fn test_send_message_carries_review_buttons() {
        let mut client = MockHttpClient::new();
        client
            .expect_post_json()
            .withf(|url, body| {
                url == "https://api.example.org/botTOKEN/sendMessage"
                    && body["chat_id"] == json!(42)
                    && body["reply_markup"]["inline_keyboard"][0][1]["callback_data"] == json!("reject:deposit:9")
            })
            .times(1)
            .returning(|_, _| Ok(json!({ "ok": true, "result": {} })));

        let notifier = BotApiNotifier::new(Box::new(client), "https://api.example.org/", "TOKEN");
        let note = Notification::with_review("Deposit #9", RequestKind::Deposit, 9);
        notifier.notify(42, &note).await.unwrap();
    }

    #[tokio::test]
    async fn test_api_error_becomes_notify_error() {
        let mut client = MockHttpClient::new();
        client
            .expect_post_json()
            .returning(|_, _| Ok(json!({ "ok": false, "description": "chat not found" })));
        let notifier = BotApiNotifier::new(Box::new(client), "https://api.example.org", "TOKEN");
        let err = notifier.notify(1, &Notification::text("hi")).await.unwrap_err();
        assert!(matches!(err, Error::Notify(ref d) if d == "chat not found"));
    }

    #[tokio::test]
    async fn test_membership_status_mapping() {
        let mut client = MockHttpClient::new();
        client
            .expect_get_json()
            .withf(|url| url.contains("getChatMember?chat_id=%40ledger&user_id=5"))
            .returning(|_| Ok(json!({ "ok": true, "result": { "status": "member" } })));
        client
            .expect_get_json()
            .returning(|_| Ok(json!({ "ok": true, "result": { "status": "left" } })));
        let checker = BotApiMembership::new(Box::new(client), "https://api.example.org", "TOKEN", "@ledger");
        assert!(checker.is_member(5).await.unwrap());
        assert!(!checker.is_member(6).await.unwrap());
    }
}
