use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::{MasterTrader, Subscription};

/// Payload accepted by the notification service.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub data: Value,
}

/// Notification service client. Failures are logged but never block the main flow.
#[derive(Debug, Clone)]
pub struct Notifier {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl Notifier {
    pub fn new(base_url: String, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Deliver a notification to one user. Failures are logged as warnings.
    pub async fn send(&self, user_id: Uuid, notification: &Notification) {
        let url = format!("{}/api/v1/notifications", self.base_url);
        let body = json!({
            "user_id": user_id,
            "type": notification.kind,
            "title": notification.title,
            "message": notification.message,
            "data": notification.data,
        });

        let mut req = self.http.post(&url).json(&body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        match req.send().await {
            Ok(resp) => {
                if !resp.status().is_success() {
                    tracing::warn!(
                        user_id = %user_id,
                        status = %resp.status(),
                        "Notification service returned non-2xx"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to send notification");
            }
        }
    }
}

/// Message sent to a master when someone starts copying them.
pub fn new_follower(master: &MasterTrader, sub: &Subscription) -> Notification {
    Notification {
        kind: "new_follower".into(),
        title: "New Follower".into(),
        message: format!(
            "You have a new follower copying {} with {} {}",
            master.strategy_name,
            sub.allocated_amount.round_dp(2),
            sub.currency,
        ),
        data: json!({
            "follower_id": sub.follower_id,
            "subscription_id": sub.id,
            "allocated_amount": sub.allocated_amount,
        }),
    }
}
