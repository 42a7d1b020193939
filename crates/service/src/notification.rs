use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification rejected: {0}")]
    Rejected(String),
    #[error("notification store error: {0}")]
    Store(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub metadata: Value,
}

/// Fire-and-forget delivery; callers log failures and move on.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the `notification` table, read later by the dashboards.
pub struct SeaOrmNotificationSink {
    pub db: DatabaseConnection,
}

#[async_trait]
impl NotificationSink for SeaOrmNotificationSink {
    async fn notify(&self, n: Notification) -> Result<(), NotifyError> {
        models::notification::create(&self.db, n.user_id, &n.title, &n.message, &n.kind, n.metadata)
            .await
            .map(|_| ())
            .map_err(|e| NotifyError::Store(e.to_string()))
    }
}

pub mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Keeps every delivered notification; can be told to reject some recipients.
    #[derive(Default)]
    pub struct RecordingSink {
        delivered: Mutex<Vec<Notification>>,
        reject: Mutex<HashSet<Uuid>>,
    }

    impl RecordingSink {
        pub fn reject_user(&self, user_id: Uuid) { self.reject.lock().unwrap().insert(user_id); }

        pub fn delivered(&self) -> Vec<Notification> { self.delivered.lock().unwrap().clone() }

        pub fn for_user(&self, user_id: Uuid) -> Vec<Notification> {
            self.delivered().into_iter().filter(|n| n.user_id == user_id).collect()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn notify(&self, n: Notification) -> Result<(), NotifyError> {
            if self.reject.lock().unwrap().contains(&n.user_id) {
                return Err(NotifyError::Rejected(format!("recipient {} unavailable", n.user_id)));
            }
            self.delivered.lock().unwrap().push(n);
            Ok(())
        }
    }
}
