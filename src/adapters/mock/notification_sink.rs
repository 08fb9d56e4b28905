use std::sync::Mutex;

use crate::domain::value_objects::{MemberId, NotificationId};
use crate::ports::notification_sink::{
    Notification, NotificationSink as NotificationSinkTrait, Result,
};
use async_trait::async_trait;

/// NotificationSinkのインメモリ実装
///
/// 受け取った通知を保持し、テストからの検証をサポートする。
pub struct NotificationSink {
    notifications: Mutex<Vec<Notification>>,
}

impl NotificationSink {
    pub fn new() -> Self {
        Self {
            notifications: Mutex::new(Vec::new()),
        }
    }

    /// 受け取ったすべての通知（テスト検証用）
    pub fn received(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

impl Default for NotificationSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSinkTrait for NotificationSink {
    async fn publish(&self, notification: Notification) -> Result<()> {
        self.notifications.lock().unwrap().push(notification);
        Ok(())
    }

    async fn list_for_member(&self, member_id: MemberId) -> Result<Vec<Notification>> {
        let mut list: Vec<Notification> = self
            .notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|notification| notification.member_id == member_id)
            .cloned()
            .collect();
        list.sort_by_key(|notification| notification.created_at);
        list.reverse();
        Ok(list)
    }

    async fn mark_read(&self, notification_id: NotificationId) -> Result<bool> {
        let mut notifications = self.notifications.lock().unwrap();
        match notifications
            .iter_mut()
            .find(|notification| notification.notification_id == notification_id)
        {
            Some(notification) => {
                notification.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, notification_id: NotificationId) -> Result<bool> {
        let mut notifications = self.notifications.lock().unwrap();
        let before = notifications.len();
        notifications.retain(|notification| notification.notification_id != notification_id);
        Ok(notifications.len() < before)
    }
}
