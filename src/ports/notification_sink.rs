use crate::domain::value_objects::{MemberId, NotificationId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 会員向け通知
///
/// 貸出・返却・罰金イベントから生成され、会員の画面に表示される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: NotificationId,
    pub member_id: MemberId,
    pub event_type: String,
    pub title: String,
    pub message: String,
    pub action_url: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// 通知シンクポート
///
/// 外部コラボレーター。配信の失敗はログに記録されるだけで、
/// 主操作を失敗させることはない。
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// 通知を記録する
    async fn publish(&self, notification: Notification) -> Result<()>;

    /// 会員の通知を新しい順で取得する
    async fn list_for_member(&self, member_id: MemberId) -> Result<Vec<Notification>>;

    /// 通知を既読にする
    ///
    /// 通知が存在した場合はtrueを返す。
    async fn mark_read(&self, notification_id: NotificationId) -> Result<bool>;

    /// 通知を削除する
    ///
    /// 通知が存在した場合はtrueを返す。
    async fn delete(&self, notification_id: NotificationId) -> Result<bool>;
}
