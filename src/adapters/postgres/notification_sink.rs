use crate::domain::value_objects::{MemberId, NotificationId};
use crate::ports::notification_sink::{
    Notification, NotificationSink as NotificationSinkTrait, Result,
};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

/// PostgreSQLの行データをNotificationに変換する
fn map_row_to_notification(row: &PgRow) -> Notification {
    Notification {
        notification_id: NotificationId::from_uuid(row.get("notification_id")),
        member_id: MemberId::from_uuid(row.get("member_id")),
        event_type: row.get("event_type"),
        title: row.get("title"),
        message: row.get("message"),
        action_url: row.get("action_url"),
        metadata: row.get("metadata"),
        read: row.get("read"),
        created_at: row.get("created_at"),
    }
}

/// NotificationSinkのPostgreSQL実装
///
/// 通知を会員ごとの受信箱として保存する。metadataはJSONBで
/// スキーマの変化に耐える。
pub struct NotificationSink {
    pool: PgPool,
}

impl NotificationSink {
    /// PostgreSQLコネクションプールから新しいNotificationSinkを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSinkTrait for NotificationSink {
    async fn publish(&self, notification: Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                notification_id,
                member_id,
                event_type,
                title,
                message,
                action_url,
                metadata,
                read,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(notification.notification_id.value())
        .bind(notification.member_id.value())
        .bind(&notification.event_type)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.action_url)
        .bind(&notification.metadata)
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_member(&self, member_id: MemberId) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT
                notification_id,
                member_id,
                event_type,
                title,
                message,
                action_url,
                metadata,
                read,
                created_at
            FROM notifications
            WHERE member_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(member_id.value())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(map_row_to_notification).collect())
    }

    async fn mark_read(&self, notification_id: NotificationId) -> Result<bool> {
        let updated = sqlx::query("UPDATE notifications SET read = TRUE WHERE notification_id = $1")
            .bind(notification_id.value())
            .execute(&self.pool)
            .await?;

        Ok(updated.rows_affected() > 0)
    }

    async fn delete(&self, notification_id: NotificationId) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM notifications WHERE notification_id = $1")
            .bind(notification_id.value())
            .execute(&self.pool)
            .await?;

        Ok(deleted.rows_affected() > 0)
    }
}
