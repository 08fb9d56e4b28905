use crate::ports::email_sink::{EmailMessage, EmailSink, Result};
use async_trait::async_trait;

/// ログ出力のみのEmailSink実装
///
/// 実際のメール配信はこのサービスの管轄外。ペイロードを
/// 構造化ログに記録して成功を返す（fire-and-forget）。
pub struct LogEmailSink;

impl LogEmailSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEmailSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailSink for LogEmailSink {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        tracing::info!(
            recipient = %message.recipient,
            subject = %message.subject,
            "email sink: would deliver message"
        );
        Ok(())
    }
}
