use std::sync::Mutex;

use crate::ports::email_sink::{EmailMessage, EmailSink as EmailSinkTrait, Result};
use async_trait::async_trait;

/// EmailSinkのインメモリ実装
///
/// 実際の配信は行わず、受け取ったペイロードを保持する。
pub struct EmailSink {
    sent: Mutex<Vec<EmailMessage>>,
}

impl EmailSink {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    /// 受け取ったすべてのメール（テスト検証用）
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for EmailSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailSinkTrait for EmailSink {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}
