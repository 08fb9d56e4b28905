use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 完成済みのメールペイロード
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// メールシンクポート
///
/// 外部コラボレーター。fire-and-forgetで、失敗はログに記録されるだけ。
/// リトライはしない。
#[async_trait]
pub trait EmailSink: Send + Sync {
    /// メールをシンクに渡す
    async fn send(&self, message: EmailMessage) -> Result<()>;
}
