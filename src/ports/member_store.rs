use crate::domain::commands::UpdateMember;
use crate::domain::member::Member;
use crate::domain::value_objects::MemberId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// 会員ストアのエラー
#[derive(Debug, Error)]
pub enum MemberStoreError {
    /// 会員が存在しない
    #[error("Member not found")]
    MemberNotFound,

    /// 貸出レコードが参照している会員は削除不可
    #[error("Member is still referenced by loan records")]
    MemberHasLoans,

    /// ストレージのエラー
    #[error("Member storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<sqlx::Error> for MemberStoreError {
    fn from(err: sqlx::Error) -> Self {
        MemberStoreError::Storage(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, MemberStoreError>;

/// 会員ストアポート
///
/// 会員レコードの永続化を抽象化する。
/// 貸出資格（verified）の判定はドメイン層の純粋関数が担う。
#[async_trait]
pub trait MemberStore: Send + Sync {
    /// 会員を登録する
    async fn insert(&self, member: Member) -> Result<()>;

    /// IDで会員を取得する
    async fn get(&self, member_id: MemberId) -> Result<Option<Member>>;

    /// 全会員を名前順で取得する
    async fn list(&self) -> Result<Vec<Member>>;

    /// 会員を更新する（本人確認・ロール変更を含む）
    async fn update(&self, cmd: UpdateMember, now: DateTime<Utc>) -> Result<Member>;

    /// 会員を削除する
    ///
    /// 貸出レコード（返却済みを含む）が参照している場合は拒否される。
    async fn delete(&self, member_id: MemberId) -> Result<()>;
}
