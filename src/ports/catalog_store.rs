use crate::domain::book::Book;
use crate::domain::commands::UpdateBook;
use crate::domain::value_objects::BookId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// カタログストアのエラー
#[derive(Debug, Error)]
pub enum CatalogError {
    /// 書籍が存在しない
    #[error("Book not found")]
    BookNotFound,

    /// 総冊数を貸出中の冊数より減らそうとした
    #[error("total_copies cannot drop below the number of checked-out copies")]
    CopiesBelowCheckedOut,

    /// 貸出レコードが参照している書籍は削除不可
    #[error("Book is still referenced by loan records")]
    BookHasLoans,

    /// ストレージのエラー
    #[error("Catalog storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        CatalogError::Storage(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// カタログストアポート
///
/// 蔵書レコードの永続化を抽象化する。
/// 在庫数（available_copies）の増減は貸出台帳のトランザクションが担い、
/// このポートの`update`は総冊数の変更のみを扱う。
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// 蔵書を登録する
    async fn insert(&self, book: Book) -> Result<()>;

    /// IDで蔵書を取得する
    async fn get(&self, book_id: BookId) -> Result<Option<Book>>;

    /// 全蔵書をタイトル順で取得する
    async fn list(&self) -> Result<Vec<Book>>;

    /// 蔵書を更新する
    ///
    /// 総冊数の変更は行ロックの下で検証される。
    /// 貸出中の冊数を下回る削減は`CopiesBelowCheckedOut`で拒否される。
    async fn update(&self, cmd: UpdateBook, now: DateTime<Utc>) -> Result<Book>;

    /// 蔵書を削除する
    ///
    /// 貸出レコード（返却済みを含む）が参照している場合は拒否される。
    async fn delete(&self, book_id: BookId) -> Result<()>;
}
