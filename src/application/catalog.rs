use chrono::{DateTime, Utc};

use crate::domain::book::Book;
use crate::domain::commands::{CreateBook, UpdateBook};
use crate::domain::value_objects::BookId;
use crate::ports::CatalogStore;

use super::circulation::{CirculationError, Result, ServiceDependencies};

/// 蔵書を登録する
///
/// 登録直後はすべての冊数が貸出可能（available_copies = total_copies）。
pub async fn create_book(
    deps: &ServiceDependencies,
    cmd: CreateBook,
    now: DateTime<Utc>,
) -> Result<Book> {
    let book = Book {
        book_id: BookId::new(),
        title: cmd.title,
        author: cmd.author,
        isbn: cmd.isbn,
        total_copies: cmd.total_copies,
        available_copies: cmd.total_copies,
        created_at: now,
        updated_at: now,
    };

    deps.catalog.insert(book.clone()).await?;

    Ok(book)
}

/// IDで蔵書を取得する
pub async fn get_book(deps: &ServiceDependencies, book_id: BookId) -> Result<Book> {
    deps.catalog
        .get(book_id)
        .await?
        .ok_or(CirculationError::BookNotFound)
}

/// 全蔵書を取得する
pub async fn list_books(deps: &ServiceDependencies) -> Result<Vec<Book>> {
    Ok(deps.catalog.list().await?)
}

/// 蔵書を更新する
///
/// 総冊数の変更は在庫数を同じ差分で調整する。貸出中の冊数を
/// 下回る削減はストアが行ロックの下で拒否する。
pub async fn update_book(
    deps: &ServiceDependencies,
    cmd: UpdateBook,
    now: DateTime<Utc>,
) -> Result<Book> {
    Ok(deps.catalog.update(cmd, now).await?)
}

/// 蔵書を削除する
///
/// 貸出レコード（返却済みを含む）が参照している間は拒否される。
/// 監査証跡が削除の利便性より優先される。
pub async fn delete_book(deps: &ServiceDependencies, book_id: BookId) -> Result<()> {
    Ok(deps.catalog.delete(book_id).await?)
}
