use std::sync::{Arc, Mutex};

use crate::domain::book::{Book, resize_total_copies};
use crate::domain::commands::UpdateBook;
use crate::domain::value_objects::BookId;
use crate::ports::catalog_store::{CatalogError, CatalogStore as CatalogStoreTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Db;

/// CatalogStoreのインメモリ実装
///
/// PostgreSQL実装と同じ検証（総冊数の削減制限、貸出参照中の削除拒否）を
/// 共有Dbの上で行う。
pub struct CatalogStore {
    db: Arc<Mutex<Db>>,
}

impl CatalogStore {
    pub(super) fn new(db: Arc<Mutex<Db>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogStoreTrait for CatalogStore {
    async fn insert(&self, book: Book) -> Result<()> {
        let mut db = self.db.lock().unwrap();
        db.books.insert(book.book_id, book);
        Ok(())
    }

    async fn get(&self, book_id: BookId) -> Result<Option<Book>> {
        let db = self.db.lock().unwrap();
        Ok(db.books.get(&book_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Book>> {
        let db = self.db.lock().unwrap();
        let mut books: Vec<Book> = db.books.values().cloned().collect();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(books)
    }

    async fn update(&self, cmd: UpdateBook, now: DateTime<Utc>) -> Result<Book> {
        let mut db = self.db.lock().unwrap();
        let current = db
            .books
            .get(&cmd.book_id)
            .cloned()
            .ok_or(CatalogError::BookNotFound)?;

        let mut updated = Book {
            title: cmd.title.unwrap_or(current.title),
            author: cmd.author.unwrap_or(current.author),
            isbn: cmd.isbn.or(current.isbn),
            updated_at: now,
            ..current
        };

        if let Some(new_total) = cmd.total_copies {
            updated = resize_total_copies(&updated, new_total, now)
                .map_err(|_| CatalogError::CopiesBelowCheckedOut)?;
        }

        db.books.insert(updated.book_id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, book_id: BookId) -> Result<()> {
        let mut db = self.db.lock().unwrap();

        if db.loans.values().any(|loan| loan.book_id() == book_id) {
            return Err(CatalogError::BookHasLoans);
        }

        db.books
            .remove(&book_id)
            .map(|_| ())
            .ok_or(CatalogError::BookNotFound)
    }
}
