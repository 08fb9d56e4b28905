use crate::domain::book::{Book, resize_total_copies};
use crate::domain::commands::UpdateBook;
use crate::domain::value_objects::BookId;
use crate::ports::catalog_store::{CatalogError, CatalogStore as CatalogStoreTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

/// PostgreSQLの行データをBookに変換する
///
/// 冊数カラム（i32）からu32への変換でエラーハンドリングを行う。
fn map_row_to_book(row: &PgRow) -> Result<Book> {
    let total_copies_i32: i32 = row.get("total_copies");
    let total_copies: u32 = total_copies_i32.try_into().map_err(|_| {
        CatalogError::Storage(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("total_copies out of range: {}", total_copies_i32),
        )))
    })?;

    let available_copies_i32: i32 = row.get("available_copies");
    let available_copies: u32 = available_copies_i32.try_into().map_err(|_| {
        CatalogError::Storage(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("available_copies out of range: {}", available_copies_i32),
        )))
    })?;

    Ok(Book {
        book_id: BookId::from_uuid(row.get("book_id")),
        title: row.get("title"),
        author: row.get("author"),
        isbn: row.get("isbn"),
        total_copies,
        available_copies,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const SELECT_BOOK_COLUMNS: &str = r#"
    SELECT
        book_id,
        title,
        author,
        isbn,
        total_copies,
        available_copies,
        created_at,
        updated_at
    FROM books
"#;

/// CatalogStoreのPostgreSQL実装
///
/// 在庫数（available_copies）の増減は貸出台帳のトランザクションが
/// 同じbooksテーブルに対して行う。このストアは蔵書メタデータと
/// 総冊数の変更のみを扱う。
pub struct CatalogStore {
    pool: PgPool,
}

impl CatalogStore {
    /// PostgreSQLコネクションプールから新しいCatalogStoreを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStoreTrait for CatalogStore {
    async fn insert(&self, book: Book) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (
                book_id,
                title,
                author,
                isbn,
                total_copies,
                available_copies,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(book.book_id.value())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.total_copies as i32)
        .bind(book.available_copies as i32)
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, book_id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query(&format!("{} WHERE book_id = $1", SELECT_BOOK_COLUMNS))
            .bind(book_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn list(&self) -> Result<Vec<Book>> {
        let rows = sqlx::query(&format!("{} ORDER BY title ASC", SELECT_BOOK_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row_to_book).collect()
    }

    /// 蔵書を更新する
    ///
    /// 行ロック（SELECT ... FOR UPDATE）の下で総冊数の変更を検証し、
    /// 並行する貸出・返却トランザクションとの競合を防ぐ。
    async fn update(&self, cmd: UpdateBook, now: DateTime<Utc>) -> Result<Book> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "{} WHERE book_id = $1 FOR UPDATE",
            SELECT_BOOK_COLUMNS
        ))
        .bind(cmd.book_id.value())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Err(CatalogError::BookNotFound);
        };
        let current = map_row_to_book(&row)?;

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

        sqlx::query(
            r#"
            UPDATE books
            SET
                title = $2,
                author = $3,
                isbn = $4,
                total_copies = $5,
                available_copies = $6,
                updated_at = $7
            WHERE book_id = $1
            "#,
        )
        .bind(updated.book_id.value())
        .bind(&updated.title)
        .bind(&updated.author)
        .bind(&updated.isbn)
        .bind(updated.total_copies as i32)
        .bind(updated.available_copies as i32)
        .bind(updated.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete(&self, book_id: BookId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let referenced: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM loans WHERE book_id = $1)")
                .bind(book_id.value())
                .fetch_one(&mut *tx)
                .await?;

        if referenced {
            return Err(CatalogError::BookHasLoans);
        }

        let deleted = sqlx::query("DELETE FROM books WHERE book_id = $1")
            .bind(book_id.value())
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(CatalogError::BookNotFound);
        }

        tx.commit().await?;
        Ok(())
    }
}
