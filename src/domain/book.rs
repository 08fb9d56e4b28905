use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, ResizeCopiesError};

/// 蔵書 - カタログ管理コンテキストのレコード
///
/// 不変条件：
/// - 0 <= available_copies <= total_copies
/// - available（貸出可能フラグ）は available_copies > 0 から導出される
///
/// 在庫数は台帳トランザクション内の条件付き更新でのみ変更される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub total_copies: u32,
    pub available_copies: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// 貸出可能か（導出値）
    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }

    /// 貸出中の冊数（導出値）
    pub fn checked_out_copies(&self) -> u32 {
        self.total_copies - self.available_copies
    }
}

/// 純粋関数：蔵書の総冊数を変更する
///
/// ビジネスルール：
/// - available_copies は同じ差分で調整される
/// - 貸出中の冊数を下回る削減は拒否する（available_copiesが負になるため）
///
/// 副作用なし。新しいBookを返す。
pub fn resize_total_copies(
    book: &Book,
    new_total: u32,
    resized_at: DateTime<Utc>,
) -> Result<Book, ResizeCopiesError> {
    let checked_out = book.checked_out_copies();
    if new_total < checked_out {
        return Err(ResizeCopiesError::BelowCheckedOut { checked_out });
    }

    Ok(Book {
        total_copies: new_total,
        available_copies: new_total - checked_out,
        updated_at: resized_at,
        ..book.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_book(total: u32, available: u32) -> Book {
        let now = Utc::now();
        Book {
            book_id: BookId::new(),
            title: "The Rust Programming Language".to_string(),
            author: "Steve Klabnik".to_string(),
            isbn: Some("9781593278281".to_string()),
            total_copies: total,
            available_copies: available,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_is_available_follows_copy_count() {
        assert!(sample_book(2, 1).is_available());
        assert!(!sample_book(2, 0).is_available());
    }

    #[test]
    fn test_checked_out_copies() {
        assert_eq!(sample_book(3, 1).checked_out_copies(), 2);
        assert_eq!(sample_book(3, 3).checked_out_copies(), 0);
    }

    // TDD: resize_total_copies() のテスト
    #[test]
    fn test_resize_grows_available_by_delta() {
        let book = sample_book(2, 1);
        let resized = resize_total_copies(&book, 5, Utc::now()).unwrap();
        assert_eq!(resized.total_copies, 5);
        // 貸出中の1冊はそのまま、残りが貸出可能
        assert_eq!(resized.available_copies, 4);
    }

    #[test]
    fn test_resize_shrinks_down_to_checked_out() {
        let book = sample_book(5, 3);
        let resized = resize_total_copies(&book, 2, Utc::now()).unwrap();
        assert_eq!(resized.total_copies, 2);
        assert_eq!(resized.available_copies, 0);
    }

    #[test]
    fn test_resize_rejects_below_checked_out() {
        let book = sample_book(5, 3);
        let result = resize_total_copies(&book, 1, Utc::now());
        assert_eq!(
            result.unwrap_err(),
            ResizeCopiesError::BelowCheckedOut { checked_out: 2 }
        );
    }
}
