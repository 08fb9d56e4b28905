use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::circulation::DefaulterEntry;
use crate::domain::book::Book;
use crate::domain::commands::IssueLoan;
use crate::domain::loan::{self, FinePayment, Loan};
use crate::domain::member::Member;
use crate::domain::value_objects::{BookId, MemberId, Role};
use crate::ports::Notification;

// ============================================================================
// カタログ
// ============================================================================

/// 蔵書登録リクエスト（POST /books）
#[derive(Debug, Deserialize)]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub total_copies: u32,
}

/// 蔵書更新リクエスト（PUT /books/:id）
///
/// 省略されたフィールドは変更しない。
#[derive(Debug, Deserialize)]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub total_copies: Option<u32>,
}

/// 蔵書レスポンス
#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub book_id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub total_copies: u32,
    pub available_copies: u32,
    /// 導出値：available_copies > 0
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        let available = book.is_available();
        Self {
            book_id: book.book_id.value(),
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            total_copies: book.total_copies,
            available_copies: book.available_copies,
            available,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

// ============================================================================
// 会員
// ============================================================================

/// 会員登録リクエスト（POST /members）
#[derive(Debug, Deserialize)]
pub struct CreateMemberRequest {
    pub name: String,
    pub email: String,
    /// 省略時はmember
    pub role: Option<Role>,
}

/// 会員更新リクエスト（PUT /members/:id）
#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub verified: Option<bool>,
    pub role: Option<Role>,
}

/// 会員レスポンス
#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub member_id: Uuid,
    pub name: String,
    pub email: String,
    pub verified: bool,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Member> for MemberResponse {
    fn from(member: Member) -> Self {
        Self {
            member_id: member.member_id.value(),
            name: member.name,
            email: member.email,
            verified: member.verified,
            role: member.role,
            created_at: member.created_at,
            updated_at: member.updated_at,
        }
    }
}

// ============================================================================
// 貸出
// ============================================================================

/// 貸出作成リクエスト（POST /loans）
#[derive(Debug, Deserialize)]
pub struct IssueLoanRequest {
    pub book_id: Uuid,
    pub member_id: Uuid,
}

impl IssueLoanRequest {
    pub fn to_command(&self) -> IssueLoan {
        IssueLoan {
            book_id: BookId::from_uuid(self.book_id),
            member_id: MemberId::from_uuid(self.member_id),
            issued_at: Utc::now(),
        }
    }
}

/// 貸出作成レスポンス（POST /loans, POST /loans/:id/reissue）
#[derive(Debug, Serialize)]
pub struct LoanCreatedResponse {
    pub loan_id: Uuid,
    pub book_id: Uuid,
    pub member_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

/// 返却リクエスト（POST /loans/:id/return）
#[derive(Debug, Default, Deserialize)]
pub struct ReturnLoanRequest {
    /// 計算値の代わりに使う明示的な罰金額
    pub fine: Option<i64>,
    /// trueの場合、罰金を免除して支払いレコードを残す
    #[serde(default)]
    pub clear_fine: bool,
    pub condition: Option<String>,
    pub notes: Option<String>,
}

/// 返却レスポンス
#[derive(Debug, Serialize)]
pub struct LoanReturnedResponse {
    pub loan_id: Uuid,
    pub returned_at: DateTime<Utc>,
    pub fine: i64,
    pub waived: Option<i64>,
}

/// 貸出一覧取得のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct ListLoansQuery {
    /// 会員IDでフィルタリング
    pub member_id: Option<Uuid>,
    /// 書籍IDでフィルタリング
    pub book_id: Option<Uuid>,
    /// ステータスでフィルタリング（active, returned）
    pub status: Option<String>,
}

/// 貸出レスポンス（GET /loans/:id と GET /loans）
#[derive(Debug, Serialize)]
pub struct LoanResponse {
    pub loan_id: Uuid,
    pub book_id: Uuid,
    pub member_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub returned: bool,
    pub returned_at: Option<DateTime<Utc>>,
    pub fine: i64,
    pub condition: Option<String>,
    pub notes: Option<String>,
    /// 未返却の貸出の延滞日数（切り捨て、期限内は0）
    pub days_overdue: Option<i64>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanResponse {
    /// Loan集約からレスポンスを組み立てる
    ///
    /// 延滞日数の注釈は未返却の貸出にのみ付く。
    pub fn from_loan(loan: &Loan, as_of: DateTime<Utc>) -> Self {
        match loan {
            Loan::Active(active) => Self {
                loan_id: active.loan_id.value(),
                book_id: active.book_id.value(),
                member_id: active.member_id.value(),
                issued_at: active.issued_at,
                deadline: active.deadline,
                returned: false,
                returned_at: None,
                fine: 0,
                condition: None,
                notes: None,
                days_overdue: Some(loan::days_overdue(active.deadline, as_of)),
                status: "active".to_string(),
                created_at: active.created_at,
                updated_at: active.updated_at,
            },
            Loan::Returned(returned) => Self {
                loan_id: returned.loan_id.value(),
                book_id: returned.book_id.value(),
                member_id: returned.member_id.value(),
                issued_at: returned.issued_at,
                deadline: returned.deadline,
                returned: true,
                returned_at: Some(returned.returned_at),
                fine: returned.fine.value(),
                condition: returned.condition.clone(),
                notes: returned.notes.clone(),
                days_overdue: None,
                status: "returned".to_string(),
                created_at: returned.created_at,
                updated_at: returned.updated_at,
            },
        }
    }
}

// ============================================================================
// 罰金
// ============================================================================

/// 罰金精算リクエスト（POST /loans/:id/fine/clear, POST /members/:id/fines/clear）
#[derive(Debug, Default, Deserialize)]
pub struct ClearFineRequest {
    /// 精算を処理した管理者のID
    pub processed_by: Option<Uuid>,
    pub notes: Option<String>,
}

/// 罰金支払いレスポンス
#[derive(Debug, Serialize)]
pub struct FinePaymentResponse {
    pub payment_id: Uuid,
    pub loan_id: Uuid,
    pub member_id: Uuid,
    pub amount: i64,
    pub processed_by: Option<Uuid>,
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
}

impl From<FinePayment> for FinePaymentResponse {
    fn from(payment: FinePayment) -> Self {
        Self {
            payment_id: payment.payment_id.value(),
            loan_id: payment.loan_id.value(),
            member_id: payment.member_id.value(),
            amount: payment.amount.value(),
            processed_by: payment.processed_by.map(|id| id.value()),
            notes: payment.notes,
            paid_at: payment.paid_at,
        }
    }
}

// ============================================================================
// 延滞者
// ============================================================================

/// 延滞者レスポンス（GET /defaulters）
#[derive(Debug, Serialize)]
pub struct DefaulterResponse {
    pub loan_id: Uuid,
    pub book_id: Uuid,
    pub member_id: Uuid,
    pub deadline: DateTime<Utc>,
    pub days_overdue: i64,
}

impl From<DefaulterEntry> for DefaulterResponse {
    fn from(entry: DefaulterEntry) -> Self {
        Self {
            loan_id: entry.loan.loan_id.value(),
            book_id: entry.loan.book_id.value(),
            member_id: entry.loan.member_id.value(),
            deadline: entry.loan.deadline,
            days_overdue: entry.days_overdue,
        }
    }
}

// ============================================================================
// 通知
// ============================================================================

/// 通知一覧取得のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub member_id: Option<Uuid>,
}

/// 通知レスポンス
#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub notification_id: Uuid,
    pub member_id: Uuid,
    pub event_type: String,
    pub title: String,
    pub message: String,
    pub action_url: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(notification: Notification) -> Self {
        Self {
            notification_id: notification.notification_id.value(),
            member_id: notification.member_id.value(),
            event_type: notification.event_type,
            title: notification.title,
            message: notification.message,
            action_url: notification.action_url,
            metadata: notification.metadata,
            read: notification.read,
            created_at: notification.created_at,
        }
    }
}

// ============================================================================
// エラー
// ============================================================================

/// エラーレスポンス
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
