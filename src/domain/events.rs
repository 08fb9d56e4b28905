use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, FineAmount, LoanId, MemberId};

/// イベント：貸出が作成された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanIssued {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub member_id: MemberId,
    pub issued_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

/// イベント：書籍が返却された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanReturned {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub member_id: MemberId,
    pub returned_at: DateTime<Utc>,
    pub was_overdue: bool,
    /// 返却時に確定した罰金（免除後の値）
    pub fine: FineAmount,
    /// 返却時に免除された金額（免除がなければNone）
    pub waived: Option<FineAmount>,
}

/// イベント：罰金が精算された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FineCleared {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub member_id: MemberId,
    pub amount: FineAmount,
    pub cleared_at: DateTime<Utc>,
}

/// イベント：貸出が延滞している（リマインダーバッチが発行）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanOverdue {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub member_id: MemberId,
    pub deadline: DateTime<Utc>,
    pub days_overdue: i64,
    pub detected_at: DateTime<Utc>,
}

/// ドメインイベント統合型
///
/// 通知シンクとメールシンクへの配信単位。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainEvent {
    LoanIssued(LoanIssued),
    LoanReturned(LoanReturned),
    FineCleared(FineCleared),
    LoanOverdue(LoanOverdue),
}

impl DomainEvent {
    /// イベント種別の識別子を取得する
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::LoanIssued(_) => "loan_issued",
            DomainEvent::LoanReturned(_) => "loan_returned",
            DomainEvent::FineCleared(_) => "fine_cleared",
            DomainEvent::LoanOverdue(_) => "loan_overdue",
        }
    }

    /// イベントの発生時刻を取得する
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::LoanIssued(e) => e.issued_at,
            DomainEvent::LoanReturned(e) => e.returned_at,
            DomainEvent::FineCleared(e) => e.cleared_at,
            DomainEvent::LoanOverdue(e) => e.detected_at,
        }
    }

    /// イベントの対象会員を取得する
    pub fn member_id(&self) -> MemberId {
        match self {
            DomainEvent::LoanIssued(e) => e.member_id,
            DomainEvent::LoanReturned(e) => e.member_id,
            DomainEvent::FineCleared(e) => e.member_id,
            DomainEvent::LoanOverdue(e) => e.member_id,
        }
    }
}
