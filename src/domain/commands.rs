use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, LoanId, MemberId, Role, loan::ReturnTerms};

/// コマンド：書籍を貸し出す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueLoan {
    pub book_id: BookId,
    pub member_id: MemberId,
    pub issued_at: DateTime<Utc>,
}

/// コマンド：書籍を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLoan {
    pub loan_id: LoanId,
    pub returned_at: DateTime<Utc>,
    pub terms: ReturnTerms,
}

/// コマンド：返却済みの貸出と同じ会員・書籍の組で再貸出する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReissueLoan {
    pub loan_id: LoanId,
    pub issued_at: DateTime<Utc>,
}

/// コマンド：1件の貸出の罰金を精算する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearFine {
    pub loan_id: LoanId,
    pub processed_by: Option<MemberId>,
    pub notes: Option<String>,
    pub cleared_at: DateTime<Utc>,
}

/// コマンド：会員の全罰金を一括精算する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearMemberFines {
    pub member_id: MemberId,
    pub processed_by: Option<MemberId>,
    pub notes: Option<String>,
    pub cleared_at: DateTime<Utc>,
}

/// コマンド：蔵書を登録する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBook {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub total_copies: u32,
}

/// コマンド：蔵書を更新する
///
/// Noneのフィールドは変更しない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBook {
    pub book_id: BookId,
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub total_copies: Option<u32>,
}

/// コマンド：会員を登録する
///
/// 登録直後は未確認（verified = false）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMember {
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// コマンド：会員を更新する
///
/// Noneのフィールドは変更しない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateMember {
    pub member_id: MemberId,
    pub name: Option<String>,
    pub email: Option<String>,
    pub verified: Option<bool>,
    pub role: Option<Role>,
}
