use crate::domain::loan::{ActiveLoan, FinePayment, Loan, ReturnedLoan};
use crate::domain::value_objects::{BookId, LoanId, MemberId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// 貸出台帳のエラー
///
/// アプリケーション層が区別すべき結果（在庫切れ、上限超過など）は
/// 型付きヴァリアントで表現する。トランザクション内の再検証で
/// 発生するため、事前検証をすり抜けた競合もここで報告される。
#[derive(Debug, Error)]
pub enum LedgerError {
    /// 貸出が存在しない
    #[error("Loan not found")]
    LoanNotFound,

    /// 既に返却済み
    #[error("Loan already returned")]
    AlreadyReturned,

    /// 貸出可能な在庫がない
    #[error("Book has no available copies")]
    BookUnavailable,

    /// 同じ書籍の未返却の貸出が既にある
    #[error("Member already has an active loan for this book")]
    DuplicateActiveLoan,

    /// 未返却の貸出数が上限に達している
    #[error("Member reached the active loan limit")]
    LoanLimitReached,

    /// 精算すべき罰金が残っていない
    #[error("No outstanding fine to clear")]
    NoOutstandingFine,

    /// 在庫カウンタが総冊数と矛盾している
    #[error("Copy counters out of sync for book {0:?}")]
    CopyCountDrift(BookId),

    /// ストレージのエラー
    #[error("Ledger storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Storage(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// 貸出ステータスのフィルタ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanStatus {
    /// 貸出中
    Active,
    /// 返却済み
    Returned,
}

impl LoanStatus {
    /// 文字列表現を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Returned => "returned",
        }
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(LoanStatus::Active),
            "returned" => Ok(LoanStatus::Returned),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

/// 貸出一覧の検索条件
#[derive(Debug, Clone, Copy, Default)]
pub struct LoanFilter {
    pub member_id: Option<MemberId>,
    pub book_id: Option<BookId>,
    pub status: Option<LoanStatus>,
}

/// 貸出台帳ポート
///
/// 貸出レコードと罰金支払いの永続化を抽象化する。
/// 複合書き込み（貸出作成＋在庫減、返却＋在庫増、罰金精算）は
/// 1つのデータベーストランザクションとして実行されなければならない。
/// 元の実装は逐次の無防備な書き込みだったが、最後の1冊への同時貸出が
/// 両方成功し得るため、この再実装では条件付き更新で閉じている。
#[async_trait]
pub trait LoanLedger: Send + Sync {
    /// 貸出を記録し、同時に在庫を1冊確保する
    ///
    /// 原子性の保証：
    /// - 会員行をロックして貸出上限をトランザクション内で再検証する
    /// - 在庫の確保は `available_copies > 0` の条件付き更新で行う
    /// - 同一会員・同一書籍の未返却の組は部分ユニーク制約で拒否される
    async fn issue(&self, loan: &ActiveLoan) -> Result<()>;

    /// 返却を記録し、同時に在庫を1冊戻す
    ///
    /// 在庫は `available_copies < total_copies` の条件付き更新で戻され、
    /// 総冊数を超えることはない。免除された罰金があれば同じ
    /// トランザクションで支払いレコードを追記する。
    async fn complete_return(
        &self,
        loan: &ReturnedLoan,
        waived: Option<&FinePayment>,
    ) -> Result<()>;

    /// 罰金精算を記録する
    ///
    /// 各支払いについて、対象貸出の罰金を `fine > 0` の条件付き更新で
    /// 0にし、支払いレコードを追記する。1件でも条件を満たさなければ
    /// 全体をロールバックする（呼び出し側から見て原子的）。
    async fn settle_fines(&self, payments: &[FinePayment]) -> Result<()>;

    /// IDで貸出を取得する
    async fn get(&self, loan_id: LoanId) -> Result<Option<Loan>>;

    /// 会員の未返却の貸出を取得する
    ///
    /// 貸出上限（会員ごと最大2冊）と重複貸出の事前検証に使用される。
    async fn active_loans_for_member(&self, member_id: MemberId) -> Result<Vec<ActiveLoan>>;

    /// 検索条件に合う貸出を取得する
    async fn find(&self, filter: LoanFilter) -> Result<Vec<Loan>>;

    /// 返却期限を過ぎた未返却の貸出を取得する
    ///
    /// 延滞者クエリとリマインダーバッチに使用される。状態は変更しない。
    async fn overdue_loans(&self, as_of: DateTime<Utc>) -> Result<Vec<ActiveLoan>>;

    /// 会員の罰金が残っている貸出を取得する
    ///
    /// 一括精算に使用される。
    async fn fined_loans_for_member(&self, member_id: MemberId) -> Result<Vec<ReturnedLoan>>;

    /// 貸出に紐づく支払い履歴を取得する
    async fn payments_for_loan(&self, loan_id: LoanId) -> Result<Vec<FinePayment>>;
}
