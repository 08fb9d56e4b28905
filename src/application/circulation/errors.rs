use thiserror::Error;

use crate::domain::{ClearFineError, IssueLoanError, ReturnLoanError};
use crate::ports::{CatalogError, LedgerError, MemberStoreError};

/// 貸出管理アプリケーション層のエラー
///
/// ビジネスルール違反はすべて同期的に報告され、リトライ不可。
/// ストレージのエラーは発生源を保持したまま伝搬する。
#[derive(Debug, Error)]
pub enum CirculationError {
    /// 会員が存在しない
    #[error("Member not found")]
    MemberNotFound,

    /// 会員が本人確認済みでない
    #[error("Member is not verified")]
    MemberNotVerified,

    /// 貸出レコードが参照している会員は削除不可
    #[error("Member is still referenced by loan records")]
    MemberHasLoans,

    /// 書籍が存在しない
    #[error("Book not found")]
    BookNotFound,

    /// 貸出可能な在庫がない
    #[error("Book is not available for loan")]
    BookUnavailable,

    /// 総冊数を貸出中の冊数より減らそうとした
    #[error("total_copies cannot drop below the number of checked-out copies")]
    CopiesBelowCheckedOut,

    /// 貸出レコードが参照している書籍は削除不可
    #[error("Book is still referenced by loan records")]
    BookHasLoans,

    /// 同じ書籍の未返却の貸出が既にある
    #[error("Member already has an active loan for this book")]
    DuplicateActiveLoan,

    /// 未返却の貸出数が上限（2冊）に達している
    #[error("Loan limit exceeded (max 2 active loans per member)")]
    LoanLimitReached,

    /// 貸出が見つからない
    #[error("Loan not found")]
    LoanNotFound,

    /// 既に返却済み
    #[error("Loan already returned")]
    LoanAlreadyReturned,

    /// 再貸出の元になる貸出がまだ返却されていない
    #[error("Loan has not been returned yet")]
    LoanNotReturned,

    /// 精算すべき罰金が残っていない
    #[error("No outstanding fine to clear")]
    NoOutstandingFine,

    /// カタログストアのエラー
    #[error("Catalog store error")]
    Catalog(#[source] CatalogError),

    /// 会員ストアのエラー
    #[error("Member store error")]
    Members(#[source] MemberStoreError),

    /// 貸出台帳のエラー
    #[error("Loan ledger error")]
    Ledger(#[source] LedgerError),

    /// 通知シンクのエラー
    #[error("Notification sink error")]
    Notifications(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<CatalogError> for CirculationError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::BookNotFound => CirculationError::BookNotFound,
            CatalogError::CopiesBelowCheckedOut => CirculationError::CopiesBelowCheckedOut,
            CatalogError::BookHasLoans => CirculationError::BookHasLoans,
            err @ CatalogError::Storage(_) => CirculationError::Catalog(err),
        }
    }
}

impl From<MemberStoreError> for CirculationError {
    fn from(err: MemberStoreError) -> Self {
        match err {
            MemberStoreError::MemberNotFound => CirculationError::MemberNotFound,
            MemberStoreError::MemberHasLoans => CirculationError::MemberHasLoans,
            err @ MemberStoreError::Storage(_) => CirculationError::Members(err),
        }
    }
}

impl From<LedgerError> for CirculationError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::LoanNotFound => CirculationError::LoanNotFound,
            LedgerError::AlreadyReturned => CirculationError::LoanAlreadyReturned,
            LedgerError::BookUnavailable => CirculationError::BookUnavailable,
            LedgerError::DuplicateActiveLoan => CirculationError::DuplicateActiveLoan,
            LedgerError::LoanLimitReached => CirculationError::LoanLimitReached,
            LedgerError::NoOutstandingFine => CirculationError::NoOutstandingFine,
            err @ (LedgerError::CopyCountDrift(_) | LedgerError::Storage(_)) => {
                CirculationError::Ledger(err)
            }
        }
    }
}

impl From<IssueLoanError> for CirculationError {
    fn from(err: IssueLoanError) -> Self {
        match err {
            IssueLoanError::MemberNotVerified => CirculationError::MemberNotVerified,
            IssueLoanError::BookUnavailable => CirculationError::BookUnavailable,
            IssueLoanError::DuplicateActiveLoan => CirculationError::DuplicateActiveLoan,
            IssueLoanError::LoanLimitReached => CirculationError::LoanLimitReached,
        }
    }
}

impl From<ReturnLoanError> for CirculationError {
    fn from(err: ReturnLoanError) -> Self {
        match err {
            ReturnLoanError::AlreadyReturned => CirculationError::LoanAlreadyReturned,
        }
    }
}

impl From<ClearFineError> for CirculationError {
    fn from(err: ClearFineError) -> Self {
        match err {
            ClearFineError::NoOutstandingFine => CirculationError::NoOutstandingFine,
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, CirculationError>;
