/// 貸出作成のエラー
///
/// すべて同期的に報告され、リトライ不可。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueLoanError {
    /// 会員が本人確認済みでない
    MemberNotVerified,
    /// 貸出可能な在庫がない
    BookUnavailable,
    /// 同じ書籍の未返却の貸出が既にある
    DuplicateActiveLoan,
    /// 未返却の貸出数が上限に達している
    LoanLimitReached,
}

/// 返却のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnLoanError {
    /// 既に返却済み
    AlreadyReturned,
}

/// 罰金精算のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearFineError {
    /// 精算すべき罰金が残っていない
    NoOutstandingFine,
}

/// 総冊数変更のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResizeCopiesError {
    /// 貸出中の冊数を下回る削減は不可
    BelowCheckedOut { checked_out: u32 },
}
