use std::sync::{Arc, Mutex};

use crate::domain::loan::{ActiveLoan, FinePayment, Loan, MAX_ACTIVE_LOANS, ReturnedLoan};
use crate::domain::value_objects::{FineAmount, LoanId, MemberId};
use crate::ports::loan_ledger::{
    LedgerError, LoanFilter, LoanLedger as LoanLedgerTrait, LoanStatus, Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Db;

/// LoanLedgerのインメモリ実装
///
/// PostgreSQL実装のトランザクションに相当するものとして、
/// 複合書き込みを1回のロック区間で行う。検証の意味論
/// （上限再確認、条件付きの在庫確保、重複拒否）は同一。
pub struct LoanLedger {
    db: Arc<Mutex<Db>>,
}

impl LoanLedger {
    pub(super) fn new(db: Arc<Mutex<Db>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LoanLedgerTrait for LoanLedger {
    async fn issue(&self, loan: &ActiveLoan) -> Result<()> {
        let mut db = self.db.lock().unwrap();

        let active_count = db
            .loans
            .values()
            .filter(|l| l.member_id() == loan.member_id && !l.is_returned())
            .count();
        if active_count >= MAX_ACTIVE_LOANS {
            return Err(LedgerError::LoanLimitReached);
        }

        let duplicate = db.loans.values().any(|l| {
            l.member_id() == loan.member_id && l.book_id() == loan.book_id && !l.is_returned()
        });
        if duplicate {
            return Err(LedgerError::DuplicateActiveLoan);
        }

        // 在庫確保（available_copies > 0 の条件付き更新に相当）
        let book = db
            .books
            .get_mut(&loan.book_id)
            .ok_or(LedgerError::BookUnavailable)?;
        if book.available_copies == 0 {
            return Err(LedgerError::BookUnavailable);
        }
        book.available_copies -= 1;
        book.updated_at = loan.updated_at;

        db.loans.insert(loan.loan_id, Loan::Active(loan.clone()));
        Ok(())
    }

    async fn complete_return(
        &self,
        loan: &ReturnedLoan,
        waived: Option<&FinePayment>,
    ) -> Result<()> {
        let mut db = self.db.lock().unwrap();

        match db.loans.get(&loan.loan_id) {
            None => return Err(LedgerError::LoanNotFound),
            Some(Loan::Returned(_)) => return Err(LedgerError::AlreadyReturned),
            Some(Loan::Active(_)) => {}
        }

        // 在庫返却（available_copies < total_copies の条件付き更新に相当）
        let book = db
            .books
            .get_mut(&loan.book_id)
            .ok_or(LedgerError::CopyCountDrift(loan.book_id))?;
        if book.available_copies >= book.total_copies {
            return Err(LedgerError::CopyCountDrift(loan.book_id));
        }
        book.available_copies += 1;
        book.updated_at = loan.returned_at;

        db.loans.insert(loan.loan_id, Loan::Returned(loan.clone()));

        if let Some(payment) = waived {
            db.payments.push(payment.clone());
        }

        Ok(())
    }

    async fn settle_fines(&self, payments: &[FinePayment]) -> Result<()> {
        let mut db = self.db.lock().unwrap();

        // 全件を検証してから適用する（1件でも失敗すれば何も変更しない）
        for payment in payments {
            match db.loans.get(&payment.loan_id) {
                Some(Loan::Returned(returned)) if !returned.fine.is_zero() => {}
                Some(_) => return Err(LedgerError::NoOutstandingFine),
                None => return Err(LedgerError::LoanNotFound),
            }
        }

        for payment in payments {
            if let Some(Loan::Returned(returned)) = db.loans.get_mut(&payment.loan_id) {
                returned.fine = FineAmount::ZERO;
                returned.core.updated_at = payment.paid_at;
            }
            db.payments.push(payment.clone());
        }

        Ok(())
    }

    async fn get(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        let db = self.db.lock().unwrap();
        Ok(db.loans.get(&loan_id).cloned())
    }

    async fn active_loans_for_member(&self, member_id: MemberId) -> Result<Vec<ActiveLoan>> {
        let db = self.db.lock().unwrap();
        Ok(db
            .loans
            .values()
            .filter_map(|loan| match loan {
                Loan::Active(active) if active.member_id == member_id => Some(active.clone()),
                _ => None,
            })
            .collect())
    }

    async fn find(&self, filter: LoanFilter) -> Result<Vec<Loan>> {
        let db = self.db.lock().unwrap();
        let mut loans: Vec<Loan> = db
            .loans
            .values()
            .filter(|loan| {
                filter
                    .member_id
                    .is_none_or(|member_id| loan.member_id() == member_id)
                    && filter.book_id.is_none_or(|book_id| loan.book_id() == book_id)
                    && filter.status.is_none_or(|status| match status {
                        LoanStatus::Active => !loan.is_returned(),
                        LoanStatus::Returned => loan.is_returned(),
                    })
            })
            .cloned()
            .collect();

        loans.sort_by_key(|loan| match loan {
            Loan::Active(active) => active.issued_at,
            Loan::Returned(returned) => returned.issued_at,
        });
        loans.reverse();
        Ok(loans)
    }

    async fn overdue_loans(&self, as_of: DateTime<Utc>) -> Result<Vec<ActiveLoan>> {
        let db = self.db.lock().unwrap();
        let mut overdue: Vec<ActiveLoan> = db
            .loans
            .values()
            .filter_map(|loan| match loan {
                Loan::Active(active) if active.deadline < as_of => Some(active.clone()),
                _ => None,
            })
            .collect();

        overdue.sort_by_key(|loan| loan.deadline);
        Ok(overdue)
    }

    async fn fined_loans_for_member(&self, member_id: MemberId) -> Result<Vec<ReturnedLoan>> {
        let db = self.db.lock().unwrap();
        let mut fined: Vec<ReturnedLoan> = db
            .loans
            .values()
            .filter_map(|loan| match loan {
                Loan::Returned(returned)
                    if returned.member_id == member_id && !returned.fine.is_zero() =>
                {
                    Some(returned.clone())
                }
                _ => None,
            })
            .collect();

        fined.sort_by_key(|loan| loan.returned_at);
        Ok(fined)
    }

    async fn payments_for_loan(&self, loan_id: LoanId) -> Result<Vec<FinePayment>> {
        let db = self.db.lock().unwrap();
        Ok(db
            .payments
            .iter()
            .filter(|payment| payment.loan_id == loan_id)
            .cloned()
            .collect())
    }
}
