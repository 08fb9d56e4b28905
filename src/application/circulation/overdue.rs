use chrono::{DateTime, Utc};

use crate::domain::{self, DomainEvent, LoanOverdue, loan::ActiveLoan};
use crate::ports::LoanLedger;

use super::errors::Result;
use super::loan_service::ServiceDependencies;
use super::notify;

/// 延滞者クエリの1エントリ
///
/// 未返却かつ期限超過の貸出と、切り捨ての延滞日数の注釈。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaulterEntry {
    pub loan: ActiveLoan,
    pub days_overdue: i64,
}

/// 延滞者クエリ（読み取り専用）
///
/// 返却期限を過ぎたすべての未返却の貸出を、延滞日数
/// （切り捨て）の注釈付きで返す。状態は変更しない。
pub async fn list_defaulters(
    deps: &ServiceDependencies,
    as_of: DateTime<Utc>,
) -> Result<Vec<DefaulterEntry>> {
    let overdue = deps.ledger.overdue_loans(as_of).await?;

    Ok(overdue
        .into_iter()
        .map(|loan| {
            let days_overdue = domain::loan::days_overdue(loan.deadline, as_of);
            DefaulterEntry { loan, days_overdue }
        })
        .collect())
}

/// 延滞リマインダーバッチ
///
/// リクエスト経路の外で一回限りのジョブとして実行される
/// （`bin/overdue_reminder`参照）。延滞中の貸出ごとに
/// リマインダー通知とメールを配信する。
///
/// 処理フロー：
/// 1. 延滞中の貸出を取得
/// 2. 各貸出についてLoanOverdueイベントを組み立てて配信
/// 3. 対象件数を返す
///
/// 配信の失敗はログに記録されるだけで、バッチは継続する。
pub async fn send_overdue_reminders(
    deps: &ServiceDependencies,
    as_of: DateTime<Utc>,
) -> Result<usize> {
    let defaulters = list_defaulters(deps, as_of).await?;
    let reminded = defaulters.len();

    for entry in defaulters {
        let event = LoanOverdue {
            loan_id: entry.loan.loan_id,
            book_id: entry.loan.book_id,
            member_id: entry.loan.member_id,
            deadline: entry.loan.deadline,
            days_overdue: entry.days_overdue,
            detected_at: as_of,
        };

        notify::dispatch_for(
            deps,
            entry.loan.member_id,
            entry.loan.book_id,
            &DomainEvent::LoanOverdue(event),
        )
        .await;
    }

    Ok(reminded)
}
