use crate::domain::{self, DomainEvent, commands::*, loan::FinePayment};
use crate::domain::value_objects::LoanId;
use crate::ports::LoanLedger;

use super::errors::{CirculationError, Result};
use super::loan_service::ServiceDependencies;
use super::notify;

/// 1件の貸出の罰金を精算する
///
/// ビジネスルール：
/// - 貸出が存在し、返却済みで、罰金が残っていること
/// - 全額を1件の支払いレコードとして記録し、罰金を0にする
/// - 罰金0の貸出への精算は拒否される（2回目の精算は重複しない）
pub async fn clear_fine(deps: &ServiceDependencies, cmd: ClearFine) -> Result<FinePayment> {
    // 1. 貸出を取得
    let loan = deps
        .ledger
        .get(cmd.loan_id)
        .await?
        .ok_or(CirculationError::LoanNotFound)?;

    // 2. 返却済みであることを確認（未返却の貸出に罰金は存在しない）
    let returned = match loan {
        domain::loan::Loan::Returned(returned) => returned,
        domain::loan::Loan::Active(_) => return Err(CirculationError::NoOutstandingFine),
    };

    // 3. ドメイン層の純粋関数で精算を計算
    let settlement =
        domain::loan::clear_fine(returned, cmd.processed_by, cmd.notes, cmd.cleared_at)?;

    // 4. 台帳に記録（条件付き更新で競合時の二重精算を防ぐ）
    deps.ledger
        .settle_fines(std::slice::from_ref(&settlement.payment))
        .await?;

    // 5. シンクへ配信
    notify::dispatch_for(
        deps,
        settlement.loan.member_id,
        settlement.loan.book_id,
        &DomainEvent::FineCleared(settlement.event.clone()),
    )
    .await;

    Ok(settlement.payment)
}

/// 会員の全罰金を一括精算する
///
/// ビジネスルール：
/// - 罰金が残っている貸出ごとに1件の支払いレコードを作成する
/// - すべての罰金を呼び出し側から見て原子的に0にする
///   （元の実装は独立した書き込みの列だったが、単一トランザクションに置き換えた）
/// - 残っている罰金がなければエラー（静かに無視しない）
pub async fn clear_member_fines(
    deps: &ServiceDependencies,
    cmd: ClearMemberFines,
) -> Result<Vec<FinePayment>> {
    // 1. 罰金が残っている貸出を取得
    let fined_loans = deps.ledger.fined_loans_for_member(cmd.member_id).await?;

    if fined_loans.is_empty() {
        return Err(CirculationError::NoOutstandingFine);
    }

    // 2. ドメイン層の純粋関数で貸出ごとの精算を計算
    let mut settlements = Vec::with_capacity(fined_loans.len());
    for loan in fined_loans {
        let settlement = domain::loan::clear_fine(
            loan,
            cmd.processed_by,
            cmd.notes.clone(),
            cmd.cleared_at,
        )?;
        settlements.push(settlement);
    }

    // 3. 台帳に記録（全件が単一トランザクション）
    let payments: Vec<FinePayment> = settlements
        .iter()
        .map(|settlement| settlement.payment.clone())
        .collect();
    deps.ledger.settle_fines(&payments).await?;

    // 4. シンクへ配信（貸出ごとに1通）
    for settlement in &settlements {
        notify::dispatch_for(
            deps,
            settlement.loan.member_id,
            settlement.loan.book_id,
            &DomainEvent::FineCleared(settlement.event.clone()),
        )
        .await;
    }

    Ok(payments)
}

/// 貸出に紐づく支払い履歴を取得する
pub async fn payments_for_loan(
    deps: &ServiceDependencies,
    loan_id: LoanId,
) -> Result<Vec<FinePayment>> {
    // 貸出の存在確認を先に行い、存在しないIDには404相当を返す
    if deps.ledger.get(loan_id).await?.is_none() {
        return Err(CirculationError::LoanNotFound);
    }

    Ok(deps.ledger.payments_for_loan(loan_id).await?)
}
