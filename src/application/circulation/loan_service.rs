use std::sync::Arc;

use crate::domain::{self, DomainEvent, commands::*, value_objects::*};
use crate::ports::*;

use super::errors::{CirculationError, Result};
use super::notify;

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞い（メソッド）は持たず、純粋な関数に依存関係を渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub catalog: Arc<dyn CatalogStore>,
    pub members: Arc<dyn MemberStore>,
    pub ledger: Arc<dyn LoanLedger>,
    pub notifications: Arc<dyn NotificationSink>,
    pub email: Arc<dyn EmailSink>,
}

/// 書籍を貸し出す
///
/// ビジネスルール：
/// - 会員が存在し、本人確認済みであること
/// - 書籍が存在し、貸出可能な在庫があること
/// - 同じ書籍の未返却の貸出がないこと
/// - 未返却の貸出数が上限（2冊）未満であること
///
/// # 一貫性保証
///
/// 事前検証はドメイン層の純粋関数で行い、台帳が同じルールを
/// トランザクション内で再検証する。最後の1冊への同時貸出は
/// 条件付き更新により片方だけが成功する。
///
/// # 引数
/// * `deps` - サービスの依存関係
/// * `cmd` - 貸出コマンド
///
/// # 戻り値
/// 成功時は作成された貸出のID
pub async fn issue_loan(deps: &ServiceDependencies, cmd: IssueLoan) -> Result<LoanId> {
    // 1. 会員の存在確認
    let member = deps
        .members
        .get(cmd.member_id)
        .await?
        .ok_or(CirculationError::MemberNotFound)?;

    // 2. 書籍の存在確認
    let book = deps
        .catalog
        .get(cmd.book_id)
        .await?
        .ok_or(CirculationError::BookNotFound)?;

    // 3. 未返却の貸出を取得し、純粋関数で検証
    let active_loans = deps.ledger.active_loans_for_member(cmd.member_id).await?;
    domain::loan::validate_issuance(&member, &book, &active_loans)?;

    // 4. ドメイン層の純粋関数で貸出を作成
    let (loan, event) = domain::loan::issue_loan(cmd.book_id, cmd.member_id, cmd.issued_at);
    let loan_id = loan.loan_id;

    // 5. 台帳に記録（在庫確保と上限再検証を含む単一トランザクション）
    deps.ledger.issue(&loan).await?;

    // 6. シンクへ配信（失敗しても主操作は成功のまま）
    notify::dispatch(deps, &member, &book, &DomainEvent::LoanIssued(event)).await;

    Ok(loan_id)
}

/// 書籍を返却する
///
/// ビジネスルール：
/// - 貸出が存在すること
/// - 既に返却済みでないこと
/// - 罰金 = 延滞日数（切り上げ） × 日額。明示指定・免除は`ReturnTerms`で制御
///
/// # 一貫性保証
///
/// 貸出の更新・在庫の返却・免除分の支払いレコードは
/// 台帳の単一トランザクションで記録される。
pub async fn return_loan(
    deps: &ServiceDependencies,
    cmd: ReturnLoan,
) -> Result<domain::loan::ReturnOutcome> {
    // 1. 貸出を取得
    let loan = deps
        .ledger
        .get(cmd.loan_id)
        .await?
        .ok_or(CirculationError::LoanNotFound)?;

    // 2. ドメイン層の純粋関数で返却を計算
    let outcome = domain::loan::return_loan(loan, cmd.returned_at, cmd.terms)?;

    // 3. 台帳に記録（単一トランザクション）
    deps.ledger
        .complete_return(&outcome.loan, outcome.payment.as_ref())
        .await?;

    // 4. シンクへ配信
    notify::dispatch_for(
        deps,
        outcome.loan.member_id,
        outcome.loan.book_id,
        &DomainEvent::LoanReturned(outcome.event.clone()),
    )
    .await;

    Ok(outcome)
}

/// 返却済みの貸出と同じ会員・書籍の組で再貸出する
///
/// ビジネスルール：
/// - 元の貸出が存在し、返却済みであること
/// - その上で通常の貸出と同じ検証（上限・在庫・重複）を現在の状態に対して行う
pub async fn reissue_loan(deps: &ServiceDependencies, cmd: ReissueLoan) -> Result<LoanId> {
    // 1. 元の貸出を取得
    let prior = deps
        .ledger
        .get(cmd.loan_id)
        .await?
        .ok_or(CirculationError::LoanNotFound)?;

    // 2. 返却済みであることを確認
    let returned = match prior {
        domain::loan::Loan::Returned(returned) => returned,
        domain::loan::Loan::Active(_) => return Err(CirculationError::LoanNotReturned),
    };

    // 3. 同じ会員・書籍の組で通常の貸出を実行
    issue_loan(
        deps,
        IssueLoan {
            book_id: returned.book_id,
            member_id: returned.member_id,
            issued_at: cmd.issued_at,
        },
    )
    .await
}
