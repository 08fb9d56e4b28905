use chrono::{Duration, Utc};
use rusty_circulation::application::circulation::{
    CirculationError, clear_fine, clear_member_fines, issue_loan, list_defaulters,
    payments_for_loan, reissue_loan, return_loan, send_overdue_reminders,
};
use rusty_circulation::application::{catalog, membership};
use rusty_circulation::domain::commands::*;
use rusty_circulation::domain::loan::{Loan, ReturnTerms};
use rusty_circulation::domain::value_objects::{BookId, FineAmount, LoanId, MemberId};
use rusty_circulation::ports::{CatalogStore, LoanLedger};

mod common;
use common::{TestDeps, seed_book, seed_member, test_deps};

// ============================================================================
// ヘルパー
// ============================================================================

/// 貸出コマンドを組み立てる（issued_atを過去にずらして延滞を作れる）
fn issue_cmd(book_id: BookId, member_id: MemberId, days_ago: i64) -> IssueLoan {
    IssueLoan {
        book_id,
        member_id,
        issued_at: Utc::now() - Duration::days(days_ago),
    }
}

async fn available_copies(deps: &TestDeps, book_id: BookId) -> u32 {
    deps.deps
        .catalog
        .get(book_id)
        .await
        .unwrap()
        .expect("book exists")
        .available_copies
}

async fn loan_state(deps: &TestDeps, loan_id: LoanId) -> Loan {
    deps.deps
        .ledger
        .get(loan_id)
        .await
        .unwrap()
        .expect("loan exists")
}

// ============================================================================
// 貸出作成
// ============================================================================

#[tokio::test]
async fn test_issue_loan_success() {
    // Arrange
    let harness = test_deps();
    let book_id = seed_book(&harness.deps, 2).await;
    let member_id = seed_member(&harness.deps, true).await;

    // Act
    let result = issue_loan(&harness.deps, issue_cmd(book_id, member_id, 0)).await;

    // Assert: 貸出が作成され、在庫が1冊減る
    let loan_id = result.expect("loan issued");
    let loan = loan_state(&harness, loan_id).await;
    assert!(!loan.is_returned());
    assert_eq!(available_copies(&harness, book_id).await, 1);

    // シンクへ配信されている
    let notifications = harness.notifications.received();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].event_type, "loan_issued");
    assert_eq!(notifications[0].member_id, member_id);

    let emails = harness.email.sent();
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].recipient, "genly@example.com");
}

#[tokio::test]
async fn test_issue_loan_member_not_found() {
    let harness = test_deps();
    let book_id = seed_book(&harness.deps, 1).await;

    let result = issue_loan(&harness.deps, issue_cmd(book_id, MemberId::new(), 0)).await;

    assert!(matches!(
        result.unwrap_err(),
        CirculationError::MemberNotFound
    ));
}

#[tokio::test]
async fn test_issue_loan_member_not_verified() {
    let harness = test_deps();
    let book_id = seed_book(&harness.deps, 1).await;
    let member_id = seed_member(&harness.deps, false).await;

    let result = issue_loan(&harness.deps, issue_cmd(book_id, member_id, 0)).await;

    assert!(matches!(
        result.unwrap_err(),
        CirculationError::MemberNotVerified
    ));
}

#[tokio::test]
async fn test_issue_loan_book_not_found() {
    let harness = test_deps();
    let member_id = seed_member(&harness.deps, true).await;

    let result = issue_loan(&harness.deps, issue_cmd(BookId::new(), member_id, 0)).await;

    assert!(matches!(result.unwrap_err(), CirculationError::BookNotFound));
}

#[tokio::test]
async fn test_issue_loan_last_copy_then_unavailable() {
    // Arrange: 在庫1冊の書籍
    let harness = test_deps();
    let book_id = seed_book(&harness.deps, 1).await;
    let first = seed_member(&harness.deps, true).await;
    let second = seed_member(&harness.deps, true).await;

    // Act: 1人目が最後の1冊を借りる
    issue_loan(&harness.deps, issue_cmd(book_id, first, 0))
        .await
        .expect("first borrow");

    // Assert: 在庫0、2人目は借りられない
    assert_eq!(available_copies(&harness, book_id).await, 0);
    let result = issue_loan(&harness.deps, issue_cmd(book_id, second, 0)).await;
    assert!(matches!(
        result.unwrap_err(),
        CirculationError::BookUnavailable
    ));

    // 在庫が0未満になることはない
    assert_eq!(available_copies(&harness, book_id).await, 0);
}

#[tokio::test]
async fn test_issue_loan_rejects_duplicate_book() {
    // Arrange: 在庫に余裕があっても同じ書籍は2冊借りられない
    let harness = test_deps();
    let book_id = seed_book(&harness.deps, 3).await;
    let member_id = seed_member(&harness.deps, true).await;

    issue_loan(&harness.deps, issue_cmd(book_id, member_id, 0))
        .await
        .expect("first borrow");

    let result = issue_loan(&harness.deps, issue_cmd(book_id, member_id, 0)).await;

    assert!(matches!(
        result.unwrap_err(),
        CirculationError::DuplicateActiveLoan
    ));
    assert_eq!(available_copies(&harness, book_id).await, 2);
}

#[tokio::test]
async fn test_issue_loan_enforces_two_loan_limit() {
    // Arrange: 既に2冊借りている会員
    let harness = test_deps();
    let member_id = seed_member(&harness.deps, true).await;
    let first = seed_book(&harness.deps, 1).await;
    let second = seed_book(&harness.deps, 1).await;
    let third = seed_book(&harness.deps, 1).await;

    issue_loan(&harness.deps, issue_cmd(first, member_id, 0))
        .await
        .expect("first borrow");
    issue_loan(&harness.deps, issue_cmd(second, member_id, 0))
        .await
        .expect("second borrow");

    // Act: 3冊目（別の書籍）は拒否される
    let result = issue_loan(&harness.deps, issue_cmd(third, member_id, 0)).await;

    // Assert
    assert!(matches!(
        result.unwrap_err(),
        CirculationError::LoanLimitReached
    ));

    let active = harness
        .deps
        .ledger
        .active_loans_for_member(member_id)
        .await
        .unwrap();
    assert_eq!(active.len(), 2);
    // 3冊目の在庫は減っていない
    assert_eq!(available_copies(&harness, third).await, 1);
}

// ============================================================================
// 返却
// ============================================================================

#[tokio::test]
async fn test_return_on_time_has_no_fine_and_restores_copy() {
    let harness = test_deps();
    let book_id = seed_book(&harness.deps, 1).await;
    let member_id = seed_member(&harness.deps, true).await;

    let loan_id = issue_loan(&harness.deps, issue_cmd(book_id, member_id, 7))
        .await
        .expect("borrow");

    let outcome = return_loan(
        &harness.deps,
        ReturnLoan {
            loan_id,
            returned_at: Utc::now(),
            terms: ReturnTerms::default(),
        },
    )
    .await
    .expect("return");

    assert_eq!(outcome.loan.fine, FineAmount::ZERO);
    assert!(outcome.payment.is_none());

    // 在庫はちょうど1冊戻り、総冊数を超えない
    assert_eq!(available_copies(&harness, book_id).await, 1);

    let notifications = harness.notifications.received();
    assert_eq!(notifications.last().unwrap().event_type, "loan_returned");
}

#[tokio::test]
async fn test_return_35_days_late_scenario() {
    // 在庫1冊を借りてちょうど35日後に返す → 罰金25、在庫復活
    let harness = test_deps();
    let book_id = seed_book(&harness.deps, 1).await;
    let member_id = seed_member(&harness.deps, true).await;

    let issued_at = Utc::now() - Duration::days(40);
    let loan_id = issue_loan(
        &harness.deps,
        IssueLoan {
            book_id,
            member_id,
            issued_at,
        },
    )
    .await
    .expect("borrow");
    assert_eq!(available_copies(&harness, book_id).await, 0);

    let outcome = return_loan(
        &harness.deps,
        ReturnLoan {
            loan_id,
            returned_at: issued_at + Duration::days(35),
            terms: ReturnTerms::default(),
        },
    )
    .await
    .expect("return");

    // 期限（30日）から5日延滞 → 5 × 5 = 25
    assert_eq!(outcome.loan.fine.value(), 25);
    assert!(outcome.event.was_overdue);
    assert_eq!(available_copies(&harness, book_id).await, 1);
}

#[tokio::test]
async fn test_return_with_clear_fine_waives_and_records_payment() {
    let harness = test_deps();
    let book_id = seed_book(&harness.deps, 1).await;
    let member_id = seed_member(&harness.deps, true).await;

    let issued_at = Utc::now() - Duration::days(40);
    let loan_id = issue_loan(
        &harness.deps,
        IssueLoan {
            book_id,
            member_id,
            issued_at,
        },
    )
    .await
    .expect("borrow");

    let outcome = return_loan(
        &harness.deps,
        ReturnLoan {
            loan_id,
            // ちょうど5日延滞 → 免除される罰金は25
            returned_at: issued_at + Duration::days(35),
            terms: ReturnTerms {
                waive_fine: true,
                ..ReturnTerms::default()
            },
        },
    )
    .await
    .expect("return");

    // 罰金は0、免除額は支払いレコードとして残る
    assert_eq!(outcome.loan.fine, FineAmount::ZERO);
    let payments = payments_for_loan(&harness.deps, loan_id).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].amount.value(), 25);
    assert_eq!(payments[0].processed_by, None);
}

#[tokio::test]
async fn test_return_with_fine_override() {
    let harness = test_deps();
    let book_id = seed_book(&harness.deps, 1).await;
    let member_id = seed_member(&harness.deps, true).await;

    let loan_id = issue_loan(&harness.deps, issue_cmd(book_id, member_id, 35))
        .await
        .expect("borrow");

    let outcome = return_loan(
        &harness.deps,
        ReturnLoan {
            loan_id,
            returned_at: Utc::now(),
            terms: ReturnTerms {
                fine_override: Some(FineAmount::try_from(10).unwrap()),
                ..ReturnTerms::default()
            },
        },
    )
    .await
    .expect("return");

    assert_eq!(outcome.loan.fine.value(), 10);
}

#[tokio::test]
async fn test_return_twice_rejected() {
    let harness = test_deps();
    let book_id = seed_book(&harness.deps, 1).await;
    let member_id = seed_member(&harness.deps, true).await;

    let loan_id = issue_loan(&harness.deps, issue_cmd(book_id, member_id, 0))
        .await
        .expect("borrow");

    return_loan(
        &harness.deps,
        ReturnLoan {
            loan_id,
            returned_at: Utc::now(),
            terms: ReturnTerms::default(),
        },
    )
    .await
    .expect("first return");

    let result = return_loan(
        &harness.deps,
        ReturnLoan {
            loan_id,
            returned_at: Utc::now(),
            terms: ReturnTerms::default(),
        },
    )
    .await;

    assert!(matches!(
        result.unwrap_err(),
        CirculationError::LoanAlreadyReturned
    ));
    // 2回目の返却で在庫が二重に増えることはない
    assert_eq!(available_copies(&harness, book_id).await, 1);
}

#[tokio::test]
async fn test_return_unknown_loan_not_found() {
    let harness = test_deps();

    let result = return_loan(
        &harness.deps,
        ReturnLoan {
            loan_id: LoanId::new(),
            returned_at: Utc::now(),
            terms: ReturnTerms::default(),
        },
    )
    .await;

    assert!(matches!(result.unwrap_err(), CirculationError::LoanNotFound));
}

// ============================================================================
// 再貸出
// ============================================================================

#[tokio::test]
async fn test_reissue_after_return() {
    let harness = test_deps();
    let book_id = seed_book(&harness.deps, 1).await;
    let member_id = seed_member(&harness.deps, true).await;

    let loan_id = issue_loan(&harness.deps, issue_cmd(book_id, member_id, 10))
        .await
        .expect("borrow");
    return_loan(
        &harness.deps,
        ReturnLoan {
            loan_id,
            returned_at: Utc::now(),
            terms: ReturnTerms::default(),
        },
    )
    .await
    .expect("return");

    // Act: 同じ組で再貸出
    let new_loan_id = reissue_loan(
        &harness.deps,
        ReissueLoan {
            loan_id,
            issued_at: Utc::now(),
        },
    )
    .await
    .expect("reissue");

    // Assert: 新しい貸出が作成され、在庫が再び減る
    assert_ne!(new_loan_id, loan_id);
    let new_loan = loan_state(&harness, new_loan_id).await;
    assert_eq!(new_loan.book_id(), book_id);
    assert_eq!(new_loan.member_id(), member_id);
    assert!(!new_loan.is_returned());
    assert_eq!(available_copies(&harness, book_id).await, 0);
}

#[tokio::test]
async fn test_reissue_of_active_loan_rejected() {
    let harness = test_deps();
    let book_id = seed_book(&harness.deps, 2).await;
    let member_id = seed_member(&harness.deps, true).await;

    let loan_id = issue_loan(&harness.deps, issue_cmd(book_id, member_id, 0))
        .await
        .expect("borrow");

    let result = reissue_loan(
        &harness.deps,
        ReissueLoan {
            loan_id,
            issued_at: Utc::now(),
        },
    )
    .await;

    assert!(matches!(
        result.unwrap_err(),
        CirculationError::LoanNotReturned
    ));
}

#[tokio::test]
async fn test_reissue_subject_to_current_availability() {
    // 返却後に他の会員が最後の1冊を借りていたら再貸出は失敗する
    let harness = test_deps();
    let book_id = seed_book(&harness.deps, 1).await;
    let member_id = seed_member(&harness.deps, true).await;
    let other = seed_member(&harness.deps, true).await;

    let loan_id = issue_loan(&harness.deps, issue_cmd(book_id, member_id, 0))
        .await
        .expect("borrow");
    return_loan(
        &harness.deps,
        ReturnLoan {
            loan_id,
            returned_at: Utc::now(),
            terms: ReturnTerms::default(),
        },
    )
    .await
    .expect("return");

    issue_loan(&harness.deps, issue_cmd(book_id, other, 0))
        .await
        .expect("other member borrows the last copy");

    let result = reissue_loan(
        &harness.deps,
        ReissueLoan {
            loan_id,
            issued_at: Utc::now(),
        },
    )
    .await;

    assert!(matches!(
        result.unwrap_err(),
        CirculationError::BookUnavailable
    ));
}

// ============================================================================
// 罰金精算
// ============================================================================

/// 延滞返却で罰金付きの貸出を1件作る（ちょうどdays_overdue日延滞）
async fn fined_loan(harness: &TestDeps, member_id: MemberId, days_overdue: i64) -> LoanId {
    let book_id = seed_book(&harness.deps, 1).await;
    let issued_at = Utc::now() - Duration::days(40);
    let loan_id = issue_loan(
        &harness.deps,
        IssueLoan {
            book_id,
            member_id,
            issued_at,
        },
    )
    .await
    .expect("borrow");
    return_loan(
        &harness.deps,
        ReturnLoan {
            loan_id,
            returned_at: issued_at + Duration::days(30 + days_overdue),
            terms: ReturnTerms::default(),
        },
    )
    .await
    .expect("return");
    loan_id
}

#[tokio::test]
async fn test_clear_fine_single() {
    let harness = test_deps();
    let member_id = seed_member(&harness.deps, true).await;
    let admin = seed_member(&harness.deps, true).await;
    // 5日延滞 → 罰金25
    let loan_id = fined_loan(&harness, member_id, 5).await;

    let payment = clear_fine(
        &harness.deps,
        ClearFine {
            loan_id,
            processed_by: Some(admin),
            notes: Some("paid at the desk".to_string()),
            cleared_at: Utc::now(),
        },
    )
    .await
    .expect("clear fine");

    assert_eq!(payment.amount.value(), 25);
    assert_eq!(payment.processed_by, Some(admin));

    // 貸出の罰金は0になっている
    match loan_state(&harness, loan_id).await {
        Loan::Returned(returned) => assert!(returned.fine.is_zero()),
        Loan::Active(_) => panic!("loan should be returned"),
    }
}

#[tokio::test]
async fn test_clear_fine_twice_rejected_not_duplicated() {
    let harness = test_deps();
    let member_id = seed_member(&harness.deps, true).await;
    let loan_id = fined_loan(&harness, member_id, 5).await;

    clear_fine(
        &harness.deps,
        ClearFine {
            loan_id,
            processed_by: None,
            notes: None,
            cleared_at: Utc::now(),
        },
    )
    .await
    .expect("first clear");

    // 2回目は拒否され、支払いレコードは増えない
    let result = clear_fine(
        &harness.deps,
        ClearFine {
            loan_id,
            processed_by: None,
            notes: None,
            cleared_at: Utc::now(),
        },
    )
    .await;

    assert!(matches!(
        result.unwrap_err(),
        CirculationError::NoOutstandingFine
    ));
    let payments = payments_for_loan(&harness.deps, loan_id).await.unwrap();
    assert_eq!(payments.len(), 1);
}

#[tokio::test]
async fn test_clear_fine_on_active_loan_rejected() {
    let harness = test_deps();
    let book_id = seed_book(&harness.deps, 1).await;
    let member_id = seed_member(&harness.deps, true).await;
    let loan_id = issue_loan(&harness.deps, issue_cmd(book_id, member_id, 0))
        .await
        .expect("borrow");

    let result = clear_fine(
        &harness.deps,
        ClearFine {
            loan_id,
            processed_by: None,
            notes: None,
            cleared_at: Utc::now(),
        },
    )
    .await;

    assert!(matches!(
        result.unwrap_err(),
        CirculationError::NoOutstandingFine
    ));
}

#[tokio::test]
async fn test_bulk_clear_three_fines_totaling_45() {
    // 罰金合計45の3件を一括精算 → 3件の支払いレコード、全件0
    let harness = test_deps();
    let member_id = seed_member(&harness.deps, true).await;

    // 1日・3日・5日延滞 → 5 + 15 + 25 = 45
    let first = fined_loan(&harness, member_id, 1).await;
    let second = fined_loan(&harness, member_id, 3).await;
    let third = fined_loan(&harness, member_id, 5).await;

    let payments = clear_member_fines(
        &harness.deps,
        ClearMemberFines {
            member_id,
            processed_by: None,
            notes: None,
            cleared_at: Utc::now(),
        },
    )
    .await
    .expect("bulk clear");

    assert_eq!(payments.len(), 3);
    let total: i64 = payments.iter().map(|payment| payment.amount.value()).sum();
    assert_eq!(total, 45);

    for loan_id in [first, second, third] {
        match loan_state(&harness, loan_id).await {
            Loan::Returned(returned) => assert!(returned.fine.is_zero()),
            Loan::Active(_) => panic!("loan should be returned"),
        }
    }

    // 罰金がもう残っていないので2回目はエラー
    let result = clear_member_fines(
        &harness.deps,
        ClearMemberFines {
            member_id,
            processed_by: None,
            notes: None,
            cleared_at: Utc::now(),
        },
    )
    .await;
    assert!(matches!(
        result.unwrap_err(),
        CirculationError::NoOutstandingFine
    ));
}

// ============================================================================
// 延滞者クエリとリマインダー
// ============================================================================

#[tokio::test]
async fn test_list_defaulters_annotates_floored_days() {
    let harness = test_deps();
    let member_id = seed_member(&harness.deps, true).await;
    let overdue_book = seed_book(&harness.deps, 1).await;
    let current_book = seed_book(&harness.deps, 1).await;

    // 期限から4日半超過 → 切り捨てで4日
    let overdue_loan_id = issue_loan(
        &harness.deps,
        IssueLoan {
            book_id: overdue_book,
            member_id,
            issued_at: Utc::now() - Duration::days(34) - Duration::hours(12),
        },
    )
    .await
    .expect("overdue borrow");

    // 期限内の貸出は含まれない
    issue_loan(&harness.deps, issue_cmd(current_book, member_id, 10))
        .await
        .expect("current borrow");

    let defaulters = list_defaulters(&harness.deps, Utc::now()).await.unwrap();

    assert_eq!(defaulters.len(), 1);
    assert_eq!(defaulters[0].loan.loan_id, overdue_loan_id);
    assert_eq!(defaulters[0].days_overdue, 4);
}

#[tokio::test]
async fn test_send_overdue_reminders() {
    let harness = test_deps();
    let member_id = seed_member(&harness.deps, true).await;
    let book_id = seed_book(&harness.deps, 1).await;

    issue_loan(&harness.deps, issue_cmd(book_id, member_id, 40))
        .await
        .expect("overdue borrow");

    let before = harness.notifications.received().len();
    let reminded = send_overdue_reminders(&harness.deps, Utc::now())
        .await
        .expect("reminders");

    assert_eq!(reminded, 1);
    let notifications = harness.notifications.received();
    assert_eq!(notifications.len(), before + 1);
    assert_eq!(notifications.last().unwrap().event_type, "loan_overdue");
    assert_eq!(harness.email.sent().len(), before + 1);
}

// ============================================================================
// カタログ・会員のルール
// ============================================================================

#[tokio::test]
async fn test_update_book_cannot_shrink_below_checked_out() {
    let harness = test_deps();
    let book_id = seed_book(&harness.deps, 2).await;
    let member_id = seed_member(&harness.deps, true).await;

    issue_loan(&harness.deps, issue_cmd(book_id, member_id, 0))
        .await
        .expect("borrow");

    // 1冊貸出中なので0冊にはできない
    let result = catalog::update_book(
        &harness.deps,
        UpdateBook {
            book_id,
            title: None,
            author: None,
            isbn: None,
            total_copies: Some(0),
        },
        Utc::now(),
    )
    .await;

    assert!(matches!(
        result.unwrap_err(),
        CirculationError::CopiesBelowCheckedOut
    ));

    // 1冊までは削減できる（貸出可能分が0になる）
    let book = catalog::update_book(
        &harness.deps,
        UpdateBook {
            book_id,
            title: None,
            author: None,
            isbn: None,
            total_copies: Some(1),
        },
        Utc::now(),
    )
    .await
    .expect("shrink to checked-out count");
    assert_eq!(book.total_copies, 1);
    assert_eq!(book.available_copies, 0);
}

#[tokio::test]
async fn test_delete_book_with_loan_history_rejected() {
    let harness = test_deps();
    let book_id = seed_book(&harness.deps, 1).await;
    let member_id = seed_member(&harness.deps, true).await;

    let loan_id = issue_loan(&harness.deps, issue_cmd(book_id, member_id, 0))
        .await
        .expect("borrow");
    return_loan(
        &harness.deps,
        ReturnLoan {
            loan_id,
            returned_at: Utc::now(),
            terms: ReturnTerms::default(),
        },
    )
    .await
    .expect("return");

    // 返却済みでも貸出履歴が残っている間は削除できない
    let result = catalog::delete_book(&harness.deps, book_id).await;
    assert!(matches!(result.unwrap_err(), CirculationError::BookHasLoans));
}

#[tokio::test]
async fn test_delete_member_with_loan_history_rejected() {
    let harness = test_deps();
    let book_id = seed_book(&harness.deps, 1).await;
    let member_id = seed_member(&harness.deps, true).await;

    issue_loan(&harness.deps, issue_cmd(book_id, member_id, 0))
        .await
        .expect("borrow");

    let result = membership::delete_member(&harness.deps, member_id).await;
    assert!(matches!(
        result.unwrap_err(),
        CirculationError::MemberHasLoans
    ));
}
