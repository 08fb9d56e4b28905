use crate::application::{catalog, circulation, membership};
use crate::domain::commands::{
    ClearFine, ClearMemberFines, CreateBook, CreateMember, ReissueLoan, ReturnLoan, UpdateBook,
    UpdateMember,
};
use crate::domain::loan::ReturnTerms;
use crate::domain::value_objects::{
    BookId, FineAmount, LoanId, MemberId, NotificationId, Role,
};
use crate::ports::loan_ledger::{LoanFilter, LoanStatus};
use crate::ports::{LoanLedger, NotificationSink};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    error::ApiError,
    types::{
        BookResponse, ClearFineRequest, CreateBookRequest, CreateMemberRequest, DefaulterResponse,
        ErrorResponse, FinePaymentResponse, IssueLoanRequest, ListLoansQuery,
        ListNotificationsQuery, LoanCreatedResponse, LoanResponse, LoanReturnedResponse,
        MemberResponse, NotificationResponse, ReturnLoanRequest, UpdateBookRequest,
        UpdateMemberRequest,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: circulation::ServiceDependencies,
}

// ============================================================================
// カタログ（GET/POST /books, GET/PUT/DELETE /books/:id）
// ============================================================================

/// GET /books - 全蔵書を取得
pub async fn list_books(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let books = catalog::list_books(&state.service_deps).await?;
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// POST /books - 蔵書を登録
///
/// 登録直後はすべての冊数が貸出可能。
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookRequest>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    let cmd = CreateBook {
        title: req.title,
        author: req.author,
        isbn: req.isbn,
        total_copies: req.total_copies,
    };

    let book = catalog::create_book(&state.service_deps, cmd, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(BookResponse::from(book))))
}

/// GET /books/:id - 蔵書詳細を取得
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = catalog::get_book(&state.service_deps, BookId::from_uuid(book_id)).await?;
    Ok(Json(BookResponse::from(book)))
}

/// PUT /books/:id - 蔵書を更新
///
/// 強制されるビジネスルール:
/// - 総冊数は貸出中の冊数を下回れない
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
    Json(req): Json<UpdateBookRequest>,
) -> Result<Json<BookResponse>, ApiError> {
    let cmd = UpdateBook {
        book_id: BookId::from_uuid(book_id),
        title: req.title,
        author: req.author,
        isbn: req.isbn,
        total_copies: req.total_copies,
    };

    let book = catalog::update_book(&state.service_deps, cmd, Utc::now()).await?;
    Ok(Json(BookResponse::from(book)))
}

/// DELETE /books/:id - 蔵書を削除
///
/// 貸出レコードが参照している間は拒否される。
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    catalog::delete_book(&state.service_deps, BookId::from_uuid(book_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// 会員（GET/POST /members, GET/PUT/DELETE /members/:id）
// ============================================================================

/// GET /members - 全会員を取得
pub async fn list_members(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MemberResponse>>, ApiError> {
    let members = membership::list_members(&state.service_deps).await?;
    Ok(Json(members.into_iter().map(MemberResponse::from).collect()))
}

/// POST /members - 会員を登録
///
/// 登録直後は未確認（verified = false）。
pub async fn create_member(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMemberRequest>,
) -> Result<(StatusCode, Json<MemberResponse>), ApiError> {
    let cmd = CreateMember {
        name: req.name,
        email: req.email,
        role: req.role.unwrap_or(Role::Member),
    };

    let member = membership::create_member(&state.service_deps, cmd, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(MemberResponse::from(member))))
}

/// GET /members/:id - 会員詳細を取得
pub async fn get_member(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<Uuid>,
) -> Result<Json<MemberResponse>, ApiError> {
    let member =
        membership::get_member(&state.service_deps, MemberId::from_uuid(member_id)).await?;
    Ok(Json(MemberResponse::from(member)))
}

/// PUT /members/:id - 会員を更新（本人確認・ロール変更を含む）
pub async fn update_member(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<Uuid>,
    Json(req): Json<UpdateMemberRequest>,
) -> Result<Json<MemberResponse>, ApiError> {
    let cmd = UpdateMember {
        member_id: MemberId::from_uuid(member_id),
        name: req.name,
        email: req.email,
        verified: req.verified,
        role: req.role,
    };

    let member = membership::update_member(&state.service_deps, cmd, Utc::now()).await?;
    Ok(Json(MemberResponse::from(member)))
}

/// DELETE /members/:id - 会員を削除
///
/// 貸出レコードが参照している間は拒否される。
pub async fn delete_member(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    membership::delete_member(&state.service_deps, MemberId::from_uuid(member_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// 貸出（POST /loans, GET /loans, GET /loans/:id, ...）
// ============================================================================

/// POST /loans - 新しい貸出を作成
///
/// 強制されるビジネスルール:
/// - 会員が存在し、本人確認済みであること
/// - 書籍が存在し、貸出可能な在庫があること
/// - 同じ書籍の未返却の貸出がないこと
/// - 未返却の貸出数が上限（2冊）未満であること
pub async fn create_loan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IssueLoanRequest>,
) -> Result<(StatusCode, Json<LoanCreatedResponse>), ApiError> {
    let cmd = req.to_command();

    let loan_id = circulation::issue_loan(&state.service_deps, cmd.clone()).await?;

    // 作成された貸出を取得して完全な情報を返す
    let loan = state
        .service_deps
        .ledger
        .get(loan_id)
        .await
        .map_err(circulation::CirculationError::from)?
        .ok_or(circulation::CirculationError::LoanNotFound)?;

    let view = LoanResponse::from_loan(&loan, Utc::now());
    let response = LoanCreatedResponse {
        loan_id: view.loan_id,
        book_id: view.book_id,
        member_id: view.member_id,
        issued_at: view.issued_at,
        deadline: view.deadline,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /loans/:id/return - 書籍を返却
///
/// 強制されるビジネスルール:
/// - 貸出が存在すること
/// - 既に返却済みでないこと
/// - 罰金 = 延滞日数（切り上げ） × 日額。fineで明示指定、clear_fineで免除
pub async fn return_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
    Json(req): Json<ReturnLoanRequest>,
) -> Result<Json<LoanReturnedResponse>, ApiError> {
    let fine_override = match req.fine {
        Some(value) => Some(
            FineAmount::try_from(value)
                .map_err(|_| ApiError::bad_request(format!("invalid fine amount: {}", value)))?,
        ),
        None => None,
    };

    let cmd = ReturnLoan {
        loan_id: LoanId::from_uuid(loan_id),
        returned_at: Utc::now(),
        terms: ReturnTerms {
            fine_override,
            waive_fine: req.clear_fine,
            condition: req.condition,
            notes: req.notes,
        },
    };

    let outcome = circulation::return_loan(&state.service_deps, cmd).await?;

    let response = LoanReturnedResponse {
        loan_id: outcome.loan.loan_id.value(),
        returned_at: outcome.loan.returned_at,
        fine: outcome.loan.fine.value(),
        waived: outcome.event.waived.map(|amount| amount.value()),
    };

    Ok(Json(response))
}

/// POST /loans/:id/reissue - 返却済みの貸出と同じ組で再貸出
///
/// 現在の状態に対して通常の貸出と同じ検証が行われる。
pub async fn reissue_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<(StatusCode, Json<LoanCreatedResponse>), ApiError> {
    let cmd = ReissueLoan {
        loan_id: LoanId::from_uuid(loan_id),
        issued_at: Utc::now(),
    };

    let new_loan_id = circulation::reissue_loan(&state.service_deps, cmd).await?;

    let loan = state
        .service_deps
        .ledger
        .get(new_loan_id)
        .await
        .map_err(circulation::CirculationError::from)?
        .ok_or(circulation::CirculationError::LoanNotFound)?;

    let view = LoanResponse::from_loan(&loan, Utc::now());
    let response = LoanCreatedResponse {
        loan_id: view.loan_id,
        book_id: view.book_id,
        member_id: view.member_id,
        issued_at: view.issued_at,
        deadline: view.deadline,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /loans/:id - 貸出詳細をIDで取得
///
/// 未返却の貸出には延滞日数（切り捨て）の注釈が付く。
pub async fn get_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, QueryError> {
    let loan_id = LoanId::from_uuid(loan_id);

    match state.service_deps.ledger.get(loan_id).await {
        Ok(Some(loan)) => Ok(Json(LoanResponse::from_loan(&loan, Utc::now()))),
        Ok(None) => Err(QueryError::NotFound(format!(
            "Loan {} not found",
            loan_id.value()
        ))),
        Err(e) => Err(QueryError::InternalError(e.to_string())),
    }
}

/// GET /loans - オプションフィルタ付き貸出一覧取得
///
/// クエリパラメータ:
/// - member_id: 会員IDでフィルタリング（オプション）
/// - book_id: 書籍IDでフィルタリング（オプション）
/// - status: ステータスでフィルタリング（active, returned）（オプション）
pub async fn list_loans(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListLoansQuery>,
) -> Result<Json<Vec<LoanResponse>>, QueryError> {
    let status = match &query.status {
        Some(status_str) => Some(
            LoanStatus::from_str(status_str).map_err(QueryError::BadRequest)?,
        ),
        None => None,
    };

    let filter = LoanFilter {
        member_id: query.member_id.map(MemberId::from_uuid),
        book_id: query.book_id.map(BookId::from_uuid),
        status,
    };

    let loans = state
        .service_deps
        .ledger
        .find(filter)
        .await
        .map_err(|e| QueryError::InternalError(e.to_string()))?;

    let now = Utc::now();
    Ok(Json(
        loans
            .iter()
            .map(|loan| LoanResponse::from_loan(loan, now))
            .collect(),
    ))
}

// ============================================================================
// 罰金（POST /loans/:id/fine/clear, POST /members/:id/fines/clear, ...）
// ============================================================================

/// POST /loans/:id/fine/clear - 1件の貸出の罰金を精算
///
/// 全額を1件の支払いレコードとして記録し、罰金を0にする。
/// 罰金が残っていない場合は拒否される。
pub async fn clear_loan_fine(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
    Json(req): Json<ClearFineRequest>,
) -> Result<Json<FinePaymentResponse>, ApiError> {
    let cmd = ClearFine {
        loan_id: LoanId::from_uuid(loan_id),
        processed_by: req.processed_by.map(MemberId::from_uuid),
        notes: req.notes,
        cleared_at: Utc::now(),
    };

    let payment = circulation::clear_fine(&state.service_deps, cmd).await?;
    Ok(Json(FinePaymentResponse::from(payment)))
}

/// POST /members/:id/fines/clear - 会員の全罰金を一括精算
///
/// 罰金が残っている貸出ごとに1件の支払いレコードを作成する。
/// 残っている罰金がなければ拒否される。
pub async fn clear_member_fines(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<Uuid>,
    Json(req): Json<ClearFineRequest>,
) -> Result<Json<Vec<FinePaymentResponse>>, ApiError> {
    let cmd = ClearMemberFines {
        member_id: MemberId::from_uuid(member_id),
        processed_by: req.processed_by.map(MemberId::from_uuid),
        notes: req.notes,
        cleared_at: Utc::now(),
    };

    let payments = circulation::clear_member_fines(&state.service_deps, cmd).await?;
    Ok(Json(
        payments.into_iter().map(FinePaymentResponse::from).collect(),
    ))
}

/// GET /loans/:id/payments - 貸出に紐づく支払い履歴を取得
pub async fn list_loan_payments(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<Vec<FinePaymentResponse>>, ApiError> {
    let payments =
        circulation::payments_for_loan(&state.service_deps, LoanId::from_uuid(loan_id)).await?;
    Ok(Json(
        payments.into_iter().map(FinePaymentResponse::from).collect(),
    ))
}

// ============================================================================
// 延滞者（GET /defaulters）
// ============================================================================

/// GET /defaulters - 延滞者クエリ（読み取り専用）
///
/// 返却期限を過ぎたすべての未返却の貸出を、延滞日数
/// （切り捨て）の注釈付きで返す。状態は変更しない。
pub async fn list_defaulters(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DefaulterResponse>>, ApiError> {
    let defaulters = circulation::list_defaulters(&state.service_deps, Utc::now()).await?;
    Ok(Json(
        defaulters.into_iter().map(DefaulterResponse::from).collect(),
    ))
}

// ============================================================================
// 通知（GET /notifications, POST /notifications/:id/read, DELETE /notifications/:id）
// ============================================================================

/// GET /notifications - 会員の通知一覧を取得
///
/// member_idクエリパラメータが必須。
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<Vec<NotificationResponse>>, QueryError> {
    let member_id = query.member_id.ok_or_else(|| {
        QueryError::BadRequest("member_id query parameter is required".to_string())
    })?;

    let notifications = state
        .service_deps
        .notifications
        .list_for_member(MemberId::from_uuid(member_id))
        .await
        .map_err(|e| QueryError::InternalError(e.to_string()))?;

    Ok(Json(
        notifications
            .into_iter()
            .map(NotificationResponse::from)
            .collect(),
    ))
}

/// POST /notifications/:id/read - 通知を既読にする
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, QueryError> {
    let found = state
        .service_deps
        .notifications
        .mark_read(NotificationId::from_uuid(notification_id))
        .await
        .map_err(|e| QueryError::InternalError(e.to_string()))?;

    if !found {
        return Err(QueryError::NotFound(format!(
            "Notification {} not found",
            notification_id
        )));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /notifications/:id - 通知を削除する
pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, QueryError> {
    let found = state
        .service_deps
        .notifications
        .delete(NotificationId::from_uuid(notification_id))
        .await
        .map_err(|e| QueryError::InternalError(e.to_string()))?;

    if !found {
        return Err(QueryError::NotFound(format!(
            "Notification {} not found",
            notification_id
        )));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Error types
// ============================================================================

/// クエリハンドラー用のエラー型
#[derive(Debug)]
pub enum QueryError {
    NotFound(String),
    BadRequest(String),
    InternalError(String),
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            QueryError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            QueryError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            QueryError::InternalError(msg) => {
                // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
                tracing::error!("Internal error in query handler: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
