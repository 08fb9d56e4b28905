use crate::application::circulation::CirculationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
/// - 存在しないリソース → 404
/// - ビジネスルール違反 → 422
/// - 不正な入力 → 400
/// - ストレージ障害 → 500（詳細はログのみ、クライアントには一般的なメッセージ）
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Circulation(CirculationError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }
}

impl From<CirculationError> for ApiError {
    fn from(err: CirculationError) -> Self {
        ApiError::Circulation(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::BadRequest(message) => {
                let body = Json(ErrorResponse::new("BAD_REQUEST", message));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            ApiError::Circulation(err) => err,
        };

        let (status, error_type, message) = match err {
            // 404 Not Found - リクエストされたリソースが存在しない
            CirculationError::MemberNotFound => {
                (StatusCode::NOT_FOUND, "MEMBER_NOT_FOUND", "Member not found")
            }
            CirculationError::BookNotFound => {
                (StatusCode::NOT_FOUND, "BOOK_NOT_FOUND", "Book not found")
            }
            CirculationError::LoanNotFound => {
                (StatusCode::NOT_FOUND, "LOAN_NOT_FOUND", "Loan not found")
            }

            // 422 Unprocessable Entity - ビジネスルール違反
            CirculationError::MemberNotVerified => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "MEMBER_NOT_VERIFIED",
                "Member is not verified and cannot borrow books",
            ),
            CirculationError::MemberHasLoans => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "MEMBER_HAS_LOANS",
                "Member is still referenced by loan records",
            ),
            CirculationError::BookUnavailable => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "BOOK_UNAVAILABLE",
                "Book is not available for loan",
            ),
            CirculationError::CopiesBelowCheckedOut => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "COPIES_BELOW_CHECKED_OUT",
                "total_copies cannot drop below the number of checked-out copies",
            ),
            CirculationError::BookHasLoans => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "BOOK_HAS_LOANS",
                "Book is still referenced by loan records",
            ),
            CirculationError::DuplicateActiveLoan => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "DUPLICATE_ACTIVE_LOAN",
                "Member already has an active loan for this book",
            ),
            CirculationError::LoanLimitReached => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "LOAN_LIMIT_REACHED",
                "Loan limit exceeded (max 2 active loans per member)",
            ),
            CirculationError::LoanAlreadyReturned => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "LOAN_ALREADY_RETURNED",
                "Loan has already been returned",
            ),
            CirculationError::LoanNotReturned => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "LOAN_NOT_RETURNED",
                "Loan has not been returned yet",
            ),
            CirculationError::NoOutstandingFine => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "NO_OUTSTANDING_FINE",
                "No outstanding fine to clear",
            ),

            // 500 Internal Server Error - システム障害
            // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
            CirculationError::Catalog(ref e) => {
                tracing::error!(error = ?e, "Catalog store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CATALOG_ERROR",
                    "An unexpected error occurred",
                )
            }
            CirculationError::Members(ref e) => {
                tracing::error!(error = ?e, "Member store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "MEMBER_STORE_ERROR",
                    "An unexpected error occurred",
                )
            }
            CirculationError::Ledger(ref e) => {
                tracing::error!(error = ?e, "Loan ledger error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LEDGER_ERROR",
                    "An unexpected error occurred",
                )
            }
            CirculationError::Notifications(ref e) => {
                tracing::error!(error = %e, "Notification sink error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "NOTIFICATION_ERROR",
                    "An unexpected error occurred",
                )
            }
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
