use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, clear_loan_fine, clear_member_fines, create_book, create_loan, create_member,
    delete_book, delete_member, delete_notification, get_book, get_loan, get_member,
    list_books, list_defaulters, list_loan_payments, list_loans, list_members,
    list_notifications, mark_notification_read, reissue_loan, return_loan, update_book,
    update_member,
};

/// Creates the API router with all circulation endpoints
///
/// Catalog:
/// - GET/POST /books, GET/PUT/DELETE /books/:id
///
/// Membership:
/// - GET/POST /members, GET/PUT/DELETE /members/:id
/// - POST /members/:id/fines/clear - Bulk fine clearing
///
/// Ledger:
/// - GET/POST /loans, GET /loans/:id
/// - POST /loans/:id/return - Return a book
/// - POST /loans/:id/reissue - Borrow again after return
/// - POST /loans/:id/fine/clear - Clear a single fine
/// - GET /loans/:id/payments - Fine payment history
/// - GET /defaulters - Overdue loans annotated with days overdue
///
/// Notifications:
/// - GET /notifications?member_id= - Member inbox
/// - POST /notifications/:id/read, DELETE /notifications/:id
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Catalog
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/:id",
            get(get_book).put(update_book).delete(delete_book),
        )
        // Membership
        .route("/members", get(list_members).post(create_member))
        .route(
            "/members/:id",
            get(get_member).put(update_member).delete(delete_member),
        )
        .route("/members/:id/fines/clear", post(clear_member_fines))
        // Ledger
        .route("/loans", get(list_loans).post(create_loan))
        .route("/loans/:id", get(get_loan))
        .route("/loans/:id/return", post(return_loan))
        .route("/loans/:id/reissue", post(reissue_loan))
        .route("/loans/:id/fine/clear", post(clear_loan_fine))
        .route("/loans/:id/payments", get(list_loan_payments))
        .route("/defaulters", get(list_defaulters))
        // Notifications
        .route("/notifications", get(list_notifications))
        .route("/notifications/:id/read", post(mark_notification_read))
        .route("/notifications/:id", delete(delete_notification))
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
