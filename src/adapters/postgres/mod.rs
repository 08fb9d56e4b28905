pub mod catalog_store;
pub mod loan_ledger;
pub mod member_store;
pub mod notification_sink;

// パブリックに型を再エクスポート
pub use catalog_store::CatalogStore as PostgresCatalogStore;
pub use loan_ledger::LoanLedger as PostgresLoanLedger;
pub use member_store::MemberStore as PostgresMemberStore;
pub use notification_sink::NotificationSink as PostgresNotificationSink;
