pub mod catalog_store;
pub mod email_sink;
pub mod loan_ledger;
pub mod member_store;
pub mod notification_sink;

pub use catalog_store::{CatalogError, CatalogStore};
pub use email_sink::{EmailMessage, EmailSink};
pub use loan_ledger::{LedgerError, LoanFilter, LoanLedger, LoanStatus};
pub use member_store::{MemberStore, MemberStoreError};
pub use notification_sink::{Notification, NotificationSink};
