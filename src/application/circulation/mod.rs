mod errors;
mod fine_service;
mod loan_service;
mod notify;
mod overdue;

pub use errors::{CirculationError, Result};
pub use fine_service::{clear_fine, clear_member_fines, payments_for_loan};
pub use loan_service::{ServiceDependencies, issue_loan, reissue_loan, return_loan};
pub use notify::{NotificationContent, notification_content};
pub use overdue::{DefaulterEntry, list_defaulters, send_overdue_reminders};
