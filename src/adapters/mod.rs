pub mod log_email;
pub mod mock;
pub mod postgres;

pub use log_email::LogEmailSink;
