//! Notification adapters.
//!
//! - `ResendEmailNotifier` - confirmation email through Resend
//! - `LogNotifier` - structured log line only
//! - `RecordingNotifier` - in-memory capture for tests

mod log_notifier;
mod recording_notifier;
mod resend_email;

pub use log_notifier::LogNotifier;
pub use recording_notifier::RecordingNotifier;
pub use resend_email::ResendEmailNotifier;
