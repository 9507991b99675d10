//! Notifier that records confirmations in memory, for tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::ports::{NotificationError, NotificationSink, SubscriptionConfirmation};

#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<SubscriptionConfirmation>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every send fails after recording the attempt.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SubscriptionConfirmation> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().map(|s| s.len()).unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn send_subscription_confirmation(
        &self,
        confirmation: &SubscriptionConfirmation,
    ) -> Result<(), NotificationError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(confirmation.clone());
        }
        if self.fail {
            return Err(NotificationError::Transport("recording notifier set to fail".to_string()));
        }
        Ok(())
    }
}
