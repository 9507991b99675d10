//! Subscription confirmation emails via the Resend HTTP API.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::domain::billing::format_amount;
use crate::ports::{NotificationError, NotificationSink, SubscriptionConfirmation};

const RESEND_URL: &str = "https://api.resend.com/emails";

#[derive(Clone)]
pub struct ResendEmailNotifier {
    client: Client,
    api_key: SecretString,
    from: String,
    endpoint: String,
}

impl ResendEmailNotifier {
    /// `from` is a full mailbox, e.g. `Bizhub <billing@bizhub.example>`.
    pub fn new(api_key: SecretString, from: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            from: from.into(),
            endpoint: RESEND_URL.to_string(),
        }
    }

    /// Set a custom endpoint (for testing).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

pub(crate) fn confirmation_subject(c: &SubscriptionConfirmation) -> String {
    format!("Your {} subscription is active", c.plan_name)
}

pub(crate) fn confirmation_html(c: &SubscriptionConfirmation) -> String {
    format!(
        "<p>Hi {name},</p>\
         <p>Thanks for your payment of <strong>{amount}</strong>. \
         Your <strong>{plan}</strong> plan is active until {until}.</p>\
         <p>Reference: {reference}</p>",
        name = html_escape(&c.recipient_name),
        amount = format_amount(c.amount_minor_units, &c.currency),
        plan = html_escape(&c.plan_name),
        until = c.valid_until.as_datetime().format("%d %b %Y"),
        reference = html_escape(&c.transaction_reference),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[async_trait]
impl NotificationSink for ResendEmailNotifier {
    async fn send_subscription_confirmation(
        &self,
        confirmation: &SubscriptionConfirmation,
    ) -> Result<(), NotificationError> {
        let subject = confirmation_subject(confirmation);
        let html = confirmation_html(confirmation);
        let body = ResendRequest {
            from: &self.from,
            to: [confirmation.recipient_email.as_str()],
            subject: &subject,
            html: &html,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}
