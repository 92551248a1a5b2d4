//! Mailer that writes messages to the log.

use async_trait::async_trait;
use callslot_core::{EmailMessage, Mailer};
use callslot_domain::{CallSlotError, Result};
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<()> {
        if message.to.is_empty() {
            return Err(CallSlotError::Config("Email recipient is required".into()));
        }
        info!(
            to = %message.to.join(", "),
            subject = %message.subject,
            body = %message.text,
            "email (log transport)"
        );
        Ok(())
    }
}
