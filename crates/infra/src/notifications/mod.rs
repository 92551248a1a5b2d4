//! Outbound email transports

pub mod log_mailer;
pub mod resend;

use std::sync::Arc;

use callslot_core::Mailer;
use callslot_domain::{EmailConfig, EmailProvider, Result};

pub use log_mailer::LogMailer;
pub use resend::ResendMailer;

/// Build the transport selected by `EMAIL_PROVIDER`.
pub fn mailer_from_config(config: &EmailConfig) -> Result<Arc<dyn Mailer>> {
    match config.provider {
        EmailProvider::Log => Ok(Arc::new(LogMailer)),
        EmailProvider::Resend => Ok(Arc::new(ResendMailer::from_config(config)?)),
    }
}
