//! Fire-and-forget booking notifications
//!
//! Sends happen on a spawned task. A failed send is logged and dropped; it
//! never changes the outcome of the booking or payment that triggered it.

pub mod ports;
pub mod templates;

use std::sync::Arc;

use callslot_domain::Booking;
use chrono_tz::Tz;
use tracing::{debug, warn};

use self::ports::{EmailMessage, Mailer};
use self::templates::{admin_booking_email, customer_booking_email, EmailContent};

/// Sends booking emails in the background and logs failures.
#[derive(Clone)]
pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
    admin_recipients: Vec<String>,
    subject_prefix: String,
    send_customer_emails: bool,
    time_zone: Tz,
}

impl NotificationDispatcher {
    /// Create a dispatcher with no admin recipients and customer emails on.
    pub fn new(mailer: Arc<dyn Mailer>, time_zone: Tz) -> Self {
        Self {
            mailer,
            admin_recipients: Vec::new(),
            subject_prefix: String::new(),
            send_customer_emails: true,
            time_zone,
        }
    }

    pub fn with_admin_recipients(mut self, recipients: Vec<String>) -> Self {
        self.admin_recipients = recipients;
        self
    }

    pub fn with_subject_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subject_prefix = prefix.into().split_whitespace().collect::<Vec<_>>().join(" ");
        self
    }

    pub fn with_customer_emails(mut self, enabled: bool) -> Self {
        self.send_customer_emails = enabled;
        self
    }

    fn message(&self, to: Vec<String>, content: EmailContent) -> EmailMessage {
        let subject = if self.subject_prefix.is_empty() {
            content.subject
        } else {
            format!("{}: {}", self.subject_prefix, content.subject)
        };
        EmailMessage { to, subject, text: content.text, html: content.html }
    }

    /// Messages for one booking event: admin copy first, then the customer.
    pub fn booking_messages(&self, booking: &Booking) -> Vec<EmailMessage> {
        let mut messages = Vec::with_capacity(2);
        if !self.admin_recipients.is_empty() {
            messages.push(self.message(self.admin_recipients.clone(), admin_booking_email(booking, self.time_zone)));
        }
        if self.send_customer_emails {
            messages.push(self.message(vec![booking.email.clone()], customer_booking_email(booking, self.time_zone)));
        }
        messages
    }

    /// Queue booking emails in the background. `tag` labels log lines.
    pub fn notify_booking(&self, booking: &Booking, tag: &'static str) -> tokio::task::JoinHandle<()> {
        let messages = self.booking_messages(booking);
        let mailer = Arc::clone(&self.mailer);
        let booking_id = booking.id;

        tokio::spawn(async move {
            for message in messages {
                let recipients = message.to.len();
                match mailer.send(message).await {
                    Ok(()) => debug!(%booking_id, tag, recipients, "booking email sent"),
                    Err(err) => warn!(%booking_id, tag, error = %err, "booking email failed"),
                }
            }
        })
    }
}
