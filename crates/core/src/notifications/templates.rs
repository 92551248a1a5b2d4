//! Booking email bodies

use callslot_domain::{Booking, BookingStatus};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Subject plus plain-text and HTML bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub text: String,
    pub html: String,
}

fn format_local(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%a, %d %b %Y, %H:%M").to_string()
}

/// `12345` minor units of INR -> `123.45 INR`.
pub fn format_money(amount_minor: i64, currency: &str) -> String {
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.unsigned_abs();
    format!("{sign}{}.{:02} {currency}", abs / 100, abs % 100)
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn payment_line(booking: &Booking, unpaid_label: &str) -> String {
    if booking.amount <= 0 {
        return unpaid_label.to_string();
    }
    let status = booking.payment_status.as_str().to_uppercase();
    let money = format_money(booking.amount, &booking.currency);
    match &booking.payment_provider {
        Some(provider) => format!("{status} {money} ({provider})"),
        None => format!("{status} {money}"),
    }
}

fn render(heading: &str, intro: &[String], rows: &[(&str, String)]) -> (String, String) {
    let mut text: Vec<String> = intro.to_vec();
    if !intro.is_empty() {
        text.push(String::new());
    }
    text.extend(rows.iter().map(|(label, value)| format!("{label}: {value}")));

    let intro_html: String =
        intro.iter().filter(|l| !l.is_empty()).map(|l| format!("<p>{}</p>", escape_html(l))).collect();
    let rows_html: String = rows
        .iter()
        .map(|(label, value)| {
            format!("<tr><td><strong>{}</strong></td><td>{}</td></tr>", escape_html(label), escape_html(value))
        })
        .collect();
    let html = format!("<div><h2>{}</h2>{intro_html}<table><tbody>{rows_html}</tbody></table></div>", escape_html(heading));

    (text.join("\n"), html)
}

fn detail_rows(booking: &Booking, tz: Tz) -> Vec<(&'static str, String)> {
    vec![
        ("When", format!("{} ({})", format_local(booking.start_at, tz), tz.name())),
        ("Ends", format!("{} ({})", format_local(booking.end_at(), tz), tz.name())),
        ("Duration", format!("{}m", booking.duration_minutes)),
    ]
}

/// Admin notification. The subject distinguishes a confirmed booking, a
/// plain cancellation and a paid booking that lost its slot.
pub fn admin_booking_email(booking: &Booking, tz: Tz) -> EmailContent {
    let headline = if booking.needs_reconciliation() {
        "Payment received - slot not confirmed"
    } else if booking.status == BookingStatus::Cancelled {
        "Call booking cancelled"
    } else {
        "New call booking"
    };
    let subject = format!(
        "{headline} - {} ({}m)",
        format_local(booking.start_at, tz),
        booking.duration_minutes
    );

    let mut rows = detail_rows(booking, tz);
    rows.extend([
        ("Status", booking.status.as_str().to_uppercase()),
        ("Topic", booking.topic.clone()),
        ("Title", booking.title.clone()),
        ("Name", booking.name.clone()),
        ("Email", booking.email.clone()),
        ("Payment", payment_line(booking, &booking.payment_status.as_str().to_uppercase())),
    ]);
    if let Some(order_id) = &booking.provider_order_id {
        rows.push(("Order", order_id.clone()));
    }
    if let Some(payment_id) = &booking.provider_payment_id {
        rows.push(("Payment ID", payment_id.clone()));
    }
    rows.push(("Booking ID", booking.id.to_string()));

    let (text, html) = render("New Call Booking", &[], &rows);
    EmailContent { subject, text, html }
}

/// Customer confirmation, or an apology when payment was captured but the
/// slot could not be held.
pub fn customer_booking_email(booking: &Booking, tz: Tz) -> EmailContent {
    let cancelled = booking.status == BookingStatus::Cancelled;
    let when = format_local(booking.start_at, tz);
    let subject = if cancelled {
        format!("Payment received - scheduling issue ({when})")
    } else {
        format!("Your call is booked - {when} ({}m)", booking.duration_minutes)
    };

    let mut intro = vec![format!("Hi {},", booking.name), String::new()];
    if cancelled {
        intro.push(
            "We received your payment, but we could not confirm your selected slot because it was no longer available."
                .to_string(),
        );
        intro.push("We will contact you to reschedule, or you can request a refund.".to_string());
    } else {
        intro.push("Your call booking is confirmed.".to_string());
    }

    let mut rows = detail_rows(booking, tz);
    rows.extend([
        ("Topic", booking.topic.clone()),
        ("Title", booking.title.clone()),
        ("Payment", payment_line(booking, "No payment required")),
    ]);
    if let Some(payment_id) = &booking.provider_payment_id {
        rows.push(("Payment ID", payment_id.clone()));
    }

    let heading = if cancelled { "Scheduling issue" } else { "Call confirmed" };
    let (text, html) = render(heading, &intro, &rows);
    EmailContent { subject, text, html }
}
