//! Transactional email bodies.
//!
//! Each builder returns a ready-to-send [`EmailMessage`]; delivery is the
//! caller's concern. HTML and text parts carry the same content.

use crate::domain::ports::EmailMessage;
use crate::domain::{Email, PaymentOrder, User};

const BRAND: &str = "DigiDiploma";

fn wrap(title: &str, body_html: &str) -> String {
    format!(
        "<!doctype html><html><body style=\"font-family:Arial,sans-serif;color:#1f2937\">\
         <h2 style=\"color:#4f46e5\">{title}</h2>{body_html}\
         <p style=\"color:#6b7280;font-size:12px\">{BRAND}</p></body></html>"
    )
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Sent after registration.
pub fn welcome(user: &User) -> EmailMessage {
    let name = escape(&user.name);
    EmailMessage {
        to: user.email.clone(),
        subject: format!("Welcome to {BRAND}"),
        html: wrap(
            &format!("Welcome, {name}!"),
            "<p>Your account is ready. Browse notes, previous year papers, and more \
             for your branch and semester.</p>",
        ),
        text: format!(
            "Welcome, {}! Your {BRAND} account is ready.",
            user.name
        ),
        reply_to: None,
    }
}

/// Carries a password reset token.
pub fn password_reset(user: &User, token: &str, reset_url: &str) -> EmailMessage {
    let link = format!("{}?token={token}", reset_url.trim_end_matches('/'));
    EmailMessage {
        to: user.email.clone(),
        subject: format!("Reset your {BRAND} password"),
        html: wrap(
            "Password reset",
            &format!(
                "<p>Use the link below within one hour to choose a new password.</p>\
                 <p><a href=\"{link}\">{link}</a></p>\
                 <p>If you did not ask for this, ignore this email.</p>",
                link = escape(&link)
            ),
        ),
        text: format!(
            "Reset your password within one hour: {link}\nIf you did not ask for this, ignore this email."
        ),
        reply_to: None,
    }
}

/// Confirms a successful payment.
pub fn payment_receipt(user: &User, order: &PaymentOrder) -> EmailMessage {
    let amount = format_inr(order.amount);
    let description = order.purpose.describe();
    EmailMessage {
        to: user.email.clone(),
        subject: format!("{BRAND} payment receipt {}", order.receipt),
        html: wrap(
            "Payment received",
            &format!(
                "<p>We received {amount} for {}.</p><p>Receipt: {}</p>",
                escape(&description),
                escape(&order.receipt)
            ),
        ),
        text: format!(
            "We received {amount} for {description}. Receipt: {}",
            order.receipt
        ),
        reply_to: None,
    }
}

/// Forwards a contact form message to the site admin.
pub fn contact_forward(
    admin: &Email,
    sender_name: &str,
    sender_email: &Email,
    subject: Option<&str>,
    message: &str,
) -> EmailMessage {
    let subject = subject.unwrap_or("New contact message");
    EmailMessage {
        to: admin.clone(),
        subject: format!("[{BRAND} contact] {subject}"),
        html: wrap(
            "New contact message",
            &format!(
                "<p><strong>From:</strong> {} &lt;{}&gt;</p><p>{}</p>",
                escape(sender_name),
                escape(sender_email.as_ref()),
                escape(message).replace('\n', "<br>")
            ),
        ),
        text: format!("From: {sender_name} <{sender_email}>\n\n{message}"),
        reply_to: Some(sender_email.clone()),
    }
}

/// Rupee amount from paise, e.g. `₹99.00`.
pub fn format_inr(paise: u64) -> String {
    format!("₹{}.{:02}", paise / 100, paise % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserRole;
    use crate::domain::test_fixtures::user;
    use rstest::rstest;

    #[rstest]
    #[case(9_900, "₹99.00")]
    #[case(5, "₹0.05")]
    fn formats_paise(#[case] paise: u64, #[case] expected: &str) {
        assert_eq!(format_inr(paise), expected);
    }

    #[rstest]
    fn reset_mail_embeds_the_token_link() {
        let message = password_reset(&user(UserRole::Student), "abc123", "https://app.test/reset/");
        assert!(message.text.contains("https://app.test/reset?token=abc123"));
        assert!(message.html.contains("https://app.test/reset?token=abc123"));
    }

    #[rstest]
    fn contact_mail_escapes_markup_and_sets_reply_to() {
        let admin = Email::new("admin@example.in").expect("email");
        let sender = Email::new("visitor@example.in").expect("email");
        let message = contact_forward(&admin, "<b>Eve</b>", &sender, None, "hi\nthere");
        assert!(message.html.contains("&lt;b&gt;Eve&lt;/b&gt;"));
        assert!(message.html.contains("hi<br>there"));
        assert_eq!(message.reply_to, Some(sender));
    }
}
