//! Rendered account emails

use super::Email;

/// Welcome message with the first-login activation link
pub fn account_activation(to: &str, name: &str, frontend_url: &str, token: &str) -> Email {
    let link = action_link(frontend_url, "activate", token);
    render(
        to,
        "Welcome to Lentera Cendekia",
        name,
        "Your account has been created. Activate it and choose a password using the button below.",
        "Activate account",
        &link,
        "This link expires in 24 hours.",
    )
}

/// Confirmation for a changed email address
pub fn email_verification(to: &str, name: &str, frontend_url: &str, token: &str) -> Email {
    let link = action_link(frontend_url, "verify-email", token);
    render(
        to,
        "Verify your email address",
        name,
        "The email address on your Lentera Cendekia account was changed. Confirm it to keep signing in.",
        "Verify email",
        &link,
        "This link expires in 24 hours.",
    )
}

pub fn password_reset(to: &str, name: &str, frontend_url: &str, token: &str) -> Email {
    let link = action_link(frontend_url, "reset-password", token);
    render(
        to,
        "Reset your password",
        name,
        "We received a request to reset your password. If this was not you, ignore this email.",
        "Reset password",
        &link,
        "This link expires in 15 minutes.",
    )
}

fn action_link(frontend_url: &str, path: &str, token: &str) -> String {
    format!("{}/{}?token={}", frontend_url.trim_end_matches('/'), path, token)
}

fn render(
    to: &str,
    subject: &str,
    name: &str,
    intro: &str,
    action: &str,
    link: &str,
    expiry: &str,
) -> Email {
    let name_html = escape_html(name);
    let html_body = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{subject}</title>
</head>
<body style="margin:0;padding:0;background-color:#f5f5f5;font-family:Arial,sans-serif;">
    <div style="max-width:560px;margin:0 auto;padding:40px 20px;">
        <div style="background-color:#ffffff;border-radius:8px;overflow:hidden;">
            <div style="background-color:#1e3a8a;color:#ffffff;padding:28px 24px;text-align:center;">
                <h1 style="margin:0;font-size:22px;">Lentera Cendekia</h1>
            </div>
            <div style="padding:32px 24px;color:#374151;line-height:1.6;">
                <p>Hi {name_html},</p>
                <p>{intro}</p>
                <p style="text-align:center;margin:32px 0;">
                    <a href="{link}" style="background-color:#2563eb;color:#ffffff;padding:12px 28px;border-radius:6px;text-decoration:none;">{action}</a>
                </p>
                <p style="font-size:13px;color:#6b7280;">{expiry}</p>
                <p style="font-size:13px;color:#6b7280;word-break:break-all;">{link}</p>
            </div>
        </div>
    </div>
</body>
</html>"#
    );

    let text_body = format!("Hi {name},\n\n{intro}\n\n{action}: {link}\n\n{expiry}\n");

    Email {
        to: to.to_string(),
        subject: subject.to_string(),
        html_body,
        text_body,
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
