use anyhow::Context;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use lettre::message::MultiPart;

use super::ReplyDraft;

/// Builds the RFC 2822 reply draft as a base64url string for the
/// drafts endpoint.
pub fn build_reply_mime(from: &str, draft: &ReplyDraft) -> anyhow::Result<String> {
    let signature = draft.signature_html.as_deref();
    let html_body = match signature {
        Some(sig) => format!("{}<br/><br/>{}", text_to_html(&draft.body), sig),
        None => text_to_html(&draft.body),
    };
    let plain_body = match signature {
        Some(sig) => format!("{}\n\n{}", draft.body, html_to_plain(sig)),
        None => draft.body.clone(),
    };

    let mut builder = lettre::Message::builder()
        .from(from.parse().context("Could not parse draft sender")?)
        .to(draft.to.parse().context("Could not parse draft recipient")?)
        .subject(reply_subject(&draft.subject));

    if let Some(ref message_id) = draft.in_reply_to {
        builder = builder
            .in_reply_to(message_id.clone())
            .references(message_id.clone());
    }

    let email = builder.multipart(MultiPart::alternative_plain_html(plain_body, html_body))?;

    Ok(encode_web_safe(&email.formatted()))
}

/// A standalone HTML message (the digest), base64url encoded.
pub fn build_message_mime(
    from: &str,
    to: &str,
    subject: &str,
    html_body: &str,
) -> anyhow::Result<String> {
    let email = lettre::Message::builder()
        .from(from.parse().context("Could not parse message sender")?)
        .to(to.parse().context("Could not parse message recipient")?)
        .subject(subject)
        .multipart(MultiPart::alternative_plain_html(
            html_to_plain(html_body),
            html_body.to_string(),
        ))?;

    Ok(encode_web_safe(&email.formatted()))
}

pub fn reply_subject(subject: &str) -> String {
    let trimmed = subject.trim();
    if trimmed.to_ascii_lowercase().starts_with("re:") {
        trimmed.to_string()
    } else {
        format!("Re: {}", trimmed)
    }
}

pub fn html_to_plain(html: &str) -> String {
    html2text::from_read(html.as_bytes(), 400)
        .trim()
        .to_string()
}

pub fn text_to_html(text: &str) -> String {
    let escaped = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");

    escaped.replace('\n', "<br/>")
}

pub fn encode_web_safe(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_subject_prefixes_once() {
        assert_eq!(reply_subject("Hello"), "Re: Hello");
        assert_eq!(reply_subject("Re: Hello"), "Re: Hello");
        assert_eq!(reply_subject("RE: Hello"), "RE: Hello");
        assert_eq!(reply_subject("  Hello  "), "Re: Hello");
    }

    #[test]
    fn text_to_html_escapes_and_breaks() {
        let html = text_to_html("a < b & c\nnext line");
        assert_eq!(html, "a &lt; b &amp; c<br/>next line");
    }

    #[test]
    fn reply_mime_is_decodable_and_threads() {
        let draft = ReplyDraft {
            thread_id: "t1".to_string(),
            to: "jane@example.com".to_string(),
            subject: "Quick question".to_string(),
            body: "Sure, 3pm works.".to_string(),
            in_reply_to: Some("abc123@example.com".to_string()),
            signature_html: Some("<p>Best,<br/>Me</p>".to_string()),
        };

        let raw = build_reply_mime("me@example.com", &draft).unwrap();
        let decoded = URL_SAFE_NO_PAD.decode(&raw).unwrap();
        let text = String::from_utf8_lossy(&decoded);

        assert!(text.contains("Subject: Re: Quick question"));
        assert!(text.contains("In-Reply-To:"));
        assert!(text.contains("abc123@example.com"));
        assert!(text.contains("To: jane@example.com"));
    }

    #[test]
    fn message_mime_carries_both_parts() {
        let raw =
            build_message_mime("me@example.com", "me@example.com", "Inbox Summary", "<b>2 new</b>")
                .unwrap();
        let decoded = URL_SAFE_NO_PAD.decode(&raw).unwrap();
        let text = String::from_utf8_lossy(&decoded);

        assert!(text.contains("Subject: Inbox Summary"));
        assert!(text.contains("multipart/alternative"));
    }
}
