use std::fmt;

use anyhow::Context;
use mail_parser::MessageParser;
use regex::Regex;

const RE_WHITESPACE_STR: &str = r"[\r\t\n]+";
const RE_LONG_SPACE_STR: &str = r" {2,}";
const RE_HTTP_LINK_STR: &str = r"https?:\/\/(www\.)?[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_\+.~#?&//=]*)";

lazy_static::lazy_static!(
    static ref RE_WHITESPACE: Regex = Regex::new(RE_WHITESPACE_STR).unwrap();
    static ref RE_LONG_SPACE: Regex = Regex::new(RE_LONG_SPACE_STR).unwrap();
    static ref RE_HTTP_LINK: Regex = Regex::new(RE_HTTP_LINK_STR).unwrap();
);

/// A Gmail message reduced to what classification and drafting need.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SimplifiedMessage {
    pub id: String,
    pub thread_id: String,
    /// Raw From header, e.g. `Jane Doe <jane@example.com>`
    pub from: Option<String>,
    /// Bare address extracted from From
    pub from_address: Option<String>,
    /// First To address, i.e. which of the user's aliases received it
    pub to: Option<String>,
    /// Reply-To address when present, otherwise None
    pub reply_to: Option<String>,
    /// RFC 5322 Message-ID, used for In-Reply-To on drafts
    pub rfc_message_id: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
}

impl SimplifiedMessage {
    pub fn from_gmail_message(msg: &google_gmail1::api::Message) -> anyhow::Result<Self> {
        let id = msg.id.clone().unwrap_or_default();
        let thread_id = msg.thread_id.clone().unwrap_or_default();

        let raw = msg
            .raw
            .as_ref()
            .with_context(|| format!("No raw content in message {}", id))?;

        let parsed = MessageParser::default().parse(raw);
        let stripped = parsed.map(strip_formatting_and_links).unwrap_or_default();

        Ok(SimplifiedMessage {
            id,
            thread_id,
            from: stripped.from,
            from_address: stripped.from_address,
            to: stripped.to,
            reply_to: stripped.reply_to,
            rfc_message_id: stripped.rfc_message_id,
            subject: stripped.subject,
            body: stripped.body,
        })
    }

    /// The address replies should go to: Reply-To when set, else From.
    pub fn reply_address(&self) -> Option<&str> {
        self.reply_to.as_deref().or(self.from_address.as_deref())
    }
}

impl fmt::Display for SimplifiedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<from>{}</from> <subject>{}</subject> <body>{}</body>",
            self.from.as_deref().unwrap_or_default(),
            self.subject.as_deref().unwrap_or_default(),
            self.body.as_deref().unwrap_or_default()
        )
    }
}

fn strip_formatting_and_links(msg: mail_parser::Message) -> StrippedMessage {
    let subject = msg.subject().map(|s| s.to_string());
    let body = msg.body_text(0).map(|b| b.to_string());
    let rfc_message_id = msg.message_id().map(|m| m.to_string());

    let from = msg.from().and_then(|f| f.first()).map(|addr| {
        let address = addr.address().unwrap_or_default();
        match addr.name.as_deref() {
            Some(name) => format!("{} <{}>", name, address),
            None => address.to_string(),
        }
    });
    let from_address = msg
        .from()
        .and_then(|f| f.first())
        .and_then(|a| a.address().map(|s| s.to_string()));
    let to = msg
        .to()
        .and_then(|f| f.first())
        .and_then(|a| a.address().map(|s| s.to_string()));
    let reply_to = msg
        .reply_to()
        .and_then(|f| f.first())
        .and_then(|a| a.address().map(|s| s.to_string()));

    let subject = subject.map(|s| {
        let s = RE_WHITESPACE.replace_all(&s, " ");
        let s = RE_LONG_SPACE.replace_all(&s, " ");
        s.trim().to_string()
    });
    let body = body.map(|b| {
        let b = html2text::from_read(b.as_bytes(), 400);
        let b = RE_HTTP_LINK.replace_all(&b, "[LINK]");
        let b = RE_WHITESPACE.replace_all(&b, " ");
        let b = RE_LONG_SPACE.replace_all(&b, " ");
        b.trim().to_string()
    });

    StrippedMessage {
        from,
        from_address,
        to,
        reply_to,
        rfc_message_id,
        subject,
        body,
    }
}

#[derive(Debug, Default)]
struct StrippedMessage {
    from: Option<String>,
    from_address: Option<String>,
    to: Option<String>,
    reply_to: Option<String>,
    rfc_message_id: Option<String>,
    subject: Option<String>,
    body: Option<String>,
}
