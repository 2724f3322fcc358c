//! Message data model and subject validation
//!
//! [`Message`] is the ephemeral value the engine hands to the delivery path:
//! a subject plus raw payload bytes. [`Notification`] is what user handlers
//! receive after decoding. The conversion copies everything it needs, since
//! the engine may reclaim the message's backing memory as soon as the
//! delivery callback returns.

use bytes::Bytes;

/// An inbound protocol message as delivered by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Subject the message arrived on.
    pub subject: String,
    /// Raw payload. May be empty; the stated length is authoritative and the
    /// bytes carry no terminator.
    pub payload: Bytes,
}

impl Message {
    pub fn new(subject: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            subject: subject.into(),
            payload: payload.into(),
        }
    }
}

/// A decoded delivery handed to the registered subscription handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Subject the message arrived on.
    pub subject: String,
    /// Payload decoded as UTF-8 text. Empty when the payload was absent or
    /// zero-length; invalid sequences are replaced rather than failing the
    /// delivery path.
    pub text: String,
}

impl From<Message> for Notification {
    fn from(message: Message) -> Self {
        let text = if message.payload.is_empty() {
            String::new()
        } else {
            // Length-authoritative: embedded NUL bytes are data, not
            // terminators, and must survive the decode.
            String::from_utf8_lossy(&message.payload).into_owned()
        };
        Notification {
            subject: message.subject,
            text,
        }
    }
}

/// Check a subject against the protocol's naming rules.
///
/// Subjects are dot-delimited token sequences with no empty tokens and no
/// whitespace. With `allow_wildcards`, a token may be `*` and the final token
/// may be `>`; publish subjects must be literal.
pub fn is_valid_subject(subject: &str, allow_wildcards: bool) -> bool {
    if subject.is_empty() {
        return false;
    }

    let tokens: Vec<&str> = subject.split('.').collect();
    let last = tokens.len() - 1;

    for (position, token) in tokens.iter().enumerate() {
        if token.is_empty() {
            return false;
        }
        match *token {
            "*" if allow_wildcards => continue,
            ">" if allow_wildcards && position == last => continue,
            _ => {}
        }
        if token
            .chars()
            .any(|c| c.is_whitespace() || c == '*' || c == '>')
        {
            return false;
        }
    }

    true
}
