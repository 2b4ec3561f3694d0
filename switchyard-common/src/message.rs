//! The message collaborator consumed by channels.
//!
//! Channels treat a message as opaque: they may look up headers, read the
//! recipients it carries and serialise it, nothing more.

use std::{
    fmt::Debug,
    io,
};

use crate::{
    address::{Address, AddressList},
    error::MessageError,
};

/// Header carrying the message identifier.
pub const MESSAGE_ID: &str = "Message-ID";

/// What a channel needs from a message.
pub trait Message: Debug + Send + Sync {
    /// All values of the named header, in order of appearance. Header names
    /// are matched case-insensitively.
    fn header(&self, name: &str) -> Vec<&str>;

    /// The recipients named by the message itself (`To`, `Cc`, `Bcc`).
    fn recipients(&self) -> &[Address];

    /// Serialise the message as it would appear on the wire.
    ///
    /// # Errors
    /// Any error raised by `out`.
    fn write_to(&self, out: &mut dyn io::Write) -> io::Result<()>;

    fn message_id(&self) -> Option<&str> {
        self.header(MESSAGE_ID).first().copied()
    }

    /// # Errors
    /// If the message cannot be serialised.
    fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(buffer)
    }
}

/// A plain RFC 5322 message: an ordered header block and an opaque body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailMessage {
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    recipients: AddressList,
}

impl MailMessage {
    #[must_use]
    pub fn builder() -> MailMessageBuilder {
        MailMessageBuilder::default()
    }

    /// Parse a raw message.
    ///
    /// # Errors
    /// If the header block is malformed or a recipient header holds an
    /// invalid address.
    pub fn parse(raw: &[u8]) -> Result<Self, MessageError> {
        let (parsed, offset) = mailparse::parse_headers(raw)?;
        let headers: Vec<(String, String)> = parsed
            .iter()
            .map(|header| (header.get_key(), header.get_value()))
            .collect();

        let mut recipients = AddressList::default();
        for (name, value) in &headers {
            if is_recipient_header(name) {
                recipients.extend(AddressList::parse(value)?.0);
            }
        }

        Ok(Self {
            headers,
            body: raw.get(offset..).unwrap_or_default().to_vec(),
            recipients,
        })
    }

    /// Replace every value of `name` with `value`.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl Message for MailMessage {
    fn header(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    fn recipients(&self) -> &[Address] {
        &self.recipients
    }

    fn write_to(&self, out: &mut dyn io::Write) -> io::Result<()> {
        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("Bcc") {
                continue;
            }
            write!(out, "{name}: {value}\r\n")?;
        }
        out.write_all(b"\r\n")?;
        out.write_all(&self.body)
    }
}

fn is_recipient_header(name: &str) -> bool {
    ["To", "Cc", "Bcc"]
        .iter()
        .any(|header| name.eq_ignore_ascii_case(header))
}

/// Builds a [`MailMessage`], stamping `Date` and `Message-ID` when they are
/// not supplied.
#[derive(Debug, Default)]
pub struct MailMessageBuilder {
    from: Option<Address>,
    to: Vec<Address>,
    cc: Vec<Address>,
    subject: Option<String>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl MailMessageBuilder {
    #[must_use]
    pub fn from(mut self, address: Address) -> Self {
        self.from = Some(address);
        self
    }

    #[must_use]
    pub fn to(mut self, address: Address) -> Self {
        self.to.push(address);
        self
    }

    #[must_use]
    pub fn cc(mut self, address: Address) -> Self {
        self.cc.push(address);
        self
    }

    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = body.into().into_bytes();
        self
    }

    #[must_use]
    pub fn build(self) -> MailMessage {
        let mut headers = Vec::new();

        if let Some(from) = &self.from {
            headers.push(("From".to_string(), from.to_string()));
        }
        if !self.to.is_empty() {
            headers.push(("To".to_string(), AddressList(self.to.clone()).to_string()));
        }
        if !self.cc.is_empty() {
            headers.push(("Cc".to_string(), AddressList(self.cc.clone()).to_string()));
        }
        if let Some(subject) = self.subject {
            headers.push(("Subject".to_string(), subject));
        }

        let has = |name: &str| {
            self.headers
                .iter()
                .any(|(key, _)| key.eq_ignore_ascii_case(name))
        };
        if !has("Date") {
            headers.push(("Date".to_string(), chrono::Utc::now().to_rfc2822()));
        }
        if !has(MESSAGE_ID) {
            headers.push((
                MESSAGE_ID.to_string(),
                format!("<{}@switchyard>", ulid::Ulid::new()),
            ));
        }
        headers.extend(self.headers);

        MailMessage {
            headers,
            body: self.body,
            recipients: self.to.into_iter().chain(self.cc).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    #[test]
    fn test_builder_stamps_identity_headers() {
        let message = MailMessage::builder()
            .from(address("nobody@nowhere.net"))
            .to(address("somebody@somewhere.net"))
            .subject("Hello!")
            .text("A message.")
            .build();

        let id = message.message_id().unwrap();
        assert!(id.starts_with('<') && id.ends_with("@switchyard>"));
        assert_eq!(message.header("date").len(), 1);
        assert_eq!(message.header("SUBJECT"), vec!["Hello!"]);
        assert_eq!(message.recipients(), &[address("somebody@somewhere.net")]);
    }

    #[test]
    fn test_builder_keeps_supplied_message_id() {
        let message = MailMessage::builder()
            .header("Message-Id", "<fixed@test>")
            .build();
        assert_eq!(message.message_id(), Some("<fixed@test>"));
        assert_eq!(message.header(MESSAGE_ID).len(), 1);
    }

    #[test]
    fn test_parse_round_trip() {
        let original = MailMessage::builder()
            .from(address("nobody@nowhere.net"))
            .to(address("a@x.org"))
            .cc(address("b@y.org"))
            .subject("Test message")
            .header("X-Throw-Error", "boom")
            .text("This is a test. This is only a test.")
            .build();

        let parsed = MailMessage::parse(&original.to_bytes().unwrap()).unwrap();

        assert_eq!(parsed.header("Subject"), vec!["Test message"]);
        assert_eq!(parsed.header("x-throw-error"), vec!["boom"]);
        assert_eq!(parsed.message_id(), original.message_id());
        assert_eq!(parsed.recipients().len(), 2);
        assert_eq!(parsed.body(), b"This is a test. This is only a test.");
    }

    #[test]
    fn test_multiple_header_values_keep_order() {
        let message = MailMessage::parse(b"X-Trace: one\r\nX-Trace: two\r\n\r\nbody").unwrap();
        assert_eq!(message.header("X-Trace"), vec!["one", "two"]);
        assert!(message.header("X-Missing").is_empty());
    }

    #[test]
    fn test_bcc_is_a_recipient_but_not_written() {
        let mut message =
            MailMessage::parse(b"To: a@x.org\r\nBcc: hidden@y.org\r\n\r\nbody").unwrap();
        assert_eq!(message.recipients().len(), 2);

        let written = String::from_utf8(message.to_bytes().unwrap()).unwrap();
        assert!(!written.contains("hidden@y.org"));

        message.set_header("to", "c@z.org");
        assert_eq!(message.header("To"), vec!["c@z.org"]);
    }

    #[test]
    fn test_parse_rejects_bad_recipients() {
        assert!(MailMessage::parse(b"To: not-an-address\r\n\r\n").is_err());
    }
}
