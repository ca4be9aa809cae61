//! Transient mail message type.

use lettre::message::header::ContentType;
use lettre::message::{Mailbox, SinglePart};
use lettre::Message;
use uuid::Uuid;

use super::MailError;

/// Body of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailBody {
    /// Plain text.
    Text(String),
    /// HTML.
    Html(String),
}

impl MailBody {
    /// Raw body content regardless of type.
    pub fn as_str(&self) -> &str {
        match self {
            MailBody::Text(s) | MailBody::Html(s) => s,
        }
    }
}

/// A single message handed to a [`MailTransport`](super::MailTransport).
#[derive(Debug, Clone)]
pub struct MailMessage {
    /// Sender identity (display name and address).
    pub from: Mailbox,
    /// Recipient.
    pub to: Mailbox,
    /// Address replies should go to.
    pub reply_to: Mailbox,
    /// Subject line.
    pub subject: String,
    /// Body content.
    pub body: MailBody,
}

impl MailMessage {
    /// Generate a fresh `Message-ID` in the sender's domain.
    pub fn new_message_id(&self) -> String {
        format!("<{}@{}>", Uuid::new_v4(), self.from.email.domain())
    }

    /// Build the RFC 5322 message for lettre with the given `Message-ID`.
    pub fn to_lettre(&self, message_id: &str) -> Result<Message, MailError> {
        let builder = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .reply_to(self.reply_to.clone())
            .subject(self.subject.clone())
            .message_id(Some(message_id.to_string()))
            .date_now();

        let message = match &self.body {
            MailBody::Text(text) => builder
                .header(ContentType::TEXT_PLAIN)
                .body(text.clone()),
            MailBody::Html(html) => builder.singlepart(SinglePart::html(html.clone())),
        };

        message.map_err(|e| MailError::Build(e.to_string()))
    }
}
