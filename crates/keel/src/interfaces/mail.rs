//! The `mail` interface.

use keel_core::{BoxError, Handler, InterfaceDefinition};
use serde::{Deserialize, Serialize};

pub const INTERFACE: &str = "mail";

pub const CAPABILITIES: &[&str] = &["send"];

/// Envelope fields for one message.
///
/// Empty fields fall back to the handler's configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailMessage {
    pub to: Vec<String>,
    pub from_addr: Option<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: Option<String>,
}

impl MailMessage {
    pub fn to<S: Into<String>>(recipients: impl IntoIterator<Item = S>) -> Self {
        Self {
            to: recipients.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// Sends mail. Returns whether the message was accepted.
pub trait MailHandler: Handler {
    fn send(&self, body: &str, message: &MailMessage) -> Result<bool, BoxError>;
}

pub fn definition() -> InterfaceDefinition {
    InterfaceDefinition::new::<dyn MailHandler>(INTERFACE)
        .capabilities(CAPABILITIES.iter().copied())
        .description("outgoing mail")
}
