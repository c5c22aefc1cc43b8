//! Mail handler that prints messages instead of sending them.
//!
//! Useful in development and tests. Every message is written to the sink as
//! a header block followed by the body; nothing leaves the process.
//!
//! | Key              | Default                  |
//! |------------------|--------------------------|
//! | `to`             | `[]`                     |
//! | `from_addr`      | `noreply@localhost`      |
//! | `cc`, `bcc`      | `[]`                     |
//! | `subject`        | `Default Subject Line`   |
//! | `subject_prefix` | empty                    |

use keel_core::{BoxError, ConfigMap, Handler, Meta, Provides};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::interfaces::mail::{MailHandler, MailMessage, CAPABILITIES};
use crate::sink::Sink;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MailDefaults {
    to: Vec<String>,
    from_addr: String,
    cc: Vec<String>,
    bcc: Vec<String>,
    subject: String,
    subject_prefix: String,
}

impl Default for MailDefaults {
    fn default() -> Self {
        Self {
            to: Vec::new(),
            from_addr: "noreply@localhost".into(),
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: "Default Subject Line".into(),
            subject_prefix: String::new(),
        }
    }
}

#[derive(Debug)]
pub struct DummyMailHandler {
    sink: Sink,
    defaults: MailDefaults,
}

impl DummyMailHandler {
    pub fn new(sink: Sink) -> Self {
        Self {
            sink,
            defaults: MailDefaults::default(),
        }
    }

    /// Fills empty fields of `message` from the configured defaults.
    pub fn complete(&self, message: &MailMessage) -> MailMessage {
        fn or_default(given: &[String], fallback: &[String]) -> Vec<String> {
            if given.is_empty() {
                fallback.to_vec()
            } else {
                given.to_vec()
            }
        }

        let subject = message
            .subject
            .clone()
            .unwrap_or_else(|| self.defaults.subject.clone());
        MailMessage {
            to: or_default(&message.to, &self.defaults.to),
            from_addr: Some(
                message
                    .from_addr
                    .clone()
                    .unwrap_or_else(|| self.defaults.from_addr.clone()),
            ),
            cc: or_default(&message.cc, &self.defaults.cc),
            bcc: or_default(&message.bcc, &self.defaults.bcc),
            subject: Some(format!("{}{}", self.defaults.subject_prefix, subject)),
        }
    }
}

impl Provides for DummyMailHandler {
    const LABEL: &'static str = "dummy";
    const CAPABILITIES: &'static [&'static str] = CAPABILITIES;

    fn config_defaults() -> ConfigMap {
        match json!({
            "to": [],
            "from_addr": "noreply@localhost",
            "cc": [],
            "bcc": [],
            "subject": "Default Subject Line",
            "subject_prefix": "",
        }) {
            Value::Object(map) => map,
            _ => ConfigMap::new(),
        }
    }
}

impl Handler for DummyMailHandler {
    fn setup(&mut self, meta: &Meta) -> Result<(), BoxError> {
        self.defaults = meta.deserialize()?;
        Ok(())
    }
}

impl MailHandler for DummyMailHandler {
    fn send(&self, body: &str, message: &MailMessage) -> Result<bool, BoxError> {
        let message = self.complete(message);
        if message.to.is_empty() {
            return Err("message has no recipients".into());
        }

        let rule = "=".repeat(77);
        let mut out = String::new();
        out.push_str(&format!("\n{rule}\nDUMMY MAIL MESSAGE\n{}\n\n", "-".repeat(77)));
        out.push_str(&format!("To: {}\n", message.to.join(", ")));
        out.push_str(&format!(
            "From: {}\n",
            message.from_addr.as_deref().unwrap_or_default()
        ));
        out.push_str(&format!("CC: {}\n", message.cc.join(", ")));
        out.push_str(&format!("BCC: {}\n", message.bcc.join(", ")));
        out.push_str(&format!(
            "Subject: {}\n",
            message.subject.as_deref().unwrap_or_default()
        ));
        out.push_str(&format!("\n---\n\n{body}\n{rule}\n"));
        self.sink.write_str(&out)?;

        tracing::debug!(recipients = message.to.len(), "dummy mail written");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn configured(pairs: Value) -> (DummyMailHandler, Rc<RefCell<Vec<u8>>>) {
        let buffer = Rc::new(RefCell::new(Vec::new()));
        let mut handler = DummyMailHandler::new(Sink::Writer(buffer.clone()));
        let mut config = DummyMailHandler::config_defaults();
        if let Value::Object(extra) = pairs {
            config.extend(extra);
        }
        handler
            .setup(&Meta::new("mail", "dummy", config))
            .unwrap();
        (handler, buffer)
    }

    #[test]
    fn test_send_fills_defaults() {
        let (mail, buffer) = configured(json!({"subject_prefix": "[keel] "}));

        let sent = mail
            .send("hi there", &MailMessage::to(["ops@example.com"]))
            .unwrap();

        assert!(sent);
        let out = String::from_utf8(buffer.borrow().clone()).unwrap();
        assert!(out.contains("To: ops@example.com\n"));
        assert!(out.contains("From: noreply@localhost\n"));
        assert!(out.contains("Subject: [keel] Default Subject Line\n"));
        assert!(out.contains("hi there"));
    }

    #[test]
    fn test_message_fields_beat_defaults() {
        let (mail, _) = configured(json!({"to": ["default@example.com"]}));
        let message = MailMessage::to(["me@example.com"]).subject("Report");

        let completed = mail.complete(&message);

        assert_eq!(completed.to, vec!["me@example.com"]);
        assert_eq!(completed.subject.as_deref(), Some("Report"));
    }

    #[test]
    fn test_send_without_recipients_fails() {
        let (mail, buffer) = configured(json!({}));
        assert!(mail.send("body", &MailMessage::default()).is_err());
        assert!(buffer.borrow().is_empty());
    }
}
