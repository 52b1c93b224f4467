//! Error-mail dispatch.
//!
//! Every error-level event is mailed to the configured admin addresses as a
//! plaintext message over unencrypted SMTP on port 25.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{Message, SmtpTransport, Transport};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Where error-level events are mailed.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub host: String,
    pub from: String,
    pub to: Vec<String>,
}

pub struct MailLayer {
    settings: MailSettings,
    transport: SmtpTransport,
}

impl MailLayer {
    pub fn new(settings: MailSettings) -> Self {
        let transport = SmtpTransport::builder_dangerous(settings.host.as_str())
            .port(25)
            .build();
        Self {
            settings,
            transport,
        }
    }

    // Failures here go to stderr: an error! would feed back into this layer.
    fn dispatch(&self, body: &str) {
        let from: Mailbox = match self.settings.from.parse() {
            Ok(from) => from,
            Err(e) => {
                eprintln!("boardwatch: bad sender address {}: {e}", self.settings.from);
                return;
            }
        };
        for to in &self.settings.to {
            let mailbox: Mailbox = match to.parse() {
                Ok(mailbox) => mailbox,
                Err(e) => {
                    eprintln!("boardwatch: bad admin address {to}: {e}");
                    continue;
                }
            };
            let message = Message::builder()
                .from(from.clone())
                .to(mailbox)
                .subject("boardwatch failure")
                .header(ContentType::TEXT_PLAIN)
                .body(body.to_string());
            match message {
                Ok(message) => {
                    if let Err(e) = self.transport.send(&message) {
                        eprintln!("boardwatch: failed to mail error to {to}: {e}");
                    }
                }
                Err(e) => eprintln!("boardwatch: failed to build error mail: {e}"),
            }
        }
    }
}

impl<S: Subscriber> Layer<S> for MailLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        if !visitor.message.is_empty() {
            self.dispatch(&visitor.message);
        }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_visitor_captures_message_field() {
        #[derive(Clone)]
        struct Probe(std::sync::Arc<std::sync::Mutex<String>>);
        // Record through a real event so the visitor sees the same field
        // layout the layer will.
        impl<S: Subscriber> Layer<S> for Probe {
            fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
                let mut visitor = MessageVisitor::default();
                event.record(&mut visitor);
                *self.0.lock().unwrap() = visitor.message;
            }
        }

        use tracing_subscriber::layer::SubscriberExt;
        let captured = Probe(std::sync::Arc::new(std::sync::Mutex::new(String::new())));
        let subscriber = tracing_subscriber::registry().with(captured.clone());
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("it broke: {}", 42);
        });
        assert_eq!(*captured.0.lock().unwrap(), "it broke: 42");
    }
}
