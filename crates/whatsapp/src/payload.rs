use serde::Deserialize;

use crate::events::{StatusUpdateEvent, TextMessageEvent, WhatsAppEvent};

pub const BUSINESS_ACCOUNT_OBJECT: &str = "whatsapp_business_account";

/// Body of a `POST /webhook` notification.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: ChangeValue,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub statuses: Vec<MessageStatus>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Contact {
    pub wa_id: String,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Profile {
    pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct InboundMessage {
    pub from: String,
    pub id: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextBody>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MessageStatus {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub recipient_id: Option<String>,
}

impl WebhookPayload {
    /// Flattens every entry and change into events, in delivery order.
    /// Payloads for other objects yield nothing.
    pub fn events(&self) -> Vec<WhatsAppEvent> {
        if self.object != BUSINESS_ACCOUNT_OBJECT {
            return Vec::new();
        }

        let mut events = Vec::new();
        for change in self.entry.iter().flat_map(|entry| entry.changes.iter()) {
            let value = &change.value;
            for message in &value.messages {
                events.push(message_event(message, &value.contacts));
            }
            for status in &value.statuses {
                events.push(WhatsAppEvent::StatusUpdate(StatusUpdateEvent {
                    message_id: status.id.clone(),
                    status: status.status.clone(),
                    recipient_id: status.recipient_id.clone(),
                }));
            }
        }
        events
    }
}

fn message_event(message: &InboundMessage, contacts: &[Contact]) -> WhatsAppEvent {
    match (message.kind.as_str(), &message.text) {
        ("text", Some(text)) => WhatsAppEvent::TextMessage(TextMessageEvent {
            from: message.from.clone(),
            message_id: message.id.clone(),
            text: text.body.clone(),
            contact_name: contacts
                .iter()
                .find(|contact| contact.wa_id == message.from)
                .and_then(|contact| contact.profile.as_ref())
                .map(|profile| profile.name.clone()),
        }),
        (kind, _) => WhatsAppEvent::Unsupported { event_type: kind.to_string() },
    }
}
