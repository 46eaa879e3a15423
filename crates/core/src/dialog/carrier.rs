//! The session context carrier: the only state that survives between turns.
//!
//! Fields accumulate monotonically — once set they are only ever
//! overwritten, never removed — and every reader must tolerate any subset
//! being absent. The server never stores a carrier; it lives exclusively in
//! the context entries round-tripped through the webhook payloads.

use serde_json::{Map, Number, Value};

use crate::dialog::coerce;
use crate::dialog::wire::ContextEntry;
use crate::domain::user::UserId;

/// Turns an emitted context entry survives if the caller never refreshes it.
pub const CARRIER_LIFESPAN: u32 = 5;

/// Dialog state, named by the context marker whose presence it expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateMarker {
    AwaitingEventName,
    AwaitingTicketType,
    AwaitingEmail,
    AwaitingConfirmation,
}

impl StateMarker {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::AwaitingEventName => "awaiting_event_name",
            Self::AwaitingTicketType => "awaiting_ticket_type",
            Self::AwaitingEmail => "awaiting_email",
            Self::AwaitingConfirmation => "awaiting_confirmation",
        }
    }

    pub fn context_name(&self, session: &str) -> String {
        format!("{session}/contexts/{}", self.suffix())
    }
}

pub const FIELD_EMAIL: &str = "email";
pub const FIELD_USER_ID: &str = "user_id";
pub const FIELD_EVENT_ID: &str = "event_id";
pub const FIELD_EVENT_NAME: &str = "event_name";
pub const FIELD_TICKET_TYPE_ID: &str = "ticket_type_id";
pub const FIELD_TICKET_TYPE_NAME: &str = "ticket_type_name";
pub const FIELD_TICKET_PRICE: &str = "ticket_price";
pub const FIELD_QUANTITY: &str = "quantity";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Carrier {
    fields: Map<String, Value>,
}

impl Carrier {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Copies the payload out of a context entry. Always a copy: the inbound
    /// entry may be borrowed elsewhere and must never be mutated in place.
    pub fn from_context(entry: &ContextEntry) -> Self {
        Self { fields: entry.parameters.clone() }
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn set_email(&mut self, email: &str) {
        self.fields.insert(FIELD_EMAIL.to_string(), Value::String(email.to_string()));
    }

    /// A lookup miss is recorded as an explicit null, mirroring the upstream
    /// contract; the confirmation step re-resolves the user by email anyway.
    pub fn set_user_id(&mut self, user_id: Option<UserId>) {
        let value = match user_id {
            Some(UserId(id)) => Value::Number(Number::from(id)),
            None => Value::Null,
        };
        self.fields.insert(FIELD_USER_ID.to_string(), value);
    }

    pub fn set_event(&mut self, event_id: i64, event_name: &str) {
        self.fields.insert(FIELD_EVENT_ID.to_string(), Value::Number(Number::from(event_id)));
        self.fields.insert(FIELD_EVENT_NAME.to_string(), Value::String(event_name.to_string()));
    }

    pub fn set_ticket_choice(
        &mut self,
        ticket_type_id: i64,
        ticket_type_name: &str,
        ticket_price: Value,
        quantity: u32,
    ) {
        self.fields
            .insert(FIELD_TICKET_TYPE_ID.to_string(), Value::Number(Number::from(ticket_type_id)));
        self.fields.insert(
            FIELD_TICKET_TYPE_NAME.to_string(),
            Value::String(ticket_type_name.to_string()),
        );
        self.fields.insert(FIELD_TICKET_PRICE.to_string(), ticket_price);
        self.fields.insert(FIELD_QUANTITY.to_string(), Value::Number(Number::from(quantity)));
    }

    pub fn email(&self) -> Option<&str> {
        self.fields.get(FIELD_EMAIL).and_then(Value::as_str).filter(|email| !email.is_empty())
    }

    pub fn event_id(&self) -> Option<i64> {
        coerce::identifier(self.fields.get(FIELD_EVENT_ID))
    }

    pub fn event_name(&self) -> Option<&str> {
        self.fields.get(FIELD_EVENT_NAME).and_then(Value::as_str).filter(|name| !name.is_empty())
    }

    pub fn ticket_type_id(&self) -> Option<i64> {
        coerce::identifier(self.fields.get(FIELD_TICKET_TYPE_ID))
    }

    pub fn quantity(&self) -> Option<i64> {
        coerce::integer(self.fields.get(FIELD_QUANTITY))
    }
}
