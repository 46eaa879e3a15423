//! Intent dispatch: a registered-handler map keyed by intent display name,
//! with a fixed fallback for everything else.
//!
//! Handlers never propagate errors past the machine. Every path — bad
//! parameters, lookup misses, even backend failures — produces a well-formed
//! response whose fulfillment text is the only failure signal the caller
//! sees. Malformed top-level payloads are rejected before a turn is ever
//! built (see [`crate::dialog::turn::TurnError`]).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::dialog::carrier::{Carrier, StateMarker, CARRIER_LIFESPAN};
use crate::dialog::gateway::{BookingStore, EntityGateway};
use crate::dialog::handlers::{CollectEmail, CollectEvent, CollectTicketType, ConfirmBooking};
use crate::dialog::seal::CarrierSealer;
use crate::dialog::turn::ConversationTurn;
use crate::dialog::wire::{ContextEntry, WebhookResponse};

pub const FALLBACK_TEXT: &str =
    "I'm sorry, I didn't understand that. Could you please rephrase?";

pub const RETRY_TEXT: &str = "Something went wrong on our side. Please try again.";

/// Everything a handler may touch during one turn.
pub struct HandlerContext<'a> {
    pub gateway: &'a dyn EntityGateway,
    pub store: &'a dyn BookingStore,
    pub sealer: Option<&'a CarrierSealer>,
    pub now: DateTime<Utc>,
}

impl HandlerContext<'_> {
    /// Reads the prior turn's carrier for `marker`. With sealing enabled, a
    /// missing or invalid seal degrades to an empty carrier — downstream
    /// code then takes its ordinary missing-precondition path.
    pub fn recall(&self, turn: &ConversationTurn, marker: StateMarker) -> Carrier {
        let Some(entry) = turn.context_for(marker) else {
            return Carrier::default();
        };

        if let Some(sealer) = self.sealer {
            if !sealer.verify(&entry.parameters) {
                tracing::warn!(
                    event_name = "dialog.carrier_rejected",
                    session_id = %turn.session,
                    marker = marker.suffix(),
                    "inbound carrier seal missing or invalid, discarding carried state"
                );
                return Carrier::default();
            }
        }

        Carrier::from_context(entry)
    }

    /// Builds the outgoing context entry for `marker`, sealing when
    /// configured.
    pub fn carry(
        &self,
        turn: &ConversationTurn,
        marker: StateMarker,
        carrier: Carrier,
    ) -> ContextEntry {
        let mut fields = carrier.into_fields();
        if let Some(sealer) = self.sealer {
            sealer.seal(&mut fields);
        }

        ContextEntry {
            name: marker.context_name(&turn.session),
            lifespan_count: CARRIER_LIFESPAN,
            parameters: fields,
        }
    }

    /// Re-prompt that echoes the last good carrier unchanged, so a retry
    /// never loses prior answers. With nothing to echo, the context list is
    /// simply omitted.
    pub fn reprompt(
        &self,
        turn: &ConversationTurn,
        marker: StateMarker,
        carrier: Carrier,
        text: impl Into<String>,
    ) -> WebhookResponse {
        if carrier.is_empty() {
            WebhookResponse::say(text)
        } else {
            WebhookResponse::carrying(text, self.carry(turn, marker, carrier))
        }
    }
}

#[async_trait]
pub trait IntentHandler: Send + Sync {
    /// The intent display name this handler is registered under.
    fn intent(&self) -> &'static str;

    async fn handle(&self, turn: &ConversationTurn, ctx: &HandlerContext<'_>) -> WebhookResponse;
}

pub struct DialogMachine {
    gateway: Arc<dyn EntityGateway>,
    store: Arc<dyn BookingStore>,
    sealer: Option<CarrierSealer>,
    handlers: HashMap<&'static str, Box<dyn IntentHandler>>,
}

impl DialogMachine {
    pub fn new(
        gateway: Arc<dyn EntityGateway>,
        store: Arc<dyn BookingStore>,
        sealer: Option<CarrierSealer>,
    ) -> Self {
        let mut machine = Self { gateway, store, sealer, handlers: HashMap::new() };
        machine.register(Box::new(CollectEmail));
        machine.register(Box::new(CollectEvent));
        machine.register(Box::new(CollectTicketType));
        machine.register(Box::new(ConfirmBooking));
        machine
    }

    pub fn register(&mut self, handler: Box<dyn IntentHandler>) {
        self.handlers.insert(handler.intent(), handler);
    }

    pub async fn dispatch(&self, turn: &ConversationTurn) -> WebhookResponse {
        let ctx = HandlerContext {
            gateway: self.gateway.as_ref(),
            store: self.store.as_ref(),
            sealer: self.sealer.as_ref(),
            now: Utc::now(),
        };

        match self.handlers.get(turn.intent.as_str()) {
            Some(handler) => {
                tracing::info!(
                    event_name = "dialog.turn_received",
                    session_id = %turn.session,
                    intent = %turn.intent,
                    "dispatching intent"
                );
                handler.handle(turn, &ctx).await
            }
            None => {
                tracing::info!(
                    event_name = "dialog.fallback",
                    session_id = %turn.session,
                    intent = %turn.intent,
                    "unrecognized intent, returning fallback"
                );
                WebhookResponse::say(FALLBACK_TEXT)
            }
        }
    }
}
