//! The four booking-flow handlers.
//!
//! Flow: email -> event -> ticket type -> confirmation. Each handler reads
//! the carrier its state marker expects, tolerates any subset of fields
//! being absent, and answers with fulfillment text plus (usually) the next
//! carrier. Lookup failures and bad input re-prompt; only the confirmation
//! handler commits.

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::dialog::carrier::StateMarker;
use crate::dialog::commit::{commit, BookingRequest, CommitError};
use crate::dialog::machine::{HandlerContext, IntentHandler, RETRY_TEXT};
use crate::dialog::params::{EmailParams, EventParams, TicketTypeParams};
use crate::dialog::turn::ConversationTurn;
use crate::dialog::wire::WebhookResponse;
use crate::domain::event::EventId;
use crate::domain::ticket::{format_price, TicketTypeId, TicketTypeName};

/// Step 1: resolve the account email and open the flow.
pub struct CollectEmail;

#[async_trait]
impl IntentHandler for CollectEmail {
    fn intent(&self) -> &'static str {
        "CollectEmailIntent"
    }

    async fn handle(&self, turn: &ConversationTurn, ctx: &HandlerContext<'_>) -> WebhookResponse {
        // On the email-detour return path the prior answers ride in an
        // awaiting_email context; a fresh conversation has none.
        let mut carrier = ctx.recall(turn, StateMarker::AwaitingEmail);

        let params = match EmailParams::parse(&turn.parameters) {
            Ok(params) => params,
            Err(issue) => {
                return ctx.reprompt(turn, StateMarker::AwaitingEmail, carrier, issue.reprompt());
            }
        };

        let user = match ctx.gateway.find_user_by_email(&params.email).await {
            Ok(user) => user,
            Err(error) => {
                tracing::error!(
                    event_name = "dialog.lookup_failed",
                    session_id = %turn.session,
                    error = %error,
                    "user lookup failed"
                );
                return ctx.reprompt(turn, StateMarker::AwaitingEmail, carrier, RETRY_TEXT);
            }
        };

        if user.is_none() {
            // The flow continues with a null user id; the commit step
            // re-resolves by email and reports the miss to the end user.
            tracing::warn!(
                event_name = "dialog.unknown_email",
                session_id = %turn.session,
                "no account matches the supplied email, carrying a null user id"
            );
        }

        carrier.set_user_id(user.map(|user| user.id));
        carrier.set_email(&params.email);

        WebhookResponse::carrying(
            "Which event would you like to book tickets for?",
            ctx.carry(turn, StateMarker::AwaitingEventName, carrier),
        )
    }
}

/// Step 2: resolve the event and list its ticket types.
pub struct CollectEvent;

#[async_trait]
impl IntentHandler for CollectEvent {
    fn intent(&self) -> &'static str {
        "CollectEventIntent"
    }

    async fn handle(&self, turn: &ConversationTurn, ctx: &HandlerContext<'_>) -> WebhookResponse {
        let mut carrier = ctx.recall(turn, StateMarker::AwaitingEventName);

        let params = match EventParams::parse(&turn.parameters) {
            Ok(params) => params,
            Err(issue) => {
                return ctx.reprompt(
                    turn,
                    StateMarker::AwaitingEventName,
                    carrier,
                    issue.reprompt(),
                );
            }
        };

        let event = match ctx.gateway.find_event_by_name(&params.event_name).await {
            Ok(event) => event,
            Err(error) => {
                tracing::error!(
                    event_name = "dialog.lookup_failed",
                    session_id = %turn.session,
                    error = %error,
                    "event lookup failed"
                );
                return ctx.reprompt(turn, StateMarker::AwaitingEventName, carrier, RETRY_TEXT);
            }
        };

        let Some(event) = event else {
            return ctx.reprompt(
                turn,
                StateMarker::AwaitingEventName,
                carrier,
                format!(
                    "I'm sorry, I couldn't find the event: {}. Please provide a valid event name.",
                    params.event_name
                ),
            );
        };

        let ticket_types = match ctx.gateway.ticket_types_by_event(event.id).await {
            Ok(ticket_types) => ticket_types,
            Err(error) => {
                tracing::error!(
                    event_name = "dialog.lookup_failed",
                    session_id = %turn.session,
                    error = %error,
                    "ticket type listing failed"
                );
                return ctx.reprompt(turn, StateMarker::AwaitingEventName, carrier, RETRY_TEXT);
            }
        };

        if ticket_types.is_empty() {
            return ctx.reprompt(
                turn,
                StateMarker::AwaitingEventName,
                carrier,
                "I'm sorry, there are no tickets available for this event.",
            );
        }

        carrier.set_event(event.id.0, &params.event_name);

        let mut listing =
            format!("Here are the available ticket types for {}:\n", params.event_name);
        for (index, ticket_type) in ticket_types.iter().enumerate() {
            listing.push_str(&format!(
                "{}. {} - ${}\n",
                index + 1,
                ticket_type.name,
                format_price(ticket_type.price)
            ));
        }
        listing.push_str("Please choose a ticket type.");

        WebhookResponse::carrying(listing, ctx.carry(turn, StateMarker::AwaitingTicketType, carrier))
    }
}

/// Step 3: resolve the ticket type and quantity, then ask for confirmation.
pub struct CollectTicketType;

#[async_trait]
impl IntentHandler for CollectTicketType {
    fn intent(&self) -> &'static str {
        "CollectTicketTypeIntent"
    }

    async fn handle(&self, turn: &ConversationTurn, ctx: &HandlerContext<'_>) -> WebhookResponse {
        let mut carrier = ctx.recall(turn, StateMarker::AwaitingTicketType);

        let params = match TicketTypeParams::parse(&turn.parameters) {
            Ok(params) => params,
            Err(issue) => {
                return ctx.reprompt(
                    turn,
                    StateMarker::AwaitingTicketType,
                    carrier,
                    issue.reprompt(),
                );
            }
        };

        let (Some(event_id), Some(event_name)) =
            (carrier.event_id(), carrier.event_name().map(str::to_string))
        else {
            return ctx.reprompt(
                turn,
                StateMarker::AwaitingTicketType,
                carrier,
                "Event ID or event name is missing. Please try again.",
            );
        };

        // Re-fetch instead of trusting the carrier: prices and availability
        // may have changed since the listing was rendered.
        let ticket_types = match ctx.gateway.ticket_types_by_event(EventId(event_id)).await {
            Ok(ticket_types) => ticket_types,
            Err(error) => {
                tracing::error!(
                    event_name = "dialog.lookup_failed",
                    session_id = %turn.session,
                    error = %error,
                    "ticket type listing failed"
                );
                return ctx.reprompt(turn, StateMarker::AwaitingTicketType, carrier, RETRY_TEXT);
            }
        };

        let selected = TicketTypeName::matching(&params.ticket_type)
            .and_then(|wanted| ticket_types.into_iter().find(|t| t.name == wanted));
        let Some(selected) = selected else {
            return ctx.reprompt(
                turn,
                StateMarker::AwaitingTicketType,
                carrier,
                format!(
                    "I'm sorry, I couldn't find the ticket type: {}. Please choose a valid ticket type.",
                    params.ticket_type
                ),
            );
        };

        carrier.set_ticket_choice(
            selected.id.0,
            selected.name.as_str(),
            price_value(selected.price),
            params.quantity,
        );

        // The chosen type and quantity are already in the carrier, so the
        // email detour loses nothing the user has answered.
        let Some(email) = carrier.email().map(str::to_string) else {
            return WebhookResponse::carrying(
                "Please provide your email to assign the ticket.",
                ctx.carry(turn, StateMarker::AwaitingEmail, carrier),
            );
        };

        let summary = format!(
            "You selected {} {} tickets for the event '{}', priced at ${} each. \
             The tickets will be assigned to {}. Would you like to confirm the booking?",
            params.quantity,
            selected.name,
            event_name,
            format_price(selected.price),
            email
        );

        WebhookResponse::carrying(summary, ctx.carry(turn, StateMarker::AwaitingConfirmation, carrier))
    }
}

/// Step 4: validate the collected tuple and commit the booking.
pub struct ConfirmBooking;

#[async_trait]
impl IntentHandler for ConfirmBooking {
    fn intent(&self) -> &'static str {
        "ConfirmBookingIntent"
    }

    async fn handle(&self, turn: &ConversationTurn, ctx: &HandlerContext<'_>) -> WebhookResponse {
        let carrier = ctx.recall(turn, StateMarker::AwaitingConfirmation);

        let resolved = (
            carrier.event_id(),
            carrier.ticket_type_id(),
            carrier.quantity().filter(|q| *q > 0).and_then(|q| u32::try_from(q).ok()),
            carrier.email(),
        );
        let (Some(event_id), Some(ticket_type_id), Some(quantity), Some(email)) = resolved else {
            return WebhookResponse::say(
                "Unable to process your booking. Some information is missing.",
            );
        };

        let request = BookingRequest {
            email: email.to_string(),
            event_id: EventId(event_id),
            ticket_type_id: TicketTypeId(ticket_type_id),
            quantity,
        };

        match commit(ctx.gateway, ctx.store, request, ctx.now).await {
            Ok(done) => {
                tracing::info!(
                    event_name = "booking.committed",
                    session_id = %turn.session,
                    code = %done.ticket.code,
                    quantity = done.ticket.quantity,
                    "booking persisted"
                );
                WebhookResponse::say(format!(
                    "Your booking for {} {} tickets to the event '{}' has been confirmed. \
                     Your ticket code is: {}. Total cost: ${}.",
                    done.ticket.quantity,
                    done.ticket_type.name,
                    done.event.name,
                    done.ticket.code,
                    format_price(done.ticket.total_price)
                ))
            }
            Err(CommitError::UnknownUser(_)) => {
                WebhookResponse::say("User not found. Please provide a valid email.")
            }
            Err(CommitError::UnknownEvent(_)) => {
                WebhookResponse::say("Event not found. Please provide a valid event.")
            }
            Err(CommitError::UnknownTicketType(_)) => {
                WebhookResponse::say("Ticket type not found. Please provide a valid ticket type.")
            }
            Err(error) => {
                tracing::error!(
                    event_name = "booking.commit_failed",
                    session_id = %turn.session,
                    error = %error,
                    "booking commit failed, flow abandoned"
                );
                WebhookResponse::say(
                    "An error occurred while processing your booking. Please try again.",
                )
            }
        }
    }
}

/// Carrier prices are informational (the commit re-reads the store), so a
/// lossy float is acceptable and keeps the field numeric on the wire.
fn price_value(price: Decimal) -> Value {
    price
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(price.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::{json, Map, Value};

    use crate::dialog::carrier::StateMarker;
    use crate::dialog::gateway::{BookingStore, EntityGateway, GatewayError};
    use crate::dialog::machine::{DialogMachine, FALLBACK_TEXT};
    use crate::dialog::seal::CarrierSealer;
    use crate::dialog::turn::ConversationTurn;
    use crate::dialog::wire::{ContextEntry, WebhookResponse};
    use crate::domain::event::{Event, EventId};
    use crate::domain::ticket::{Ticket, TicketType, TicketTypeId, TicketTypeName};
    use crate::domain::user::{User, UserId};

    const SESSION: &str = "projects/p/agent/sessions/s1";

    struct StubGateway {
        users: Vec<User>,
        events: Vec<Event>,
        ticket_types: Vec<TicketType>,
    }

    impl StubGateway {
        fn seeded() -> Self {
            let jazz = Event {
                id: EventId(3),
                name: "Jazz Night".to_string(),
                description: None,
                category_id: None,
                event_date: Utc::now().date_naive(),
                location: None,
                ticket_price: Decimal::from(45),
            };
            let disco = Event {
                id: EventId(5),
                name: "Silent Disco".to_string(),
                description: None,
                category_id: None,
                event_date: Utc::now().date_naive(),
                location: None,
                ticket_price: Decimal::ZERO,
            };
            Self {
                users: vec![User {
                    id: UserId(1),
                    email: "a@x.com".to_string(),
                    name: "Ada".to_string(),
                }],
                events: vec![jazz, disco],
                ticket_types: vec![
                    TicketType {
                        id: TicketTypeId(7),
                        event_id: EventId(3),
                        name: TicketTypeName::Vip,
                        price: Decimal::from(120),
                    },
                    TicketType {
                        id: TicketTypeId(8),
                        event_id: EventId(3),
                        name: TicketTypeName::General,
                        price: Decimal::from(45),
                    },
                ],
            }
        }
    }

    #[async_trait]
    impl EntityGateway for StubGateway {
        async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, GatewayError> {
            Ok(self.users.iter().find(|user| user.email == email).cloned())
        }

        async fn find_event_by_name(&self, name: &str) -> Result<Option<Event>, GatewayError> {
            Ok(self.events.iter().find(|event| event.name.eq_ignore_ascii_case(name)).cloned())
        }

        async fn event_by_id(&self, id: EventId) -> Result<Option<Event>, GatewayError> {
            Ok(self.events.iter().find(|event| event.id == id).cloned())
        }

        async fn ticket_types_by_event(
            &self,
            event_id: EventId,
        ) -> Result<Vec<TicketType>, GatewayError> {
            Ok(self.ticket_types.iter().filter(|t| t.event_id == event_id).cloned().collect())
        }

        async fn ticket_type_by_id(
            &self,
            id: TicketTypeId,
        ) -> Result<Option<TicketType>, GatewayError> {
            Ok(self.ticket_types.iter().find(|t| t.id == id).cloned())
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        saved: Mutex<Vec<Ticket>>,
    }

    #[async_trait]
    impl BookingStore for RecordingStore {
        async fn save_booking(&self, ticket: Ticket) -> Result<Ticket, GatewayError> {
            self.saved.lock().expect("lock").push(ticket.clone());
            Ok(ticket)
        }
    }

    fn machine_with(store: Arc<RecordingStore>, sealer: Option<CarrierSealer>) -> DialogMachine {
        DialogMachine::new(Arc::new(StubGateway::seeded()), store, sealer)
    }

    fn machine() -> (DialogMachine, Arc<RecordingStore>) {
        let store = Arc::new(RecordingStore::default());
        (machine_with(store.clone(), None), store)
    }

    fn turn(intent: &str, parameters: Value, contexts: Vec<ContextEntry>) -> ConversationTurn {
        let parameters = match parameters {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        ConversationTurn {
            intent: intent.to_string(),
            parameters,
            contexts,
            session: SESSION.to_string(),
        }
    }

    fn context_suffix(response: &WebhookResponse) -> Option<&str> {
        response.output_contexts.first().map(|entry| {
            entry.name.rsplit_once("/contexts/").map(|(_, suffix)| suffix).unwrap_or("")
        })
    }

    #[tokio::test]
    async fn four_intent_happy_path_commits_with_total_price() {
        let (machine, store) = machine();

        let opened = machine
            .dispatch(&turn("CollectEmailIntent", json!({ "email": "a@x.com" }), vec![]))
            .await;
        assert_eq!(opened.fulfillment_text, "Which event would you like to book tickets for?");
        assert_eq!(context_suffix(&opened), Some("awaiting_event_name"));

        let listed = machine
            .dispatch(&turn(
                "CollectEventIntent",
                json!({ "event": "Jazz Night" }),
                opened.output_contexts.clone(),
            ))
            .await;
        assert!(listed.fulfillment_text.contains("1. VIP - $120.00"));
        assert!(listed.fulfillment_text.contains("2. GENERAL - $45.00"));
        assert_eq!(context_suffix(&listed), Some("awaiting_ticket_type"));

        let summarized = machine
            .dispatch(&turn(
                "CollectTicketTypeIntent",
                json!({ "ticketType": "VIP", "quantity": 2 }),
                listed.output_contexts.clone(),
            ))
            .await;
        assert!(summarized.fulfillment_text.contains("2 VIP tickets"));
        assert!(summarized.fulfillment_text.contains("assigned to a@x.com"));
        assert_eq!(context_suffix(&summarized), Some("awaiting_confirmation"));

        let confirmed = machine
            .dispatch(&turn(
                "ConfirmBookingIntent",
                json!({}),
                summarized.output_contexts.clone(),
            ))
            .await;
        assert!(confirmed.fulfillment_text.contains("has been confirmed"));
        assert!(confirmed.fulfillment_text.contains("Total cost: $240.00."));
        assert!(confirmed.fulfillment_text.contains("TKT-"));
        assert!(confirmed.output_contexts.is_empty());

        let saved = store.saved.lock().expect("lock");
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].total_price, Decimal::from(240));
        assert_eq!(saved[0].quantity, 2);
        assert_eq!(saved[0].user_id, UserId(1));
    }

    #[tokio::test]
    async fn unknown_intent_falls_back_without_contexts() {
        let (machine, _) = machine();
        let response = machine
            .dispatch(&turn("OrderPizzaIntent", json!({ "anything": [1, 2] }), vec![]))
            .await;

        assert_eq!(response.fulfillment_text, FALLBACK_TEXT);
        assert!(response.output_contexts.is_empty());
    }

    #[tokio::test]
    async fn quantity_accepts_float_representation_and_rejects_zero() {
        let (machine, _) = machine();
        let opened = machine
            .dispatch(&turn("CollectEmailIntent", json!({ "email": "a@x.com" }), vec![]))
            .await;
        let listed = machine
            .dispatch(&turn(
                "CollectEventIntent",
                json!({ "event": "Jazz Night" }),
                opened.output_contexts,
            ))
            .await;

        let float_quantity = machine
            .dispatch(&turn(
                "CollectTicketTypeIntent",
                json!({ "ticketType": "General", "quantity": 3.0 }),
                listed.output_contexts.clone(),
            ))
            .await;
        assert!(float_quantity.fulfillment_text.contains("3 GENERAL tickets"));

        for bad in [json!(0), json!(-1), Value::Null] {
            let rejected = machine
                .dispatch(&turn(
                    "CollectTicketTypeIntent",
                    json!({ "ticketType": "General", "quantity": bad }),
                    listed.output_contexts.clone(),
                ))
                .await;
            assert_eq!(
                rejected.fulfillment_text,
                "Please specify a valid number of tickets."
            );
            // The re-prompt echoes the carrier so the retry keeps its state.
            assert_eq!(context_suffix(&rejected), Some("awaiting_ticket_type"));
        }
    }

    #[tokio::test]
    async fn event_matching_tolerates_case_and_non_breaking_spaces() {
        let (machine, _) = machine();
        let opened = machine
            .dispatch(&turn("CollectEmailIntent", json!({ "email": "a@x.com" }), vec![]))
            .await;

        let listed = machine
            .dispatch(&turn(
                "CollectEventIntent",
                json!({ "event": "jazz\u{a0}night " }),
                opened.output_contexts,
            ))
            .await;

        assert!(listed.fulfillment_text.starts_with("Here are the available ticket types"));
        assert_eq!(context_suffix(&listed), Some("awaiting_ticket_type"));
        let carried = &listed.output_contexts[0].parameters;
        assert_eq!(carried.get("event_id"), Some(&json!(3)));
        assert_eq!(carried.get("event_name"), Some(&json!("jazz night")));
    }

    #[tokio::test]
    async fn missing_email_detour_preserves_collected_answers() {
        let (machine, store) = machine();

        // Carrier with event facts but no email, as if the flow was entered
        // sideways.
        let mut fields = Map::new();
        fields.insert("event_id".to_string(), json!(3.0));
        fields.insert("event_name".to_string(), json!("Jazz Night"));
        let entry = ContextEntry {
            name: StateMarker::AwaitingTicketType.context_name(SESSION),
            lifespan_count: 5,
            parameters: fields,
        };

        let detoured = machine
            .dispatch(&turn(
                "CollectTicketTypeIntent",
                json!({ "ticketType": "VIP", "quantity": 2 }),
                vec![entry],
            ))
            .await;

        assert_eq!(
            detoured.fulfillment_text,
            "Please provide your email to assign the ticket."
        );
        assert_eq!(context_suffix(&detoured), Some("awaiting_email"));
        let carried = &detoured.output_contexts[0].parameters;
        // The echoed float stays exactly as the client sent it.
        assert_eq!(carried.get("event_id"), Some(&json!(3.0)));
        assert_eq!(carried.get("event_name"), Some(&json!("Jazz Night")));
        assert_eq!(carried.get("ticket_type_id"), Some(&json!(7)));
        assert_eq!(carried.get("ticket_type_name"), Some(&json!("VIP")));
        assert_eq!(carried.get("quantity"), Some(&json!(2)));

        // Supplying the email merges the preserved answers and re-opens at
        // the event prompt with nothing lost.
        let resumed = machine
            .dispatch(&turn(
                "CollectEmailIntent",
                json!({ "email": "a@x.com" }),
                detoured.output_contexts.clone(),
            ))
            .await;
        assert_eq!(context_suffix(&resumed), Some("awaiting_event_name"));
        let carried = &resumed.output_contexts[0].parameters;
        assert_eq!(carried.get("email"), Some(&json!("a@x.com")));
        assert_eq!(carried.get("ticket_type_id"), Some(&json!(7)));

        assert!(store.saved.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn confirmation_with_missing_fields_never_touches_the_store() {
        let (machine, store) = machine();

        let cases = [
            json!({ "ticket_type_id": 7, "quantity": 2, "email": "a@x.com" }),
            json!({ "event_id": 3, "quantity": 2, "email": "a@x.com" }),
            json!({ "event_id": 3, "ticket_type_id": 7, "email": "a@x.com" }),
            json!({ "event_id": 3, "ticket_type_id": 7, "quantity": 2 }),
            json!({ "event_id": 3, "ticket_type_id": 7, "quantity": 0, "email": "a@x.com" }),
        ];

        for fields in cases {
            let entry = ContextEntry {
                name: StateMarker::AwaitingConfirmation.context_name(SESSION),
                lifespan_count: 5,
                parameters: match fields {
                    Value::Object(map) => map,
                    _ => Map::new(),
                },
            };
            let response =
                machine.dispatch(&turn("ConfirmBookingIntent", json!({}), vec![entry])).await;

            assert_eq!(
                response.fulfillment_text,
                "Unable to process your booking. Some information is missing."
            );
            assert!(response.output_contexts.is_empty());
        }

        assert!(store.saved.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn unknown_event_without_carrier_omits_contexts() {
        let (machine, _) = machine();
        let response = machine
            .dispatch(&turn("CollectEventIntent", json!({ "event": "Nonexistent Fest" }), vec![]))
            .await;

        assert_eq!(
            response.fulfillment_text,
            "I'm sorry, I couldn't find the event: Nonexistent Fest. Please provide a valid event name."
        );
        assert!(response.output_contexts.is_empty());
    }

    #[tokio::test]
    async fn unknown_event_with_carrier_echoes_it_for_the_retry() {
        let (machine, _) = machine();
        let opened = machine
            .dispatch(&turn("CollectEmailIntent", json!({ "email": "a@x.com" }), vec![]))
            .await;

        let response = machine
            .dispatch(&turn(
                "CollectEventIntent",
                json!({ "event": "Nonexistent Fest" }),
                opened.output_contexts.clone(),
            ))
            .await;

        assert!(response.fulfillment_text.contains("couldn't find the event"));
        assert_eq!(context_suffix(&response), Some("awaiting_event_name"));
        assert_eq!(
            response.output_contexts[0].parameters.get("email"),
            Some(&json!("a@x.com"))
        );
    }

    #[tokio::test]
    async fn event_without_ticket_types_reprompts() {
        let (machine, _) = machine();
        let opened = machine
            .dispatch(&turn("CollectEmailIntent", json!({ "email": "a@x.com" }), vec![]))
            .await;

        let response = machine
            .dispatch(&turn(
                "CollectEventIntent",
                json!({ "event": "Silent Disco" }),
                opened.output_contexts,
            ))
            .await;

        assert_eq!(
            response.fulfillment_text,
            "I'm sorry, there are no tickets available for this event."
        );
        assert_eq!(context_suffix(&response), Some("awaiting_event_name"));
    }

    #[tokio::test]
    async fn unknown_email_defers_failure_to_commit_time() {
        let (machine, store) = machine();

        let opened = machine
            .dispatch(&turn("CollectEmailIntent", json!({ "email": "ghost@x.com" }), vec![]))
            .await;
        assert_eq!(
            opened.output_contexts[0].parameters.get("user_id"),
            Some(&Value::Null)
        );

        let listed = machine
            .dispatch(&turn(
                "CollectEventIntent",
                json!({ "event": "Jazz Night" }),
                opened.output_contexts,
            ))
            .await;
        let summarized = machine
            .dispatch(&turn(
                "CollectTicketTypeIntent",
                json!({ "ticketType": "VIP", "quantity": 1 }),
                listed.output_contexts,
            ))
            .await;
        let confirmed = machine
            .dispatch(&turn("ConfirmBookingIntent", json!({}), summarized.output_contexts))
            .await;

        assert_eq!(
            confirmed.fulfillment_text,
            "User not found. Please provide a valid email."
        );
        assert!(store.saved.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn unknown_ticket_type_reprompts_with_carrier() {
        let (machine, _) = machine();
        let opened = machine
            .dispatch(&turn("CollectEmailIntent", json!({ "email": "a@x.com" }), vec![]))
            .await;
        let listed = machine
            .dispatch(&turn(
                "CollectEventIntent",
                json!({ "event": "Jazz Night" }),
                opened.output_contexts,
            ))
            .await;

        let response = machine
            .dispatch(&turn(
                "CollectTicketTypeIntent",
                json!({ "ticketType": "Backstage", "quantity": 2 }),
                listed.output_contexts,
            ))
            .await;

        assert_eq!(
            response.fulfillment_text,
            "I'm sorry, I couldn't find the ticket type: Backstage. Please choose a valid ticket type."
        );
        assert_eq!(context_suffix(&response), Some("awaiting_ticket_type"));
    }

    #[tokio::test]
    async fn sealed_carriers_round_trip_and_reject_tampering() {
        let sealer = CarrierSealer::new("an-adequately-long-test-secret".to_string().into());
        let store = Arc::new(RecordingStore::default());
        let machine = machine_with(store.clone(), Some(sealer));

        let opened = machine
            .dispatch(&turn("CollectEmailIntent", json!({ "email": "a@x.com" }), vec![]))
            .await;
        assert!(opened.output_contexts[0].parameters.contains_key("_seal"));

        let listed = machine
            .dispatch(&turn(
                "CollectEventIntent",
                json!({ "event": "Jazz Night" }),
                opened.output_contexts,
            ))
            .await;
        let summarized = machine
            .dispatch(&turn(
                "CollectTicketTypeIntent",
                json!({ "ticketType": "VIP", "quantity": 2 }),
                listed.output_contexts,
            ))
            .await;

        // Untampered round-trip commits normally.
        let confirmed = machine
            .dispatch(&turn(
                "ConfirmBookingIntent",
                json!({}),
                summarized.output_contexts.clone(),
            ))
            .await;
        assert!(confirmed.fulfillment_text.contains("has been confirmed"));
        assert_eq!(store.saved.lock().expect("lock").len(), 1);

        // A rewritten quantity invalidates the seal; the carrier is treated
        // as absent and nothing further is persisted.
        let mut tampered = summarized.output_contexts.clone();
        tampered[0].parameters.insert("quantity".to_string(), json!(200));
        let rejected =
            machine.dispatch(&turn("ConfirmBookingIntent", json!({}), tampered)).await;

        assert_eq!(
            rejected.fulfillment_text,
            "Unable to process your booking. Some information is missing."
        );
        assert_eq!(store.saved.lock().expect("lock").len(), 1);
    }
}
