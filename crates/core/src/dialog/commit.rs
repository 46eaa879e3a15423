//! Terminal booking commit: resolve the fully-collected tuple, snapshot the
//! price, and persist exactly one record.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::dialog::gateway::{BookingStore, EntityGateway, GatewayError};
use crate::domain::event::{Event, EventId};
use crate::domain::ticket::{Ticket, TicketCode, TicketType, TicketTypeId};
use crate::errors::DomainError;

/// Fresh codes drawn per collision before giving up.
const CODE_ATTEMPTS: u32 = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookingRequest {
    pub email: String,
    pub event_id: EventId,
    pub ticket_type_id: TicketTypeId,
    pub quantity: u32,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CommitError {
    #[error("no user registered under `{0}`")]
    UnknownUser(String),
    #[error("event {0:?} no longer exists")]
    UnknownEvent(EventId),
    #[error("ticket type {0:?} no longer exists")]
    UnknownTicketType(TicketTypeId),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletedBooking {
    pub ticket: Ticket,
    pub event: Event,
    pub ticket_type: TicketType,
}

/// Resolves user, event, and ticket type — each missing entity fails early
/// with its own error and no write — then persists the booking. The total is
/// computed here from the ticket type's price at this moment and never
/// recomputed afterwards.
pub async fn commit(
    gateway: &dyn EntityGateway,
    store: &dyn BookingStore,
    request: BookingRequest,
    now: DateTime<Utc>,
) -> Result<CompletedBooking, CommitError> {
    let user = gateway
        .find_user_by_email(&request.email)
        .await?
        .ok_or_else(|| CommitError::UnknownUser(request.email.clone()))?;
    let event = gateway
        .event_by_id(request.event_id)
        .await?
        .ok_or(CommitError::UnknownEvent(request.event_id))?;
    let ticket_type = gateway
        .ticket_type_by_id(request.ticket_type_id)
        .await?
        .ok_or(CommitError::UnknownTicketType(request.ticket_type_id))?;

    let mut ticket = Ticket::new_booking(user.id, &ticket_type, request.quantity, now)?;

    let mut attempts_left = CODE_ATTEMPTS;
    let saved = loop {
        match store.save_booking(ticket.clone()).await {
            Ok(saved) => break saved,
            Err(GatewayError::CodeCollision(code)) if attempts_left > 1 => {
                attempts_left -= 1;
                tracing::warn!(
                    event_name = "booking.code_collision",
                    code = %code,
                    attempts_left,
                    "generated ticket code collided, retrying with a fresh one"
                );
                ticket.code = TicketCode::generate();
            }
            Err(error) => return Err(error.into()),
        }
    };

    Ok(CompletedBooking { ticket: saved, event, ticket_type })
}
