//! Narrow interfaces to the backing store. The dialog machine only ever
//! touches persistence through these traits; the SQL implementations live in
//! the db crate.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::event::{Event, EventId};
use crate::domain::ticket::{Ticket, TicketType, TicketTypeId};
use crate::domain::user::User;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("backend lookup failed: {0}")]
    Backend(String),
    #[error("ticket code already in use: {0}")]
    CodeCollision(String),
}

#[async_trait]
pub trait EntityGateway: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, GatewayError>;

    /// Case-insensitive match on the already-normalized event name.
    async fn find_event_by_name(&self, name: &str) -> Result<Option<Event>, GatewayError>;

    async fn event_by_id(&self, id: EventId) -> Result<Option<Event>, GatewayError>;

    async fn ticket_types_by_event(
        &self,
        event_id: EventId,
    ) -> Result<Vec<TicketType>, GatewayError>;

    async fn ticket_type_by_id(&self, id: TicketTypeId)
        -> Result<Option<TicketType>, GatewayError>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Persists the booking atomically: the full record or nothing. A taken
    /// ticket code surfaces as [`GatewayError::CodeCollision`] so the commit
    /// path can regenerate and retry.
    async fn save_booking(&self, ticket: Ticket) -> Result<Ticket, GatewayError>;
}
