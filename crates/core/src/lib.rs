pub mod catalog;
pub mod config;
pub mod dialog;
pub mod domain;
pub mod errors;

pub use catalog::{DateWindow, EventFilter, Page, PageRequest, PriceBracket};
pub use dialog::{
    BookingStore, Carrier, CarrierSealer, ConversationTurn, DialogMachine, EntityGateway,
    GatewayError, StateMarker, TurnError, WebhookRequest, WebhookResponse,
};
pub use domain::event::{CategoryId, Event, EventId};
pub use domain::ticket::{Ticket, TicketCode, TicketType, TicketTypeId, TicketTypeName};
pub use domain::user::{User, UserId};
pub use errors::DomainError;
