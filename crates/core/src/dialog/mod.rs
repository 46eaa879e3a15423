pub mod carrier;
pub mod coerce;
pub mod commit;
pub mod gateway;
pub mod handlers;
pub mod machine;
pub mod params;
pub mod seal;
pub mod turn;
pub mod wire;

pub use carrier::{Carrier, StateMarker, CARRIER_LIFESPAN};
pub use commit::{commit, BookingRequest, CommitError, CompletedBooking};
pub use gateway::{BookingStore, EntityGateway, GatewayError};
pub use machine::{DialogMachine, HandlerContext, IntentHandler, FALLBACK_TEXT};
pub use seal::CarrierSealer;
pub use turn::{ConversationTurn, TurnError};
pub use wire::{ContextEntry, WebhookRequest, WebhookResponse};
