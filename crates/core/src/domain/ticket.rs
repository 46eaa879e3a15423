use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::event::EventId;
use crate::domain::user::UserId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketTypeId(pub i64);

/// Closed set of purchasable ticket categories. Stored and transmitted by
/// enum name (`GENERAL`, `VIP`, `EARLY_BIRD`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketTypeName {
    General,
    Vip,
    EarlyBird,
}

impl TicketTypeName {
    pub const ALL: [TicketTypeName; 3] = [Self::General, Self::Vip, Self::EarlyBird];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "GENERAL",
            Self::Vip => "VIP",
            Self::EarlyBird => "EARLY_BIRD",
        }
    }

    /// Case-insensitive match against the enum names, tolerating spaces in
    /// place of underscores (`"early bird"` matches `EARLY_BIRD`).
    pub fn matching(input: &str) -> Option<Self> {
        let wanted = input.trim().replace(' ', "_");
        Self::ALL.iter().copied().find(|name| name.as_str().eq_ignore_ascii_case(&wanted))
    }
}

impl std::fmt::Display for TicketTypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Purchasable category scoped to one event, with its own unit price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketType {
    pub id: TicketTypeId,
    pub event_id: EventId,
    pub name: TicketTypeName,
    pub price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketCode(pub String);

impl TicketCode {
    /// Human-readable code with 48 bits of v4-UUID entropy. Uniqueness is
    /// ultimately enforced by the store; collisions there trigger a
    /// regenerate-and-retry in the commit path.
    pub fn generate() -> Self {
        let entropy = Uuid::new_v4().simple().to_string();
        Self(format!("TKT-{}", entropy[..12].to_ascii_uppercase()))
    }
}

impl std::fmt::Display for TicketCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One completed booking. Insert-only: the total price is a snapshot of the
/// ticket-type price at commit time and is never recomputed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub user_id: UserId,
    pub event_id: EventId,
    pub ticket_type_id: TicketTypeId,
    pub quantity: u32,
    pub total_price: Decimal,
    pub purchase_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub code: TicketCode,
}

impl Ticket {
    pub fn new_booking(
        user_id: UserId,
        ticket_type: &TicketType,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity(quantity as i64));
        }

        let total_price = ticket_type
            .price
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(|| DomainError::InvariantViolation("total price overflow".to_string()))?;

        Ok(Self {
            user_id,
            event_id: ticket_type.event_id,
            ticket_type_id: ticket_type.id,
            quantity,
            total_price,
            purchase_date: now,
            created_at: now,
            updated_at: now,
            code: TicketCode::generate(),
        })
    }
}

/// Two-decimal display form used in fulfillment texts (`120.5` -> `120.50`).
pub fn format_price(price: Decimal) -> String {
    format!("{:.2}", price.round_dp(2))
}
