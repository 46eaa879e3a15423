use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub i64);

/// Catalog event. Read-only to the booking flow; the catalog surface filters
/// on `category_id`, `event_date`, `location`, and the headline
/// `ticket_price`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub event_date: NaiveDate,
    pub location: Option<String>,
    pub ticket_price: Decimal,
}
