//! Schema-validated parameter extraction, one record per intent.
//!
//! Each `parse` inspects only the fields its intent owns and returns either
//! a strict typed record or a [`ParamIssue`] carrying the re-prompt wording.

use serde_json::{Map, Value};

use crate::dialog::coerce;

pub const PARAM_EMAIL: &str = "email";
pub const PARAM_EVENT: &str = "event";
pub const PARAM_TICKET_TYPE: &str = "ticketType";
pub const PARAM_QUANTITY: &str = "quantity";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamIssue {
    MissingEmail,
    MissingEventName,
    MissingTicketType,
    InvalidQuantity,
}

impl ParamIssue {
    pub fn reprompt(&self) -> &'static str {
        match self {
            Self::MissingEmail => "Please provide your email to look up your account.",
            Self::MissingEventName => "Which event would you like to book tickets for?",
            Self::MissingTicketType => "Please specify a ticket type.",
            Self::InvalidQuantity => "Please specify a valid number of tickets.",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailParams {
    pub email: String,
}

impl EmailParams {
    pub fn parse(parameters: &Map<String, Value>) -> Result<Self, ParamIssue> {
        let email = coerce::text(parameters.get(PARAM_EMAIL)).ok_or(ParamIssue::MissingEmail)?;
        Ok(Self { email })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventParams {
    pub event_name: String,
}

impl EventParams {
    pub fn parse(parameters: &Map<String, Value>) -> Result<Self, ParamIssue> {
        let event_name =
            coerce::text(parameters.get(PARAM_EVENT)).ok_or(ParamIssue::MissingEventName)?;
        Ok(Self { event_name })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketTypeParams {
    pub ticket_type: String,
    pub quantity: u32,
}

impl TicketTypeParams {
    pub fn parse(parameters: &Map<String, Value>) -> Result<Self, ParamIssue> {
        let ticket_type =
            coerce::text(parameters.get(PARAM_TICKET_TYPE)).ok_or(ParamIssue::MissingTicketType)?;

        let quantity = coerce::integer(parameters.get(PARAM_QUANTITY))
            .filter(|quantity| *quantity > 0)
            .and_then(|quantity| u32::try_from(quantity).ok())
            .ok_or(ParamIssue::InvalidQuantity)?;

        Ok(Self { ticket_type, quantity })
    }
}
