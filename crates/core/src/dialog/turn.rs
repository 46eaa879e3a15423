use serde_json::{Map, Value};
use thiserror::Error;

use crate::dialog::carrier::StateMarker;
use crate::dialog::wire::{ContextEntry, WebhookRequest};

/// One inbound conversation turn, validated down from the raw webhook
/// payload. Constructed per request and discarded once the response is
/// built; nothing here is ever persisted.
#[derive(Clone, Debug)]
pub struct ConversationTurn {
    pub intent: String,
    pub parameters: Map<String, Value>,
    pub contexts: Vec<ContextEntry>,
    pub session: String,
}

/// Malformed top-level request shape. Distinct from an unknown intent name
/// (which routes to the fallback handler): these indicate a broken upstream
/// caller and are surfaced as a hard HTTP failure.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("request is missing the queryResult block")]
    MissingQueryResult,
    #[error("request is missing the intent display name")]
    MissingIntent,
    #[error("request is missing the parameters block")]
    MissingParameters,
    #[error("request is missing the session identifier")]
    MissingSession,
}

impl ConversationTurn {
    pub fn from_request(request: WebhookRequest) -> Result<Self, TurnError> {
        let session = request
            .session
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(TurnError::MissingSession)?;
        let query = request.query_result.ok_or(TurnError::MissingQueryResult)?;
        let intent = query
            .intent
            .and_then(|intent| intent.display_name)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or(TurnError::MissingIntent)?;
        let parameters = query.parameters.ok_or(TurnError::MissingParameters)?;

        Ok(Self { intent, parameters, contexts: query.output_contexts, session })
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    /// First context entry whose name carries the marker suffix. Suffix
    /// matching is the whole contract; the leading session path is opaque.
    pub fn context_for(&self, marker: StateMarker) -> Option<&ContextEntry> {
        let suffix = format!("/contexts/{}", marker.suffix());
        self.contexts.iter().find(|entry| entry.name.ends_with(&suffix))
    }
}
