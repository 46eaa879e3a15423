//! Webhook payload shapes for the NLU fulfillment contract.
//!
//! The carrier round-trips entirely through these payloads: every turn reads
//! the prior turn's context entry and the response embeds the next one. The
//! suffix of a context entry name is the only binding part of the contract;
//! callers must echo names back verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    pub query_result: Option<QueryResult>,
    pub session: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub intent: Option<IntentRef>,
    pub parameters: Option<Map<String, Value>>,
    #[serde(default)]
    pub output_contexts: Vec<ContextEntry>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRef {
    pub display_name: Option<String>,
}

/// Named, lifespan-bounded context entry. The `parameters` map is the
/// carrier payload when the name ends in one of the dialog state markers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextEntry {
    pub name: String,
    #[serde(default)]
    pub lifespan_count: u32,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub fulfillment_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_contexts: Vec<ContextEntry>,
}

impl WebhookResponse {
    /// Reply with no carrier: fallback, terminal messages, and re-prompts
    /// for turns that carried no context to echo.
    pub fn say(text: impl Into<String>) -> Self {
        Self { fulfillment_text: text.into(), output_contexts: Vec::new() }
    }

    /// Reply that moves (or keeps) the conversation in a state, carrying the
    /// session facts forward.
    pub fn carrying(text: impl Into<String>, context: ContextEntry) -> Self {
        Self { fulfillment_text: text.into(), output_contexts: vec![context] }
    }
}
