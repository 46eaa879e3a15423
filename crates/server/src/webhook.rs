//! The fulfillment webhook: one stateless turn per call.
//!
//! Well-formed turns always answer 200 with guidance text; the only
//! transport-level failure is a malformed top-level payload (missing
//! queryResult/intent/parameters/session), which is rejected with 400 since
//! it indicates a broken upstream caller rather than user input.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Serialize;
use tracing::warn;

use evenue_core::dialog::{ConversationTurn, DialogMachine, WebhookRequest, WebhookResponse};

#[derive(Debug, Serialize)]
pub struct WebhookFault {
    pub error: String,
}

pub fn router(machine: Arc<DialogMachine>) -> Router {
    Router::new().route("/webhook", post(webhook)).with_state(machine)
}

pub async fn webhook(
    State(machine): State<Arc<DialogMachine>>,
    Json(request): Json<WebhookRequest>,
) -> Result<Json<WebhookResponse>, (StatusCode, Json<WebhookFault>)> {
    let turn = ConversationTurn::from_request(request).map_err(|error| {
        warn!(
            event_name = "webhook.malformed_request",
            error = %error,
            "rejecting malformed webhook payload"
        );
        (StatusCode::BAD_REQUEST, Json(WebhookFault { error: error.to_string() }))
    })?;

    Ok(Json(machine.dispatch(&turn).await))
}
