//! Catalog query surface for the web front end.
//!
//! Endpoints:
//! - `GET /api/events`       — filtered, paginated event listing
//! - `GET /api/events/{id}`  — event detail with its ticket types
//!
//! Filter keywords mirror the front end's dropdowns (`date=this-week`,
//! `price=under-30`, `categories=1,3`); unknown keywords fall through to an
//! unfiltered listing rather than erroring.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;

use evenue_core::catalog::{DateWindow, EventFilter, Page, PageRequest, PriceBracket};
use evenue_core::dialog::EntityGateway;
use evenue_core::domain::event::{CategoryId, Event, EventId};
use evenue_core::domain::ticket::TicketType;
use evenue_db::{SqlEntityGateway, SqlEventCatalog};

#[derive(Clone)]
pub struct CatalogState {
    gateway: Arc<SqlEntityGateway>,
    catalog: Arc<SqlEventCatalog>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    /// Comma-separated category ids.
    pub categories: Option<String>,
    pub date: Option<String>,
    pub price: Option<String>,
    pub search: Option<String>,
    pub location: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct EventDetail {
    pub event: Event,
    pub ticket_types: Vec<TicketType>,
}

#[derive(Debug, Serialize)]
pub struct CatalogFault {
    pub error: String,
}

pub fn router(gateway: Arc<SqlEntityGateway>, catalog: Arc<SqlEventCatalog>) -> Router {
    Router::new()
        .route("/api/events", get(list_events))
        .route("/api/events/{id}", get(event_detail))
        .with_state(CatalogState { gateway, catalog })
}

fn filter_from_query(query: &EventsQuery) -> EventFilter {
    EventFilter {
        categories: query.categories.as_deref().map(parse_categories).unwrap_or_default(),
        date: query.date.as_deref().and_then(DateWindow::parse),
        price: query.price.as_deref().and_then(PriceBracket::parse),
        search: query.search.clone(),
        location: query.location.clone(),
    }
    .normalized()
}

fn parse_categories(raw: &str) -> Vec<CategoryId> {
    raw.split(',').filter_map(|part| part.trim().parse::<i64>().ok()).map(CategoryId).collect()
}

pub async fn list_events(
    State(state): State<CatalogState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Page<Event>>, (StatusCode, Json<CatalogFault>)> {
    let filter = filter_from_query(&query);
    let page = PageRequest::new(
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(evenue_core::catalog::DEFAULT_PER_PAGE),
    );

    state
        .catalog
        .filter_events(&filter, page, Utc::now().date_naive())
        .await
        .map(Json)
        .map_err(|err| {
            error!(
                event_name = "catalog.listing_failed",
                error = %err,
                "event listing query failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CatalogFault { error: "event listing is temporarily unavailable".into() }),
            )
        })
}

pub async fn event_detail(
    Path(id): Path<i64>,
    State(state): State<CatalogState>,
) -> Result<Json<EventDetail>, (StatusCode, Json<CatalogFault>)> {
    let backend_fault = |err: evenue_core::dialog::GatewayError| {
        error!(
            event_name = "catalog.detail_failed",
            event_id = id,
            error = %err,
            "event detail query failed"
        );
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(CatalogFault { error: "event detail is temporarily unavailable".into() }),
        )
    };

    let event = state.gateway.event_by_id(EventId(id)).await.map_err(backend_fault)?;
    let Some(event) = event else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(CatalogFault { error: format!("no event with id {id}") }),
        ));
    };

    let ticket_types =
        state.gateway.ticket_types_by_event(event.id).await.map_err(backend_fault)?;

    Ok(Json(EventDetail { event, ticket_types }))
}
