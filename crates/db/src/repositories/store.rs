//! SQL implementations of the dialog's narrow persistence interfaces.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use evenue_core::dialog::{BookingStore, EntityGateway, GatewayError};
use evenue_core::domain::event::{CategoryId, Event, EventId};
use evenue_core::domain::ticket::{Ticket, TicketType, TicketTypeId, TicketTypeName};
use evenue_core::domain::user::{User, UserId};

use super::{decimal_from_real, into_gateway, real_from_decimal, RepositoryError};
use crate::DbPool;

#[derive(Clone)]
pub struct SqlEntityGateway {
    pool: DbPool,
}

impl SqlEntityGateway {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT id, email, name FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| user_from_row(&row)).transpose()
    }

    async fn event_by_name(&self, name: &str) -> Result<Option<Event>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, description, category_id, event_date, location, ticket_price
             FROM events WHERE name = ?1 COLLATE NOCASE",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| event_from_row(&row)).transpose()
    }

    async fn event(&self, id: EventId) -> Result<Option<Event>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, description, category_id, event_date, location, ticket_price
             FROM events WHERE id = ?1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| event_from_row(&row)).transpose()
    }

    async fn ticket_types(&self, event_id: EventId) -> Result<Vec<TicketType>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, event_id, type_name, price FROM ticket_types
             WHERE event_id = ?1 ORDER BY price DESC, id ASC",
        )
        .bind(event_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(ticket_type_from_row).collect()
    }

    async fn ticket_type(&self, id: TicketTypeId) -> Result<Option<TicketType>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, event_id, type_name, price FROM ticket_types WHERE id = ?1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(ticket_type_from_row).transpose()
    }
}

#[async_trait]
impl EntityGateway for SqlEntityGateway {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, GatewayError> {
        self.user_by_email(email).await.map_err(into_gateway)
    }

    async fn find_event_by_name(&self, name: &str) -> Result<Option<Event>, GatewayError> {
        self.event_by_name(name).await.map_err(into_gateway)
    }

    async fn event_by_id(&self, id: EventId) -> Result<Option<Event>, GatewayError> {
        self.event(id).await.map_err(into_gateway)
    }

    async fn ticket_types_by_event(
        &self,
        event_id: EventId,
    ) -> Result<Vec<TicketType>, GatewayError> {
        self.ticket_types(event_id).await.map_err(into_gateway)
    }

    async fn ticket_type_by_id(
        &self,
        id: TicketTypeId,
    ) -> Result<Option<TicketType>, GatewayError> {
        self.ticket_type(id).await.map_err(into_gateway)
    }
}

#[derive(Clone)]
pub struct SqlBookingStore {
    pool: DbPool,
}

impl SqlBookingStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for SqlBookingStore {
    async fn save_booking(&self, ticket: Ticket) -> Result<Ticket, GatewayError> {
        let total_price =
            real_from_decimal(ticket.total_price).map_err(into_gateway)?;

        let result = sqlx::query(
            "INSERT INTO tickets
                 (user_id, event_id, ticket_type_id, quantity, total_price,
                  ticket_code, purchase_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(ticket.user_id.0)
        .bind(ticket.event_id.0)
        .bind(ticket.ticket_type_id.0)
        .bind(ticket.quantity as i64)
        .bind(total_price)
        .bind(&ticket.code.0)
        .bind(ticket.purchase_date)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(ticket),
            Err(error) => {
                if is_code_collision(&error) {
                    return Err(GatewayError::CodeCollision(ticket.code.0.clone()));
                }
                Err(into_gateway(RepositoryError::Database(error)))
            }
        }
    }
}

fn is_code_collision(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .map(|db| {
            matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
                && db.message().contains("ticket_code")
        })
        .unwrap_or(false)
}

fn user_from_row(row: &SqliteRow) -> Result<User, RepositoryError> {
    Ok(User {
        id: UserId(row.try_get("id")?),
        email: row.try_get("email")?,
        name: row.try_get("name")?,
    })
}

fn event_from_row(row: &SqliteRow) -> Result<Event, RepositoryError> {
    Ok(Event {
        id: EventId(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category_id: row.try_get::<Option<i64>, _>("category_id")?.map(CategoryId),
        event_date: row.try_get("event_date")?,
        location: row.try_get("location")?,
        ticket_price: decimal_from_real(row.try_get("ticket_price")?)?,
    })
}

fn ticket_type_from_row(row: &SqliteRow) -> Result<TicketType, RepositoryError> {
    let raw_name: String = row.try_get("type_name")?;
    let name = TicketTypeName::matching(&raw_name)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown ticket type name `{raw_name}`")))?;

    Ok(TicketType {
        id: TicketTypeId(row.try_get("id")?),
        event_id: EventId(row.try_get("event_id")?),
        name,
        price: decimal_from_real(row.try_get("price")?)?,
    })
}
