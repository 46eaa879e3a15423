use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use thiserror::Error;

pub mod catalog;
pub mod store;

pub use catalog::SqlEventCatalog;
pub use store::{SqlBookingStore, SqlEntityGateway};

use evenue_core::dialog::GatewayError;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Core traits speak [`GatewayError`]; everything repository-internal stays
/// [`RepositoryError`] and is flattened at the trait boundary.
pub(crate) fn into_gateway(error: RepositoryError) -> GatewayError {
    GatewayError::Backend(error.to_string())
}

/// Prices are stored as REAL columns; the domain works in `Decimal`.
pub(crate) fn decimal_from_real(value: f64) -> Result<Decimal, RepositoryError> {
    Decimal::from_f64(value)
        .ok_or_else(|| RepositoryError::Decode(format!("non-finite price value {value}")))
}

pub(crate) fn real_from_decimal(value: Decimal) -> Result<f64, RepositoryError> {
    value
        .to_f64()
        .ok_or_else(|| RepositoryError::Decode(format!("price {value} is not representable")))
}
