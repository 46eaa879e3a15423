use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("ticket quantity must be positive, got {0}")]
    InvalidQuantity(i64),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}
