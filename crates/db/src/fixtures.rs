//! Deterministic demo dataset with a verification contract, used by the
//! end-to-end webhook tests and available for local seeding.

use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// (event id, name, ticket type count) contract the seed must satisfy.
const SEED_EVENTS: &[(i64, &str, i64)] =
    &[(1, "Jazz Night", 2), (2, "Rust Conf", 3), (3, "Silent Disco", 0)];

const SEED_USER_EMAILS: &[&str] = &["a@x.com", "b@x.com"];

pub struct DemoSeedDataset;

impl DemoSeedDataset {
    /// SQL fixture content for the demo dataset.
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    /// Loads the dataset in one transaction.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let events_seeded = SEED_EVENTS
            .iter()
            .map(|(id, name, ticket_type_count)| SeedEventInfo {
                event_id: *id,
                name,
                ticket_type_count: *ticket_type_count,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult { events_seeded })
    }

    /// Verifies the loaded dataset against the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut failures = Vec::new();

        let user_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE email IN ('a@x.com', 'b@x.com')",
        )
        .fetch_one(pool)
        .await?;
        if user_count != SEED_USER_EMAILS.len() as i64 {
            failures.push(format!(
                "expected {} seeded users, found {user_count}",
                SEED_USER_EMAILS.len()
            ));
        }

        for (event_id, name, expected_types) in SEED_EVENTS {
            let event_exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM events WHERE id = ?1 AND name = ?2)",
            )
            .bind(event_id)
            .bind(name)
            .fetch_one(pool)
            .await?;
            if event_exists != 1 {
                failures.push(format!("seed event `{name}` (id {event_id}) is missing"));
            }

            let type_count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM ticket_types WHERE event_id = ?1")
                    .bind(event_id)
                    .fetch_one(pool)
                    .await?;
            if type_count != *expected_types {
                failures.push(format!(
                    "event `{name}` should have {expected_types} ticket types, found {type_count}"
                ));
            }
        }

        Ok(VerificationResult { passed: failures.is_empty(), failures })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedEventInfo {
    pub event_id: i64,
    pub name: &'static str,
    pub ticket_type_count: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub events_seeded: Vec<SeedEventInfo>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResult {
    pub passed: bool,
    pub failures: Vec<String>,
}

#[cfg(test)]
mod tests {
    use crate::{connect_with_settings, migrations};

    use super::DemoSeedDataset;

    #[tokio::test]
    async fn seed_loads_and_satisfies_its_contract() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        let result = DemoSeedDataset::load(&pool).await.expect("seed");
        assert_eq!(result.events_seeded.len(), 3);

        let verification = DemoSeedDataset::verify(&pool).await.expect("verify");
        assert!(verification.passed, "failures: {:?}", verification.failures);

        pool.close().await;
    }

    #[tokio::test]
    async fn verification_reports_missing_data() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        let verification = DemoSeedDataset::verify(&pool).await.expect("verify");
        assert!(!verification.passed);
        assert!(!verification.failures.is_empty());

        pool.close().await;
    }
}
