//! Filtered, paginated event queries for the web catalog.

use chrono::NaiveDate;
use sqlx::{QueryBuilder, Row, Sqlite};

use evenue_core::catalog::{EventFilter, Page, PageRequest};
use evenue_core::domain::event::{CategoryId, Event, EventId};

use super::{decimal_from_real, real_from_decimal, RepositoryError};
use crate::DbPool;

#[derive(Clone)]
pub struct SqlEventCatalog {
    pool: DbPool,
}

impl SqlEventCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Applies the filter twice — once for the total count, once for the
    /// page window — so pagination metadata stays correct under any filter
    /// combination.
    pub async fn filter_events(
        &self,
        filter: &EventFilter,
        page: PageRequest,
        today: NaiveDate,
    ) -> Result<Page<Event>, RepositoryError> {
        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM events");
        push_filters(&mut count_query, filter, today)?;
        let total: i64 = count_query.build_query_scalar().fetch_one(&self.pool).await?;

        let mut query = QueryBuilder::new(
            "SELECT id, name, description, category_id, event_date, location, ticket_price
             FROM events",
        );
        push_filters(&mut query, filter, today)?;
        query
            .push(" ORDER BY event_date ASC, id ASC LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = query.build().fetch_all(&self.pool).await?;
        let items = rows
            .iter()
            .map(|row| {
                Ok(Event {
                    id: EventId(row.try_get("id")?),
                    name: row.try_get("name")?,
                    description: row.try_get("description")?,
                    category_id: row.try_get::<Option<i64>, _>("category_id")?.map(CategoryId),
                    event_date: row.try_get("event_date")?,
                    location: row.try_get("location")?,
                    ticket_price: decimal_from_real(row.try_get("ticket_price")?)?,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(Page::new(items, page, total.max(0) as u64))
    }
}

struct ClauseJoiner {
    first: bool,
}

impl ClauseJoiner {
    fn new() -> Self {
        Self { first: true }
    }

    fn join(&mut self, builder: &mut QueryBuilder<'_, Sqlite>) {
        builder.push(if self.first { " WHERE " } else { " AND " });
        self.first = false;
    }
}

fn push_filters(
    builder: &mut QueryBuilder<'_, Sqlite>,
    filter: &EventFilter,
    today: NaiveDate,
) -> Result<(), RepositoryError> {
    let mut clause = ClauseJoiner::new();

    if !filter.categories.is_empty() {
        clause.join(builder);
        builder.push("category_id IN (");
        let mut separated = builder.separated(", ");
        for CategoryId(id) in &filter.categories {
            separated.push_bind(*id);
        }
        builder.push(")");
    }

    if let Some(window) = filter.date {
        let (start, end) = window.bounds(today);
        clause.join(builder);
        builder.push("event_date >= ").push_bind(start);
        builder.push(" AND event_date <= ").push_bind(end);
    }

    if let Some(bracket) = filter.price {
        let (min, max) = bracket.bounds();
        if let Some(min) = min {
            clause.join(builder);
            builder.push("ticket_price >= ").push_bind(real_from_decimal(min)?);
        }
        if let Some(max) = max {
            clause.join(builder);
            builder.push("ticket_price <= ").push_bind(real_from_decimal(max)?);
        }
    }

    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        clause.join(builder);
        builder
            .push("(name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR IFNULL(description, '') LIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(location) = &filter.location {
        clause.join(builder);
        builder.push("IFNULL(location, '') LIKE ").push_bind(format!("%{location}%"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use evenue_core::catalog::{DateWindow, EventFilter, PageRequest, PriceBracket};
    use evenue_core::domain::event::CategoryId;

    use crate::fixtures::DemoSeedDataset;
    use crate::{connect_with_settings, migrations, DbPool};

    use super::SqlEventCatalog;

    async fn seeded_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        DemoSeedDataset::load(&pool).await.expect("seed");
        pool
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 5, 1).expect("valid date")
    }

    #[tokio::test]
    async fn unfiltered_listing_pages_by_date() {
        let pool = seeded_pool().await;
        let catalog = SqlEventCatalog::new(pool.clone());

        let page = catalog
            .filter_events(&EventFilter::default(), PageRequest::new(1, 2), today())
            .await
            .expect("listing");

        assert_eq!(page.total_items, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 2);
        assert!(page.items[0].event_date <= page.items[1].event_date);

        let second = catalog
            .filter_events(&EventFilter::default(), PageRequest::new(2, 2), today())
            .await
            .expect("listing");
        assert_eq!(second.items.len(), 1);

        pool.close().await;
    }

    #[tokio::test]
    async fn category_and_price_filters_compose() {
        let pool = seeded_pool().await;
        let catalog = SqlEventCatalog::new(pool.clone());

        let filter = EventFilter {
            categories: vec![CategoryId(1)],
            price: Some(PriceBracket::UnderThirty),
            ..EventFilter::default()
        };
        let page = catalog
            .filter_events(&filter, PageRequest::default(), today())
            .await
            .expect("listing");
        assert!(page.items.is_empty(), "category 1 has no event under 30");

        let filter = EventFilter {
            categories: vec![CategoryId(1), CategoryId(3)],
            ..EventFilter::default()
        };
        let page = catalog
            .filter_events(&filter, PageRequest::default(), today())
            .await
            .expect("listing");
        let names: Vec<_> = page.items.iter().map(|event| event.name.as_str()).collect();
        assert_eq!(names, ["Jazz Night", "Silent Disco"]);

        pool.close().await;
    }

    #[tokio::test]
    async fn date_window_filters_against_supplied_today() {
        let pool = seeded_pool().await;
        let catalog = SqlEventCatalog::new(pool.clone());

        // Seeded dates: Jazz Night 2030-05-03, Rust Conf 2030-06-15,
        // Silent Disco 2030-05-20.
        let filter =
            EventFilter { date: Some(DateWindow::ThisWeek), ..EventFilter::default() };
        let page = catalog
            .filter_events(&filter, PageRequest::default(), today())
            .await
            .expect("listing");
        let names: Vec<_> = page.items.iter().map(|event| event.name.as_str()).collect();
        assert_eq!(names, ["Jazz Night"], "only events before next Sunday qualify");

        let filter =
            EventFilter { date: Some(DateWindow::WithinOneMonth), ..EventFilter::default() };
        let page = catalog
            .filter_events(&filter, PageRequest::default(), today())
            .await
            .expect("listing");
        assert_eq!(page.total_items, 2);

        pool.close().await;
    }

    #[tokio::test]
    async fn search_and_location_match_substrings() {
        let pool = seeded_pool().await;
        let catalog = SqlEventCatalog::new(pool.clone());

        let filter =
            EventFilter { search: Some("jazz".to_string()), ..EventFilter::default() }
                .normalized();
        let page = catalog
            .filter_events(&filter, PageRequest::default(), today())
            .await
            .expect("listing");
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].name, "Jazz Night");

        let filter =
            EventFilter { location: Some("Berlin".to_string()), ..EventFilter::default() }
                .normalized();
        let page = catalog
            .filter_events(&filter, PageRequest::default(), today())
            .await
            .expect("listing");
        let names: Vec<_> = page.items.iter().map(|event| event.name.as_str()).collect();
        assert_eq!(names, ["Silent Disco"]);

        pool.close().await;
    }

    #[tokio::test]
    async fn free_bracket_matches_zero_priced_events() {
        let pool = seeded_pool().await;
        let catalog = SqlEventCatalog::new(pool.clone());

        let filter = EventFilter { price: Some(PriceBracket::Free), ..EventFilter::default() };
        let page = catalog
            .filter_events(&filter, PageRequest::default(), today())
            .await
            .expect("listing");
        let names: Vec<_> = page.items.iter().map(|event| event.name.as_str()).collect();
        assert_eq!(names, ["Silent Disco"]);

        pool.close().await;
    }
}
