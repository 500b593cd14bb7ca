//! [`EventStore`] over the `events` table.

use crate::rows::{
    EVENT_COLUMNS, EventRow, capacity_column, revision_column, seat_count, tally_count,
};
use crate::{PostgresStore, db_error};
use eventgate_core::error::{Rejection, StoreError};
use eventgate_core::event::{Event, LifecycleState};
use eventgate_core::store::{EventFilter, EventStore, EventTally, StoreFuture};
use eventgate_core::types::{EventId, Revision};
use sqlx::{PgConnection, Postgres, QueryBuilder};

/// Load and lock an event row for the rest of the transaction.
pub(crate) async fn lock_event(
    conn: &mut PgConnection,
    id: EventId,
) -> Result<Option<Event>, StoreError> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, EventRow>(&sql)
        .bind(id.as_uuid())
        .fetch_optional(conn)
        .await
        .map_err(db_error)?
        .map(Event::try_from)
        .transpose()
}

/// Confirmed registrations for an event, as seen by `conn`.
pub(crate) async fn confirmed_in(conn: &mut PgConnection, id: EventId) -> Result<u32, StoreError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM registrations WHERE event_id = $1 AND status = 'confirmed'",
    )
    .bind(id.as_uuid())
    .fetch_one(conn)
    .await
    .map_err(db_error)?;
    Ok(seat_count(count))
}

impl EventStore for PostgresStore {
    fn insert_event(&self, event: Event) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO events (
                    id, title, description, event_date, event_time, location, category,
                    capacity, organizer_id, state, revision, created_at, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                ",
            )
            .bind(event.id.as_uuid())
            .bind(&event.title)
            .bind(&event.description)
            .bind(event.date)
            .bind(&event.time)
            .bind(&event.location)
            .bind(&event.category)
            .bind(capacity_column(&event)?)
            .bind(event.organizer.as_uuid())
            .bind(event.state.as_str())
            .bind(revision_column(event.revision)?)
            .bind(event.created_at)
            .bind(event.updated_at)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

            tracing::debug!(event_id = %event.id, "Inserted event");
            Ok(())
        })
    }

    fn load_event(&self, id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
            sqlx::query_as::<_, EventRow>(&sql)
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?
                .map(Event::try_from)
                .transpose()
        })
    }

    fn find_events(&self, filter: EventFilter) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            let mut query: QueryBuilder<'_, Postgres> =
                QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM events WHERE TRUE"));

            if let Some(state) = filter.state {
                query.push(" AND state = ").push_bind(state.as_str());
            }
            if let Some(date) = filter.date {
                query.push(" AND event_date = ").push_bind(date);
            }
            if let Some(location) = &filter.location {
                query
                    .push(" AND lower(location) = ")
                    .push_bind(location.trim().to_lowercase());
            }
            if let Some(category) = &filter.category {
                query
                    .push(" AND lower(category) = ")
                    .push_bind(category.trim().to_lowercase());
            }
            if let Some(organizer) = filter.organizer {
                query.push(" AND organizer_id = ").push_bind(*organizer.as_uuid());
            }
            query.push(" ORDER BY event_date, created_at");

            query
                .build_query_as::<EventRow>()
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?
                .into_iter()
                .map(Event::try_from)
                .collect::<Result<Vec<_>, _>>()
        })
    }

    fn update_event(&self, event: Event, expected: Revision) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db_error)?;

            let current = lock_event(&mut tx, event.id)
                .await?
                .ok_or_else(|| Rejection::event_not_found(event.id))?;
            if current.revision != expected {
                return Err(StoreError::VersionConflict {
                    event_id: event.id,
                    expected,
                    actual: current.revision,
                });
            }

            let confirmed = confirmed_in(&mut tx, event.id).await?;
            if event.capacity.get() < confirmed {
                return Err(Rejection::Invalid(format!(
                    "capacity {} is below the {confirmed} confirmed registrations",
                    event.capacity
                ))
                .into());
            }

            sqlx::query(
                r"
                UPDATE events
                SET title = $2, description = $3, event_date = $4, event_time = $5,
                    location = $6, category = $7, capacity = $8, state = $9,
                    revision = $10, updated_at = $11
                WHERE id = $1
                ",
            )
            .bind(event.id.as_uuid())
            .bind(&event.title)
            .bind(&event.description)
            .bind(event.date)
            .bind(&event.time)
            .bind(&event.location)
            .bind(&event.category)
            .bind(capacity_column(&event)?)
            .bind(event.state.as_str())
            .bind(revision_column(event.revision)?)
            .bind(event.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

            tx.commit().await.map_err(db_error)?;
            Ok(event)
        })
    }

    fn delete_event_cascade(&self, id: EventId) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db_error)?;

            if lock_event(&mut tx, id).await?.is_none() {
                return Err(Rejection::event_not_found(id).into());
            }

            let removed = sqlx::query("DELETE FROM registrations WHERE event_id = $1")
                .bind(id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(db_error)?
                .rows_affected();
            sqlx::query("DELETE FROM events WHERE id = $1")
                .bind(id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;

            tx.commit().await.map_err(db_error)?;
            Ok(removed)
        })
    }

    fn event_tally(&self) -> StoreFuture<'_, EventTally> {
        Box::pin(async move {
            let rows: Vec<(String, i64)> =
                sqlx::query_as("SELECT state, COUNT(*) FROM events GROUP BY state")
                    .fetch_all(&self.pool)
                    .await
                    .map_err(db_error)?;

            let mut tally = EventTally::default();
            for (state, count) in rows {
                let count = tally_count(count);
                match LifecycleState::parse(&state)? {
                    LifecycleState::Pending => tally.pending = count,
                    LifecycleState::Approved => tally.approved = count,
                    LifecycleState::Rejected => tally.rejected = count,
                }
            }
            Ok(tally)
        })
    }
}
