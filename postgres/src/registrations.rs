//! [`RegistrationStore`] over the `registrations` table, including the
//! locked admission transaction.

use crate::events::{confirmed_in, lock_event};
use crate::rows::{REGISTRATION_COLUMNS, RegistrationRow, seat_count, tally_count};
use crate::{PostgresStore, db_error, write_error};
use chrono::{DateTime, Utc};
use eventgate_core::admission::{self, AdmissionRequest, SeatSnapshot};
use eventgate_core::error::{Rejection, StoreError};
use eventgate_core::registration::{CancelOutcome, Registration, RegistrationStatus};
use eventgate_core::store::{RegistrationStore, RegistrationTally, StoreFuture};
use eventgate_core::types::{EventId, RegistrationId, UserId};
use std::collections::HashMap;
use uuid::Uuid;

impl PostgresStore {
    async fn fetch_registration(
        &self,
        id: RegistrationId,
    ) -> Result<Option<Registration>, StoreError> {
        let sql = format!("SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1");
        sqlx::query_as::<_, RegistrationRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(Registration::try_from)
            .transpose()
    }
}

impl RegistrationStore for PostgresStore {
    fn admit(&self, request: AdmissionRequest) -> StoreFuture<'_, Registration> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db_error)?;

            // Everything below runs with the event row locked.
            let event = lock_event(&mut tx, request.event_id).await?;
            let existing: Option<Uuid> = sqlx::query_scalar(
                "SELECT id FROM registrations \
                 WHERE event_id = $1 AND user_id = $2 AND status = 'confirmed'",
            )
            .bind(request.event_id.as_uuid())
            .bind(request.user_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
            let confirmed = confirmed_in(&mut tx, request.event_id).await?;

            let snapshot = SeatSnapshot {
                event: event.as_ref(),
                existing: existing.map(RegistrationId::from_uuid),
                confirmed,
            };
            let registration = admission::decide(snapshot, &request)?;

            sqlx::query(
                r"
                INSERT INTO registrations (id, event_id, user_id, status, notes, created_at, cancelled_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(registration.id.as_uuid())
            .bind(registration.event_id.as_uuid())
            .bind(registration.user_id.as_uuid())
            .bind(registration.status.as_str())
            .bind(&registration.notes)
            .bind(registration.created_at)
            .bind(registration.cancelled_at)
            .execute(&mut *tx)
            .await
            .map_err(write_error)?;

            tx.commit().await.map_err(db_error)?;
            Ok(registration)
        })
    }

    fn cancel(
        &self,
        id: RegistrationId,
        requested_by: UserId,
        at: DateTime<Utc>,
    ) -> StoreFuture<'_, CancelOutcome> {
        Box::pin(async move {
            let not_found = || StoreError::from(Rejection::registration_not_found(id));
            let event_id: Uuid = sqlx::query_scalar("SELECT event_id FROM registrations WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?
                .ok_or_else(not_found)?;

            let mut tx = self.pool.begin().await.map_err(db_error)?;
            // Same lock as admission, so the seat count never moves mid-decision.
            lock_event(&mut tx, EventId::from_uuid(event_id))
                .await?
                .ok_or_else(not_found)?;

            let sql = format!("SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1");
            let mut registration: Registration = sqlx::query_as::<_, RegistrationRow>(&sql)
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error)?
                .ok_or_else(not_found)
                .and_then(Registration::try_from)?;

            if registration.user_id != requested_by {
                return Err(
                    Rejection::forbidden("only the attendee may cancel this registration").into(),
                );
            }

            let changed = registration.cancel(at);
            if changed {
                sqlx::query("UPDATE registrations SET status = $2, cancelled_at = $3 WHERE id = $1")
                    .bind(id.as_uuid())
                    .bind(RegistrationStatus::Cancelled.as_str())
                    .bind(registration.cancelled_at)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error)?;
            }

            tx.commit().await.map_err(db_error)?;
            Ok(CancelOutcome {
                registration,
                changed,
            })
        })
    }

    fn load_registration(&self, id: RegistrationId) -> StoreFuture<'_, Option<Registration>> {
        Box::pin(self.fetch_registration(id))
    }

    fn count_confirmed(&self, event_id: EventId) -> StoreFuture<'_, u32> {
        Box::pin(async move {
            let mut conn = self.pool.acquire().await.map_err(db_error)?;
            confirmed_in(&mut conn, event_id).await
        })
    }

    fn confirmed_counts(&self, event_ids: Vec<EventId>) -> StoreFuture<'_, HashMap<EventId, u32>> {
        Box::pin(async move {
            let ids: Vec<Uuid> = event_ids.iter().map(|id| *id.as_uuid()).collect();
            let rows: Vec<(Uuid, i64)> = sqlx::query_as(
                "SELECT event_id, COUNT(*) FROM registrations \
                 WHERE status = 'confirmed' AND event_id = ANY($1) GROUP BY event_id",
            )
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

            let mut counts: HashMap<EventId, u32> =
                event_ids.into_iter().map(|id| (id, 0)).collect();
            for (event_id, count) in rows {
                counts.insert(EventId::from_uuid(event_id), seat_count(count));
            }
            Ok(counts)
        })
    }

    fn find_confirmed(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> StoreFuture<'_, Option<Registration>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {REGISTRATION_COLUMNS} FROM registrations \
                 WHERE event_id = $1 AND user_id = $2 AND status = 'confirmed'"
            );
            sqlx::query_as::<_, RegistrationRow>(&sql)
                .bind(event_id.as_uuid())
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?
                .map(Registration::try_from)
                .transpose()
        })
    }

    fn registrations_for_user(&self, user_id: UserId) -> StoreFuture<'_, Vec<Registration>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT {REGISTRATION_COLUMNS} FROM registrations \
                 WHERE user_id = $1 ORDER BY created_at DESC"
            );
            sqlx::query_as::<_, RegistrationRow>(&sql)
                .bind(user_id.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?
                .into_iter()
                .map(Registration::try_from)
                .collect::<Result<Vec<_>, _>>()
        })
    }

    fn registration_tally(&self) -> StoreFuture<'_, RegistrationTally> {
        Box::pin(async move {
            let rows: Vec<(String, i64)> =
                sqlx::query_as("SELECT status, COUNT(*) FROM registrations GROUP BY status")
                    .fetch_all(&self.pool)
                    .await
                    .map_err(db_error)?;

            let mut tally = RegistrationTally::default();
            for (status, count) in rows {
                let count = tally_count(count);
                match RegistrationStatus::parse(&status)? {
                    RegistrationStatus::Confirmed => tally.confirmed = count,
                    RegistrationStatus::Cancelled => tally.cancelled = count,
                }
            }
            Ok(tally)
        })
    }
}
