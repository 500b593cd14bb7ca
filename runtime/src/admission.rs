//! Registration and cancellation.

use crate::desk::EventDesk;
use crate::error::DeskError;
use crate::metrics::AdmissionMetrics;
use crate::retry::retry_store;
use eventgate_core::admission::AdmissionRequest;
use eventgate_core::registration::{CancelOutcome, Registration};
use eventgate_core::types::{EventId, RegistrationId, UserId};
use std::time::Instant;

impl EventDesk {
    /// Try to take a seat at `event_id` for `user_id`.
    ///
    /// The decision and the insert happen inside the backend's per-event
    /// critical section; a lost race is retried with the configured policy.
    ///
    /// # Errors
    ///
    /// - `Rejected(NotFound | NotApproved | AlreadyRegistered | CapacityFull)`
    ///   in that order of precedence.
    /// - `Rejected(Invalid)` for an oversized note.
    /// - `Rejected(Conflict)` when retries ran out.
    /// - `Storage(..)` when the backend failed; nothing was committed.
    #[tracing::instrument(skip(self, notes), fields(%event_id, %user_id))]
    pub async fn try_register(
        &self,
        event_id: EventId,
        user_id: UserId,
        notes: Option<String>,
    ) -> Result<Registration, DeskError> {
        let started = Instant::now();
        let request = AdmissionRequest::new(event_id, user_id, notes, self.now())?;

        let result = retry_store(&self.config.retry, || {
            self.storage.admit(request.clone())
        })
        .await;

        match &result {
            Ok(registration) => {
                AdmissionMetrics::record("admitted", started.elapsed());
                tracing::info!(registration_id = %registration.id, "Registration admitted");
            }
            Err(err @ DeskError::Rejected(_)) => {
                AdmissionMetrics::record(err.kind(), started.elapsed());
                tracing::info!(outcome = err.kind(), "Registration rejected");
            }
            Err(err) => {
                AdmissionMetrics::record(err.kind(), started.elapsed());
                tracing::error!(error = %err, "Admission failed");
            }
        }

        result
    }

    /// Cancel a registration owned by `user_id`.
    ///
    /// Cancelling twice is not an error: the second call returns the
    /// cancelled record with `changed == false`.
    ///
    /// # Errors
    ///
    /// - `Rejected(NotFound)` when the registration does not exist.
    /// - `Rejected(Forbidden)` when `user_id` does not own it.
    /// - `Storage(..)` when the backend failed.
    #[tracing::instrument(skip(self), fields(%registration_id, %user_id))]
    pub async fn cancel(
        &self,
        registration_id: RegistrationId,
        user_id: UserId,
    ) -> Result<CancelOutcome, DeskError> {
        let now = self.now();
        let outcome = retry_store(&self.config.retry, || {
            self.storage.cancel(registration_id, user_id, now)
        })
        .await?;

        AdmissionMetrics::record_cancel(outcome.changed);
        if outcome.changed {
            tracing::info!(event_id = %outcome.registration.event_id, "Registration cancelled");
        } else {
            tracing::debug!("Registration was already cancelled");
        }

        Ok(outcome)
    }
}
