//! Event creation, moderation, edits and deletion.

use crate::desk::EventDesk;
use crate::error::DeskError;
use crate::metrics::LifecycleMetrics;
use crate::retry::retry_store;
use eventgate_core::error::{Rejection, StoreError};
use eventgate_core::event::{Event, EventDraft, EventPatch};
use eventgate_core::lifecycle::{self, LifecycleCommand, Transition};
use eventgate_core::types::{Actor, EventId};
use serde::{Deserialize, Serialize};

/// Result of [`EventDesk::delete_event`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedEvent {
    /// The removed event.
    pub event_id: EventId,
    /// How many registrations went with it.
    pub registrations_removed: u64,
}

impl EventDesk {
    /// Publish a new event for review. It starts Pending.
    ///
    /// # Errors
    ///
    /// `Rejected(Invalid)` for a malformed draft, `Storage(..)` otherwise.
    #[tracing::instrument(skip(self, draft), fields(organizer = %actor.user_id))]
    pub async fn create_event(&self, draft: EventDraft, actor: Actor) -> Result<Event, DeskError> {
        let event = draft.into_event(EventId::new(), actor.user_id, self.now())?;
        self.storage.insert_event(event.clone()).await?;

        tracing::info!(event_id = %event.id, capacity = %event.capacity, "Event submitted for review");
        Ok(event)
    }

    /// Moderator approval: Pending → Approved.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-moderators, `InvalidTransition` unless Pending,
    /// `NotFound` when the event does not exist.
    pub async fn approve(&self, event_id: EventId, actor: Actor) -> Result<Event, DeskError> {
        self.transition(event_id, actor, LifecycleCommand::Approve)
            .await
            .map(|t| t.event)
    }

    /// Moderator rejection: Pending → Rejected.
    ///
    /// # Errors
    ///
    /// Same as [`Self::approve`].
    pub async fn reject(&self, event_id: EventId, actor: Actor) -> Result<Event, DeskError> {
        self.transition(event_id, actor, LifecycleCommand::Reject)
            .await
            .map(|t| t.event)
    }

    /// Organizer edit. Any edit sends the event (back) to Pending.
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless `actor` organizes the event.
    /// - `Invalid` for a malformed patch or a capacity below the current
    ///   confirmed count.
    /// - `NotFound` when the event does not exist.
    pub async fn edit_event(
        &self,
        event_id: EventId,
        patch: EventPatch,
        actor: Actor,
    ) -> Result<Event, DeskError> {
        self.transition(event_id, actor, LifecycleCommand::Edit(patch))
            .await
            .map(|t| t.event)
    }

    /// Remove an event together with all of its registrations.
    ///
    /// # Errors
    ///
    /// `NotFound` when the event does not exist, `Forbidden` unless `actor`
    /// organizes it.
    #[tracing::instrument(skip(self), fields(%event_id, user_id = %actor.user_id))]
    pub async fn delete_event(
        &self,
        event_id: EventId,
        actor: Actor,
    ) -> Result<DeletedEvent, DeskError> {
        let event = self
            .storage
            .load_event(event_id)
            .await?
            .ok_or_else(|| Rejection::event_not_found(event_id))?;
        lifecycle::authorize_delete(&event, &actor)?;

        let registrations_removed = self.storage.delete_event_cascade(event_id).await?;

        LifecycleMetrics::record_delete(registrations_removed);
        tracing::info!(registrations_removed, "Event deleted");
        Ok(DeletedEvent {
            event_id,
            registrations_removed,
        })
    }

    #[tracing::instrument(skip(self, command), fields(%event_id, user_id = %actor.user_id, command = command.name()))]
    async fn transition(
        &self,
        event_id: EventId,
        actor: Actor,
        command: LifecycleCommand,
    ) -> Result<Transition, DeskError> {
        let transition = retry_store(&self.config.retry, || {
            self.attempt_transition(event_id, &actor, &command)
        })
        .await?;

        LifecycleMetrics::record_transition(transition.change.as_str());
        tracing::info!(
            from = %transition.from,
            to = %transition.event.state,
            change = transition.change.as_str(),
            "Lifecycle transition"
        );
        Ok(transition)
    }

    async fn attempt_transition(
        &self,
        event_id: EventId,
        actor: &Actor,
        command: &LifecycleCommand,
    ) -> Result<Transition, StoreError> {
        let current = self
            .storage
            .load_event(event_id)
            .await?
            .ok_or_else(|| Rejection::event_not_found(event_id))?;

        let transition = lifecycle::decide(&current, actor, command, self.now())?;
        let stored = self
            .storage
            .update_event(transition.event.clone(), current.revision)
            .await?;

        Ok(Transition {
            event: stored,
            ..transition
        })
    }
}
