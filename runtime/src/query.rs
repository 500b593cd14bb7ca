//! Read side: listings, single-event views, "my registrations" and stats.
//!
//! Counts are read live from the backend on every call. They may lag an
//! in-flight admission by one seat but never overstate occupancy.

use crate::desk::EventDesk;
use crate::error::DeskError;
use eventgate_core::error::Rejection;
use eventgate_core::event::{Event, LifecycleState};
use eventgate_core::query::{EventSummary, EventView, RegistrationView, Stats};
use eventgate_core::store::EventFilter;
use eventgate_core::types::{Actor, EventId, UserId};
use std::collections::{HashMap, HashSet};

impl EventDesk {
    /// Approved events matching `filter`, annotated for `viewer`.
    ///
    /// Whatever state the filter asks for, only approved events are listed.
    ///
    /// # Errors
    ///
    /// `Storage(..)` when the backend failed.
    #[tracing::instrument(skip(self, filter))]
    pub async fn list_events(
        &self,
        filter: EventFilter,
        viewer: Option<UserId>,
    ) -> Result<Vec<EventView>, DeskError> {
        let events = self
            .storage
            .find_events(filter.with_state(LifecycleState::Approved))
            .await?;
        self.annotate(events, viewer).await
    }

    /// Moderation queue: every Pending event, oldest first.
    ///
    /// # Errors
    ///
    /// `Rejected(Forbidden)` unless `actor` is a moderator.
    pub async fn pending_events(&self, actor: Actor) -> Result<Vec<EventView>, DeskError> {
        require_moderator(&actor, "only moderators can review pending events")?;

        let mut events = self
            .storage
            .find_events(EventFilter::default().with_state(LifecycleState::Pending))
            .await?;
        events.sort_by_key(|e| e.created_at);
        self.annotate(events, None).await
    }

    /// One event with live occupancy.
    ///
    /// Events that are not approved are only visible to their organizer
    /// and to moderators.
    ///
    /// # Errors
    ///
    /// `Rejected(NotFound)` when the event does not exist or is hidden
    /// from `viewer`.
    #[tracing::instrument(skip(self))]
    pub async fn get_event(
        &self,
        event_id: EventId,
        viewer: Option<Actor>,
    ) -> Result<EventView, DeskError> {
        let event = self
            .storage
            .load_event(event_id)
            .await?
            .filter(|event| visible_to(event, viewer.as_ref()))
            .ok_or_else(|| Rejection::event_not_found(event_id))?;

        let count = self.storage.count_confirmed(event_id).await?;
        let is_registered = match viewer {
            Some(actor) => self.is_registered(event_id, actor.user_id).await?,
            None => false,
        };
        Ok(EventView::new(event, count, is_registered, self.today()))
    }

    /// Whether `user_id` holds a confirmed seat at `event_id`.
    ///
    /// # Errors
    ///
    /// `Storage(..)` when the backend failed.
    pub async fn is_registered(&self, event_id: EventId, user_id: UserId) -> Result<bool, DeskError> {
        Ok(self
            .storage
            .find_confirmed(event_id, user_id)
            .await?
            .is_some())
    }

    /// Every registration the user holds or held, each joined with its
    /// event, soonest event first.
    ///
    /// # Errors
    ///
    /// `Storage(..)` when the backend failed.
    #[tracing::instrument(skip(self))]
    pub async fn user_registrations(&self, user_id: UserId) -> Result<Vec<RegistrationView>, DeskError> {
        let registrations = self.storage.registrations_for_user(user_id).await?;

        let mut events: HashMap<EventId, EventSummary> = HashMap::new();
        for event_id in registrations.iter().map(|r| r.event_id) {
            if events.contains_key(&event_id) {
                continue;
            }
            // A registration can outlive a concurrent delete by one read.
            if let Some(event) = self.storage.load_event(event_id).await? {
                events.insert(event_id, EventSummary::from(&event));
            }
        }

        let mut views: Vec<RegistrationView> = registrations
            .into_iter()
            .filter_map(|registration| {
                let event = events.get(&registration.event_id)?.clone();
                Some(RegistrationView {
                    registration,
                    event,
                })
            })
            .collect();
        views.sort_by_key(RegistrationView::sort_key);
        Ok(views)
    }

    /// Moderator dashboard totals.
    ///
    /// # Errors
    ///
    /// `Rejected(Forbidden)` unless `actor` is a moderator.
    pub async fn stats(&self, actor: Actor) -> Result<Stats, DeskError> {
        require_moderator(&actor, "only moderators can view statistics")?;

        Ok(Stats {
            events: self.storage.event_tally().await?,
            registrations: self.storage.registration_tally().await?,
        })
    }

    async fn annotate(
        &self,
        events: Vec<Event>,
        viewer: Option<UserId>,
    ) -> Result<Vec<EventView>, DeskError> {
        let ids = events.iter().map(|e| e.id).collect();
        let counts = self.storage.confirmed_counts(ids).await?;

        let registered: HashSet<EventId> = match viewer {
            Some(user_id) => self
                .storage
                .registrations_for_user(user_id)
                .await?
                .into_iter()
                .filter(|r| r.is_confirmed())
                .map(|r| r.event_id)
                .collect(),
            None => HashSet::new(),
        };

        let today = self.today();
        Ok(events
            .into_iter()
            .map(|event| {
                let count = counts.get(&event.id).copied().unwrap_or(0);
                let is_registered = registered.contains(&event.id);
                EventView::new(event, count, is_registered, today)
            })
            .collect())
    }
}

fn visible_to(event: &Event, viewer: Option<&Actor>) -> bool {
    event.is_approved()
        || viewer.is_some_and(|actor| actor.is_moderator() || event.is_organized_by(actor.user_id))
}

fn require_moderator(actor: &Actor, reason: &'static str) -> Result<(), Rejection> {
    if actor.is_moderator() {
        Ok(())
    } else {
        Err(Rejection::forbidden(reason))
    }
}
