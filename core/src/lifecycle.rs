//! Moderation state machine for events.
//!
//! ```text
//!            approve            edit
//! Pending ───────────▶ Approved ─────▶ Pending
//!    │
//!    │ reject           edit
//!    └──────────▶ Rejected ─────▶ Pending   (resubmission)
//! ```
//!
//! Pure functions only: [`decide`] validates a command against the current
//! record and returns the record as it should be stored. Persisting the
//! result (with an optimistic revision check) is the caller's job.

use crate::error::Rejection;
use crate::event::{Event, EventPatch, LifecycleState};
use crate::types::Actor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Something an actor asks to happen to an event's lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleCommand {
    /// Moderator publishes a pending event.
    Approve,
    /// Moderator turns down a pending event.
    Reject,
    /// Organizer changes the event's details.
    Edit(EventPatch),
}

impl LifecycleCommand {
    /// Verb used in logs and error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Edit(_) => "edit",
        }
    }
}

/// What a successful command did to the lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleChange {
    /// Pending → Approved.
    Approved,
    /// Pending → Rejected.
    Rejected,
    /// Pending event edited; still awaiting review.
    Edited,
    /// Approved or rejected event edited; back to Pending for re-review.
    Resubmitted,
}

impl LifecycleChange {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Edited => "edited",
            Self::Resubmitted => "resubmitted",
        }
    }
}

/// A validated lifecycle step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    /// State before the command.
    pub from: LifecycleState,
    /// What happened.
    pub change: LifecycleChange,
    /// The record to store, revision already advanced.
    pub event: Event,
}

/// Validate `command` for `actor` and compute the next record.
///
/// # Errors
///
/// - [`Rejection::Forbidden`] when the actor lacks the role or ownership.
/// - [`Rejection::InvalidTransition`] when approving or rejecting a
///   non-pending event.
/// - [`Rejection::Invalid`] when an edit patch is malformed.
pub fn decide(
    event: &Event,
    actor: &Actor,
    command: &LifecycleCommand,
    now: DateTime<Utc>,
) -> Result<Transition, Rejection> {
    let change = match command {
        LifecycleCommand::Approve => {
            validate_moderation(event, actor, command)?;
            LifecycleChange::Approved
        }
        LifecycleCommand::Reject => {
            validate_moderation(event, actor, command)?;
            LifecycleChange::Rejected
        }
        LifecycleCommand::Edit(patch) => validate_edit(event, actor, patch)?,
    };

    let mut next = event.clone();
    apply_change(&mut next, command, change, now)?;

    Ok(Transition {
        from: event.state,
        change,
        event: next,
    })
}

/// Check that `actor` may delete `event`.
///
/// # Errors
///
/// Returns [`Rejection::Forbidden`] unless the actor organizes the event.
pub fn authorize_delete(event: &Event, actor: &Actor) -> Result<(), Rejection> {
    if event.is_organized_by(actor.user_id) {
        Ok(())
    } else {
        Err(Rejection::forbidden("only the organizer may delete this event"))
    }
}

fn validate_moderation(
    event: &Event,
    actor: &Actor,
    command: &LifecycleCommand,
) -> Result<(), Rejection> {
    if !actor.is_moderator() {
        return Err(Rejection::forbidden(format!(
            "only moderators may {} events",
            command.name()
        )));
    }

    if event.state != LifecycleState::Pending {
        return Err(Rejection::InvalidTransition {
            from: event.state,
            action: command.name(),
        });
    }

    Ok(())
}

fn validate_edit(
    event: &Event,
    actor: &Actor,
    patch: &EventPatch,
) -> Result<LifecycleChange, Rejection> {
    if !event.is_organized_by(actor.user_id) {
        return Err(Rejection::forbidden("only the organizer may edit this event"));
    }

    patch.validate()?;

    Ok(match event.state {
        LifecycleState::Pending => LifecycleChange::Edited,
        LifecycleState::Approved | LifecycleState::Rejected => LifecycleChange::Resubmitted,
    })
}

fn apply_change(
    event: &mut Event,
    command: &LifecycleCommand,
    change: LifecycleChange,
    now: DateTime<Utc>,
) -> Result<(), Rejection> {
    match change {
        LifecycleChange::Approved => event.state = LifecycleState::Approved,
        LifecycleChange::Rejected => event.state = LifecycleState::Rejected,
        LifecycleChange::Edited | LifecycleChange::Resubmitted => {
            if let LifecycleCommand::Edit(patch) = command {
                patch.apply_to(event)?;
            }
            event.state = LifecycleState::Pending;
        }
    }
    event.revision = event.revision.next();
    event.updated_at = now;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::event::EventDraft;
    use crate::types::{EventId, Revision, UserId};
    use chrono::NaiveDate;

    fn pending_event(organizer: UserId) -> Event {
        EventDraft {
            title: "Launch party".to_string(),
            description: None,
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            time: "20:00".to_string(),
            location: "Rooftop".to_string(),
            category: None,
            capacity: 50,
        }
        .into_event(EventId::new(), organizer, Utc::now())
        .unwrap()
    }

    #[test]
    fn moderator_approves_pending_event() {
        let event = pending_event(UserId::new());
        let t = decide(
            &event,
            &Actor::admin(UserId::new()),
            &LifecycleCommand::Approve,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(t.from, LifecycleState::Pending);
        assert_eq!(t.change, LifecycleChange::Approved);
        assert_eq!(t.event.state, LifecycleState::Approved);
        assert_eq!(t.event.revision, Revision::new(2));
    }

    #[test]
    fn members_cannot_moderate() {
        let organizer = UserId::new();
        let event = pending_event(organizer);
        for command in [LifecycleCommand::Approve, LifecycleCommand::Reject] {
            let err = decide(&event, &Actor::member(organizer), &command, Utc::now())
                .unwrap_err();
            assert!(matches!(err, Rejection::Forbidden { .. }));
        }
    }

    #[test]
    fn no_moderation_out_of_rejected() {
        let mut event = pending_event(UserId::new());
        event.state = LifecycleState::Rejected;
        let err = decide(
            &event,
            &Actor::admin(UserId::new()),
            &LifecycleCommand::Approve,
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            Rejection::InvalidTransition {
                from: LifecycleState::Rejected,
                action: "approve",
            }
        );
    }

    #[test]
    fn editing_approved_event_requires_re_review() {
        let organizer = UserId::new();
        let mut event = pending_event(organizer);
        event.state = LifecycleState::Approved;

        let patch = EventPatch {
            title: Some("Launch party (moved)".to_string()),
            ..EventPatch::default()
        };
        let t = decide(
            &event,
            &Actor::member(organizer),
            &LifecycleCommand::Edit(patch),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(t.change, LifecycleChange::Resubmitted);
        assert_eq!(t.event.state, LifecycleState::Pending);
        assert_eq!(t.event.title, "Launch party (moved)");
    }

    #[test]
    fn only_organizer_edits_or_deletes() {
        let event = pending_event(UserId::new());
        let stranger = Actor::admin(UserId::new());
        let patch = EventPatch {
            location: Some("Basement".to_string()),
            ..EventPatch::default()
        };

        assert!(matches!(
            decide(&event, &stranger, &LifecycleCommand::Edit(patch), Utc::now()),
            Err(Rejection::Forbidden { .. })
        ));
        assert!(authorize_delete(&event, &stranger).is_err());
        assert!(authorize_delete(&event, &Actor::member(event.organizer)).is_ok());
    }
}
