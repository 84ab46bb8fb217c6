//! Human-readable notification feed derived from accepted change events.
//!
//! Records are a rendering artifact: newest-first, append-only, unbounded
//! until the viewer clears them, and never reconciled against the remote
//! store. Only events the engine actually admitted produce a record —
//! filtered no-ops stay silent, so a user's feed never mentions tasks they
//! cannot see.

use crate::engine::Applied;
use crate::event::ChangeEvent;
use crate::model::UserRef;
use chrono::{DateTime, Duration, Utc};
use tracing::trace;

/// Rendered in place of a missing user relation. Degraded display, not an
/// error.
pub const MISSING_USER: &str = "N/A";

/// How long an exact repeat of a notification is suppressed.
///
/// Re-subscribing after a transport drop can redeliver recent events. Events
/// carry full snapshots, so an exact repeat is byte-for-byte the same event;
/// remembering recent events verbatim inside this window keeps a reconnect
/// storm from flooding the feed while distinct edits of the same task stay
/// audible.
pub const REPEAT_WINDOW: Duration = Duration::seconds(30);

/// One notification line. No identity beyond its position in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRecord {
    pub message: String,
    pub time: DateTime<Utc>,
}

/// The per-dashboard notification state: the feed itself plus the unseen
/// badge count.
#[derive(Debug, Clone, Default)]
pub struct NotificationFeed {
    records: Vec<NotificationRecord>,
    unseen: usize,
    recent: Vec<(ChangeEvent, DateTime<Utc>)>,
}

impl NotificationFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest first.
    #[must_use]
    pub fn records(&self) -> &[NotificationRecord] {
        &self.records
    }

    #[must_use]
    pub const fn unseen(&self) -> usize {
        self.unseen
    }

    /// Reset the unseen badge without touching the records.
    pub fn mark_seen(&mut self) {
        self.unseen = 0;
    }

    /// Drop all records. Purely local; no remote effect.
    pub fn clear(&mut self) {
        self.records.clear();
        self.unseen = 0;
        self.recent.clear();
    }

    /// Observe an event the engine applied, producing a record when the
    /// outcome was a visible change and it is not a suppressed repeat.
    pub fn observe(&mut self, event: &ChangeEvent, outcome: Applied) -> Option<&NotificationRecord> {
        self.observe_at(event, outcome, Utc::now())
    }

    /// [`observe`](Self::observe) with an explicit clock, for tests.
    pub fn observe_at(
        &mut self,
        event: &ChangeEvent,
        outcome: Applied,
        now: DateTime<Utc>,
    ) -> Option<&NotificationRecord> {
        if !outcome.is_visible_change() {
            return None;
        }
        if self.is_repeat(event, now) {
            trace!(
                kind = %event.kind(),
                id = event.task_id(),
                "repeat within window, suppressed"
            );
            return None;
        }
        self.recent.push((event.clone(), now));
        self.records.insert(
            0,
            NotificationRecord {
                message: render_message(event),
                time: now,
            },
        );
        self.unseen += 1;
        self.records.first()
    }

    fn is_repeat(&mut self, event: &ChangeEvent, now: DateTime<Utc>) -> bool {
        self.recent.retain(|(_, seen)| now - *seen < REPEAT_WINDOW);
        self.recent.iter().any(|(recent, _)| recent == event)
    }
}

fn username_or_sentinel(user: Option<&UserRef>) -> &str {
    user.map_or(MISSING_USER, |u| u.username.as_str())
}

/// The fixed per-kind message templates.
fn render_message(event: &ChangeEvent) -> String {
    match event {
        ChangeEvent::Created(task) => format!(
            "New task: {} (Assigned to {})",
            task.title,
            username_or_sentinel(task.assigned_user.as_ref())
        ),
        ChangeEvent::Updated(task) => format!(
            "Task \"{}\" (ID: {}) has been updated by an admin.",
            task.title, task.id
        ),
        ChangeEvent::Deleted(id) => {
            format!("Task with ID {id} has been deleted by an admin.")
        }
        ChangeEvent::UpdatedByUser(task) => format!(
            "Task \"{}\" (ID: {}) has been updated by {}.",
            task.title,
            task.id,
            username_or_sentinel(task.updated_by.as_ref())
        ),
    }
}

/// Render the message an event would produce, without touching feed state.
/// Used by transient UI surfaces (snackbars).
#[must_use]
pub fn message_for(event: &ChangeEvent) -> String {
    render_message(event)
}
