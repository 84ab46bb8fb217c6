//! Reconciliation engine: merges authoritative snapshots and a live event
//! stream into one consistent local collection.
//!
//! # Consistency model
//!
//! The wire carries full entity snapshots and no version tokens, so the
//! engine cannot detect truly concurrent edits. Duplicate and reordered
//! create/update deliveries converge to whichever write was observed last —
//! this "last write observed wins" rule is a documented limitation of the
//! backend contract, deliberately not papered over with invented ordering.
//!
//! Two further rules fall out of that:
//!
//! - **Idempotence under redelivery.** The transport may redeliver events on
//!   reconnect; applying the same event twice must leave the collection
//!   unchanged after the first application.
//! - **Snapshot supersession.** A snapshot replaces local state wholesale.
//!   Events accepted between the start of a load and its completion may be
//!   silently superseded by the snapshot — an accepted staleness window that
//!   heals on the next event or reload.
//!
//! Every transition is synchronous against local state and total: malformed
//! input never reaches the engine (it is dropped at decode), and no input
//! can make a transition panic.

use crate::event::ChangeEvent;
use crate::filter::ViewScope;
use crate::model::Task;
use tracing::debug;

/// What applying one event did to the collection.
///
/// The notification feed keys off this: only outcomes that changed state the
/// viewer can see produce a record. [`Evicted`](Applied::Evicted) is a state
/// change the viewer should *not* hear about (the task left their scope), and
/// [`Skipped`](Applied::Skipped) changed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// A task entered the collection (fresh create, or a late-arriving
    /// update whose create was never seen).
    Inserted,
    /// An existing entry was replaced in place.
    Replaced,
    /// An entry was removed by a deletion event.
    Removed,
    /// An entry was removed because it no longer matches the scope.
    Evicted,
    /// Nothing changed: duplicate delivery, out-of-scope event, or a
    /// deletion for an id that was never present.
    Skipped,
}

impl Applied {
    /// Whether this outcome is one the viewer should be notified about.
    #[must_use]
    pub const fn is_visible_change(self) -> bool {
        matches!(self, Self::Inserted | Self::Replaced | Self::Removed)
    }
}

/// An id-unique, order-preserving sequence of tasks.
///
/// Order is most-recently-changed-first for event-driven insertions and
/// fetch order after a snapshot. In-place replacement preserves position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewCollection {
    tasks: Vec<Task>,
}

impl ViewCollection {
    #[must_use]
    pub const fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }

    #[must_use]
    pub fn get(&self, id: i64) -> Option<&Task> {
        self.position(id).map(|i| &self.tasks[i])
    }

    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        self.position(id).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    fn position(&self, id: i64) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Insert at the front. Caller must have checked the id is absent.
    fn prepend(&mut self, task: Task) {
        debug_assert!(!self.contains(task.id));
        self.tasks.insert(0, task);
    }

    /// Replace the entry with the same id, keeping its position.
    fn replace_at(&mut self, index: usize, task: Task) {
        self.tasks[index] = task;
    }

    fn remove(&mut self, index: usize) -> Task {
        self.tasks.remove(index)
    }

    fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }
}

impl<'a> IntoIterator for &'a ViewCollection {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

/// One viewer's live mirror of the visible subset of the remote collection.
///
/// Multiple instances (an admin board, a per-user board) can consume the
/// same event stream independently; each applies its own scope and keeps its
/// own collection.
#[derive(Debug, Clone)]
pub struct BoardView {
    scope: ViewScope,
    collection: ViewCollection,
}

impl BoardView {
    /// An empty board for the given scope; populate it with
    /// [`replace_with_snapshot`](Self::replace_with_snapshot).
    #[must_use]
    pub const fn new(scope: ViewScope) -> Self {
        Self {
            scope,
            collection: ViewCollection::new(),
        }
    }

    #[must_use]
    pub const fn scope(&self) -> &ViewScope {
        &self.scope
    }

    #[must_use]
    pub const fn collection(&self) -> &ViewCollection {
        &self.collection
    }

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        self.collection.as_slice()
    }

    /// Adopt an authoritative snapshot, replacing prior state entirely.
    ///
    /// The snapshot is filtered through the scope and kept in fetch order.
    /// Last snapshot wins: anything applied from the event stream before this
    /// point is discarded, whether or not the snapshot reflects it.
    pub fn replace_with_snapshot(&mut self, snapshot: Vec<Task>) {
        let before = self.collection.len();
        // The store assigns unique ids, but the uniqueness invariant is
        // ours to uphold: keep the first occurrence of a repeated id.
        let mut visible: Vec<Task> = Vec::new();
        for task in snapshot {
            if self.scope.matches(&task) && !visible.iter().any(|t| t.id == task.id) {
                visible.push(task);
            }
        }
        debug!(
            prior = before,
            adopted = visible.len(),
            "snapshot replaced collection"
        );
        self.collection.replace_all(visible);
    }

    /// Apply one change event and report what it did.
    ///
    /// See the module docs for the transition rules; in short:
    ///
    /// - `Created` prepends when in scope and not already present, and is a
    ///   no-op otherwise (duplicate deliveries must not mutate state).
    /// - `Updated`/`UpdatedByUser` replace in place when in scope; when the
    ///   id is absent they behave as a create, so a late-arriving update is
    ///   never dropped. When the task no longer matches the scope the entry
    ///   is evicted (e.g. reassigned to another user).
    /// - `Deleted` removes when present.
    pub fn apply(&mut self, event: &ChangeEvent) -> Applied {
        match event {
            ChangeEvent::Created(task) => self.apply_created(task),
            ChangeEvent::Updated(task) | ChangeEvent::UpdatedByUser(task) => {
                self.apply_updated(task)
            }
            ChangeEvent::Deleted(id) => self.apply_deleted(*id),
        }
    }

    fn apply_created(&mut self, task: &Task) -> Applied {
        if !self.scope.matches(task) {
            debug!(id = task.id, "create outside scope, skipped");
            return Applied::Skipped;
        }
        if self.collection.contains(task.id) {
            debug!(id = task.id, "duplicate create, skipped");
            return Applied::Skipped;
        }
        self.collection.prepend(task.clone());
        Applied::Inserted
    }

    fn apply_updated(&mut self, task: &Task) -> Applied {
        let present = self.collection.position(task.id);
        if self.scope.matches(task) {
            match present {
                Some(index) => {
                    self.collection.replace_at(index, task.clone());
                    Applied::Replaced
                }
                // Update arrived before (or instead of) its create.
                None => {
                    self.collection.prepend(task.clone());
                    Applied::Inserted
                }
            }
        } else {
            match present {
                Some(index) => {
                    self.collection.remove(index);
                    debug!(id = task.id, "task left viewer scope, evicted");
                    Applied::Evicted
                }
                None => Applied::Skipped,
            }
        }
    }

    fn apply_deleted(&mut self, id: i64) -> Applied {
        match self.collection.position(id) {
            Some(index) => {
                self.collection.remove(index);
                Applied::Removed
            }
            None => Applied::Skipped,
        }
    }
}
