//! Per-viewer visibility predicate.
//!
//! Every dashboard instance runs the same reconciliation logic parameterized
//! by a scope: admins see everything, regular users see only tasks assigned
//! to them. The predicate is pure — it is evaluated both when a snapshot is
//! merged and once per incoming event, and those call sites can interleave
//! arbitrarily, so it must give identical answers for identical inputs.

use crate::model::{Role, Task, Viewer};

/// Which tasks a viewer is allowed to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewScope {
    /// Admin dashboards are unfiltered.
    Admin,
    /// Only tasks assigned to this username.
    Owner { username: String },
}

impl ViewScope {
    /// The scope a viewer's role implies.
    #[must_use]
    pub fn for_viewer(viewer: &Viewer) -> Self {
        match viewer.role {
            Role::Admin => Self::Admin,
            Role::User => Self::Owner {
                username: viewer.username.clone(),
            },
        }
    }

    /// Whether `task` is visible in this scope.
    ///
    /// A task with no assignee is invisible to owner scopes; its absence is
    /// a degraded state the admin view still surfaces.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Self::Admin => true,
            Self::Owner { username } => task.assignee() == Some(username.as_str()),
        }
    }
}
