//! Change events pushed by the remote task store.
//!
//! The push channel delivers named messages in the `task.<verb>` dotted
//! format. Create and update events carry a full post-change [`Task`]
//! snapshot — never a diff — and deletion carries only the id. There is no
//! version token on the wire, so consumers reconcile on a last-write-observed
//! basis.

use crate::model::Task;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four event kinds in the task event catalog.
///
/// String representation follows the `task.<verb>` convention used on the
/// push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A task was created.
    Created,
    /// A task was updated by an admin (any field).
    Updated,
    /// A task was deleted.
    Deleted,
    /// A task's status was changed by its assignee.
    UpdatedByUser,
}

impl EventKind {
    /// All known event kinds in catalog order.
    pub const ALL: [Self; 4] = [
        Self::Created,
        Self::Updated,
        Self::Deleted,
        Self::UpdatedByUser,
    ];

    /// Return the canonical `task.<verb>` string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "task.created",
            Self::Updated => "task.updated",
            Self::Deleted => "task.deleted",
            Self::UpdatedByUser => "task.updatedbyuser",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = MalformedEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task.created" => Ok(Self::Created),
            "task.updated" => Ok(Self::Updated),
            "task.deleted" => Ok(Self::Deleted),
            "task.updatedbyuser" => Ok(Self::UpdatedByUser),
            _ => Err(MalformedEvent::UnknownKind { raw: s.to_string() }),
        }
    }
}

/// Deletion payload: the backend sends only the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct DeletedPayload {
    id: i64,
}

/// A decoded change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Created(Task),
    Updated(Task),
    Deleted(i64),
    UpdatedByUser(Task),
}

impl ChangeEvent {
    /// The kind tag of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Created(_) => EventKind::Created,
            Self::Updated(_) => EventKind::Updated,
            Self::Deleted(_) => EventKind::Deleted,
            Self::UpdatedByUser(_) => EventKind::UpdatedByUser,
        }
    }

    /// The id of the task this event concerns.
    #[must_use]
    pub const fn task_id(&self) -> i64 {
        match self {
            Self::Created(task) | Self::Updated(task) | Self::UpdatedByUser(task) => task.id,
            Self::Deleted(id) => *id,
        }
    }

    /// Decode a named push message into an event.
    ///
    /// One corrupt message must not take down the whole view, so decoding
    /// failures are returned as [`MalformedEvent`] for the caller to log and
    /// drop.
    ///
    /// # Errors
    ///
    /// [`MalformedEvent::UnknownKind`] for an unrecognized message name;
    /// [`MalformedEvent::Payload`] when the payload does not decode as the
    /// shape that kind requires.
    pub fn from_wire(name: &str, payload: serde_json::Value) -> Result<Self, MalformedEvent> {
        let kind = EventKind::from_str(name)?;
        let decode = |payload| {
            serde_json::from_value(payload).map_err(|e| MalformedEvent::Payload {
                kind,
                detail: e.to_string(),
            })
        };
        match kind {
            EventKind::Created => Ok(Self::Created(decode(payload)?)),
            EventKind::Updated => Ok(Self::Updated(decode(payload)?)),
            EventKind::UpdatedByUser => Ok(Self::UpdatedByUser(decode(payload)?)),
            EventKind::Deleted => {
                let DeletedPayload { id } = serde_json::from_value(payload).map_err(|e| {
                    MalformedEvent::Payload {
                        kind,
                        detail: e.to_string(),
                    }
                })?;
                Ok(Self::Deleted(id))
            }
        }
    }
}

/// Error returned when a push message cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedEvent {
    /// The message name is not in the event catalog.
    #[error(
        "unknown event '{raw}': expected one of task.created, task.updated, \
         task.deleted, task.updatedbyuser"
    )]
    UnknownKind { raw: String },

    /// The payload did not decode as the shape this kind requires.
    /// `detail` is the decoder's message; there is no underlying error value
    /// to chain.
    #[error("bad payload for {kind}: {detail}")]
    Payload { kind: EventKind, detail: String },
}
