//! Data model for the task board.
//!
//! These types mirror the backend's wire shapes exactly: field names are
//! camelCase on the wire, enums serialize as lowercase string literals, and
//! timestamps are RFC 3339 strings. Every change event carries a full
//! post-change [`Task`] snapshot, so the model doubles as the event payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// All priorities in ascending order.
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Todo,
    Progress,
    Done,
}

impl Status {
    /// All statuses in workflow order.
    pub const ALL: [Self; 3] = [Self::Todo, Self::Progress, Self::Done];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Progress => "progress",
            Self::Done => "done",
        }
    }
}

/// Viewer role, decoded from the bearer token by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {expected}: '{got}'")]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase()
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ParseEnumError {
                expected: "priority",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "todo" => Ok(Self::Todo),
            "progress" => Ok(Self::Progress),
            "done" => Ok(Self::Done),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => Err(ParseEnumError {
                expected: "role",
                got: s.to_string(),
            }),
        }
    }
}

/// A user relation embedded in a task (assignee or last updater).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: i64,
    pub username: String,
}

/// A comment on a task. Append-only; owned by exactly one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A task record, as stored remotely and mirrored locally.
///
/// The backend sometimes omits `comments` on event payloads, so it defaults
/// to empty. `updated_by` is only populated on user-driven status updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub assigned_user: Option<UserRef>,
    #[serde(default)]
    pub updated_by: Option<UserRef>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Task {
    /// Username of the assignee, or `None` when the relation is absent.
    #[must_use]
    pub fn assignee(&self) -> Option<&str> {
        self.assigned_user.as_ref().map(|u| u.username.as_str())
    }

    /// Human-readable time remaining until the deadline, or `"Expired"`.
    #[must_use]
    pub fn time_left(&self, now: DateTime<Utc>) -> String {
        let diff = self.deadline - now;
        if diff <= chrono::Duration::zero() {
            return "Expired".to_string();
        }
        let secs = diff.num_seconds();
        let days = secs / 86_400;
        let hours = (secs % 86_400) / 3_600;
        let minutes = (secs % 3_600) / 60;
        let seconds = secs % 60;
        format!("{days}d {hours}h {minutes}m {seconds}s")
    }
}

/// The viewer's identity, derived externally from the session token.
///
/// The core never parses credentials; callers construct this from whatever
/// auth layer they use and pass it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

/// A row from the user directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::{Comment, ParseEnumError, Priority, Role, Status, Task, UserRef};
    use chrono::{DateTime, TimeZone, Utc};
    use std::str::FromStr;

    fn sample_task(json: &str) -> Task {
        serde_json::from_str(json).expect("task should deserialize")
    }

    #[test]
    fn enum_json_roundtrips() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        assert_eq!(serde_json::to_string(&Status::Todo).unwrap(), "\"todo\"");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");

        assert_eq!(
            serde_json::from_str::<Priority>("\"low\"").unwrap(),
            Priority::Low
        );
        assert_eq!(
            serde_json::from_str::<Status>("\"progress\"").unwrap(),
            Status::Progress
        );
        assert_eq!(serde_json::from_str::<Role>("\"user\"").unwrap(), Role::User);
    }

    #[test]
    fn display_parse_roundtrips() {
        for value in Priority::ALL {
            assert_eq!(Priority::from_str(&value.to_string()).unwrap(), value);
        }
        for value in Status::ALL {
            assert_eq!(Status::from_str(&value.to_string()).unwrap(), value);
        }
        for value in [Role::Admin, Role::User] {
            assert_eq!(Role::from_str(&value.to_string()).unwrap(), value);
        }
    }

    #[test]
    fn parse_rejects_unknown_values() {
        assert!(Priority::from_str("urgent").is_err());
        assert!(Status::from_str("doing").is_err());
        assert!(Role::from_str("root").is_err());

        let err = Status::from_str("doing").unwrap_err();
        assert_eq!(
            err,
            ParseEnumError {
                expected: "status",
                got: "doing".to_string(),
            }
        );
        assert_eq!(err.to_string(), "invalid status: 'doing'");
    }

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        assert_eq!(Priority::from_str(" HIGH ").unwrap(), Priority::High);
        assert_eq!(Status::from_str("Done").unwrap(), Status::Done);
    }

    #[test]
    fn task_wire_shape_is_camel_case() {
        let task = sample_task(
            r#"{
                "id": 7,
                "title": "Ship release notes",
                "description": "Draft and publish",
                "priority": "medium",
                "status": "progress",
                "deadline": "2026-09-01T12:00:00Z",
                "assignedUser": {"id": 3, "username": "bob"},
                "comments": [
                    {"id": 1, "content": "started", "createdAt": "2026-08-20T09:00:00Z"}
                ]
            }"#,
        );

        assert_eq!(task.id, 7);
        assert_eq!(task.assignee(), Some("bob"));
        assert_eq!(task.comments.len(), 1);
        assert_eq!(task.comments[0].content, "started");
        assert!(task.updated_by.is_none());

        let json = serde_json::to_value(&task).unwrap();
        assert!(json.get("assignedUser").is_some());
        assert!(json.get("assigned_user").is_none());
    }

    #[test]
    fn task_tolerates_missing_optional_fields() {
        // Event payloads omit comments; the original client normalized
        // `task.comments || []`.
        let task = sample_task(
            r#"{
                "id": 8,
                "title": "Bare payload",
                "priority": "low",
                "status": "todo",
                "deadline": "2026-09-01T12:00:00Z"
            }"#,
        );
        assert!(task.comments.is_empty());
        assert!(task.assigned_user.is_none());
        assert_eq!(task.description, "");
    }

    fn at(ts: &str) -> DateTime<Utc> {
        ts.parse().expect("timestamp should parse")
    }

    #[test]
    fn time_left_counts_down() {
        let task = sample_task(
            r#"{
                "id": 9,
                "title": "Deadline check",
                "priority": "high",
                "status": "todo",
                "deadline": "2026-09-03T02:03:04Z"
            }"#,
        );
        let now = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).single().unwrap();
        assert_eq!(task.time_left(now), "2d 2h 3m 4s");
        assert_eq!(task.time_left(at("2026-09-03T02:03:04Z")), "Expired");
        assert_eq!(task.time_left(at("2027-01-01T00:00:00Z")), "Expired");
    }

    #[test]
    fn comment_roundtrips_created_at() {
        let comment = Comment {
            id: 2,
            content: "lgtm".to_string(),
            created_at: at("2026-08-21T10:30:00Z"),
        };
        let json = serde_json::to_string(&comment).unwrap();
        assert!(json.contains("createdAt"));
        let back: Comment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, comment);
    }

    #[test]
    fn user_ref_equality_is_by_value() {
        let a = UserRef {
            id: 1,
            username: "bob".to_string(),
        };
        let b = UserRef {
            id: 1,
            username: "bob".to_string(),
        };
        assert_eq!(a, b);
    }
}
