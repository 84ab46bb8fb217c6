//! Shared output layer for human/JSON parity across all CLI commands.
//!
//! Every command handler receives an [`OutputMode`] and formats its output
//! accordingly: aligned text for humans, stable JSON for scripts. Watch-mode
//! notification lines go through here too, so piping `tb watch --json` into
//! another tool yields one JSON object per line.

use board_core::model::{Task, UserAccount};
use board_core::notify::NotificationRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{self, Write};

/// The two output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-optimized tables and lines.
    Human,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

fn write_json<T: Serialize>(w: &mut dyn Write, value: &T) -> io::Result<()> {
    let rendered = serde_json::to_string(value).map_err(io::Error::other)?;
    writeln!(w, "{rendered}")
}

/// Render a task table (or JSON array).
pub fn render_tasks(
    w: &mut dyn Write,
    mode: OutputMode,
    tasks: &[Task],
    now: DateTime<Utc>,
) -> io::Result<()> {
    if mode.is_json() {
        return write_json(w, &tasks);
    }

    if tasks.is_empty() {
        return writeln!(w, "No tasks.");
    }

    writeln!(
        w,
        "{:<6} {:<28} {:<8} {:<10} {:<14} {}",
        "ID", "TITLE", "PRIO", "STATUS", "ASSIGNEE", "DEADLINE"
    )?;
    for task in tasks {
        writeln!(
            w,
            "{:<6} {:<28} {:<8} {:<10} {:<14} {} ({})",
            task.id,
            truncate(&task.title, 28),
            task.priority,
            task.status,
            task.assignee().unwrap_or("-"),
            task.deadline.format("%Y-%m-%d"),
            task.time_left(now),
        )?;
    }
    Ok(())
}

/// Render one task in detail (used after writes).
pub fn render_task(w: &mut dyn Write, mode: OutputMode, task: &Task) -> io::Result<()> {
    if mode.is_json() {
        return write_json(w, task);
    }

    writeln!(w, "ID:          {}", task.id)?;
    writeln!(w, "Title:       {}", task.title)?;
    if !task.description.is_empty() {
        writeln!(w, "Description: {}", task.description)?;
    }
    writeln!(w, "Priority:    {}", task.priority)?;
    writeln!(w, "Status:      {}", task.status)?;
    writeln!(w, "Assignee:    {}", task.assignee().unwrap_or("-"))?;
    writeln!(w, "Deadline:    {}", task.deadline.format("%Y-%m-%d %H:%M"))?;
    if !task.comments.is_empty() {
        writeln!(w, "Comments:")?;
        for comment in &task.comments {
            writeln!(
                w,
                "  [{}] {}",
                comment.created_at.format("%Y-%m-%d %H:%M"),
                comment.content
            )?;
        }
    }
    Ok(())
}

/// Render the user directory.
pub fn render_users(w: &mut dyn Write, mode: OutputMode, users: &[UserAccount]) -> io::Result<()> {
    if mode.is_json() {
        return write_json(w, &users);
    }

    if users.is_empty() {
        return writeln!(w, "No users.");
    }

    writeln!(w, "{:<6} {:<16} {:<28} {}", "ID", "USERNAME", "EMAIL", "ROLE")?;
    for user in users {
        writeln!(
            w,
            "{:<6} {:<16} {:<28} {}",
            user.id, user.username, user.email, user.role
        )?;
    }
    Ok(())
}

/// Render one notification line as it arrives in watch mode.
pub fn render_notification(
    w: &mut dyn Write,
    mode: OutputMode,
    record: &NotificationRecord,
) -> io::Result<()> {
    if mode.is_json() {
        #[derive(Serialize)]
        struct Line<'a> {
            time: &'a DateTime<Utc>,
            message: &'a str,
        }
        return write_json(
            w,
            &Line {
                time: &record.time,
                message: &record.message,
            },
        );
    }
    writeln!(w, "[{}] {}", record.time.format("%H:%M:%S"), record.message)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use board_core::model::{Priority, Role, Status, UserRef};

    fn task(id: i64, title: &str) -> Task {
        Task {
            id,
            title: title.to_string(),
            description: "desc".to_string(),
            priority: Priority::High,
            status: Status::Progress,
            deadline: "2026-09-01T12:00:00Z".parse().expect("timestamp"),
            assigned_user: Some(UserRef {
                id: 1,
                username: "bob".to_string(),
            }),
            updated_by: None,
            comments: Vec::new(),
        }
    }

    fn now() -> DateTime<Utc> {
        "2026-08-27T12:00:00Z".parse().expect("timestamp")
    }

    fn rendered(f: impl FnOnce(&mut dyn Write) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn human_task_table_has_header_and_rows() {
        let out = rendered(|w| render_tasks(w, OutputMode::Human, &[task(1, "Fix login")], now()));
        assert!(out.contains("ID"));
        assert!(out.contains("Fix login"));
        assert!(out.contains("bob"));
        assert!(out.contains("2026-09-01"));
    }

    #[test]
    fn human_empty_table_says_so() {
        let out = rendered(|w| render_tasks(w, OutputMode::Human, &[], now()));
        assert_eq!(out, "No tasks.\n");
    }

    #[test]
    fn json_task_output_is_wire_shaped() {
        let out = rendered(|w| render_tasks(w, OutputMode::Json, &[task(1, "Fix login")], now()));
        let parsed: serde_json::Value = serde_json::from_str(&out).expect("valid json");
        assert_eq!(parsed[0]["id"], 1);
        assert_eq!(parsed[0]["assignedUser"]["username"], "bob");
    }

    #[test]
    fn task_detail_includes_comments() {
        let mut detailed = task(2, "With comments");
        detailed.comments.push(board_core::model::Comment {
            id: 1,
            content: "looks good".to_string(),
            created_at: "2026-08-20T09:00:00Z".parse().expect("timestamp"),
        });
        let out = rendered(|w| render_task(w, OutputMode::Human, &detailed));
        assert!(out.contains("With comments"));
        assert!(out.contains("looks good"));
    }

    #[test]
    fn users_render_in_both_modes() {
        let users = vec![UserAccount {
            id: 1,
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            role: Role::User,
        }];

        let human = rendered(|w| render_users(w, OutputMode::Human, &users));
        assert!(human.contains("bob@example.com"));

        let json = rendered(|w| render_users(w, OutputMode::Json, &users));
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(parsed[0]["role"], "user");
    }

    #[test]
    fn notification_lines_render_in_both_modes() {
        let record = NotificationRecord {
            message: "New task: A (Assigned to bob)".to_string(),
            time: now(),
        };

        let human = rendered(|w| render_notification(w, OutputMode::Human, &record));
        assert!(human.contains("New task: A"));
        assert!(human.starts_with("[12:00:00]"));

        let json = rendered(|w| render_notification(w, OutputMode::Json, &record));
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(parsed["message"], "New task: A (Assigned to bob)");
    }

    #[test]
    fn long_titles_truncate() {
        let long = "x".repeat(40);
        assert_eq!(truncate(&long, 28).chars().count(), 28);
        assert_eq!(truncate("short", 28), "short");
    }
}
