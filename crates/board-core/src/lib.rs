//! board-core: the reconciliation core of taskboard.
//!
//! Everything in this crate is pure local state: the task data model, the
//! change-event catalog, the per-viewer visibility scope, the reconciliation
//! engine that merges snapshots with the live event stream, and the derived
//! notification feed. No I/O happens here — the client shell (board-cli)
//! owns the REST and push-channel plumbing and feeds decoded values in.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums per module; transitions in the
//!   engine are total and never fail.
//! - **Logging**: `tracing` macros (`debug!`, `trace!`, `warn!`); dropped
//!   inputs are observability events, not errors.

pub mod engine;
pub mod event;
pub mod filter;
pub mod model;
pub mod notify;

pub use engine::{Applied, BoardView, ViewCollection};
pub use event::{ChangeEvent, EventKind, MalformedEvent};
pub use filter::ViewScope;
pub use model::{Comment, Priority, Role, Status, Task, UserAccount, UserRef, Viewer};
pub use notify::{NotificationFeed, NotificationRecord};
