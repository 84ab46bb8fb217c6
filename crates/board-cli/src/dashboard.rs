//! One viewer's dashboard: a board view, its notification feed, and the
//! plumbing that keeps them current.
//!
//! Several dashboards can run in one process (an admin board next to a
//! per-user board) over the same bus; each holds its own subscription and
//! its own collection. All state mutation happens on the current-thread
//! runtime, so engine transitions and user-initiated actions are strictly
//! serialized — the only suspension points are the snapshot load and the
//! write round trips in [`ApiClient`].

use crate::api::{ApiClient, FetchError};
use board_core::engine::{Applied, BoardView};
use board_core::event::ChangeEvent;
use board_core::filter::ViewScope;
use board_core::model::{Role, Viewer};
use board_core::notify::{NotificationFeed, NotificationRecord};
use crate::transport::{EventBus, Subscription};
use std::time::Duration;
use tracing::{info, warn};

/// A live dashboard for one viewer.
pub struct Dashboard {
    viewer: Viewer,
    view: BoardView,
    feed: NotificationFeed,
    api: ApiClient,
    events: Subscription,
}

impl Dashboard {
    /// Build a dashboard and register it on the bus. The view starts empty;
    /// call [`reload`](Self::reload) to populate it.
    #[must_use]
    pub fn new(viewer: Viewer, api: ApiClient, bus: &EventBus) -> Self {
        let scope = ViewScope::for_viewer(&viewer);
        Self {
            viewer,
            view: BoardView::new(scope),
            feed: NotificationFeed::new(),
            api,
            events: bus.subscribe(),
        }
    }

    #[must_use]
    pub const fn view(&self) -> &BoardView {
        &self.view
    }

    #[must_use]
    pub const fn notifications(&self) -> &NotificationFeed {
        &self.feed
    }

    #[must_use]
    pub const fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    /// Replace local state with an authoritative snapshot.
    ///
    /// Non-admin viewers use the server-side filtered read; the engine
    /// filters again either way, since client-side visibility is
    /// authoritative. Events applied while the fetch was in flight are
    /// superseded by the snapshot (last snapshot wins).
    ///
    /// # Errors
    ///
    /// [`FetchError`] — surface it as a loading-error state; do not retry
    /// automatically.
    pub async fn reload(&mut self) -> Result<(), FetchError> {
        let snapshot = match self.viewer.role {
            Role::Admin => self.api.fetch_all().await?,
            Role::User => self.api.fetch_for_user(self.viewer.id).await?,
        };
        self.view.replace_with_snapshot(snapshot);
        Ok(())
    }

    /// Apply one event: engine transition first, then the notification feed
    /// observes the outcome. Returns the outcome and the record it produced,
    /// if any.
    pub fn apply(&mut self, event: &ChangeEvent) -> (Applied, Option<NotificationRecord>) {
        let outcome = self.view.apply(event);
        let record = self.feed.observe(event, outcome).cloned();
        (outcome, record)
    }

    /// Pump events until the bus closes, invoking `on_change` after every
    /// applied event that changed the view or produced a record.
    ///
    /// With `refresh` set, a full reload also runs on that interval. A
    /// failed periodic reload keeps the loop serving live events (the view
    /// degrades to event-only until the next tick) and surfaces through
    /// `on_change` as a transient record, so the renderer can tell the
    /// operator the view may be stale. That record is not retained in the
    /// feed.
    pub async fn run<F>(&mut self, refresh: Option<Duration>, mut on_change: F)
    where
        F: FnMut(&BoardView, Option<&NotificationRecord>),
    {
        let mut ticker = refresh.map(tokio::time::interval);
        if let Some(ticker) = ticker.as_mut() {
            // The first tick fires immediately; the initial reload already
            // happened, so skip it.
            ticker.tick().await;
        }

        loop {
            let event = if let Some(ticker) = ticker.as_mut() {
                tokio::select! {
                    maybe_event = self.events.next() => maybe_event,
                    _ = ticker.tick() => {
                        match self.reload().await {
                            Ok(()) => {
                                info!("periodic reload complete");
                                on_change(&self.view, None);
                            }
                            Err(e) => {
                                warn!(error = %e, "periodic reload failed");
                                let stale = NotificationRecord {
                                    message: format!(
                                        "Reload failed: {e}. Showing last fetched state."
                                    ),
                                    time: chrono::Utc::now(),
                                };
                                on_change(&self.view, Some(&stale));
                            }
                        }
                        continue;
                    }
                }
            } else {
                self.events.next().await
            };

            let Some(event) = event else {
                info!("event bus closed, dashboard stopping");
                return;
            };

            let (outcome, record) = self.apply(&event);
            if outcome == Applied::Skipped && record.is_none() {
                continue;
            }
            on_change(&self.view, record.as_ref());
        }
    }
}
