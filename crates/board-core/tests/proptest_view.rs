//! Property suite for the reconciliation engine.
//!
//! The engine promises idempotence under redelivery, scope consistency
//! regardless of event order, id uniqueness, and wholesale snapshot
//! supersession. These hold for arbitrary event sequences, so they are
//! checked as properties rather than enumerated scenarios.

use board_core::engine::BoardView;
use board_core::event::ChangeEvent;
use proptest::prelude::*;

use generators::*;

fn view_after(scope: board_core::filter::ViewScope, events: &[ChangeEvent]) -> BoardView {
    let mut view = BoardView::new(scope);
    for event in events {
        view.apply(event);
    }
    view
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(2000))]

    #[test]
    fn applying_an_event_twice_equals_once(
        scope in arb_scope(),
        prefix in prop::collection::vec(arb_event(), 0..12),
        event in arb_event(),
    ) {
        let mut once = view_after(scope.clone(), &prefix);
        once.apply(&event);

        let mut twice = view_after(scope, &prefix);
        twice.apply(&event);
        twice.apply(&event);

        prop_assert_eq!(once.tasks(), twice.tasks());
    }

    #[test]
    fn every_resident_task_matches_the_scope(
        scope in arb_scope(),
        events in prop::collection::vec(arb_event(), 0..24),
    ) {
        let view = view_after(scope.clone(), &events);
        for task in view.tasks() {
            prop_assert!(scope.matches(task), "task {} violates scope", task.id);
        }
    }

    #[test]
    fn ids_are_unique_after_any_sequence(
        scope in arb_scope(),
        events in prop::collection::vec(arb_event(), 0..24),
    ) {
        let view = view_after(scope, &events);
        let mut seen = std::collections::HashSet::new();
        for task in view.tasks() {
            prop_assert!(seen.insert(task.id), "duplicate id {}", task.id);
        }
    }

    #[test]
    fn snapshot_supersedes_all_prior_events(
        scope in arb_scope(),
        events in prop::collection::vec(arb_event(), 0..24),
        snapshot in prop::collection::vec(arb_task(), 0..8),
    ) {
        // Snapshots from the store are id-unique; keep the first of each id.
        let mut unique = Vec::new();
        for task in snapshot {
            if !unique.iter().any(|t: &board_core::model::Task| t.id == task.id) {
                unique.push(task);
            }
        }

        let mut with_events = view_after(scope.clone(), &events);
        with_events.replace_with_snapshot(unique.clone());

        let mut fresh = BoardView::new(scope);
        fresh.replace_with_snapshot(unique);

        prop_assert_eq!(with_events.tasks(), fresh.tasks());
    }

    #[test]
    fn deletion_holds_until_a_new_create(
        scope in arb_scope(),
        task in arb_task(),
    ) {
        let mut view = BoardView::new(scope.clone());
        view.apply(&ChangeEvent::Created(task.clone()));
        view.apply(&ChangeEvent::Deleted(task.id));
        prop_assert!(!view.collection().contains(task.id));

        // A duplicate delete stays a no-op.
        view.apply(&ChangeEvent::Deleted(task.id));
        prop_assert!(!view.collection().contains(task.id));

        // Only a fresh create (or the explicit create-on-update path)
        // restores the entry, and only in scope.
        view.apply(&ChangeEvent::Created(task.clone()));
        prop_assert_eq!(view.collection().contains(task.id), scope.matches(&task));
    }
}
