
use std::sync::Arc;
use std::time::Duration;

use kitchen_sim::progress::{ProgressEvent, ProgressStatus};
use kitchen_sim::scheduler::Recipe;
use kitchen_sim::station::{Station, StationExit};
use test_harness::*;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_station_cooks_every_recipe() {
    let list = recipes(3, &[1, 2]);
    let mut fx = station_fixture(list.clone(), 1, simulated());

    let report = Station::new(1, fx.ctx.clone()).run().await;

    assert_eq!(report.exit, StationExit::Exhausted);
    assert_eq!(report.completed, 3);
    assert_eq!(report.failed, 0);
    for recipe in &list {
        assert!(recipe.is_active());
        assert!(recipe.is_completed());
        assert!(recipe.steps.iter().all(|s| s.is_completed()));
    }

    let events = drain(&mut fx.events);
    assert_eq!(created_once(&events).len(), 3);
    assert_eq!(count_kind(&events, "completed"), 3);
    assert!(fx.board.read().await.is_all_complete());
    assert!(fx.ctx.queue.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_station_percent_sequence() {
    let mut fx = station_fixture(vec![recipe("Stew", &[2, 3, 5])], 1, simulated());
    let started = Instant::now();

    Station::new(1, fx.ctx.clone()).run().await;

    assert_eq!(started.elapsed(), Duration::from_secs(10));
    let events = drain(&mut fx.events);
    let percents = percents_for(&events, "Stew");
    assert_eq!(percents.len(), 4);
    assert!(approx(percents[0], 0.0));
    assert!(approx(percents[1], 33.3));
    assert!(approx(percents[2], 66.7));
    assert!(approx(percents[3], 100.0));
    assert!(matches!(
        events.last(),
        Some(ProgressEvent::Completed { recipe, .. }) if recipe == "Stew"
    ));

    let board = fx.board.read().await;
    let record = &board.records()[0];
    assert_eq!(record.status, ProgressStatus::Completed);
    assert_eq!(record.percent, 100.0);
}

#[tokio::test(start_paused = true)]
async fn test_station_current_step_follows_progress() {
    let mut fx = station_fixture(vec![recipe("Stew", &[1, 1])], 1, simulated());

    Station::new(1, fx.ctx.clone()).run().await;

    let events = drain(&mut fx.events);
    match &events[0] {
        ProgressEvent::Created { current_step, station, .. } => {
            assert_eq!(current_step, "Stew step 1");
            assert_eq!(*station, 1);
        }
        other => panic!("expected created, got {:?}", other),
    }
    match &events[1] {
        ProgressEvent::Updated { current_step, .. } => assert_eq!(current_step, "Stew step 2"),
        other => panic!("expected updated, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_simulation_speed_divides_waits() {
    let mut fx = station_fixture(vec![recipe("Stew", &[2, 3, 5])], 1, simulated());
    fx.ctx.simulation_speed = 2.0;
    let started = Instant::now();

    Station::new(1, fx.ctx.clone()).run().await;

    assert_eq!(started.elapsed(), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_station_skips_invalid_recipes() {
    let empty = Arc::new(Recipe::new("Air", "easy", vec![], vec![]));
    let list = vec![empty.clone(), recipe("Toast", &[1])];
    let mut fx = station_fixture(list, 1, simulated());

    let report = Station::new(1, fx.ctx.clone()).run().await;

    assert_eq!(report.skipped, 1);
    assert_eq!(report.completed, 1);
    assert!(!empty.is_active());
    let events = drain(&mut fx.events);
    assert!(events.iter().all(|e| e.recipe() != Some("Air")));
}

#[tokio::test(start_paused = true)]
async fn test_station_skips_already_active_recipe() {
    let claimed = recipe("Soup", &[1]);
    assert!(claimed.try_activate());
    let mut fx = station_fixture(vec![claimed.clone()], 1, simulated());

    let report = Station::new(1, fx.ctx.clone()).run().await;

    assert_eq!(report.skipped, 1);
    assert_eq!(report.completed, 0);
    assert!(!claimed.is_completed());
    assert!(drain(&mut fx.events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failing_recipe_does_not_stop_station() {
    let burnt = recipe("Toast", &[1, 1]);
    let list = vec![burnt.clone(), recipe("Salad", &[1])];
    let mut fx = station_fixture(list, 1, FailingExecutor::new("Toast step 2"));

    let report = Station::new(1, fx.ctx.clone()).run().await;

    assert_eq!(report.exit, StationExit::Exhausted);
    assert_eq!(report.failed, 1);
    assert_eq!(report.completed, 1);
    assert!(!burnt.is_completed());
    assert!(burnt.steps[0].is_completed());
    assert!(!burnt.steps[1].is_completed());

    let events = drain(&mut fx.events);
    assert!(events.iter().any(|e| matches!(
        e,
        ProgressEvent::Failed { recipe, reason, .. }
            if recipe == "Toast" && reason.contains("caught fire")
    )));

    let board = fx.board.read().await;
    assert_eq!(board.count(ProgressStatus::Failed), 1);
    assert_eq!(board.count(ProgressStatus::Completed), 1);
    assert!(!board.is_all_complete());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_start_creates_nothing() {
    let mut fx = station_fixture(recipes(2, &[1]), 1, simulated());
    fx.ctx.cancel.cancel();

    let report = Station::new(1, fx.ctx.clone()).run().await;

    assert_eq!(report.exit, StationExit::Cancelled);
    assert!(drain(&mut fx.events).is_empty());
    assert_eq!(fx.ctx.queue.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_recipe() {
    let stew = recipe("Stew", &[2, 3, 5]);
    let mut fx = station_fixture(vec![stew.clone(), recipe("Tea", &[1])], 1, simulated());
    let handle = tokio::spawn(Station::new(1, fx.ctx.clone()).run());

    advance(3).await;
    let cancelled_at = Instant::now();
    fx.ctx.cancel.cancel();
    let report = handle.await.unwrap();

    assert!(cancelled_at.elapsed() < Duration::from_secs(1));
    assert_eq!(report.exit, StationExit::Cancelled);
    assert_eq!(report.cancelled, 1);
    assert!(!stew.is_completed());
    assert!(stew.steps[0].is_completed());
    assert!(!stew.steps[1].is_completed());
    assert!(!stew.steps[2].is_completed());

    let events = drain(&mut fx.events);
    match events.last() {
        Some(ProgressEvent::Cancelled { recipe, percent, .. }) => {
            assert_eq!(recipe, "Stew");
            assert!(approx(*percent, 33.3));
        }
        other => panic!("expected cancelled, got {:?}", other),
    }
    assert!(events.iter().all(|e| e.recipe() != Some("Tea")));
}

#[tokio::test(start_paused = true)]
async fn test_station_above_pool_size_retires_without_taking_work() {
    let list = recipes(2, &[1]);
    let mut fx = station_fixture(list.clone(), 2, simulated());
    fx.ctx.roster.resize(1);

    let report = Station::new(2, fx.ctx.clone()).run().await;

    assert_eq!(report.exit, StationExit::Retired);
    assert_eq!(report.completed, 0);
    assert_eq!(fx.ctx.queue.len(), 2);
    assert!(list.iter().all(|r| !r.is_active()));
    assert_eq!(fx.ctx.roster.on_duty(), vec![1]);

    let events = drain(&mut fx.events);
    assert_eq!(events, vec![ProgressEvent::Retracted { station: 2 }]);

    // The remaining station still cooks the whole backlog.
    let report = Station::new(1, fx.ctx.clone()).run().await;
    assert_eq!(report.completed, 2);
}

#[tokio::test(start_paused = true)]
async fn test_unschedulable_step_fails_recipe_not_station() {
    let forever = recipe("Forever", &[u64::MAX]);
    let list = vec![forever.clone(), recipe("Toast", &[1])];
    let mut fx = station_fixture(list, 1, simulated());

    let report = Station::new(1, fx.ctx.clone()).run().await;

    assert_eq!(report.exit, StationExit::Exhausted);
    assert_eq!(report.failed, 1);
    assert_eq!(report.completed, 1);
    assert!(!forever.is_completed());

    let events = drain(&mut fx.events);
    assert!(events.iter().any(|e| matches!(
        e,
        ProgressEvent::Failed { recipe, .. } if recipe == "Forever"
    )));

    let board = fx.board.read().await;
    assert_eq!(board.count(ProgressStatus::Failed), 1);
    assert_eq!(board.count(ProgressStatus::InProgress), 0);
}

#[tokio::test(start_paused = true)]
async fn test_station_signs_off_when_exhausted() {
    let fx = station_fixture(Vec::new(), 2, simulated());

    let report = Station::new(2, fx.ctx.clone()).run().await;

    assert_eq!(report.exit, StationExit::Exhausted);
    assert_eq!(fx.ctx.roster.on_duty(), vec![1]);
}
