mod common;

use chrono::Duration;
use std::collections::HashSet;
use std::sync::Arc;

use bin_collection_routing::dto::route_dto::DailyRoute;
use bin_collection_routing::models::{CollectionStatus, RouteStatus};
use bin_collection_routing::repositories::RouteRepository;
use bin_collection_routing::services::CollectionService;
use bin_collection_routing::utils::errors::AppError;
use uuid::Uuid;

use common::{officer, today, Fixture};

fn service(fx: &Fixture) -> CollectionService {
    CollectionService::new(fx.repository.clone(), fx.clock())
}

async fn stop_ids(fx: &Fixture, plan_id: Uuid) -> Vec<Uuid> {
    fx.repository
        .find_stops(plan_id)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect()
}

#[tokio::test]
async fn test_single_stop_plan_completes_in_one_call() {
    let fx = Fixture::new(&["B1"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1"], "off-1").await;
    let stop = stop_ids(&fx, plan_id).await[0];

    let outcome = service(&fx)
        .confirm_collection(stop, 80, None, &officer("off-1"), None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome.plan_status, RouteStatus::Completed);
    assert!(outcome.next_stop.is_none());
    assert!(!outcome.duplicate);
    let plan = fx.repository.find_plan(plan_id).await.unwrap().unwrap();
    assert_eq!(plan.status, RouteStatus::Completed);
}

#[tokio::test]
async fn test_status_progresses_and_completes_only_when_all_collected() {
    let fx = Fixture::new(&["B1", "B2", "B3"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1", "B2", "B3"], "off-1").await;
    let stops = stop_ids(&fx, plan_id).await;
    let svc = service(&fx);
    let me = officer("off-1");

    let first = svc.confirm_collection(stops[0], 40, None, &me, None).await.unwrap().unwrap();
    assert_eq!(first.plan_status, RouteStatus::InProgress);
    assert_eq!(first.next_stop.as_ref().map(|s| s.stop_id), Some(stops[1]));

    // Se salta la parada 2 y confirma la 3: no queda nada por delante
    fx.clock.advance(Duration::minutes(10));
    let third = svc.confirm_collection(stops[2], 55, None, &me, None).await.unwrap().unwrap();
    assert_eq!(third.plan_status, RouteStatus::InProgress);
    assert!(third.next_stop.is_none());

    fx.clock.advance(Duration::minutes(10));
    let second = svc.confirm_collection(stops[1], 90, None, &me, None).await.unwrap().unwrap();
    assert_eq!(second.plan_status, RouteStatus::Completed);
    assert!(second.next_stop.is_none());
}

#[tokio::test]
async fn test_next_stop_does_not_go_back_to_skipped_stops() {
    let fx = Fixture::new(&["B1", "B2", "B3"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1", "B2", "B3"], "off-1").await;
    let stops = stop_ids(&fx, plan_id).await;
    let svc = service(&fx);
    let me = officer("off-1");

    let last = svc.confirm_collection(stops[2], 70, None, &me, None).await.unwrap().unwrap();
    assert!(last.next_stop.is_none());
    assert_eq!(last.plan_status, RouteStatus::InProgress);

    // Las saltadas siguen disponibles en la lista de pendientes
    let view = svc.get_next_stops(&me, 10).await.unwrap().unwrap();
    let pending: Vec<Uuid> = view.stops.iter().map(|s| s.stop_id).collect();
    assert_eq!(pending, vec![stops[0], stops[1]]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_confirmations_of_last_stops_complete_the_plan() {
    for _ in 0..50 {
        let fx = Fixture::new(&["B1", "B2", "B3"]).await;
        let plan_id = fx.seed_route("bucket-1", today(), &["B1", "B2", "B3"], "off-1").await;
        let stops = stop_ids(&fx, plan_id).await;
        let svc = Arc::new(service(&fx));
        let me = officer("off-1");

        svc.confirm_collection(stops[0], 30, None, &me, None).await.unwrap();

        let handles: Vec<_> = [stops[1], stops[2]]
            .into_iter()
            .map(|stop| {
                let svc = svc.clone();
                let me = me.clone();
                tokio::spawn(async move { svc.confirm_collection(stop, 60, None, &me, None).await })
            })
            .collect();

        let mut statuses = Vec::new();
        for handle in handles {
            statuses.push(handle.await.unwrap().unwrap().unwrap().plan_status);
        }

        assert!(statuses.contains(&RouteStatus::Completed));
        let plan = fx.repository.find_plan(plan_id).await.unwrap().unwrap();
        assert_eq!(plan.status, RouteStatus::Completed);
    }
}

#[tokio::test]
async fn test_next_stop_never_points_to_collected_stop() {
    let fx = Fixture::new(&["B1", "B2", "B3", "B4"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1", "B2", "B3", "B4"], "off-1").await;
    let stops = stop_ids(&fx, plan_id).await;
    let svc = service(&fx);
    let me = officer("off-1");

    let mut collected = HashSet::new();
    for index in [1usize, 3, 0, 2] {
        fx.clock.advance(Duration::minutes(5));
        let outcome = svc
            .confirm_collection(stops[index], 50, None, &me, None)
            .await
            .unwrap()
            .unwrap();
        collected.insert(stops[index]);
        if let Some(next) = outcome.next_stop {
            assert!(!collected.contains(&next.stop_id));
        }

        if let Some(view) = svc.get_next_stops(&me, 10).await.unwrap() {
            assert!(view.stops.iter().all(|s| !collected.contains(&s.stop_id)));
            assert_eq!(view.pending_count, 4 - collected.len());
        }
    }
}

#[tokio::test]
async fn test_wrong_officer_is_indistinguishable_from_missing_stop() {
    let fx = Fixture::new(&["B1"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1"], "off-1").await;
    let stop = stop_ids(&fx, plan_id).await[0];
    let svc = service(&fx);
    let intruder = officer("off-2");

    assert!(svc.get_collection_confirmation(stop, &intruder).await.unwrap().is_none());
    assert!(svc
        .confirm_collection(stop, 10, None, &intruder, None)
        .await
        .unwrap()
        .is_none());
    assert!(svc
        .confirm_collection(Uuid::new_v4(), 10, None, &officer("off-1"), None)
        .await
        .unwrap()
        .is_none());
    assert_eq!(fx.repository.event_count().await, 0);
}

#[tokio::test]
async fn test_officer_identity_is_case_insensitive() {
    let fx = Fixture::new(&["B1"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1"], "Off-1").await;
    let stop = stop_ids(&fx, plan_id).await[0];

    let view = service(&fx)
        .get_collection_confirmation(stop, &officer("  off-1 "))
        .await
        .unwrap();
    assert!(view.is_some());
}

#[tokio::test]
async fn test_confirming_a_stop_from_another_day_fails() {
    let fx = Fixture::new(&["B1"]).await;
    let yesterday = today().pred_opt().unwrap();
    let plan_id = fx.seed_route("bucket-1", yesterday, &["B1"], "off-1").await;
    let stop = stop_ids(&fx, plan_id).await[0];
    let svc = service(&fx);

    assert!(svc
        .confirm_collection(stop, 10, None, &officer("off-1"), None)
        .await
        .unwrap()
        .is_none());
    // La consulta de confirmación no exige que sea de hoy
    assert!(svc.get_collection_confirmation(stop, &officer("off-1")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_repeated_token_does_not_duplicate_events() {
    let fx = Fixture::new(&["B1", "B2"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1", "B2"], "off-1").await;
    let stops = stop_ids(&fx, plan_id).await;
    let svc = service(&fx);
    let me = officer("off-1");

    let first = svc
        .confirm_collection(stops[0], 70, None, &me, Some("retry-1".to_string()))
        .await
        .unwrap()
        .unwrap();
    let again = svc
        .confirm_collection(stops[0], 70, None, &me, Some("retry-1".to_string()))
        .await
        .unwrap()
        .unwrap();

    assert!(again.duplicate);
    assert_eq!(again.event_id, first.event_id);
    assert_eq!(again.plan_status, RouteStatus::InProgress);
    assert_eq!(fx.repository.event_count().await, 1);
}

#[tokio::test]
async fn test_fill_level_out_of_range_is_a_validation_error() {
    let fx = Fixture::new(&["B1"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1"], "off-1").await;
    let stop = stop_ids(&fx, plan_id).await[0];

    let result = service(&fx)
        .confirm_collection(stop, 101, None, &officer("off-1"), None)
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(fx.repository.event_count().await, 0);
}

#[tokio::test]
async fn test_daily_route_view() {
    let fx = Fixture::new(&["B1", "B2", "B3"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1", "B2", "B3"], "off-1").await;
    let stops = stop_ids(&fx, plan_id).await;
    let svc = service(&fx);
    let me = officer("off-1");

    svc.confirm_collection(stops[0], 65, Some("  lid sticky ".to_string()), &me, None)
        .await
        .unwrap();

    let route = svc.get_daily_route(&me).await.unwrap();
    let view = route.route().expect("assigned route");
    assert_eq!(view.plan_id, plan_id);
    assert_eq!(view.status, RouteStatus::InProgress);
    assert_eq!(view.total_stops, 3);
    assert_eq!(view.collected_stops, 1);

    let minutes: Vec<i64> = view.stops.iter().map(|s| s.minutes_from_previous).collect();
    assert_eq!(minutes, vec![0, 15, 15]);
    assert_eq!(view.stops[0].collection_status, Some(CollectionStatus::Collected));
    assert_eq!(view.stops[0].fill_level, Some(65));
    assert_eq!(view.stops[1].collection_status, None);
    assert_eq!(view.stops[0].location.region.as_deref(), Some("Central"));

    let events = fx.repository.find_events(&[stops[0]]).await.unwrap();
    assert_eq!(events[0].issue_log.as_deref(), Some("lid sticky"));
}

#[tokio::test]
async fn test_daily_route_without_assignment_is_no_route() {
    let fx = Fixture::new(&["B1"]).await;
    fx.seed_route("bucket-1", today(), &["B1"], "off-1").await;

    let route = service(&fx).get_daily_route(&officer("off-9")).await.unwrap();
    assert_eq!(route, DailyRoute::NoRoute);
}

#[tokio::test]
async fn test_next_stops_limit_and_completed_plan() {
    let fx = Fixture::new(&["B1", "B2", "B3"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1", "B2", "B3"], "off-1").await;
    let stops = stop_ids(&fx, plan_id).await;
    let svc = service(&fx);
    let me = officer("off-1");

    let view = svc.get_next_stops(&me, 2).await.unwrap().unwrap();
    assert_eq!(view.pending_count, 3);
    let sequences: Vec<i32> = view.stops.iter().map(|s| s.sequence).collect();
    assert_eq!(sequences, vec![1, 2]);

    for stop in &stops {
        svc.confirm_collection(*stop, 30, None, &me, None).await.unwrap();
    }
    assert!(svc.get_next_stops(&me, 2).await.unwrap().is_none());
}

#[tokio::test]
async fn test_confirmation_view_shows_latest_event() {
    let fx = Fixture::new(&["B1", "B2"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1", "B2"], "off-1").await;
    let stop = stop_ids(&fx, plan_id).await[0];
    let svc = service(&fx);
    let me = officer("off-1");

    let empty = svc.get_collection_confirmation(stop, &me).await.unwrap().unwrap();
    assert_eq!(empty.last_fill_level, None);
    assert_eq!(empty.location.bin_id, "B1");

    svc.confirm_collection(stop, 20, None, &me, None).await.unwrap();
    fx.clock.advance(Duration::minutes(30));
    svc.confirm_collection(stop, 35, None, &me, None).await.unwrap();

    let view = svc.get_collection_confirmation(stop, &me).await.unwrap().unwrap();
    assert_eq!(view.last_fill_level, Some(35));
    assert_eq!(view.last_status, Some(CollectionStatus::Collected));
}
