mod common;

use std::collections::BTreeMap;

use bin_collection_routing::models::{OfficerId, RouteStatus};
use bin_collection_routing::repositories::RouteRepository;
use bin_collection_routing::services::route_planner::{group_by_route_key, PlannedStop};

use common::{officer, planned, today, Fixture};

fn assignments(pairs: &[(&str, &str)]) -> BTreeMap<String, OfficerId> {
    pairs
        .iter()
        .map(|(key, who)| (key.to_string(), officer(who)))
        .collect()
}

#[tokio::test]
async fn test_new_keys_create_plans_stops_and_assignments() {
    let fx = Fixture::new(&["B1", "B2", "B3"]).await;
    let stops = group_by_route_key(&[planned("B2", 1, 2), planned("B1", 1, 1), planned("B3", 2, 1)]);

    let summary = fx
        .reconciler()
        .save_planned_routes(&stops, &assignments(&[("bucket-1", "off-1")]), "planner", today())
        .await
        .unwrap();

    assert_eq!(summary.plans_created, 2);
    assert_eq!(summary.stops_created, 3);
    assert_eq!(summary.assignments_upserted, 1);

    let plan_id = summary.plan_ids["bucket-1"];
    let plan = fx.repository.find_plan(plan_id).await.unwrap().unwrap();
    assert_eq!(plan.status, RouteStatus::Scheduled);
    assert_eq!(plan.created_by, "planner");
    assert_eq!(plan.planned_date, today());

    let route_stops = fx.repository.find_stops(plan_id).await.unwrap();
    let order: Vec<(&str, i32)> = route_stops.iter().map(|s| (s.bin_id.as_str(), s.sequence)).collect();
    assert_eq!(order, vec![("B1", 1), ("B2", 2)]);
    let gap = route_stops[1].planned_time.unwrap() - route_stops[0].planned_time.unwrap();
    assert_eq!(gap.num_minutes(), 15);

    let assignment = fx.repository.find_assignment(plan_id).await.unwrap().unwrap();
    assert_eq!(assignment.assigned_to, officer("OFF-1"));

    // bucket-2 queda sin asignar
    let unassigned = summary.plan_ids["bucket-2"];
    assert!(fx.repository.find_assignment(unassigned).await.unwrap().is_none());
}

#[tokio::test]
async fn test_second_save_is_idempotent() {
    let fx = Fixture::new(&["B1", "B2"]).await;
    let stops = group_by_route_key(&[planned("B1", 1, 1), planned("B2", 1, 2)]);
    let who = assignments(&[("bucket-1", "off-1")]);
    let reconciler = fx.reconciler();

    let first = reconciler.save_planned_routes(&stops, &who, "planner", today()).await.unwrap();
    let plan_id = first.plan_ids["bucket-1"];

    // Segunda llamada: misma clave y mismas asignaciones
    let second = reconciler.save_planned_routes(&stops, &who, "planner", today()).await.unwrap();
    assert_eq!(second.plans_created, 0);
    assert_eq!(second.stops_created, 0);
    assert_eq!(second.plan_ids["bucket-1"], plan_id);

    // Tercera llamada usando el id persistido como clave y sin paradas
    let key = plan_id.to_string();
    let by_id = assignments(&[(key.as_str(), "off-1")]);
    let third = reconciler
        .save_planned_routes(&BTreeMap::new(), &by_id, "planner", today())
        .await
        .unwrap();
    assert_eq!(third.plans_created, 0);

    assert_eq!(fx.repository.plan_count().await, 1);
    assert_eq!(fx.repository.stop_count().await, 2);
}

#[tokio::test]
async fn test_reassignment_overwrites_and_keeps_stops() {
    let fx = Fixture::new(&["B1", "B2"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1", "B2"], "off-1").await;
    let stops_before = fx.repository.find_stops(plan_id).await.unwrap();

    let key = plan_id.to_string();
    let extra: BTreeMap<String, Vec<PlannedStop>> =
        [(key.clone(), vec![planned("B9", 1, 1)])].into_iter().collect();
    fx.reconciler()
        .save_planned_routes(&extra, &assignments(&[(key.as_str(), "off-2")]), "supervisor", today())
        .await
        .unwrap();

    let assignment = fx.repository.find_assignment(plan_id).await.unwrap().unwrap();
    assert_eq!(assignment.assigned_to, officer("off-2"));
    assert_eq!(assignment.assigned_by, "supervisor");
    assert_eq!(fx.repository.find_stops(plan_id).await.unwrap(), stops_before);
    assert!(fx
        .repository
        .find_assigned_plans(&officer("off-1"), None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_same_key_on_another_date_is_a_new_plan() {
    let fx = Fixture::new(&["B1"]).await;
    let first = fx.seed_route("bucket-1", today(), &["B1"], "off-1").await;
    let second = fx.seed_route("bucket-1", today().succ_opt().unwrap(), &["B1"], "off-1").await;

    assert_ne!(first, second);
    assert_eq!(fx.repository.plan_count().await, 2);
}

#[tokio::test]
async fn test_key_without_stops_or_plan_creates_nothing() {
    let fx = Fixture::new(&[]).await;
    let summary = fx
        .reconciler()
        .save_planned_routes(&BTreeMap::new(), &assignments(&[("bucket-7", "off-1")]), "planner", today())
        .await
        .unwrap();

    assert!(summary.plan_ids.is_empty());
    assert_eq!(fx.repository.plan_count().await, 0);
}
