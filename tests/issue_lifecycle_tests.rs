mod common;

use bin_collection_routing::dto::issue_dto::{IssueQuery, IssueSource};
use bin_collection_routing::models::issue::MAX_DESCRIPTION_LEN;
use bin_collection_routing::models::{IssueLog, IssueSeverity, IssueStatus};
use bin_collection_routing::repositories::RouteRepository;
use bin_collection_routing::services::issue_service::{
    MSG_ALREADY_RESOLVED, MSG_NO_ISSUE, MSG_STOP_NOT_FOUND,
};
use bin_collection_routing::services::{CollectionService, IssueService};
use bin_collection_routing::utils::errors::AppError;
use uuid::Uuid;

use common::{officer, today, Fixture};

fn issues(fx: &Fixture) -> IssueService {
    IssueService::new(fx.repository.clone(), fx.clock())
}

async fn first_stop(fx: &Fixture, plan_id: Uuid) -> Uuid {
    fx.repository.find_stops(plan_id).await.unwrap()[0].id
}

async fn stop_log(fx: &Fixture, stop_id: Uuid) -> Option<String> {
    fx.repository.find_stop(stop_id).await.unwrap().unwrap().issue_log
}

fn query(search: Option<&str>, status: Option<&str>, priority: Option<&str>) -> IssueQuery {
    IssueQuery {
        search: search.map(str::to_string),
        status: status.map(str::to_string),
        priority: priority.map(str::to_string),
    }
}

#[tokio::test]
async fn test_issue_cycle_open_progress_resolved() {
    let fx = Fixture::new(&["B1"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1"], "off-1").await;
    let stop = first_stop(&fx, plan_id).await;
    fx.repository
        .update_stop_issue_log(stop, "type: Full; severity: Low; status: Open; description: bin full")
        .await
        .unwrap();
    let svc = issues(&fx);
    let me = officer("off-1");

    assert_eq!(svc.start_issue_work(stop, &me).await.unwrap(), "In Progress");
    assert_eq!(svc.start_issue_work(stop, &me).await.unwrap(), "Resolved");
    let resolved_log = stop_log(&fx, stop).await;
    assert_eq!(
        resolved_log.as_deref(),
        Some("type: Full; severity: Low; status: Resolved; description: bin full")
    );

    assert_eq!(svc.start_issue_work(stop, &me).await.unwrap(), MSG_ALREADY_RESOLVED);
    assert_eq!(stop_log(&fx, stop).await, resolved_log);
}

#[tokio::test]
async fn test_start_issue_work_fixed_messages() {
    let fx = Fixture::new(&["B1"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1"], "off-1").await;
    let stop = first_stop(&fx, plan_id).await;
    let svc = issues(&fx);

    assert_eq!(svc.start_issue_work(stop, &officer("off-1")).await.unwrap(), MSG_NO_ISSUE);
    assert_eq!(svc.start_issue_work(stop, &officer("off-2")).await.unwrap(), MSG_STOP_NOT_FOUND);
    assert_eq!(
        svc.start_issue_work(Uuid::new_v4(), &officer("off-1")).await.unwrap(),
        MSG_STOP_NOT_FOUND
    );
}

#[tokio::test]
async fn test_only_latest_entry_is_transitioned() {
    let fx = Fixture::new(&["B1"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1"], "off-1").await;
    let stop = first_stop(&fx, plan_id).await;
    let older = "type: Odour; severity: Medium; status: Open; description: smell";
    fx.repository
        .update_stop_issue_log(stop, &format!("{}\ntype: Damaged; severity: High; status: Open; description: lid", older))
        .await
        .unwrap();

    issues(&fx).start_issue_work(stop, &officer("off-1")).await.unwrap();

    let log = IssueLog::parse(&stop_log(&fx, stop).await.unwrap());
    assert_eq!(log.entries()[0].status, IssueStatus::Open);
    assert_eq!(log.entries()[1].status, IssueStatus::InProgress);
    assert!(stop_log(&fx, stop).await.unwrap().starts_with(older));
}

#[tokio::test]
async fn test_event_log_with_issue_takes_precedence() {
    let fx = Fixture::new(&["B1", "B2"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1", "B2"], "off-1").await;
    let stop = first_stop(&fx, plan_id).await;
    let me = officer("off-1");
    let stop_entry = "type: Full; severity: Low; status: Open; description: bin full";
    fx.repository.update_stop_issue_log(stop, stop_entry).await.unwrap();

    CollectionService::new(fx.repository.clone(), fx.clock())
        .confirm_collection(
            stop,
            60,
            Some("type: Damaged; severity: High; status: Open; description: wheel".to_string()),
            &me,
            None,
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(issues(&fx).start_issue_work(stop, &me).await.unwrap(), "In Progress");

    let events = fx.repository.find_events(&[stop]).await.unwrap();
    assert!(events[0].issue_log.as_deref().unwrap().contains("status: In Progress"));
    assert_eq!(stop_log(&fx, stop).await.as_deref(), Some(stop_entry));
}

#[tokio::test]
async fn test_plain_event_remarks_fall_back_to_stop_log() {
    let fx = Fixture::new(&["B1", "B2"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1", "B2"], "off-1").await;
    let stop = first_stop(&fx, plan_id).await;
    let me = officer("off-1");
    fx.repository
        .update_stop_issue_log(stop, "type: Full; severity: Low; status: Open; description: bin full")
        .await
        .unwrap();

    CollectionService::new(fx.repository.clone(), fx.clock())
        .confirm_collection(stop, 60, Some("all good".to_string()), &me, None)
        .await
        .unwrap();

    assert_eq!(issues(&fx).start_issue_work(stop, &me).await.unwrap(), "In Progress");
    assert!(stop_log(&fx, stop).await.unwrap().contains("status: In Progress"));
    let events = fx.repository.find_events(&[stop]).await.unwrap();
    assert_eq!(events[0].issue_log.as_deref(), Some("all good"));
}

#[tokio::test]
async fn test_legacy_free_text_status_is_inferred() {
    let fx = Fixture::new(&["B1"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1"], "off-1").await;
    let stop = first_stop(&fx, plan_id).await;
    fx.repository
        .update_stop_issue_log(stop, "bin tipped over, crew work in progress")
        .await
        .unwrap();

    assert_eq!(issues(&fx).start_issue_work(stop, &officer("off-1")).await.unwrap(), "Resolved");
    let log = stop_log(&fx, stop).await.unwrap();
    assert!(log.contains("status: Resolved"));
    assert!(log.contains("type: General"));
}

#[tokio::test]
async fn test_submit_issue_appends_open_entry() {
    let fx = Fixture::new(&["B1", "B2"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1", "B2"], "off-1").await;
    let stop = first_stop(&fx, plan_id).await;
    let svc = issues(&fx);
    let me = officer("off-1");

    assert!(svc
        .submit_issue("B1", "Damaged", IssueSeverity::High, "lid broken", &me)
        .await
        .unwrap());
    assert!(svc
        .submit_issue("B1", "Full", IssueSeverity::Low, "overflowing", &me)
        .await
        .unwrap());

    let log = IssueLog::parse(&stop_log(&fx, stop).await.unwrap());
    assert_eq!(log.entries().len(), 2);
    let latest = log.latest().unwrap();
    assert_eq!(latest.issue_type, "Full");
    assert_eq!(latest.status, IssueStatus::Open);
    assert!(latest.reported_at.is_some());
}

#[tokio::test]
async fn test_longest_description_is_kept_through_the_cycle() {
    let fx = Fixture::new(&["B1"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1"], "off-1").await;
    let stop = first_stop(&fx, plan_id).await;
    let svc = issues(&fx);
    let me = officer("off-1");
    let description = "ñ".repeat(MAX_DESCRIPTION_LEN);

    assert!(svc
        .submit_issue("B1", "Damaged", IssueSeverity::High, &description, &me)
        .await
        .unwrap());
    assert_eq!(svc.start_issue_work(stop, &me).await.unwrap(), "In Progress");

    let log = IssueLog::parse(&stop_log(&fx, stop).await.unwrap());
    let entry = log.latest().unwrap();
    assert_eq!(entry.description, description);
    assert_eq!(entry.status, IssueStatus::InProgress);
    assert!(entry.reported_at.is_some());
}

#[tokio::test]
async fn test_overlong_description_is_rejected() {
    let fx = Fixture::new(&["B1"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1"], "off-1").await;
    let description = "x".repeat(MAX_DESCRIPTION_LEN + 1);

    let result = issues(&fx)
        .submit_issue("B1", "Damaged", IssueSeverity::High, &description, &officer("off-1"))
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(stop_log(&fx, first_stop(&fx, plan_id).await).await.is_none());
}

#[tokio::test]
async fn test_submit_issue_for_bin_off_route_fails() {
    let fx = Fixture::new(&["B1", "B2"]).await;
    let plan_id = fx.seed_route("bucket-1", today(), &["B1"], "off-1").await;
    let yesterday_plan = fx
        .seed_route("bucket-1", today().pred_opt().unwrap(), &["B2"], "off-1")
        .await;
    let svc = issues(&fx);
    let me = officer("off-1");

    assert!(!svc
        .submit_issue("B2", "Damaged", IssueSeverity::High, "lid", &me)
        .await
        .unwrap());
    assert!(!svc
        .submit_issue("B1", "Damaged", IssueSeverity::High, "lid", &officer("off-2"))
        .await
        .unwrap());

    assert!(stop_log(&fx, first_stop(&fx, plan_id).await).await.is_none());
    assert!(stop_log(&fx, first_stop(&fx, yesterday_plan).await).await.is_none());
}

#[tokio::test]
async fn test_report_issue_view_history_search_and_counts() {
    let fx = Fixture::new(&["B1", "B2", "B3"]).await;
    let me = officer("off-1");
    let today_plan = fx.seed_route("bucket-1", today(), &["B1", "B2"], "off-1").await;
    let old_plan = fx
        .seed_route("bucket-2", today().pred_opt().unwrap(), &["B3"], "off-1")
        .await;
    let svc = issues(&fx);

    svc.submit_issue("B1", "Damaged", IssueSeverity::High, "lid broken", &me)
        .await
        .unwrap();
    fx.repository
        .update_stop_issue_log(
            first_stop(&fx, old_plan).await,
            "type: Full; severity: Low; status: Resolved; description: emptied late",
        )
        .await
        .unwrap();
    let second_stop = fx.repository.find_stops(today_plan).await.unwrap()[1].id;
    CollectionService::new(fx.repository.clone(), fx.clock())
        .confirm_collection(second_stop, 50, Some("collected without trouble".to_string()), &me, None)
        .await
        .unwrap();

    let view = svc.get_report_issue_view(&me, &IssueQuery::default()).await.unwrap();
    let today_bins: Vec<&str> = view.bins.iter().map(|b| b.bin_id.as_str()).collect();
    assert_eq!(today_bins, vec!["B1", "B2"]);
    assert_eq!(view.counts.total, 2);
    assert_eq!(view.counts.open, 1);
    assert_eq!(view.counts.resolved, 1);
    assert!(view.issues.iter().all(|i| i.source == IssueSource::Stop));

    let damaged = svc.get_report_issue_view(&me, &query(Some("LID"), None, None)).await.unwrap();
    assert_eq!(damaged.issues.len(), 1);
    assert_eq!(damaged.issues[0].bin_id, "B1");

    let by_address = svc
        .get_report_issue_view(&me, &query(Some("b3 orchard"), None, None))
        .await
        .unwrap();
    assert_eq!(by_address.issues.len(), 1);

    let resolved = svc
        .get_report_issue_view(&me, &query(None, Some("Resolved"), Some("Low")))
        .await
        .unwrap();
    assert_eq!(resolved.counts.total, 1);
    assert_eq!(resolved.issues[0].issue_type, "Full");

    let none = svc
        .get_report_issue_view(&me, &query(None, Some("In Progress"), None))
        .await
        .unwrap();
    assert!(none.issues.is_empty());
    // Los contenedores seleccionables no dependen de los filtros
    assert_eq!(none.bins.len(), 2);
}

#[tokio::test]
async fn test_structured_event_issues_appear_in_history() {
    let fx = Fixture::new(&["B1"]).await;
    let me = officer("off-1");
    let plan_id = fx.seed_route("bucket-1", today(), &["B1"], "off-1").await;
    let stop = first_stop(&fx, plan_id).await;

    CollectionService::new(fx.repository.clone(), fx.clock())
        .confirm_collection(
            stop,
            60,
            Some("type: Graffiti; severity: Medium; status: Open; description: tagged".to_string()),
            &me,
            None,
        )
        .await
        .unwrap();

    let view = issues(&fx).get_report_issue_view(&me, &IssueQuery::default()).await.unwrap();
    assert_eq!(view.counts.total, 1);
    assert_eq!(view.issues[0].source, IssueSource::CollectionEvent);
    assert_eq!(view.issues[0].issue_type, "Graffiti");
}
