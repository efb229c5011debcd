use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fpqueue_client::{ImageRequestOutcome, TaskApi};
use fpqueue_queuepage::{DeleteOutcome, PageController, RefreshOutcome, SessionContext, TaskItem};
use fpqueue_testing_utils::{page_of, task_url, ScriptedTaskApi, TaskBuilder, TEST_BASE_URL};

const PERIOD: Duration = Duration::from_millis(50);

fn setup(api: &ScriptedTaskApi) -> (Arc<SessionContext>, PageController) {
    let session = Arc::new(SessionContext::new());
    let controller =
        PageController::new(Arc::new(api.clone()), Arc::clone(&session), TEST_BASE_URL).unwrap();
    (session, controller)
}

fn visible_ids(controller: &PageController) -> Vec<i64> {
    controller
        .snapshot()
        .visible_tasks()
        .iter()
        .map(|task| task.id)
        .collect()
}

#[tokio::test]
async fn test_failed_delete_restores_task_and_refreshes() {
    let api = ScriptedTaskApi::new();
    let task = TaskBuilder::new(1).build();
    api.serve_page(TEST_BASE_URL, page_of(vec![task.clone()]));
    api.fail_delete(&task.url);
    let (session, controller) = setup(&api);
    controller.refresh(true).await;

    let item = TaskItem::mount(task, &session, PERIOD);
    let outcome = item.delete(&controller).await;

    assert!(matches!(
        outcome,
        DeleteOutcome::Restored {
            refresh: RefreshOutcome::Applied,
            ..
        }
    ));
    assert_eq!(api.delete_calls(), vec![task_url(1)]);
    assert_eq!(api.fetch_count(), 2);
    assert_eq!(visible_ids(&controller), vec![1]);
}

#[tokio::test]
async fn test_successful_delete_hides_task() {
    let api = ScriptedTaskApi::new();
    let first = TaskBuilder::new(1).finished().build();
    let second = TaskBuilder::new(2).build();
    api.serve_page(TEST_BASE_URL, page_of(vec![first.clone(), second.clone()]));
    let (session, controller) = setup(&api);
    controller.refresh(true).await;

    api.serve_page(TEST_BASE_URL, page_of(vec![second]));
    let item = TaskItem::mount(first, &session, PERIOD);
    let outcome = item.delete(&controller).await;

    assert_eq!(
        outcome,
        DeleteOutcome::Deleted {
            refresh: RefreshOutcome::Applied
        }
    );
    assert_eq!(visible_ids(&controller), vec![2]);
    assert!(controller.snapshot().hidden.is_empty());
}

#[tokio::test]
async fn test_image_request_records_new_task() {
    let api = ScriptedTaskApi::new();
    let task = TaskBuilder::new(5).finished().build();
    api.serve_page(TEST_BASE_URL, page_of(vec![task.clone()]));
    api.serve_page(&task_url(5), page_of(vec![task.clone()]));
    api.set_image_outcome(
        5,
        ImageRequestOutcome::Created {
            task_id: 20,
            location: TEST_BASE_URL.to_string(),
        },
    );
    let (session, controller) = setup(&api);
    controller.set_single_task_view(5).await;
    assert_eq!(controller.location(), task_url(5));

    let item = TaskItem::mount(task, &session, PERIOD);
    let outcome = item.request_images(&controller).await.unwrap();

    assert!(matches!(outcome, ImageRequestOutcome::Created { task_id: 20, .. }));
    assert_eq!(api.image_calls(), vec![5]);
    assert!(session.is_new(20));
    assert_eq!(controller.location(), TEST_BASE_URL);

    let new_item = TaskItem::mount(TaskBuilder::new(20).build(), &session, PERIOD);
    assert!(new_item.entrance());
    assert!(!session.is_new(20));
}

#[tokio::test]
async fn test_throttled_image_request_stays_put() {
    let api = ScriptedTaskApi::new();
    let task = TaskBuilder::new(5).finished().build();
    api.set_image_outcome(
        5,
        ImageRequestOutcome::Throttled {
            error: "Too many requests".to_string(),
        },
    );
    let (session, controller) = setup(&api);

    let item = TaskItem::mount(task, &session, PERIOD);
    let outcome = item.request_images(&controller).await.unwrap();
    assert!(matches!(outcome, ImageRequestOutcome::Throttled { .. }));
    assert_eq!(api.fetch_count(), 0);
}

#[tokio::test]
async fn test_running_ticker_counts_from_start() {
    let session = SessionContext::new();
    let started = Utc::now() - chrono::Duration::seconds(42);
    let mut item = TaskItem::mount(
        TaskBuilder::new(3).running_since(started).build(),
        &session,
        PERIOD,
    );

    tokio::time::sleep(PERIOD * 2).await;
    let status = item.status_line(Utc::now()).unwrap();
    assert!(status.starts_with("Running (started 4"), "{status}");

    item.update(TaskBuilder::new(3).finished().build());
    assert!(!item.ticker_running());
}

#[tokio::test]
async fn test_plot_input_from_result_data() {
    let api = ScriptedTaskApi::new();
    let task = TaskBuilder::new(4).finished().build();
    api.set_result_data(
        4,
        "###MJD m dm uJy duJy F err chi/N\n59000.1 17.5 0.02 350 12 o 0 1.1\n59001.2 17.9 0.05 120 30 c 0 0.9\n",
    );
    let session = SessionContext::new();
    let item = TaskItem::mount(task, &session, PERIOD);

    let api: Arc<dyn TaskApi> = Arc::new(api);
    let input = item.fetch_plot_input(&api).await.unwrap();
    assert_eq!(input.plot_id, "plotforcedflux-task-4");
    assert_eq!(input.series.len(), 2);
    assert_eq!(input.limits.xmin, 59000.1);

    let missing = TaskItem::mount(TaskBuilder::new(6).finished().build(), &session, PERIOD);
    assert!(missing.fetch_plot_input(&api).await.is_err());
}
