use std::time::Duration;

use axum::{
    extract::Path,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use fpqueue_client::{FetchResponse, HttpTaskApi, ImageRequestOutcome, SubmitOutcome, TaskApi};
use fpqueue_core::QueueError;
use fpqueue_domain::{NewTaskRequest, Task};

const PAGE_ETAG: &str = "\"page-v1\"";

fn task_value(base: &str, id: i64) -> Value {
    json!({
        "url": format!("{base}/queue/{id}/"),
        "id": id,
        "timestamp": "2023-01-01T00:00:00Z",
        "ra": 110.0,
        "dec": 11.0,
        "starttimestamp": "2023-01-01T00:01:00Z",
        "finishtimestamp": "2023-01-01T00:02:00Z",
        "result_url": format!("/static/results/job{id}.txt"),
    })
}

async fn list_tasks(headers: HeaderMap) -> Response {
    if headers
        .get(header::IF_NONE_MATCH)
        .is_some_and(|value| value == PAGE_ETAG)
    {
        return StatusCode::NOT_MODIFIED.into_response();
    }

    let body = json!({
        "results": [task_value("http://stub", 2), task_value("http://stub", 1)],
        "taskcount": 2,
        "next": null,
        "previous": null,
        "pagefirsttaskposition": 0,
    });
    ([(header::ETAG, PAGE_ETAG)], Json(body)).into_response()
}

async fn create_tasks(Json(body): Json<Value>) -> Response {
    match body["radeclist"].as_str() {
        Some("throttle") => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"detail": "Too many tasks"})),
        )
            .into_response(),
        Some("110 11") => {
            (StatusCode::CREATED, Json(json!([task_value("http://stub", 9)]))).into_response()
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"radeclist": ["Error on line 1: could not parse"]})),
        )
            .into_response(),
    }
}

async fn single_task(Path(id): Path<i64>) -> Response {
    match id {
        1 => Json(task_value("http://stub", 1)).into_response(),
        404 => StatusCode::NOT_FOUND.into_response(),
        _ => (StatusCode::FOUND, [(header::LOCATION, "/accounts/login/")]).into_response(),
    }
}

async fn delete_task(Path(id): Path<i64>) -> StatusCode {
    if id == 1 {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::FORBIDDEN
    }
}

async fn request_images(Path(id): Path<i64>) -> Response {
    match id {
        1 => (StatusCode::FOUND, [(header::LOCATION, "/queue/?newids=77")]).into_response(),
        2 => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": "You have too many IMGZIP tasks"})),
        )
            .into_response(),
        _ => (StatusCode::FOUND, [(header::LOCATION, "/queue/")]).into_response(),
    }
}

async fn result_data() -> &'static str {
    "###MJD uJy duJy F\n59000.1 120 10 o\n"
}

async fn spawn_stub() -> String {
    let app = Router::new()
        .route("/queue/", get(list_tasks).post(create_tasks))
        .route("/queue/{id}/", get(single_task).delete(delete_task))
        .route("/queue/{id}/requestimages", get(request_images))
        .route("/static/results/job1.txt", get(result_data));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let address = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Failed to start stub server");
    });

    address
}

fn client(address: &str) -> HttpTaskApi {
    HttpTaskApi::new(format!("{address}/queue/"), Duration::from_secs(5)).unwrap()
}

fn task_at(address: &str, id: i64) -> Task {
    serde_json::from_value(task_value(address, id)).unwrap()
}

fn request(radeclist: &str) -> NewTaskRequest {
    NewTaskRequest {
        radeclist: radeclist.to_string(),
        mjd_min: None,
        mjd_max: None,
        use_reduced: false,
        send_email: true,
        comment: String::new(),
        propermotion: None,
    }
}

#[tokio::test]
async fn test_fetch_page_returns_etag_and_revalidates() {
    let address = spawn_stub().await;
    let api = client(&address);
    let url = format!("{address}/queue/");

    let response = api.fetch_page(&url, None).await.unwrap();
    let FetchResponse::Ok { page, etag } = response else {
        panic!("expected page, got {response:?}");
    };
    assert_eq!(page.results.len(), 2);
    assert_eq!(page.taskcount, Some(2));
    assert_eq!(etag.as_deref(), Some(PAGE_ETAG));

    let again = api.fetch_page(&url, Some(PAGE_ETAG)).await.unwrap();
    assert_eq!(again, FetchResponse::NotModified);
}

#[tokio::test]
async fn test_fetch_single_task_is_wrapped() {
    let address = spawn_stub().await;
    let api = client(&address);

    let response = api
        .fetch_page(&format!("{address}/queue/1/"), None)
        .await
        .unwrap();
    let FetchResponse::Ok { page, .. } = response else {
        panic!("expected page, got {response:?}");
    };
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].id, 1);
    assert_eq!(page.next, None);
}

#[tokio::test]
async fn test_fetch_not_found_and_login_redirect() {
    let address = spawn_stub().await;
    let api = client(&address);

    let missing = api
        .fetch_page(&format!("{address}/queue/404/"), None)
        .await
        .unwrap();
    assert_eq!(missing, FetchResponse::NotFound);

    let redirect = api
        .fetch_page(&format!("{address}/queue/5/"), None)
        .await
        .unwrap();
    assert_eq!(
        redirect,
        FetchResponse::Redirect {
            location: format!("{address}/accounts/login/")
        }
    );
}

#[tokio::test]
async fn test_create_tasks_outcomes() {
    let address = spawn_stub().await;
    let api = client(&address);

    match api.create_tasks(&request("110 11")).await.unwrap() {
        SubmitOutcome::Created(tasks) => assert_eq!(tasks[0].id, 9),
        other => panic!("unexpected outcome {other:?}"),
    }

    match api.create_tasks(&request("bogus")).await.unwrap() {
        SubmitOutcome::Invalid(errors) => assert!(errors.contains("radeclist")),
        other => panic!("unexpected outcome {other:?}"),
    }

    match api.create_tasks(&request("throttle")).await.unwrap() {
        SubmitOutcome::Throttled { detail } => assert_eq!(detail, "Too many tasks"),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn test_delete_task() {
    let address = spawn_stub().await;
    let api = client(&address);

    assert!(api.delete_task(&format!("{address}/queue/1/")).await.is_ok());

    let err = api
        .delete_task(&format!("{address}/queue/2/"))
        .await
        .unwrap_err();
    assert!(matches!(err, QueueError::HttpStatus { status: 403, .. }));
}

#[tokio::test]
async fn test_request_images_outcomes() {
    let address = spawn_stub().await;
    let api = client(&address);

    let created = api.request_images(&task_at(&address, 1)).await.unwrap();
    assert_eq!(
        created,
        ImageRequestOutcome::Created {
            task_id: 77,
            location: format!("{address}/queue/"),
        }
    );

    let throttled = api.request_images(&task_at(&address, 2)).await.unwrap();
    assert!(matches!(throttled, ImageRequestOutcome::Throttled { .. }));

    let not_created = api.request_images(&task_at(&address, 3)).await.unwrap();
    assert!(matches!(not_created, ImageRequestOutcome::NotCreated { .. }));
}

#[tokio::test]
async fn test_fetch_result_data_resolves_relative_url() {
    let address = spawn_stub().await;
    let api = client(&address);

    let text = api.fetch_result_data(&task_at(&address, 1)).await.unwrap();
    assert!(text.starts_with("###MJD"));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let api = HttpTaskApi::new("http://127.0.0.1:9/queue/", Duration::from_millis(500)).unwrap();
    let err = api
        .fetch_page("http://127.0.0.1:9/queue/", None)
        .await
        .unwrap_err();
    assert!(err.is_transport());
}
