//! In-memory `TaskApi` whose responses are scripted per URL
//!
//! Every call is recorded so tests can assert how many requests were made and
//! with which arguments. Fetches and submissions can be held open with a gate
//! to simulate a response that arrives after the caller has moved on.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use fpqueue_client::{FetchResponse, ImageRequestOutcome, SubmitOutcome, TaskApi};
use fpqueue_core::{QueueError, QueueResult};
use fpqueue_domain::{NewTaskRequest, Task, TaskPage};

/// A scripted reply; `QueueError` is not `Clone`, so failures are described here
#[derive(Debug, Clone)]
pub enum Scripted<T> {
    Reply(T),
    NetworkFailure(String),
}

impl<T> Scripted<T> {
    fn into_result(self) -> QueueResult<T> {
        match self {
            Scripted::Reply(value) => Ok(value),
            Scripted::NetworkFailure(message) => Err(QueueError::Network(message)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchCall {
    pub url: String,
    pub etag: Option<String>,
}

#[derive(Default)]
struct ScriptState {
    standing: HashMap<String, Scripted<FetchResponse>>,
    queued: HashMap<String, VecDeque<Scripted<FetchResponse>>>,
    fetch_calls: Vec<FetchCall>,
    submit_outcome: Option<Scripted<SubmitOutcome>>,
    submit_calls: Vec<NewTaskRequest>,
    failing_deletes: HashSet<String>,
    delete_calls: Vec<String>,
    image_outcomes: HashMap<i64, ImageRequestOutcome>,
    image_calls: Vec<i64>,
    result_data: HashMap<i64, String>,
}

/// Mock implementation of `TaskApi` for testing
#[derive(Clone, Default)]
pub struct ScriptedTaskApi {
    state: Arc<Mutex<ScriptState>>,
    fetch_gate: Arc<Mutex<Option<Arc<Semaphore>>>>,
    submit_gate: Arc<Mutex<Option<Arc<Semaphore>>>>,
}

impl ScriptedTaskApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to every GET of `url` with `page` unless a queued reply exists
    pub fn serve_page(&self, url: &str, page: TaskPage) {
        self.serve(
            url,
            FetchResponse::Ok {
                page,
                etag: None,
            },
        );
    }

    pub fn serve(&self, url: &str, response: FetchResponse) {
        self.state
            .lock()
            .unwrap()
            .standing
            .insert(url.to_string(), Scripted::Reply(response));
    }

    pub fn fail_fetches(&self, url: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .standing
            .insert(url.to_string(), Scripted::NetworkFailure(message.to_string()));
    }

    /// One-shot reply, consumed before the standing reply
    pub fn enqueue(&self, url: &str, response: Scripted<FetchResponse>) {
        self.state
            .lock()
            .unwrap()
            .queued
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn set_submit_outcome(&self, outcome: Scripted<SubmitOutcome>) {
        self.state.lock().unwrap().submit_outcome = Some(outcome);
    }

    pub fn fail_delete(&self, task_url: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_deletes
            .insert(task_url.to_string());
    }

    pub fn set_image_outcome(&self, task_id: i64, outcome: ImageRequestOutcome) {
        self.state
            .lock()
            .unwrap()
            .image_outcomes
            .insert(task_id, outcome);
    }

    pub fn set_result_data(&self, task_id: i64, text: &str) {
        self.state
            .lock()
            .unwrap()
            .result_data
            .insert(task_id, text.to_string());
    }

    /// Hold every subsequent GET until `release_fetches` grants it
    pub fn hold_fetches(&self) {
        *self.fetch_gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_fetches(&self, count: usize) {
        if let Some(gate) = self.fetch_gate.lock().unwrap().as_ref() {
            gate.add_permits(count);
        }
    }

    /// Stop gating GETs and let any still-waiting ones through
    pub fn stop_holding_fetches(&self) {
        if let Some(gate) = self.fetch_gate.lock().unwrap().take() {
            gate.add_permits(Semaphore::MAX_PERMITS - gate.available_permits());
        }
    }

    pub fn hold_submissions(&self) {
        *self.submit_gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_submissions(&self, count: usize) {
        if let Some(gate) = self.submit_gate.lock().unwrap().as_ref() {
            gate.add_permits(count);
        }
    }

    pub fn fetch_calls(&self) -> Vec<FetchCall> {
        self.state.lock().unwrap().fetch_calls.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.state.lock().unwrap().fetch_calls.len()
    }

    pub fn submit_calls(&self) -> Vec<NewTaskRequest> {
        self.state.lock().unwrap().submit_calls.clone()
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().delete_calls.clone()
    }

    pub fn image_calls(&self) -> Vec<i64> {
        self.state.lock().unwrap().image_calls.clone()
    }

    async fn pass_gate(gate: &Arc<Mutex<Option<Arc<Semaphore>>>>) {
        let semaphore = gate.lock().unwrap().clone();
        if let Some(semaphore) = semaphore {
            semaphore.acquire().await.unwrap().forget();
        }
    }
}

#[async_trait]
impl TaskApi for ScriptedTaskApi {
    async fn fetch_page(&self, url: &str, etag: Option<&str>) -> QueueResult<FetchResponse> {
        self.state.lock().unwrap().fetch_calls.push(FetchCall {
            url: url.to_string(),
            etag: etag.map(str::to_string),
        });

        Self::pass_gate(&self.fetch_gate).await;

        let mut state = self.state.lock().unwrap();
        let queued = state.queued.get_mut(url).and_then(VecDeque::pop_front);
        let scripted = queued
            .or_else(|| state.standing.get(url).cloned())
            .unwrap_or(Scripted::Reply(FetchResponse::NotFound));
        scripted.into_result()
    }

    async fn create_tasks(&self, request: &NewTaskRequest) -> QueueResult<SubmitOutcome> {
        self.state
            .lock()
            .unwrap()
            .submit_calls
            .push(request.clone());

        Self::pass_gate(&self.submit_gate).await;

        let outcome = self.state.lock().unwrap().submit_outcome.clone();
        outcome
            .unwrap_or(Scripted::Reply(SubmitOutcome::Created(Vec::new())))
            .into_result()
    }

    async fn delete_task(&self, task_url: &str) -> QueueResult<()> {
        let mut state = self.state.lock().unwrap();
        state.delete_calls.push(task_url.to_string());
        if state.failing_deletes.contains(task_url) {
            return Err(QueueError::HttpStatus {
                status: 500,
                body: "delete failed".to_string(),
            });
        }
        Ok(())
    }

    async fn request_images(&self, task: &Task) -> QueueResult<ImageRequestOutcome> {
        let mut state = self.state.lock().unwrap();
        state.image_calls.push(task.id);
        Ok(state
            .image_outcomes
            .get(&task.id)
            .cloned()
            .unwrap_or(ImageRequestOutcome::NotCreated { location: None }))
    }

    async fn fetch_result_data(&self, task: &Task) -> QueueResult<String> {
        self.state
            .lock()
            .unwrap()
            .result_data
            .get(&task.id)
            .cloned()
            .ok_or(QueueError::HttpStatus {
                status: 404,
                body: "Page not found".to_string(),
            })
    }
}
