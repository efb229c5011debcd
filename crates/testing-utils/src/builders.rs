//! Test data builders for tasks and pages
//!
//! Tasks default to a queued forced-photometry request at RA 110, Dec 11,
//! owned by user 1, under `https://example.com/queue/`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use fpqueue_domain::{RequestType, Task, TaskPage};

pub const TEST_BASE_URL: &str = "https://example.com/queue/";
pub const TEST_USER_ID: i64 = 1;

pub fn queued_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()
}

/// Builder for creating test Task entities
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(id: i64) -> Self {
        Self {
            task: Task {
                url: format!("{TEST_BASE_URL}{id}/"),
                id,
                user_id: Some(TEST_USER_ID),
                username: Some("tester".to_string()),
                timestamp: queued_at(),
                mpc_name: None,
                ra: Some(110.0),
                dec: Some(11.0),
                mjd_min: None,
                mjd_max: None,
                radec_epoch_year: None,
                propermotion_ra: None,
                propermotion_dec: None,
                use_reduced: false,
                result_url: None,
                comment: None,
                send_email: true,
                starttimestamp: None,
                finishtimestamp: None,
                error_msg: None,
                previewimage_url: None,
                parent_task_id: None,
                parent_task_url: None,
                request_type: RequestType::ForcedPhotometry,
                pdfplot_url: None,
                queuepos: Some(0),
                imagerequest_task_id: None,
                imagerequest_url: None,
                imagerequest_finished: None,
                result_imagezip_url: None,
            },
        }
    }

    pub fn queued(mut self, queuepos: i64) -> Self {
        self.task.starttimestamp = None;
        self.task.finishtimestamp = None;
        self.task.queuepos = Some(queuepos);
        self
    }

    pub fn running_since(mut self, started: DateTime<Utc>) -> Self {
        self.task.starttimestamp = Some(started);
        self.task.finishtimestamp = None;
        self.task.queuepos = None;
        self
    }

    /// Started one minute after queueing, finished one minute later
    pub fn finished(mut self) -> Self {
        let started = self.task.timestamp + Duration::minutes(1);
        self.task.starttimestamp = Some(started);
        self.task.finishtimestamp = Some(started + Duration::minutes(1));
        self.task.queuepos = None;
        self.task.result_url = Some(format!("/static/results/job{:05}.txt", self.task.id));
        self.task.pdfplot_url = Some(format!("/static/results/job{:05}.pdf", self.task.id));
        self
    }

    pub fn with_error(mut self, message: &str) -> Self {
        self.task.error_msg = Some(message.to_string());
        self
    }

    pub fn with_mpc_name(mut self, name: &str) -> Self {
        self.task.mpc_name = Some(name.to_string());
        self.task.ra = None;
        self.task.dec = None;
        self
    }

    pub fn with_request_type(mut self, request_type: RequestType) -> Self {
        self.task.request_type = request_type;
        self
    }

    pub fn with_owner(mut self, user_id: i64, username: &str) -> Self {
        self.task.user_id = Some(user_id);
        self.task.username = Some(username.to_string());
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.task.comment = Some(comment.to_string());
        self
    }

    pub fn with_mjd_window(mut self, mjd_min: Option<f64>, mjd_max: Option<f64>) -> Self {
        self.task.mjd_min = mjd_min;
        self.task.mjd_max = mjd_max;
        self
    }

    pub fn with_propermotion(mut self, epoch_year: f64, ra: f64, dec: f64) -> Self {
        self.task.radec_epoch_year = Some(epoch_year);
        self.task.propermotion_ra = Some(ra);
        self.task.propermotion_dec = Some(dec);
        self
    }

    pub fn with_use_reduced(mut self, use_reduced: bool) -> Self {
        self.task.use_reduced = use_reduced;
        self
    }

    pub fn with_parent(mut self, parent_id: i64, parent_url: Option<&str>) -> Self {
        self.task.parent_task_id = Some(parent_id);
        self.task.parent_task_url = parent_url.map(str::to_string);
        self
    }

    pub fn with_image_request(mut self, task_id: i64, finished: bool) -> Self {
        self.task.imagerequest_task_id = Some(task_id);
        self.task.imagerequest_url = Some(format!("{TEST_BASE_URL}{task_id}/"));
        self.task.imagerequest_finished = Some(finished);
        self
    }

    pub fn with_imagezip_url(mut self, url: &str) -> Self {
        self.task.result_imagezip_url = Some(url.to_string());
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

/// A first page holding `tasks`, with the total count equal to its length
pub fn page_of(tasks: Vec<Task>) -> TaskPage {
    TaskPage {
        taskcount: Some(tasks.len() as u64),
        pagefirsttaskposition: Some(0),
        results: tasks,
        next: None,
        previous: None,
    }
}

pub fn task_url(id: i64) -> String {
    format!("{TEST_BASE_URL}{id}/")
}
