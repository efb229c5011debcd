use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use fpqueue_client::{ImageRequestOutcome, TaskApi};
use fpqueue_core::{mjd_now, QueueResult};
use fpqueue_domain::{RequestType, Target, Task, TaskState};
use fpqueue_lightcurve::{parse_result_table, LightcurveInput};

use crate::controller::{PageController, RefreshOutcome};
use crate::session::SessionContext;
use crate::ticker::ElapsedTicker;

pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn image_kind(use_reduced: bool) -> &'static str {
    if use_reduced {
        "reduced"
    } else {
        "difference"
    }
}

/// 任务项上可用的操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    /// 未完成时显示为 "Cancel"
    Cancel,
    Delete,
    RequestImages { use_reduced: bool },
}

impl TaskAction {
    pub fn label(&self) -> String {
        match self {
            TaskAction::Cancel => "Cancel".to_string(),
            TaskAction::Delete => "Delete".to_string(),
            TaskAction::RequestImages { use_reduced } => format!(
                "Request {} images",
                if *use_reduced { "reduced" } else { "diff" }
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted { refresh: RefreshOutcome },
    /// 删除失败，任务重新显示并强制刷新
    Restored { error: String, refresh: RefreshOutcome },
}

/// 单个任务的展示状态与操作
///
/// 运行中的任务持有一个耗时计时器；离开运行状态或被移除时计时器被取消。
#[derive(Debug)]
pub struct TaskItem {
    task: Task,
    ticker: Option<ElapsedTicker>,
    period: Duration,
    entrance: bool,
}

impl TaskItem {
    /// 首次挂载；会话中的新任务标记在此处被取走
    pub fn mount(task: Task, session: &SessionContext, period: Duration) -> Self {
        let entrance = session.take_entrance(task.id);
        let mut item = Self {
            task,
            ticker: None,
            period,
            entrance,
        };
        item.sync_ticker();
        item
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn id(&self) -> i64 {
        self.task.id
    }

    /// 是否播放入场效果（仅首次挂载时可能为 true）
    pub fn entrance(&self) -> bool {
        self.entrance
    }

    pub fn ticker_running(&self) -> bool {
        self.ticker.as_ref().is_some_and(ElapsedTicker::is_running)
    }

    pub fn update(&mut self, task: Task) {
        let restarted = self.task.starttimestamp != task.starttimestamp;
        self.task = task;
        self.entrance = false;
        if restarted {
            self.stop_ticker();
        }
        self.sync_ticker();
    }

    fn sync_ticker(&mut self) {
        match self.task.state() {
            TaskState::Running { started } => {
                if self.ticker.is_none() {
                    self.ticker = Some(ElapsedTicker::start(started, self.period));
                }
            }
            _ => self.stop_ticker(),
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
    }

    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        match &self.ticker {
            Some(ticker) if self.task.is_running() => Some(ticker.elapsed_seconds()),
            _ => self.task.elapsed_seconds(now),
        }
    }

    pub fn status_line(&self, now: DateTime<Utc>) -> Option<String> {
        match self.task.state() {
            TaskState::Running { .. } => self
                .elapsed_seconds(now)
                .map(|secs| format!("Running (started {secs} seconds ago)")),
            TaskState::Queued => Some(format!(
                "Waiting ({} tasks ahead of this one)",
                self.task.queuepos.unwrap_or(0)
            )),
            TaskState::Finished { .. } => None,
        }
    }

    pub fn actions(&self, viewer: Option<i64>) -> Vec<TaskAction> {
        let task = &self.task;
        if !task.is_owned_by(viewer) {
            return Vec::new();
        }

        let mut actions = Vec::new();
        if task.request_type == RequestType::ForcedPhotometry
            && task.is_finished()
            && !task.has_error()
            && task.imagerequest_task_id.is_none()
        {
            actions.push(TaskAction::RequestImages {
                use_reduced: task.use_reduced,
            });
        }
        actions.push(if task.is_finished() {
            TaskAction::Delete
        } else {
            TaskAction::Cancel
        });
        actions
    }

    /// 任务卡片上的文字行
    pub fn describe(&self, viewer: Option<i64>, now: DateTime<Utc>) -> Vec<String> {
        let task = &self.task;
        let mut lines = vec![format!("Task {}", task.id)];

        match (task.parent_task_id, task.parent_task_url.as_deref()) {
            (Some(parent), Some(_)) => lines.push(format!("Image request for Task {parent}")),
            (Some(parent), None) => lines.push(format!("Image request for Task {parent} (deleted)")),
            (None, _) if task.request_type == RequestType::ImageZip => {
                lines.push("Image request".to_string())
            }
            _ => {}
        }

        if task.request_type == RequestType::ImageZip {
            lines.push(format!(
                "Up to the first 500 {} images will be retrieved. The image request and download link may expire after one week.",
                image_kind(task.use_reduced)
            ));
        }

        if !task.is_owned_by(viewer) {
            if let Some(username) = &task.username {
                lines.push(format!("User: {username}"));
            }
        }

        if let Some(comment) = task.comment.as_deref().filter(|c| !c.is_empty()) {
            lines.push(format!("Comment: {comment}"));
        }

        match task.target() {
            Target::MinorPlanet(name) => lines.push(format!("MPC Object: {name}")),
            Target::Coordinates {
                ra,
                dec,
                epoch_year,
                propermotion,
            } => {
                let epoch = epoch_year
                    .map(|year| format!("(epoch {year}) "))
                    .unwrap_or_default();
                let coord = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
                lines.push(format!("RA Dec: {epoch}{} {}", coord(ra), coord(dec)));
                if propermotion.is_moving() {
                    lines.push(format!(
                        "Proper motion [mas/yr]: {} {}",
                        propermotion.ra, propermotion.dec
                    ));
                }
            }
        }

        lines.push(format!(
            "Images: {}",
            if task.use_reduced { "Reduced" } else { "Difference" }
        ));

        let min = task.mjd_min.map_or_else(|| "0".to_string(), |v| v.to_string());
        let max = task.mjd_max.map_or_else(|| "∞".to_string(), |v| v.to_string());
        lines.push(format!("MJD request: [{min}, {max}]"));

        lines.push(format!("Queued at {}", format_timestamp(&task.timestamp)));

        if let TaskState::Finished { finished } = task.state() {
            lines.push(format!("Finished at {}", format_timestamp(&finished)));

            if let Some(error) = &task.error_msg {
                lines.push(format!("Error: {error}"));
            } else {
                match task.request_type {
                    RequestType::ForcedPhotometry => {
                        if let Some(url) = &task.result_url {
                            lines.push(format!("Data: {url}"));
                        }
                        if let Some(url) = &task.pdfplot_url {
                            lines.push(format!("PDF: {url}"));
                        }
                    }
                    RequestType::ImageZip => match &task.result_imagezip_url {
                        Some(url) => lines.push(format!("Download images (ZIP): {url}")),
                        None => lines.push(
                            "The download link has expired. Delete this task and request again if necessary."
                                .to_string(),
                        ),
                    },
                    RequestType::ImageStack => {}
                }
            }
        }

        if let Some(image_task) = task.imagerequest_task_id {
            if task.imagerequest_finished == Some(true) {
                lines.push(format!("Images retrieved (Task {image_task})"));
            } else {
                lines.push(format!("Images requested (Task {image_task})"));
            }
        }

        if let Some(status) = self.status_line(now) {
            lines.push(status);
        }

        lines
    }

    /// 页面任务较少且有结果数据时才挂载光变曲线
    pub fn shows_plot(&self, page_len: usize, threshold: usize) -> bool {
        let task = &self.task;
        page_len <= threshold
            && task.request_type == RequestType::ForcedPhotometry
            && task.is_finished()
            && !task.has_error()
            && task.result_url.is_some()
    }

    /// 先隐藏任务再发出 DELETE；失败时恢复显示并强制刷新
    pub async fn delete(&self, controller: &PageController) -> DeleteOutcome {
        let task = &self.task;
        controller.hide_task(task.id);

        match controller.api().delete_task(&task.url).await {
            Ok(()) => {
                info!("Deleted task {}", task.id);
                DeleteOutcome::Deleted {
                    refresh: controller.refresh(false).await,
                }
            }
            Err(e) => {
                warn!("Delete task {} failed: {}", task.id, e);
                controller.show_task(task.id);
                DeleteOutcome::Restored {
                    error: e.to_string(),
                    refresh: controller.refresh(true).await,
                }
            }
        }
    }

    /// 请求图像；服务端创建了新任务时记入会话并跳转到去掉 `newids` 的地址
    pub async fn request_images(
        &self,
        controller: &PageController,
    ) -> QueueResult<ImageRequestOutcome> {
        let outcome = controller.api().request_images(&self.task).await?;

        match &outcome {
            ImageRequestOutcome::Created { task_id, location } => {
                info!("Image request task {} created for task {}", task_id, self.task.id);
                controller.session().add_new_tasks([*task_id]);
                controller.navigate_to(location).await;
            }
            ImageRequestOutcome::NotCreated {
                location: Some(location),
            } => {
                controller.navigate_to(location).await;
            }
            ImageRequestOutcome::NotCreated { location: None } => {}
            ImageRequestOutcome::Throttled { error } => {
                warn!("Image request throttled: {}", error);
            }
            ImageRequestOutcome::Failed { status } => {
                warn!("Image request for task {} failed with HTTP {}", self.task.id, status);
            }
        }

        Ok(outcome)
    }

    /// 下载结果数据并整理为光变曲线输入
    pub async fn fetch_plot_input(&self, api: &Arc<dyn TaskApi>) -> QueueResult<LightcurveInput> {
        let text = api.fetch_result_data(&self.task).await?;
        parse_result_table(&text, &self.task.plot_id(), mjd_now())
    }
}

/// 当前页的任务项，按页面顺序排列
#[derive(Debug, Default)]
pub struct TaskItems {
    items: Vec<TaskItem>,
}

impl TaskItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按新的结果集更新：保留已有任务项，挂载新任务，移除消失的任务
    ///
    /// 返回被移除任务的绘图标识，调用方据此卸载对应的图。
    pub fn sync(&mut self, tasks: &[Task], session: &SessionContext, period: Duration) -> Vec<String> {
        let mut previous = std::mem::take(&mut self.items);
        for task in tasks {
            match previous.iter().position(|item| item.id() == task.id) {
                Some(idx) => {
                    let mut item = previous.swap_remove(idx);
                    item.update(task.clone());
                    self.items.push(item);
                }
                None => self.items.push(TaskItem::mount(task.clone(), session, period)),
            }
        }
        previous.iter().map(|item| item.task().plot_id()).collect()
    }

    pub fn get(&self, task_id: i64) -> Option<&TaskItem> {
        self.items.iter().find(|item| item.id() == task_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn running_tickers(&self) -> usize {
        self.items.iter().filter(|item| item.ticker_running()).count()
    }
}
