use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{info, warn};

use fpqueue_client::{HttpTaskApi, ImageRequestOutcome, TaskApi};
use fpqueue_core::AppConfig;
use fpqueue_domain::Task;
use fpqueue_lightcurve::{write_html, LayoutUpdate, PlotRegistry};
use fpqueue_queuepage::{
    render_page, run_polling, DeleteOutcome, DraftStore, FileDraftStore, FormField, PageController,
    RefreshOutcome, RequestForm, SessionContext, SubmitResult, TaskItem, TaskItems,
};

use crate::cli::{DraftActions, ListArgs};

/// 客户端应用：组装接口、页面控制器、请求表单与绘图注册表
pub struct Application {
    config: AppConfig,
    controller: Arc<PageController>,
    form: RequestForm,
    items: Mutex<TaskItems>,
    plots: Mutex<PlotRegistry>,
}

impl Application {
    pub fn new(config: AppConfig) -> Result<Self> {
        let api = HttpTaskApi::from_config(&config.api).context("创建HTTP客户端失败")?;
        let store = FileDraftStore::new(&config.storage.draft_path);
        info!("Using task queue at {}", api.base_url());
        Self::with_parts(config, Arc::new(api), Arc::new(store))
    }

    /// 使用给定的接口与草稿存储组装应用
    pub fn with_parts(
        config: AppConfig,
        api: Arc<dyn TaskApi>,
        store: Arc<dyn DraftStore>,
    ) -> Result<Self> {
        let session = Arc::new(SessionContext::new());
        let controller = Arc::new(
            PageController::new(Arc::clone(&api), Arc::clone(&session), &config.api.base_url)
                .context("创建页面控制器失败")?,
        );
        let form = RequestForm::new(api, store, session).context("加载表单草稿失败")?;
        let plots = PlotRegistry::new(config.plot.clone());

        Ok(Self {
            config,
            controller,
            form,
            items: Mutex::new(TaskItems::new()),
            plots: Mutex::new(plots),
        })
    }

    pub fn controller(&self) -> &Arc<PageController> {
        &self.controller
    }

    fn ticker_period(&self) -> Duration {
        Duration::from_millis(self.config.polling.ticker_interval_ms)
    }

    /// 按当前页面状态同步任务项并渲染
    pub fn render(&self) -> String {
        let view = self.controller.snapshot();
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let tasks: Vec<Task> = view.visible_tasks().into_iter().cloned().collect();
        let removed = items.sync(&tasks, self.controller.session(), self.ticker_period());
        if !removed.is_empty() {
            let mut plots = self.plots.lock().unwrap_or_else(PoisonError::into_inner);
            for plot_id in &removed {
                plots.unmount(plot_id);
            }
        }

        render_page(
            &view,
            &items,
            self.config.api.user_id,
            self.config.polling.hide_plot_threshold,
            Utc::now(),
        )
    }

    async fn open_list(&self, list: &ListArgs) -> RefreshOutcome {
        let mut outcome = if list.started {
            self.controller.set_filter(true).await
        } else {
            self.controller.refresh(true).await
        };
        if let Some(cursor) = list.cursor.as_deref() {
            outcome = self.controller.update_cursor(Some(cursor)).await;
        }
        outcome
    }

    pub async fn list(&self, list: &ListArgs) -> Result<String> {
        let outcome = self.open_list(list).await;
        info!("Task list refresh: {:?}", outcome);
        Ok(self.render())
    }

    pub async fn show(&self, task_id: i64) -> Result<String> {
        self.controller.set_single_task_view(task_id).await;
        Ok(self.render())
    }

    /// 轮询直到收到关闭信号，每次页面变化后输出一次
    pub async fn watch(
        &self,
        list: &ListArgs,
        task_id: Option<i64>,
        mut shutdown_rx: broadcast::Receiver<()>,
        mut output: impl FnMut(String),
    ) -> Result<()> {
        match task_id {
            Some(id) => {
                self.controller.set_single_task_view(id).await;
            }
            None => {
                self.open_list(list).await;
            }
        }

        let mut revision = self.controller.subscribe();
        let polling = tokio::spawn(run_polling(
            Arc::clone(&self.controller),
            Duration::from_millis(self.config.polling.interval_ms),
            shutdown_rx.resubscribe(),
        ));
        let mut ticker = tokio::time::interval(self.ticker_period());

        output(self.render());
        loop {
            tokio::select! {
                changed = revision.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    output(self.render());
                    if self.controller.is_session_expired() {
                        warn!("Session expired, stopping watch");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let running = self
                        .items
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .running_tickers();
                    if running > 0 {
                        output(self.render());
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Watch shutting down");
                    break;
                }
            }
        }

        polling.abort();
        *self.items.lock().unwrap_or_else(PoisonError::into_inner) = TaskItems::new();
        Ok(())
    }

    pub fn draft(&self, action: &DraftActions) -> Result<String> {
        match action {
            DraftActions::Set { field, value } => {
                let field: FormField = field.parse()?;
                self.form
                    .set_field(field, value)
                    .with_context(|| format!("保存草稿字段失败: {field}"))?;
            }
            DraftActions::Show => {}
            DraftActions::Clear => self.form.clear().context("清空草稿失败")?,
            DraftActions::ResetMjdMin => self.form.reset_mjd_min().context("重置mjd_min失败")?,
        }
        Ok(self.render_draft())
    }

    fn render_draft(&self) -> String {
        let draft = self.form.draft();
        let previews = self.form.previews();
        let mut lines: Vec<String> = FormField::ALL
            .iter()
            .map(|field| format!("{field}: {}", draft.value(*field)))
            .collect();
        lines.push(format!("mjd_min date: {}", previews.mjd_min));
        lines.push(format!("mjd_max date: {}", previews.mjd_max));
        lines.join("\n")
    }

    pub async fn submit(&self) -> Result<String> {
        match self.form.submit(&self.controller).await {
            SubmitResult::Created(ids) => {
                let ids: Vec<String> = ids.iter().map(i64::to_string).collect();
                Ok(format!("Created task(s): {}\n\n{}", ids.join(", "), self.render()))
            }
            SubmitResult::Invalid(errors) => {
                let mut lines = vec!["Request was not accepted:".to_string()];
                for (field, messages) in errors.iter() {
                    for message in messages {
                        lines.push(format!("  {field}: {message}"));
                    }
                }
                Ok(lines.join("\n"))
            }
            SubmitResult::Throttled(detail) => Ok(detail),
            SubmitResult::Rejected { status } => Err(anyhow!("提交失败，HTTP状态码: {status}")),
            SubmitResult::TransportError(message) => Err(anyhow!(message)),
            SubmitResult::AlreadyInProgress => Ok("A submission is already in progress".to_string()),
        }
    }

    /// 打开单任务视图并取出该任务
    async fn load_task(&self, task_id: i64) -> Result<Task> {
        self.controller.set_single_task_view(task_id).await;
        self.controller
            .snapshot()
            .visible_tasks()
            .into_iter()
            .find(|task| task.id == task_id)
            .cloned()
            .ok_or_else(|| anyhow!("任务不存在: {task_id}"))
    }

    fn mount_item(&self, task: Task) -> TaskItem {
        TaskItem::mount(task, self.controller.session(), self.ticker_period())
    }

    pub async fn delete(&self, task_id: i64) -> Result<String> {
        let item = self.mount_item(self.load_task(task_id).await?);
        match item.delete(&self.controller).await {
            DeleteOutcome::Deleted { .. } => Ok(format!("Deleted task {task_id}")),
            DeleteOutcome::Restored { error, .. } => {
                Err(anyhow!("删除任务 {task_id} 失败: {error}"))
            }
        }
    }

    pub async fn request_images(&self, task_id: i64) -> Result<String> {
        let item = self.mount_item(self.load_task(task_id).await?);
        let outcome = item
            .request_images(&self.controller)
            .await
            .context("请求图像失败")?;

        match outcome {
            ImageRequestOutcome::Created { task_id: new_id, .. } => {
                Ok(format!("Image request queued as task {new_id}\n\n{}", self.render()))
            }
            ImageRequestOutcome::NotCreated { .. } => {
                Ok(format!("No image request was created for task {task_id}"))
            }
            ImageRequestOutcome::Throttled { error } => Ok(error),
            ImageRequestOutcome::Failed { status } => {
                Err(anyhow!("请求图像失败，HTTP状态码: {status}"))
            }
        }
    }

    pub fn is_plot_mounted(&self, plot_id: &str) -> bool {
        self.plots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_mounted(plot_id)
    }

    /// 容器宽度变化时为所有已挂载的图生成新的布局
    pub fn resize_plots(&self, container_width: f64) -> Vec<(String, LayoutUpdate)> {
        self.plots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .relayout_all(container_width)
    }

    pub async fn plot(&self, task_id: i64, out: &Path) -> Result<String> {
        let item = self.mount_item(self.load_task(task_id).await?);
        let input = item
            .fetch_plot_input(self.controller.api())
            .await
            .with_context(|| format!("获取任务 {task_id} 的结果数据失败"))?;
        let plot_id = input.plot_id.clone();

        let figure = self
            .plots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .mount(input, self.config.plot.container_width);
        write_html(&figure, &plot_id, &format!("Task {task_id}"), out)
            .with_context(|| format!("写入图表失败: {}", out.display()))?;

        Ok(format!("Wrote {} to {}", plot_id, out.display()))
    }
}
