use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use fpqueue_client::{FetchResponse, TaskApi};
use fpqueue_core::QueueResult;
use fpqueue_domain::{cursor_param, Task, TaskPage};

use crate::navigator::{with_query_param, Navigator};
use crate::session::SessionContext;

/// 传输层失败时的行内提示
pub const CONNECTION_ERROR: &str = "Connection error";

/// 页面可见性与用户活跃状态；任一不满足时暂停所有获取
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityFlags {
    pub document_hidden: bool,
    pub user_active: bool,
}

impl Default for ActivityFlags {
    fn default() -> Self {
        Self {
            document_hidden: false,
            user_active: true,
        }
    }
}

impl ActivityFlags {
    pub fn allows_fetch(&self) -> bool {
        !self.document_hidden && self.user_active
    }
}

/// 一次刷新的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// 新数据已应用
    Applied,
    /// 304，缓存数据重新应用
    NotModified,
    /// 页面隐藏或用户不活跃
    Suppressed,
    /// 被动刷新时已有请求在途
    SkippedOverlap,
    /// 响应到达时地址已变化，结果被丢弃
    Discarded,
    /// 导航目标与当前地址相同，无需刷新
    Unchanged,
    SessionExpired,
    Failed,
}

#[derive(Debug, Clone)]
struct CachedPage {
    page: TaskPage,
    etag: Option<String>,
    fetched_at: DateTime<Utc>,
}

/// 展示给用户的页面状态快照
#[derive(Debug, Clone, Default)]
pub struct PageView {
    pub location: String,
    pub base_url: String,
    /// None 表示尚未加载
    pub page: Option<TaskPage>,
    pub last_updated: Option<DateTime<Utc>>,
    pub error: Option<String>,
    /// 会话失效后服务端给出的登录地址
    pub session_expired: Option<String>,
    /// 乐观删除中暂时隐藏的任务
    pub hidden: HashSet<i64>,
}

impl PageView {
    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.page
            .iter()
            .flat_map(|page| page.results.iter())
            .filter(|task| !self.hidden.contains(&task.id))
            .collect()
    }

    pub fn single_task_id(&self) -> Option<i64> {
        crate::navigator::single_task_id(&self.base_url, &self.location)
    }

    pub fn started_filter(&self) -> bool {
        crate::navigator::query_param(&self.location, "started").as_deref() == Some("true")
    }
}

struct ControllerState {
    navigator: Navigator,
    cache: HashMap<String, CachedPage>,
    activity: ActivityFlags,
    page: Option<TaskPage>,
    last_updated: Option<DateTime<Utc>>,
    error: Option<String>,
    session_expired: Option<String>,
    hidden: HashSet<i64>,
}

impl ControllerState {
    fn apply(&mut self, cached: &CachedPage) {
        self.hidden
            .retain(|id| cached.page.results.iter().any(|task| task.id == *id));
        self.page = Some(cached.page.clone());
        self.last_updated = Some(cached.fetched_at);
    }
}

/// 在途请求计数，析构时归还
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn record_poll(outcome: &'static str) {
    metrics::counter!("fpqueue_poll_requests_total", "outcome" => outcome).increment(1);
}

/// 任务列表页控制器：轮询、按地址缓存、分页与单任务视图
///
/// 被动刷新（定时器）在已有请求在途时直接跳过；用户触发的刷新先应用同一地址的
/// 缓存，再无条件发出请求。响应只有在当前地址仍等于请求地址时才会被应用。
pub struct PageController {
    api: Arc<dyn TaskApi>,
    session: Arc<SessionContext>,
    state: Mutex<ControllerState>,
    in_flight: AtomicUsize,
    revision: watch::Sender<u64>,
}

impl PageController {
    pub fn new(
        api: Arc<dyn TaskApi>,
        session: Arc<SessionContext>,
        base_url: &str,
    ) -> QueueResult<Self> {
        Self::with_navigator(api, session, Navigator::new(base_url)?)
    }

    pub fn with_navigator(
        api: Arc<dyn TaskApi>,
        session: Arc<SessionContext>,
        navigator: Navigator,
    ) -> QueueResult<Self> {
        let (revision, _) = watch::channel(0);
        Ok(Self {
            api,
            session,
            state: Mutex::new(ControllerState {
                navigator,
                cache: HashMap::new(),
                activity: ActivityFlags::default(),
                page: None,
                last_updated: None,
                error: None,
                session_expired: None,
                hidden: HashSet::new(),
            }),
            in_flight: AtomicUsize::new(0),
            revision,
        })
    }

    pub fn api(&self) -> &Arc<dyn TaskApi> {
        &self.api
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// 每次可见状态变化后递增
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn snapshot(&self) -> PageView {
        let state = self.state();
        PageView {
            location: state.navigator.location().to_string(),
            base_url: state.navigator.base_url().to_string(),
            page: state.page.clone(),
            last_updated: state.last_updated,
            error: state.error.clone(),
            session_expired: state.session_expired.clone(),
            hidden: state.hidden.clone(),
        }
    }

    pub fn location(&self) -> String {
        self.state().navigator.location().to_string()
    }

    pub fn base_url(&self) -> String {
        self.state().navigator.base_url().to_string()
    }

    pub fn requests_in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_session_expired(&self) -> bool {
        self.state().session_expired.is_some()
    }

    pub fn set_document_hidden(&self, hidden: bool) {
        self.state().activity.document_hidden = hidden;
    }

    pub fn set_user_active(&self, active: bool) {
        self.state().activity.user_active = active;
    }

    pub fn hide_task(&self, task_id: i64) {
        self.state().hidden.insert(task_id);
        self.notify();
    }

    pub fn show_task(&self, task_id: i64) {
        self.state().hidden.remove(&task_id);
        self.notify();
    }

    /// 获取当前地址的任务列表
    ///
    /// `user_triggered` 为 false 时是定时器触发的被动刷新。404 会回到根地址，
    /// 带游标的空页会去掉游标，两种情况都会立即以用户触发方式重新获取。
    pub async fn refresh(&self, user_triggered: bool) -> RefreshOutcome {
        let mut user_triggered = user_triggered;

        loop {
            let (url, etag, in_flight) = {
                let mut state = self.state();
                if state.session_expired.is_some() {
                    return RefreshOutcome::SessionExpired;
                }
                if !state.activity.allows_fetch() {
                    debug!("Fetch suppressed while hidden or inactive");
                    return RefreshOutcome::Suppressed;
                }

                let url = state.navigator.location().to_string();
                if user_triggered {
                    if let Some(cached) = state.cache.get(&url).cloned() {
                        debug!("Using cached task list before GET response: {}", url);
                        state.apply(&cached);
                        drop(state);
                        self.notify();
                        state = self.state();
                    }
                } else if self.in_flight.load(Ordering::SeqCst) > 0 {
                    debug!("Preventing overlapping GET requests");
                    record_poll("skipped");
                    return RefreshOutcome::SkippedOverlap;
                }

                let etag = state.cache.get(&url).and_then(|cached| cached.etag.clone());
                (url, etag, InFlight::enter(&self.in_flight))
            };

            debug!("Fetching task list from {}", url);
            let result = self.api.fetch_page(&url, etag.as_deref()).await;
            drop(in_flight);

            let mut state = self.state();
            let is_current = state.navigator.location() == url;

            let outcome = match result {
                Err(e) => {
                    warn!("Get task list HTTP request failed: {}", e);
                    state.error = Some(if e.is_transport() {
                        CONNECTION_ERROR.to_string()
                    } else {
                        e.to_string()
                    });
                    record_poll("error");
                    RefreshOutcome::Failed
                }
                Ok(FetchResponse::Redirect { location }) => {
                    warn!("Fetch got a redirection to {}", location);
                    state.session_expired = Some(location);
                    record_poll("session_expired");
                    RefreshOutcome::SessionExpired
                }
                Ok(FetchResponse::Status(status)) => {
                    warn!("Fetch received HTTP status {}", status);
                    state.error = Some(format!("HTTP status {status}"));
                    record_poll("error");
                    RefreshOutcome::Failed
                }
                Ok(FetchResponse::NotFound) => {
                    record_poll("not_found");
                    if url == state.navigator.base_url() {
                        warn!("Task list base URL returned 404: {}", url);
                        state.error = Some("HTTP status 404".to_string());
                        RefreshOutcome::Failed
                    } else if !is_current {
                        RefreshOutcome::Discarded
                    } else {
                        info!("{} not found, returning to the task list", url);
                        state.error = None;
                        let base = state.navigator.base_url().to_string();
                        state.navigator.push(base);
                        drop(state);
                        self.notify();
                        user_triggered = true;
                        continue;
                    }
                }
                Ok(FetchResponse::NotModified) => {
                    state.error = None;
                    let now = Utc::now();
                    match state.cache.get_mut(&url) {
                        Some(cached) => {
                            cached.fetched_at = now;
                            let cached = cached.clone();
                            record_poll("not_modified");
                            if is_current {
                                state.apply(&cached);
                                RefreshOutcome::NotModified
                            } else {
                                RefreshOutcome::Discarded
                            }
                        }
                        None => {
                            warn!("304 for {} without a cached page", url);
                            RefreshOutcome::Failed
                        }
                    }
                }
                Ok(FetchResponse::Ok { page, etag }) => {
                    state.error = None;
                    record_poll("ok");

                    if page.results.is_empty() && cursor_param(&url).is_some() {
                        if !is_current {
                            RefreshOutcome::Discarded
                        } else {
                            info!("Page is empty, dropping cursor from {}", url);
                            match with_query_param(&url, "cursor", None)
                                .and_then(|u| with_query_param(&u, "format", None))
                            {
                                Ok(without_cursor) => {
                                    state.navigator.push(without_cursor);
                                    drop(state);
                                    self.notify();
                                    user_triggered = true;
                                    continue;
                                }
                                Err(e) => {
                                    state.error = Some(e.to_string());
                                    RefreshOutcome::Failed
                                }
                            }
                        }
                    } else {
                        let cached = CachedPage {
                            page,
                            etag,
                            fetched_at: Utc::now(),
                        };
                        state.cache.insert(url.clone(), cached.clone());

                        if is_current {
                            debug!("Applying results from {}", url);
                            state.apply(&cached);
                            RefreshOutcome::Applied
                        } else {
                            info!(
                                "Not applying results from {} (location is {})",
                                url,
                                state.navigator.location()
                            );
                            RefreshOutcome::Discarded
                        }
                    }
                }
            };

            drop(state);
            self.notify();
            return outcome;
        }
    }

    fn navigate(&self, url: String) -> bool {
        let mut state = self.state();
        if state.navigator.location() == url {
            return false;
        }
        state.navigator.push(url);
        true
    }

    /// 切换“只显示已开始/已完成”筛选
    ///
    /// 若已有结果，先在本地过滤出已开始的任务；过滤后为空则显示为加载中。
    pub async fn set_filter(&self, started_only: bool) -> RefreshOutcome {
        {
            let mut state = self.state();
            let base = state.navigator.base_url().to_string();
            let url = if started_only {
                match with_query_param(&base, "started", Some("true")) {
                    Ok(url) => url,
                    Err(e) => {
                        state.error = Some(e.to_string());
                        return RefreshOutcome::Failed;
                    }
                }
            } else {
                base
            };

            if state.navigator.location() == url {
                return RefreshOutcome::Unchanged;
            }
            info!("Changed filter to {}", if started_only { "started" } else { "all" });
            state.navigator.push(url);

            if started_only {
                if let Some(page) = state.page.take() {
                    let results: Vec<Task> = page
                        .results
                        .into_iter()
                        .filter(|task| task.starttimestamp.is_some())
                        .collect();
                    state.page = (!results.is_empty()).then(|| TaskPage { results, ..page });
                }
            }
        }
        self.notify();
        self.refresh(true).await
    }

    /// 进入单任务视图，立即把列表收窄到该任务并清除分页信息
    pub async fn set_single_task_view(&self, task_id: i64) -> RefreshOutcome {
        {
            let mut state = self.state();
            let url = state.navigator.single_task_url(task_id);
            info!("Task list changed to single task view for {}", url);
            state.navigator.push(url);

            if let Some(page) = state.page.take() {
                let results: Vec<Task> = page
                    .results
                    .into_iter()
                    .filter(|task| task.id == task_id)
                    .collect();
                state.page = (!results.is_empty()).then(|| TaskPage {
                    results,
                    ..TaskPage::default()
                });
            }
        }
        self.notify();
        self.refresh(true).await
    }

    /// 切换分页游标；`None` 回到第一页
    pub async fn update_cursor(&self, cursor: Option<&str>) -> RefreshOutcome {
        let url = {
            let mut state = self.state();
            if state.navigator.cursor().as_deref() == cursor {
                return RefreshOutcome::Unchanged;
            }
            let location = state.navigator.location().to_string();
            match with_query_param(&location, "cursor", cursor)
                .and_then(|u| with_query_param(&u, "format", None))
            {
                Ok(url) => url,
                Err(e) => {
                    state.error = Some(e.to_string());
                    return RefreshOutcome::Failed;
                }
            }
        };
        info!("Task list cursor changed to {:?}", cursor);
        self.navigate(url);
        self.notify();
        self.refresh(true).await
    }

    pub async fn navigate_to(&self, url: &str) -> RefreshOutcome {
        if self.navigate(url.to_string()) {
            self.notify();
        }
        self.refresh(true).await
    }

    pub async fn go_to_base(&self) -> RefreshOutcome {
        let base = self.base_url();
        self.navigate_to(&base).await
    }

    pub async fn go_back(&self) -> RefreshOutcome {
        if !self.state().navigator.back() {
            return RefreshOutcome::Unchanged;
        }
        self.notify();
        self.refresh(true).await
    }

    pub async fn go_forward(&self) -> RefreshOutcome {
        if !self.state().navigator.forward() {
            return RefreshOutcome::Unchanged;
        }
        self.notify();
        self.refresh(true).await
    }
}
