use async_trait::async_trait;

use fpqueue_core::QueueResult;
use fpqueue_domain::{FieldErrors, NewTaskRequest, Task, TaskPage};

/// 列表/单任务 GET 的结果
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResponse {
    /// 200，单任务已被包装成只有一个元素的页
    Ok { page: TaskPage, etag: Option<String> },
    /// 304，沿用缓存
    NotModified,
    /// 404，游标失效或任务已删除
    NotFound,
    /// 3xx，会话失效后服务端跳转到登录页
    Redirect { location: String },
    /// 其他非成功状态
    Status(u16),
}

/// 提交新任务的结果
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// 201，服务端按坐标列表逐行创建的任务
    Created(Vec<Task>),
    /// 400，按字段原样展示
    Invalid(FieldErrors),
    /// 429
    Throttled { detail: String },
    Rejected { status: u16, body: String },
}

/// 请求图像的结果
#[derive(Debug, Clone, PartialEq)]
pub enum ImageRequestOutcome {
    /// 服务端重定向并在 `newids` 中携带新任务 id；`location` 已去掉该参数
    Created { task_id: i64, location: String },
    /// 重定向中没有新任务（父任务未完成或出错）
    NotCreated { location: Option<String> },
    /// 429
    Throttled { error: String },
    Failed { status: u16 },
}

/// 任务队列 REST 接口
///
/// 所有方法的传输层失败都以 `QueueError::Network` 返回，HTTP 层面的结果
/// 编码在各自的返回枚举中，由调用方决定如何展示。
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// GET 一页任务或单个任务；`etag` 作为 `If-None-Match` 发送
    async fn fetch_page(&self, url: &str, etag: Option<&str>) -> QueueResult<FetchResponse>;

    async fn create_tasks(&self, request: &NewTaskRequest) -> QueueResult<SubmitOutcome>;

    async fn delete_task(&self, task_url: &str) -> QueueResult<()>;

    async fn request_images(&self, task: &Task) -> QueueResult<ImageRequestOutcome>;

    /// 下载任务的结果数据表（纯文本）
    async fn fetch_result_data(&self, task: &Task) -> QueueResult<String>;
}
