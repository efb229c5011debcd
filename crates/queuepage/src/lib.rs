//! 任务队列页面
//!
//! 页面控制器负责轮询、按地址缓存、分页与单任务视图；任务项负责单个任务的
//! 展示、耗时计时与删除/请求图像操作；请求表单负责草稿持久化与串行提交。

pub mod controller;
pub mod draft;
pub mod form;
pub mod navigator;
pub mod polling;
pub mod render;
pub mod session;
pub mod task_item;
pub mod ticker;

pub use controller::{ActivityFlags, PageController, PageView, RefreshOutcome, CONNECTION_ERROR};
pub use draft::{DraftStore, FileDraftStore, MemoryDraftStore};
pub use form::{
    default_mjd_min, FormDraft, FormField, MjdPreviews, RequestForm, SubmitResult,
    CLEARED_ON_SUBMIT, HTTP_FAILURE_MESSAGE,
};
pub use navigator::Navigator;
pub use polling::run_polling;
pub use render::render_page;
pub use session::SessionContext;
pub use task_item::{DeleteOutcome, TaskAction, TaskItem, TaskItems};
pub use ticker::ElapsedTicker;
