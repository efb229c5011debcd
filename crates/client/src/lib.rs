//! 任务队列 REST 接口客户端

pub mod api;
pub mod http;

pub use api::{FetchResponse, ImageRequestOutcome, SubmitOutcome, TaskApi};
pub use http::HttpTaskApi;
