//! # fpqueue testing utils
//!
//! 工作区共享的测试工具：可编排响应的内存版 `TaskApi`、任务数据构建器，
//! 以及等待异步条件成立的辅助函数。
//!
//! ```toml
//! [dev-dependencies]
//! fpqueue-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
