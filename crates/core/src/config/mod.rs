//! 客户端配置管理
//!
//! 配置按以下顺序叠加：内置默认值、TOML 配置文件、`FPQUEUE_` 前缀的环境变量。
//! 嵌套字段使用双下划线分隔，例如 `FPQUEUE_POLLING__INTERVAL_MS=3000`。

pub mod models;

pub use models::*;
