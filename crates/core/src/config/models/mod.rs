pub mod api_polling;
pub mod app_config;
pub mod observability;
pub mod storage_plot;

// Re-export main types for easier imports
pub use api_polling::{ApiConfig, PollingConfig};
pub use app_config::AppConfig;
pub use observability::ObservabilityConfig;
pub use storage_plot::{PlotConfig, StorageConfig};
