use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// 任务列表根地址，单任务视图为 `{base_url}{id}/`
    pub base_url: String,
    pub request_timeout_seconds: u64,
    /// 当前用户ID，用于区分自己的任务（删除按钮、所有者显示）
    pub user_id: Option<i64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://fallingstar-data.com/forcedphot/queue/".to_string(),
            request_timeout_seconds: 30,
            user_id: None,
        }
    }
}

impl ApiConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.is_empty() {
            return Err(anyhow::anyhow!("API地址不能为空"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(anyhow::anyhow!("API地址必须以http://或https://开头: {}", self.base_url));
        }

        if !self.base_url.ends_with('/') {
            return Err(anyhow::anyhow!("API地址必须以/结尾: {}", self.base_url));
        }

        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("请求超时时间必须大于0"));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    /// 运行中任务的耗时刷新间隔
    pub ticker_interval_ms: u64,
    /// 页面任务数超过该值时不挂载光变曲线
    pub hide_plot_threshold: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            ticker_interval_ms: 1000,
            hide_plot_threshold: 10,
        }
    }
}

impl PollingConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.interval_ms < 500 {
            return Err(anyhow::anyhow!("轮询间隔不能小于500毫秒: {}", self.interval_ms));
        }

        if self.ticker_interval_ms == 0 {
            return Err(anyhow::anyhow!("计时器间隔必须大于0"));
        }

        Ok(())
    }
}
