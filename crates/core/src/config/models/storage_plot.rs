use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 表单草稿文件（JSON 键值）
    pub draft_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let draft_path = match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(".fpqueue").join("draft.json"),
            None => PathBuf::from(".fpqueue-draft.json"),
        };
        Self { draft_path }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.draft_path.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("草稿文件路径不能为空"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    /// 固定宽度；为空时按容器宽度的 90% 自适应，并在窗口变化时重新布局
    pub width: Option<f64>,
    pub height: f64,
    pub marker_size: f64,
    pub arrow_size: f64,
    pub errorbar_size: f64,
    /// 自适应宽度时假定的容器宽度
    pub container_width: f64,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: None,
            height: 300.0,
            marker_size: 6.0,
            arrow_size: 10.0,
            errorbar_size: 0.0,
            container_width: 1000.0,
        }
    }
}

impl PlotConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(width) = self.width {
            if width <= 0.0 {
                return Err(anyhow::anyhow!("图表宽度必须大于0: {width}"));
            }
        }

        if self.height <= 0.0 {
            return Err(anyhow::anyhow!("图表高度必须大于0: {}", self.height));
        }

        if self.marker_size < 0.0 || self.arrow_size < 0.0 || self.errorbar_size < 0.0 {
            return Err(anyhow::anyhow!("标记尺寸不能为负数"));
        }

        Ok(())
    }
}
