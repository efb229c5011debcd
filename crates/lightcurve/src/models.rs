use serde::{Deserialize, Serialize};

/// 单个数据点：长度为 3 是探测 `[时间, 值, 误差]`，其他非空长度是非探测上限
pub type Tuple = Vec<f64>;

/// 一个滤光片序列的显示信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesLabel {
    pub label: String,
    /// 调色板索引
    pub color: usize,
    #[serde(default)]
    pub display: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotLimits {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    #[serde(rename = "discoveryDate")]
    pub discovery_date: f64,
    pub today: f64,
}

/// 一幅光变曲线的完整输入，按绘图标识区分
///
/// `series[i]` 与 `labels[i]` 一一对应。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightcurveInput {
    pub plot_id: String,
    pub series: Vec<Vec<Tuple>>,
    pub labels: Vec<SeriesLabel>,
    pub limits: PlotLimits,
}
