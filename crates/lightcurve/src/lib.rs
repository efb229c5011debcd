//! 光变曲线数据整形
//!
//! 把每个滤光片的 `[时间, 值, 误差]` 元组拆分成探测与非探测两组，计算带留白的
//! 坐标轴范围，并生成 Plotly 的图结构。渲染本身由 plotly.js 完成。

pub mod figure;
pub mod html;
pub mod models;
pub mod registry;
pub mod reshape;
pub mod table;

pub use figure::{draw, Figure, LayoutUpdate, PALETTE};
pub use html::{render_html, write_html};
pub use models::{LightcurveInput, PlotLimits, SeriesLabel, Tuple};
pub use registry::PlotRegistry;
pub use reshape::{axis_ranges, partition, AxisRanges, PartitionedSeries, PlotRole, SeriesKind};
pub use table::parse_result_table;
