use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use fpqueue_core::PlotConfig;

use crate::models::{LightcurveInput, SeriesLabel};
use crate::reshape::{axis_ranges, partition, wants_secondary_axis, PlotRole, SeriesKind};

/// 每个序列的配色，超出范围时使用最后一个颜色
pub const PALETTE: [&str; 20] = [
    "#6A5ACD", // SlateBlue
    "#008000", // Green
    "#DAA520", // GoldenRod
    "#A0522D", // Sienna
    "#FF69B4", // HotPink
    "#DC143C", // Crimson
    "#708090", // SlateGray
    "#FFD700", // Gold
    "#0000FF", // Blue
    "#4B0082", // Indigo
    "#800080", // Purple
    "#008B8B", // DarkCyan
    "#FF8C00", // DarkOrange
    "#A52A2A", // Brown
    "#DB7093", // PaleVioletRed
    "#800000", // Maroon
    "#B22222", // FireBrick
    "#9ACD32", // YellowGreen
    "#FA8072", // Salmon
    "#000000", // Black
];

const MARKER_OPACITY: f64 = 0.4;

pub fn palette_color(index: usize) -> &'static str {
    PALETTE.get(index).copied().unwrap_or(PALETTE[PALETTE.len() - 1])
}

/// Plotly 图的 JSON 结构（`data` / `layout` / `config`）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
    pub config: FigureConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FigureConfig {
    pub display_mode_bar: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub x: Vec<f64>,
    pub y: Vec<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_y: Option<ErrorBars>,
    #[serde(rename = "type")]
    pub trace_type: &'static str,
    pub mode: &'static str,
    pub name: String,
    pub marker: Marker,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBars {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub array: Vec<f64>,
    pub visible: bool,
    pub width: f64,
    pub color: &'static str,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub color: &'static str,
    pub opacity: f64,
    pub symbol: &'static str,
    pub line: MarkerLine,
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerLine {
    pub width: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub showlegend: bool,
    pub yaxis: Axis,
    pub xaxis: Axis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis2: Option<Axis>,
    pub margin: Margin,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub range: [f64; 2],
    /// `true` 或 `"reversed"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autorange: Option<Value>,
    pub tickformat: &'static str,
    pub hoverformat: &'static str,
    pub title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlaying: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zeroline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub b: u32,
    pub t: u32,
}

/// 窗口尺寸变化时下发给已挂载图的布局更新
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutUpdate {
    pub width: f64,
    pub height: f64,
}

/// 绘图宽度：配置了固定宽度则使用之，否则取容器宽度的 90%
pub fn plot_width(config: &PlotConfig, container_width: f64) -> f64 {
    config.width.unwrap_or(0.9 * container_width)
}

/// 由输入生成完整的图；相同输入总是得到相同的结果
pub fn draw(input: &LightcurveInput, config: &PlotConfig, container_width: f64) -> Figure {
    let mut data = Vec::with_capacity(input.series.len() * 2);
    if input.series.len() != input.labels.len() {
        warn!(
            "Plot {} has {} series but {} labels, unmatched entries are not drawn",
            input.plot_id,
            input.series.len(),
            input.labels.len()
        );
    }

    for (tuples, label) in input.series.iter().zip(&input.labels) {
        let series = partition(tuples);
        data.push(detection_trace(&series.detections, label, config));
        data.push(non_detection_trace(&series.non_detections, label, config));
    }

    Figure {
        data,
        layout: layout(input, config, container_width),
        config: FigureConfig {
            display_mode_bar: false,
        },
    }
}

fn detection_trace(
    detections: &[crate::reshape::Detection],
    label: &SeriesLabel,
    config: &PlotConfig,
) -> Trace {
    let color = palette_color(label.color);
    Trace {
        x: detections.iter().map(|d| d.x).collect(),
        y: detections.iter().map(|d| Some(d.y)).collect(),
        error_y: Some(ErrorBars {
            kind: "data",
            array: detections.iter().map(|d| d.err).collect(),
            visible: true,
            width: config.errorbar_size,
            color,
            opacity: MARKER_OPACITY,
        }),
        trace_type: "scatter",
        mode: "markers",
        name: label.label.clone(),
        marker: Marker {
            color,
            opacity: MARKER_OPACITY,
            symbol: SeriesKind::from_label(&label.label).marker_symbol(),
            line: MarkerLine {
                width: 0.0,
                color: "black",
            },
            size: config.marker_size,
        },
    }
}

fn non_detection_trace(
    non_detections: &[crate::reshape::NonDetection],
    label: &SeriesLabel,
    config: &PlotConfig,
) -> Trace {
    let color = palette_color(label.color);
    Trace {
        x: non_detections.iter().map(|d| d.x).collect(),
        y: non_detections.iter().map(|d| d.y).collect(),
        error_y: None,
        trace_type: "scatter",
        mode: "markers",
        name: label.label.clone(),
        marker: Marker {
            color,
            opacity: MARKER_OPACITY,
            symbol: "limit-arrow",
            line: MarkerLine { width: 0.0, color },
            size: config.arrow_size,
        },
    }
}

fn layout(input: &LightcurveInput, config: &PlotConfig, container_width: f64) -> Layout {
    let role = PlotRole::from_plot_id(&input.plot_id);
    let secondary = wants_secondary_axis(&input.plot_id);
    let ranges = axis_ranges(&input.limits, secondary);

    let autorange = match role {
        PlotRole::Flux => Value::Bool(true),
        PlotRole::Magnitude => Value::String("reversed".to_string()),
    };

    Layout {
        showlegend: true,
        yaxis: Axis {
            range: ranges.y,
            autorange: Some(autorange),
            tickformat: ".1f",
            hoverformat: ".2f",
            title: role.y_title(),
            overlaying: None,
            zeroline: None,
            side: None,
        },
        xaxis: Axis {
            range: ranges.x,
            autorange: None,
            tickformat: ".f",
            hoverformat: ".5f",
            title: "mjd",
            overlaying: None,
            zeroline: None,
            side: None,
        },
        xaxis2: ranges.x2.map(|range| Axis {
            range,
            autorange: None,
            tickformat: ".f",
            hoverformat: ".5f",
            title: "days since earliest detection",
            overlaying: Some("x"),
            zeroline: Some(false),
            side: Some("top"),
        }),
        margin: Margin {
            l: 50,
            r: 0,
            b: 30,
            t: 30,
        },
        width: plot_width(config, container_width),
        height: config.height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlotLimits;

    fn input(plot_id: &str) -> LightcurveInput {
        LightcurveInput {
            plot_id: plot_id.to_string(),
            series: vec![
                vec![vec![100.0, 20.0, 0.1], vec![100.5, 20.5]],
                vec![vec![101.0, 19.0, 0.2]],
            ],
            labels: vec![
                SeriesLabel {
                    label: "c".to_string(),
                    color: 11,
                    display: false,
                },
                SeriesLabel {
                    label: "-o".to_string(),
                    color: 12,
                    display: false,
                },
            ],
            limits: PlotLimits {
                xmin: 100.0,
                xmax: 101.0,
                ymin: 18.0,
                ymax: 21.0,
                discovery_date: 100.0,
                today: 120.0,
            },
        }
    }

    #[test]
    fn test_series_without_label_is_skipped() {
        let mut unlabeled = input("plotforcedflux-task-2");
        unlabeled.labels.truncate(1);
        let figure = draw(&unlabeled, &PlotConfig::default(), 1000.0);
        assert_eq!(figure.data.len(), 2);
        assert_eq!(figure.data[0].x, vec![100.0]);
    }

    #[test]
    fn test_two_traces_per_filter() {
        let figure = draw(&input("plotforcedflux-task-1"), &PlotConfig::default(), 1000.0);
        assert_eq!(figure.data.len(), 4);
        assert_eq!(figure.data[0].x, vec![100.0]);
        assert!(figure.data[0].error_y.is_some());
        assert_eq!(figure.data[1].y, vec![Some(20.5)]);
        assert_eq!(figure.data[1].marker.symbol, "limit-arrow");
        assert!(figure.data[1].error_y.is_none());
        assert_eq!(figure.data[2].marker.symbol, "diamond");
        assert_eq!(figure.data[0].marker.color, "#008B8B");
    }

    #[test]
    fn test_flux_plot_layout() {
        let figure = draw(&input("plotforcedflux-task-1"), &PlotConfig::default(), 1000.0);
        let layout = serde_json::to_value(&figure.layout).unwrap();
        assert_eq!(layout["yaxis"]["autorange"], true);
        assert_eq!(layout["yaxis"]["title"], "Flux / µJy");
        assert!(layout.get("xaxis2").is_none());
        assert_eq!(layout["width"], 900.0);
    }

    #[test]
    fn test_magnitude_plot_is_reversed_with_secondary_axis() {
        let config = PlotConfig {
            width: Some(640.0),
            ..PlotConfig::default()
        };
        let figure = draw(&input("plotmag-7"), &config, 1000.0);
        let layout = serde_json::to_value(&figure.layout).unwrap();
        assert_eq!(layout["yaxis"]["autorange"], "reversed");
        assert_eq!(layout["yaxis"]["title"], "AB Mag");
        assert_eq!(layout["xaxis2"]["side"], "top");
        assert_eq!(layout["width"], 640.0);
    }

    #[test]
    fn test_redraw_is_identical() {
        let first = draw(&input("plotforcedflux-task-1"), &PlotConfig::default(), 800.0);
        let second = draw(&input("plotforcedflux-task-1"), &PlotConfig::default(), 800.0);
        assert_eq!(first, second);
    }
}
