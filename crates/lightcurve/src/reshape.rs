use serde::Serialize;

use crate::models::{PlotLimits, Tuple};

/// 时间轴两侧的留白：`(today - xmin) / PAD_DIVISOR`，即 5%
pub const PAD_DIVISOR: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    pub x: f64,
    pub y: f64,
    pub err: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NonDetection {
    pub x: f64,
    pub y: Option<f64>,
}

/// 一个滤光片拆分后的两组数据，保持输入顺序
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PartitionedSeries {
    pub detections: Vec<Detection>,
    pub non_detections: Vec<NonDetection>,
}

pub fn partition(tuples: &[Tuple]) -> PartitionedSeries {
    let mut series = PartitionedSeries::default();

    for tuple in tuples {
        match tuple.as_slice() {
            [] => {}
            [x, y, err] => series.detections.push(Detection {
                x: *x,
                y: *y,
                err: *err,
            }),
            [x, rest @ ..] => series.non_detections.push(NonDetection {
                x: *x,
                y: rest.first().copied(),
            }),
        }
    }

    series
}

/// 序列种类，由标签首字符决定标记形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Difference,
    Other,
}

impl SeriesKind {
    pub fn from_label(label: &str) -> Self {
        if label.starts_with('-') {
            SeriesKind::Difference
        } else {
            SeriesKind::Other
        }
    }

    pub fn marker_symbol(&self) -> &'static str {
        match self {
            SeriesKind::Difference => "diamond",
            SeriesKind::Other => "circle",
        }
    }
}

/// 纵轴语义：流量图自动范围，星等图反向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotRole {
    Flux,
    Magnitude,
}

impl PlotRole {
    pub fn from_plot_id(plot_id: &str) -> Self {
        if plot_id.contains("flux") {
            PlotRole::Flux
        } else {
            PlotRole::Magnitude
        }
    }

    pub fn y_title(&self) -> &'static str {
        match self {
            PlotRole::Flux => "Flux / \u{00B5}Jy",
            PlotRole::Magnitude => "AB Mag",
        }
    }
}

/// 强制测光图不画“距首次探测天数”副轴
pub fn wants_secondary_axis(plot_id: &str) -> bool {
    !plot_id.contains("forced")
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRanges {
    pub x: [f64; 2],
    pub x2: Option<[f64; 2]>,
    pub y: [f64; 2],
}

pub fn axis_ranges(limits: &PlotLimits, secondary: bool) -> AxisRanges {
    let padding = (limits.today - limits.xmin) / PAD_DIVISOR;
    let x = [limits.xmin - padding, limits.xmax + padding];
    let x2 = secondary.then(|| {
        [
            limits.xmin - limits.discovery_date - padding,
            limits.today - limits.discovery_date + padding,
        ]
    });

    AxisRanges {
        x,
        x2,
        y: [limits.ymin, limits.ymax],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_example() {
        let series = partition(&[vec![100.0, 20.0, 0.1], vec![100.5, 20.5]]);
        assert_eq!(
            series.detections,
            vec![Detection {
                x: 100.0,
                y: 20.0,
                err: 0.1
            }]
        );
        assert_eq!(
            series.non_detections,
            vec![NonDetection {
                x: 100.5,
                y: Some(20.5)
            }]
        );
    }

    #[test]
    fn test_partition_counts_and_order() {
        let tuples = vec![
            vec![1.0, 10.0, 0.1],
            vec![2.0, 11.0],
            vec![],
            vec![3.0, 12.0, 0.2],
            vec![4.0],
            vec![5.0, 13.0, 0.3, 9.0],
        ];
        let series = partition(&tuples);
        assert_eq!(series.detections.len(), 2);
        assert_eq!(series.non_detections.len(), 3);
        assert_eq!(
            series.detections.iter().map(|d| d.x).collect::<Vec<_>>(),
            vec![1.0, 3.0]
        );
        assert_eq!(
            series.non_detections.iter().map(|d| d.x).collect::<Vec<_>>(),
            vec![2.0, 4.0, 5.0]
        );
        assert_eq!(series.non_detections[1].y, None);
    }

    #[test]
    fn test_label_selects_marker() {
        assert_eq!(SeriesKind::from_label("-o").marker_symbol(), "diamond");
        assert_eq!(SeriesKind::from_label("o").marker_symbol(), "circle");
    }

    #[test]
    fn test_axis_ranges_padding() {
        let limits = PlotLimits {
            xmin: 100.0,
            xmax: 150.0,
            ymin: -200.0,
            ymax: 500.0,
            discovery_date: 110.0,
            today: 300.0,
        };
        let ranges = axis_ranges(&limits, true);
        assert_eq!(ranges.x, [90.0, 160.0]);
        assert_eq!(ranges.x2, Some([-20.0, 200.0]));
        assert_eq!(ranges.y, [-200.0, 500.0]);
        assert_eq!(axis_ranges(&limits, false).x2, None);
    }

    #[test]
    fn test_plot_role_from_id() {
        assert_eq!(PlotRole::from_plot_id("plotforcedflux-task-3"), PlotRole::Flux);
        assert_eq!(PlotRole::from_plot_id("plotmag"), PlotRole::Magnitude);
        assert!(!wants_secondary_axis("plotforcedflux-task-3"));
        assert!(wants_secondary_axis("plotmag"));
    }
}
