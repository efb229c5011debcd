//! 强制测光结果表的解析
//!
//! 结果文件是空白分隔的文本表，首行以 `#` 开头的表头给出列名，例如
//! `###MJD m dm uJy duJy F err chi/N ...`。只使用 `MJD`、`uJy`、`duJy`、`F` 四列。

use fpqueue_core::{QueueError, QueueResult};

use crate::models::{LightcurveInput, PlotLimits, SeriesLabel, Tuple};

/// 绘制的滤光片及其调色板索引
pub const FILTERS: [(usize, &str); 2] = [(11, "c"), (12, "o")];

const UJY_BOUND: f64 = 1e10;
const YMIN_FLOOR: f64 = -200.0;
const YMAX_CEILING: f64 = 40000.0;

struct Row {
    mjd: f64,
    ujy: f64,
    dujy: f64,
    filter: String,
}

struct Columns {
    mjd: usize,
    ujy: usize,
    dujy: usize,
    filter: usize,
}

impl Columns {
    fn from_header(header: &str) -> QueueResult<Self> {
        let names: Vec<&str> = header
            .split_whitespace()
            .map(|name| name.trim_start_matches('#'))
            .collect();
        let find = |wanted: &str| {
            names
                .iter()
                .position(|name| *name == wanted)
                .ok_or_else(|| QueueError::Serialization(format!("结果表缺少列: {wanted}")))
        };

        Ok(Self {
            mjd: find("MJD")?,
            ujy: find("uJy")?,
            dujy: find("duJy")?,
            filter: find("F")?,
        })
    }

    fn parse_row(&self, line_number: usize, line: &str) -> QueueResult<Row> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let field = |index: usize| {
            fields.get(index).copied().ok_or_else(|| {
                QueueError::Serialization(format!("结果表第 {line_number} 行列数不足"))
            })
        };
        let number = |index: usize| -> QueueResult<f64> {
            let raw = field(index)?;
            raw.parse::<f64>().map_err(|_| {
                QueueError::Serialization(format!("结果表第 {line_number} 行无法解析数值: {raw}"))
            })
        };

        Ok(Row {
            mjd: number(self.mjd)?,
            ujy: number(self.ujy)?,
            dujy: number(self.dujy)?,
            filter: field(self.filter)?.to_string(),
        })
    }
}

/// 解析结果表，生成绘图标识为 `plot_id` 的光变曲线输入
///
/// `uJy` 超出 (-1e10, 1e10) 的行被丢弃；时间范围取全部有效行，
/// 流量范围截断到 [-200, 40000]，首次探测时间取最早的 MJD。
pub fn parse_result_table(text: &str, plot_id: &str, today_mjd: f64) -> QueueResult<LightcurveInput> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let columns = match lines.next() {
        Some((_, header)) if header.starts_with('#') => Columns::from_header(header)?,
        _ => return Err(QueueError::Serialization("结果表缺少表头".to_string())),
    };

    let mut rows = Vec::new();
    for (line_number, line) in lines {
        if line.starts_with('#') {
            continue;
        }
        let row = columns.parse_row(line_number, line)?;
        if row.ujy > -UJY_BOUND && row.ujy < UJY_BOUND {
            rows.push(row);
        }
    }

    if rows.is_empty() {
        return Err(QueueError::Serialization("结果表中没有有效的测光点".to_string()));
    }

    let xmin = rows.iter().map(|r| r.mjd).fold(f64::INFINITY, f64::min);
    let xmax = rows.iter().map(|r| r.mjd).fold(f64::NEG_INFINITY, f64::max);
    let ujy_min = rows.iter().map(|r| r.ujy).fold(f64::INFINITY, f64::min);
    let ujy_max = rows.iter().map(|r| r.ujy).fold(f64::NEG_INFINITY, f64::max);

    let mut series: Vec<Vec<Tuple>> = Vec::with_capacity(FILTERS.len());
    let mut labels = Vec::with_capacity(FILTERS.len());
    for (color, filter) in FILTERS {
        series.push(
            rows.iter()
                .filter(|row| row.filter == filter)
                .map(|row| vec![row.mjd, row.ujy, row.dujy])
                .collect(),
        );
        labels.push(SeriesLabel {
            label: filter.to_string(),
            color,
            display: false,
        });
    }

    Ok(LightcurveInput {
        plot_id: plot_id.to_string(),
        series,
        labels,
        limits: PlotLimits {
            xmin,
            xmax,
            ymin: ujy_min.max(YMIN_FLOOR),
            ymax: ujy_max.min(YMAX_CEILING),
            discovery_date: xmin,
            today: today_mjd,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
###MJD          m      dm   uJy   duJy F err chi/N
59000.10  17.5  0.02  350    12 o  0  1.1
59001.20  17.9  0.05  -500   30 c  0  0.9
59002.30  18.0  0.05  99999999999 30 c  0  0.9
59003.40  16.0  0.01  50000  40 o  0  1.0
";

    #[test]
    fn test_parse_filters_and_limits() {
        let input = parse_result_table(TABLE, "plotforcedflux-task-4", 59100.0).unwrap();
        assert_eq!(input.plot_id, "plotforcedflux-task-4");
        assert_eq!(input.labels[0].label, "c");
        assert_eq!(input.labels[0].color, 11);
        assert_eq!(input.series[0], vec![vec![59001.2, -500.0, 30.0]]);
        assert_eq!(input.series[1].len(), 2);

        let limits = input.limits;
        assert_eq!(limits.xmin, 59000.1);
        assert_eq!(limits.xmax, 59003.4);
        assert_eq!(limits.ymin, -200.0);
        assert_eq!(limits.ymax, 40000.0);
        assert_eq!(limits.discovery_date, 59000.1);
        assert_eq!(limits.today, 59100.0);
    }

    #[test]
    fn test_missing_column_is_error() {
        let err = parse_result_table("#MJD uJy F\n1 2 o\n", "p", 0.0).unwrap_err();
        assert!(err.to_string().contains("duJy"));
    }

    #[test]
    fn test_no_valid_rows_is_error() {
        assert!(parse_result_table("###MJD uJy duJy F\n", "p", 0.0).is_err());
    }
}
