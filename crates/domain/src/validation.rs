//! 提交前的本地校验，规则与服务端一致
//!
//! 只报告第一处错误，与服务端的行为相同。通过本地校验并不代表服务端一定接受，
//! 服务端返回的 400 错误仍然按字段原样展示。

use crate::value_objects::FieldErrors;

pub const MAX_RADEC_LINES: usize = 100;

const MPC_PREFIXES: [&str; 4] = ["mpc_", "MPC_", "mpc ", "MPC "];
const MPC_BAD_CHARS: [char; 3] = ['\'', '"', ';'];

/// 校验坐标/小天体名称列表
pub fn validate_radeclist(radeclist: &str) -> FieldErrors {
    let lines: Vec<&str> = radeclist.split('\n').collect();
    if lines.len() > MAX_RADEC_LINES {
        return FieldErrors::single(
            "radeclist",
            format!(
                "Number of lines ({}) is above the limit of {MAX_RADEC_LINES}",
                lines.len()
            ),
        );
    }

    for (index, raw_line) in lines.iter().enumerate() {
        let index = index + 1;
        let line = raw_line.trim_end_matches('\r');

        if let Some(prefix) = MPC_PREFIXES.iter().find(|p| line.starts_with(*p)) {
            let name = line[prefix.len()..].trim();
            if name.is_empty() {
                return FieldErrors::single(
                    "radeclist",
                    format!("Error on line {index}: MPC name is blank"),
                );
            }
            if name.contains(MPC_BAD_CHARS) {
                return FieldErrors::single(
                    "radeclist",
                    format!(
                        "Error on line {index}: Invalid mpc_name. May not contain quotes or semicolons"
                    ),
                );
            }
            continue;
        }

        let Some(columns) = split_columns(line) else {
            continue;
        };

        if columns.len() < 2 {
            return FieldErrors::single(
                "radeclist",
                format!(
                    "Error on line {index}: Could not find two columns. Separate RA and Dec by a comma or a \
                     space. For MPC object names, start the line with 'mpc ', e.g., 'mpc Makemake'"
                ),
            );
        }

        if parse_ra_degrees(&columns[0]).is_none() {
            return FieldErrors::single(
                "radeclist",
                format!("Error on line {index}: could not parse RA '{}'", columns[0].trim()),
            );
        }

        if parse_dec_degrees(&columns[1]).is_none() {
            return FieldErrors::single(
                "radeclist",
                format!("Error on line {index}: could not parse Dec '{}'", columns[1].trim()),
            );
        }
    }

    FieldErrors::new()
}

/// 按逗号、六段式六十进制或空白拆分；空白行返回 None
fn split_columns(line: &str) -> Option<Vec<String>> {
    if line.contains(',') {
        return Some(line.split(',').map(str::to_string).collect());
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }
    if tokens.len() == 6 {
        return Some(vec![tokens[..3].join(" "), tokens[3..].join(" ")]);
    }
    Some(tokens.into_iter().map(str::to_string).collect())
}

/// 十进制度，或 `HH:MM:SS.s` / `HH MM SS.s` 时角
pub fn parse_ra_degrees(value: &str) -> Option<f64> {
    let (sign, parts) = sexagesimal_parts(value)?;
    let degrees = if parts.len() == 1 {
        parts[0]
    } else {
        (parts[0] + parts[1] / 60.0 + parts[2] / 3600.0) * 15.0
    };
    let degrees = sign * degrees;
    (0.0..=360.0).contains(&degrees).then_some(degrees)
}

/// 十进制度，或 `±DD:MM:SS.s` / `±DD MM SS.s`
pub fn parse_dec_degrees(value: &str) -> Option<f64> {
    let (sign, parts) = sexagesimal_parts(value)?;
    let degrees = if parts.len() == 1 {
        parts[0]
    } else {
        parts[0] + parts[1] / 60.0 + parts[2] / 3600.0
    };
    let degrees = sign * degrees;
    (-90.0..=90.0).contains(&degrees).then_some(degrees)
}

fn sexagesimal_parts(value: &str) -> Option<(f64, Vec<f64>)> {
    let trimmed = value.trim();
    let (sign, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let parts: Vec<f64> = unsigned
        .split(|c: char| c == ':' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::parse::<f64>)
        .collect::<Result<_, _>>()
        .ok()?;

    if parts.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return None;
    }

    match parts.len() {
        1 | 3 => Some((sign, parts)),
        _ => None,
    }
}

/// MJD 上下限：必须是有限数，且上限大于下限
pub fn validate_mjd_window(mjd_min: Option<&str>, mjd_max: Option<&str>) -> FieldErrors {
    let mut errors = FieldErrors::new();

    let parse = |field: &str, value: Option<&str>, errors: &mut FieldErrors| -> Option<f64> {
        let value = value?.trim();
        match value.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                errors.insert(
                    field,
                    format!("{field} must be either None or a finite floating-point number."),
                );
                None
            }
        }
    };

    let min = parse("mjd_min", mjd_min, &mut errors);
    let max = parse("mjd_max", mjd_max, &mut errors);

    if let (Some(min), Some(max)) = (min, max) {
        if max <= min {
            errors.insert("mjd_max", "mjd_max must be greater than mjd_min.");
        }
    }

    errors
}
