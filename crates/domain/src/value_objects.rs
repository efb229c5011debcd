use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 自行 [mas/yr]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProperMotion {
    pub ra: f64,
    pub dec: f64,
}

impl ProperMotion {
    pub fn is_moving(&self) -> bool {
        self.ra > 0.0 || self.dec > 0.0
    }
}

/// 测光目标：小天体名称或赤经赤纬
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    MinorPlanet(String),
    Coordinates {
        ra: Option<f64>,
        dec: Option<f64>,
        epoch_year: Option<f64>,
        propermotion: ProperMotion,
    },
}

/// 服务端返回的字段级校验错误，按字段名索引，原样展示
///
/// 不属于任何字段的错误归入 `non_field_errors`。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    /// 解析 400 响应体
    ///
    /// 支持 `{"field": ["msg"]}`、`{"field": "msg"}`、批量创建时的对象数组，
    /// 以及顶层字符串数组。
    pub fn from_response_body(body: &Value) -> Self {
        let mut errors = Self::new();
        errors.collect(NON_FIELD_ERRORS, body);
        errors
    }

    fn collect(&mut self, field: &str, value: &Value) {
        match value {
            Value::Object(map) => {
                for (key, nested) in map {
                    self.collect(key, nested);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.collect(field, item);
                }
            }
            Value::String(message) => self.insert(field, message.clone()),
            Value::Null => {}
            other => self.insert(field, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_field_errors() {
        let errors = FieldErrors::from_response_body(&json!({
            "radeclist": ["Error on line 2: MPC name is blank"],
            "mjd_max": "mjd_max must be greater than mjd_min."
        }));
        assert_eq!(
            errors.get("radeclist").unwrap(),
            &["Error on line 2: MPC name is blank".to_string()]
        );
        assert!(errors.contains("mjd_max"));
    }

    #[test]
    fn test_parse_top_level_list() {
        let errors =
            FieldErrors::from_response_body(&json!(["Either an mpc_name or (ra, dec) must be specified."]));
        assert_eq!(errors.get(NON_FIELD_ERRORS).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_bulk_errors_are_merged() {
        let errors = FieldErrors::from_response_body(&json!([
            {},
            {"dec": ["ra was set but dec is missing."]}
        ]));
        assert_eq!(errors.get("dec").unwrap().len(), 1);
        assert!(!errors.contains(NON_FIELD_ERRORS));
    }

    #[test]
    fn test_proper_motion_moving() {
        assert!(!ProperMotion::default().is_moving());
        assert!(ProperMotion { ra: 0.0, dec: 1.2 }.is_moving());
    }
}
