use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fpqueue_core::{QueueError, QueueResult};

use crate::value_objects::{ProperMotion, Target};

/// 队列中的一个任务
///
/// 字段与服务端序列化器保持一致，未知字段被忽略。任务所处的生命周期阶段
/// 不单独存储，而是由 `starttimestamp` / `finishtimestamp` 是否存在推导，
/// 见 [`Task::state`]。
///
/// # 使用示例
///
/// ```rust
/// use fpqueue_domain::models::{Task, TaskState};
///
/// let task: Task = serde_json::from_str(r#"{
///     "url": "https://example.com/queue/7/",
///     "id": 7,
///     "timestamp": "2023-02-25T00:00:00Z",
///     "ra": 110.0,
///     "dec": 11.0,
///     "queuepos": 3
/// }"#).unwrap();
///
/// assert_eq!(task.state(), TaskState::Queued);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub url: String,
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    /// 入队时间
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub mpc_name: Option<String>,
    #[serde(default)]
    pub ra: Option<f64>,
    #[serde(default)]
    pub dec: Option<f64>,
    #[serde(default)]
    pub mjd_min: Option<f64>,
    #[serde(default)]
    pub mjd_max: Option<f64>,
    #[serde(default)]
    pub radec_epoch_year: Option<f64>,
    #[serde(default)]
    pub propermotion_ra: Option<f64>,
    #[serde(default)]
    pub propermotion_dec: Option<f64>,
    #[serde(default)]
    pub use_reduced: bool,
    #[serde(default)]
    pub result_url: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub send_email: bool,
    #[serde(default)]
    pub starttimestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finishtimestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_msg: Option<String>,
    #[serde(default)]
    pub previewimage_url: Option<String>,
    #[serde(default)]
    pub parent_task_id: Option<i64>,
    #[serde(default)]
    pub parent_task_url: Option<String>,
    #[serde(default)]
    pub request_type: RequestType,
    #[serde(default)]
    pub pdfplot_url: Option<String>,
    /// 前方排队的任务数
    #[serde(default)]
    pub queuepos: Option<i64>,
    #[serde(default)]
    pub imagerequest_task_id: Option<i64>,
    #[serde(default)]
    pub imagerequest_url: Option<String>,
    #[serde(default)]
    pub imagerequest_finished: Option<bool>,
    #[serde(default)]
    pub result_imagezip_url: Option<String>,
}

/// 任务请求类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestType {
    /// 强制测光
    #[default]
    #[serde(rename = "FP")]
    ForcedPhotometry,
    /// 图像打包下载
    #[serde(rename = "IMGZIP")]
    ImageZip,
    /// 小天体图像叠加
    #[serde(rename = "SSOSTACK")]
    ImageStack,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::ForcedPhotometry => "FP",
            RequestType::ImageZip => "IMGZIP",
            RequestType::ImageStack => "SSOSTACK",
        }
    }
}

/// 由时间戳推导出的任务状态，三者互斥
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    Running { started: DateTime<Utc> },
    Finished { finished: DateTime<Utc> },
}

impl Task {
    pub fn state(&self) -> TaskState {
        match (self.starttimestamp, self.finishtimestamp) {
            (_, Some(finished)) => TaskState::Finished { finished },
            (Some(started), None) => TaskState::Running { started },
            (None, None) => TaskState::Queued,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state(), TaskState::Finished { .. })
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state(), TaskState::Running { .. })
    }

    /// 开始时间不早于入队时间，结束时间不早于开始时间
    pub fn timestamps_consistent(&self) -> bool {
        let started_ok = self
            .starttimestamp
            .map_or(true, |started| started >= self.timestamp);
        let finished_ok = match (self.starttimestamp, self.finishtimestamp) {
            (Some(started), Some(finished)) => finished >= started,
            (None, Some(finished)) => finished >= self.timestamp,
            _ => true,
        };
        started_ok && finished_ok
    }

    /// 运行中任务已耗费的整秒数；其他状态返回 None
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        match self.state() {
            TaskState::Running { started } => {
                let millis = (now - started).num_milliseconds();
                Some((millis as f64 / 1000.0).round() as i64)
            }
            _ => None,
        }
    }

    pub fn has_error(&self) -> bool {
        self.error_msg.is_some()
    }

    pub fn is_owned_by(&self, user_id: Option<i64>) -> bool {
        matches!((self.user_id, user_id), (Some(owner), Some(me)) if owner == me)
    }

    pub fn target(&self) -> Target {
        match self.mpc_name.as_deref() {
            Some(name) if !name.is_empty() => Target::MinorPlanet(name.to_string()),
            _ => Target::Coordinates {
                ra: self.ra,
                dec: self.dec,
                epoch_year: self.radec_epoch_year,
                propermotion: ProperMotion {
                    ra: self.propermotion_ra.unwrap_or(0.0),
                    dec: self.propermotion_dec.unwrap_or(0.0),
                },
            },
        }
    }

    /// 光变曲线绘图元素的标识
    pub fn plot_id(&self) -> String {
        format!("plotforcedflux-task-{}", self.id)
    }

    /// 在任务地址后追加子资源路径，并清空查询参数
    pub fn subresource_url(&self, segment: &str) -> QueueResult<String> {
        let mut url = url::Url::parse(&self.url)
            .map_err(|e| QueueError::InvalidUrl(format!("{}: {e}", self.url)))?;
        let path = format!("{}{}", url.path(), segment);
        url.set_path(&path);
        url.set_query(None);
        Ok(url.to_string())
    }

    pub fn request_images_url(&self) -> QueueResult<String> {
        self.subresource_url("requestimages")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task_json(extra: &str) -> String {
        format!(
            r#"{{"url": "https://example.com/queue/5/?format=json", "id": 5,
                "timestamp": "2023-01-01T00:00:00Z"{extra}}}"#
        )
    }

    #[test]
    fn test_state_is_derived_from_timestamps() {
        let queued: Task = serde_json::from_str(&task_json("")).unwrap();
        assert_eq!(queued.state(), TaskState::Queued);

        let running: Task =
            serde_json::from_str(&task_json(r#", "starttimestamp": "2023-01-01T00:01:00Z""#))
                .unwrap();
        assert!(running.is_running());

        let finished: Task = serde_json::from_str(&task_json(
            r#", "starttimestamp": "2023-01-01T00:01:00Z", "finishtimestamp": "2023-01-01T00:02:00Z""#,
        ))
        .unwrap();
        assert!(finished.is_finished());
        assert!(finished.timestamps_consistent());
    }

    #[test]
    fn test_inconsistent_timestamps_detected() {
        let task: Task = serde_json::from_str(&task_json(
            r#", "starttimestamp": "2023-01-01T00:05:00Z", "finishtimestamp": "2023-01-01T00:02:00Z""#,
        ))
        .unwrap();
        assert!(!task.timestamps_consistent());
    }

    #[test]
    fn test_elapsed_seconds_only_while_running() {
        let running: Task =
            serde_json::from_str(&task_json(r#", "starttimestamp": "2023-01-01T00:01:00Z""#))
                .unwrap();
        let now = Utc.with_ymd_and_hms(2023, 1, 1, 0, 2, 30).unwrap();
        assert_eq!(running.elapsed_seconds(now), Some(90));

        let queued: Task = serde_json::from_str(&task_json("")).unwrap();
        assert_eq!(queued.elapsed_seconds(now), None);
    }

    #[test]
    fn test_request_type_wire_names() {
        let task: Task =
            serde_json::from_str(&task_json(r#", "request_type": "IMGZIP""#)).unwrap();
        assert_eq!(task.request_type, RequestType::ImageZip);
        assert_eq!(RequestType::ImageStack.as_str(), "SSOSTACK");
    }

    #[test]
    fn test_target_prefers_mpc_name() {
        let task: Task =
            serde_json::from_str(&task_json(r#", "mpc_name": "Makemake", "ra": null"#)).unwrap();
        assert_eq!(task.target(), Target::MinorPlanet("Makemake".to_string()));

        let task: Task =
            serde_json::from_str(&task_json(r#", "mpc_name": "", "ra": 1.5, "dec": -2.0"#))
                .unwrap();
        assert!(matches!(task.target(), Target::Coordinates { ra: Some(_), .. }));
    }

    #[test]
    fn test_subresource_url_drops_query() {
        let task: Task = serde_json::from_str(&task_json("")).unwrap();
        assert_eq!(
            task.request_images_url().unwrap(),
            "https://example.com/queue/5/requestimages"
        );
        assert_eq!(task.plot_id(), "plotforcedflux-task-5");
    }
}
