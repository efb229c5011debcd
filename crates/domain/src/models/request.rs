use serde::{Deserialize, Serialize};

/// 新任务请求的 JSON 文档
///
/// 自行参数仅在用户启用时随请求一起提交。MJD 与自行字段保留用户输入的原始
/// 字符串，由服务端做数值校验。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTaskRequest {
    pub radeclist: String,
    pub mjd_min: Option<String>,
    pub mjd_max: Option<String>,
    pub use_reduced: bool,
    pub send_email: bool,
    pub comment: String,
    #[serde(flatten)]
    pub propermotion: Option<ProperMotionInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProperMotionInput {
    pub radec_epoch_year: String,
    pub propermotion_ra: String,
    pub propermotion_dec: String,
}
