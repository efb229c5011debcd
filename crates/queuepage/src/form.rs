use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use fpqueue_client::{SubmitOutcome, TaskApi};
use fpqueue_core::{mjd_now, mjd_preview, QueueError, QueueResult};
use fpqueue_domain::{
    validate_mjd_window, validate_radeclist, FieldErrors, NewTaskRequest, ProperMotionInput,
};

use crate::controller::PageController;
use crate::draft::DraftStore;
use crate::session::SessionContext;

/// 传输层失败时的提示
pub const HTTP_FAILURE_MESSAGE: &str =
    "HTTP request failed. Check internet connection and server are online.";

pub const MJD_MIN_BLANK_HINT: &str = "(leave blank to fetch earliest)";
pub const MJD_MAX_BLANK_HINT: &str = "(leave blank to fetch latest)";

/// 提交成功后清除的草稿键；`use_reduced` 与 `send_email` 作为偏好保留
pub const CLEARED_ON_SUBMIT: [&str; 8] = [
    "radeclist",
    "enable_propermotion",
    "radec_epoch_year",
    "propermotion_ra",
    "propermotion_dec",
    "mjd_min",
    "mjd_max",
    "comment",
];

/// 表单字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Radeclist,
    MjdMin,
    MjdMax,
    UseReduced,
    SendEmail,
    Comment,
    EnablePropermotion,
    RadecEpochYear,
    PropermotionRa,
    PropermotionDec,
}

impl FormField {
    pub const ALL: [FormField; 10] = [
        FormField::Radeclist,
        FormField::MjdMin,
        FormField::MjdMax,
        FormField::UseReduced,
        FormField::SendEmail,
        FormField::Comment,
        FormField::EnablePropermotion,
        FormField::RadecEpochYear,
        FormField::PropermotionRa,
        FormField::PropermotionDec,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            FormField::Radeclist => "radeclist",
            FormField::MjdMin => "mjd_min",
            FormField::MjdMax => "mjd_max",
            FormField::UseReduced => "use_reduced",
            FormField::SendEmail => "send_email",
            FormField::Comment => "comment",
            FormField::EnablePropermotion => "enable_propermotion",
            FormField::RadecEpochYear => "radec_epoch_year",
            FormField::PropermotionRa => "propermotion_ra",
            FormField::PropermotionDec => "propermotion_dec",
        }
    }

    pub fn is_checkbox(&self) -> bool {
        matches!(
            self,
            FormField::UseReduced | FormField::SendEmail | FormField::EnablePropermotion
        )
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FormField {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormField::ALL
            .into_iter()
            .find(|field| field.key() == s)
            .ok_or_else(|| QueueError::Internal(format!("未知的表单字段: {s}")))
    }
}

fn parse_checkbox(value: &str) -> QueueResult<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(QueueError::Internal(format!(
            "复选框的值必须是 true 或 false: {other}"
        ))),
    }
}

/// now - 30 天，保留五位小数
pub fn default_mjd_min(now_mjd: f64) -> String {
    format!("{:.5}", now_mjd - 30.0)
}

/// 表单当前的值
#[derive(Debug, Clone, PartialEq)]
pub struct FormDraft {
    pub radeclist: String,
    pub mjd_min: String,
    pub mjd_max: String,
    pub use_reduced: bool,
    pub send_email: bool,
    pub comment: String,
    pub enable_propermotion: bool,
    pub radec_epoch_year: String,
    pub propermotion_ra: String,
    pub propermotion_dec: String,
}

impl FormDraft {
    pub fn defaults(now_mjd: f64) -> Self {
        Self {
            radeclist: String::new(),
            mjd_min: default_mjd_min(now_mjd),
            mjd_max: String::new(),
            use_reduced: false,
            send_email: true,
            comment: String::new(),
            enable_propermotion: false,
            radec_epoch_year: String::new(),
            propermotion_ra: "0".to_string(),
            propermotion_dec: "0".to_string(),
        }
    }

    /// 从存储恢复；缺失的键使用默认值
    pub fn load(store: &dyn DraftStore, now_mjd: f64) -> QueueResult<Self> {
        let mut draft = Self::defaults(now_mjd);
        for (key, value) in store.entries()? {
            match key.parse::<FormField>() {
                Ok(field) => {
                    if let Err(e) = draft.apply(field, &value) {
                        warn!("Ignoring stored draft value for {}: {}", key, e);
                    }
                }
                Err(_) => debug!("Ignoring unknown draft key {}", key),
            }
        }
        Ok(draft)
    }

    fn apply(&mut self, field: FormField, value: &str) -> QueueResult<()> {
        match field {
            FormField::Radeclist => self.radeclist = value.to_string(),
            FormField::MjdMin => self.mjd_min = value.to_string(),
            FormField::MjdMax => self.mjd_max = value.to_string(),
            FormField::UseReduced => self.use_reduced = parse_checkbox(value)?,
            // 只有明确的 "false" 才关闭邮件通知
            FormField::SendEmail => self.send_email = value != "false",
            FormField::Comment => self.comment = value.to_string(),
            FormField::EnablePropermotion => self.enable_propermotion = parse_checkbox(value)?,
            FormField::RadecEpochYear => self.radec_epoch_year = value.to_string(),
            FormField::PropermotionRa => self.propermotion_ra = value.to_string(),
            FormField::PropermotionDec => self.propermotion_dec = value.to_string(),
        }
        Ok(())
    }

    pub fn value(&self, field: FormField) -> String {
        match field {
            FormField::Radeclist => self.radeclist.clone(),
            FormField::MjdMin => self.mjd_min.clone(),
            FormField::MjdMax => self.mjd_max.clone(),
            FormField::UseReduced => self.use_reduced.to_string(),
            FormField::SendEmail => self.send_email.to_string(),
            FormField::Comment => self.comment.clone(),
            FormField::EnablePropermotion => self.enable_propermotion.to_string(),
            FormField::RadecEpochYear => self.radec_epoch_year.clone(),
            FormField::PropermotionRa => self.propermotion_ra.clone(),
            FormField::PropermotionDec => self.propermotion_dec.clone(),
        }
    }

    /// 空的 MJD 以 null 提交；自行参数只在启用时提交
    pub fn to_request(&self) -> NewTaskRequest {
        let optional = |value: &str| (!value.is_empty()).then(|| value.to_string());
        NewTaskRequest {
            radeclist: self.radeclist.clone(),
            mjd_min: optional(&self.mjd_min),
            mjd_max: optional(&self.mjd_max),
            use_reduced: self.use_reduced,
            send_email: self.send_email,
            comment: self.comment.clone(),
            propermotion: self.enable_propermotion.then(|| ProperMotionInput {
                radec_epoch_year: self.radec_epoch_year.clone(),
                propermotion_ra: self.propermotion_ra.clone(),
                propermotion_dec: self.propermotion_dec.clone(),
            }),
        }
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = validate_radeclist(&self.radeclist);
        let request = self.to_request();
        errors.merge(validate_mjd_window(
            request.mjd_min.as_deref(),
            request.mjd_max.as_deref(),
        ));
        errors
    }
}

/// MJD 输入框旁的日历日期预览
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MjdPreviews {
    pub mjd_min: String,
    pub mjd_max: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitResult {
    Created(Vec<i64>),
    Invalid(FieldErrors),
    Throttled(String),
    Rejected { status: u16 },
    TransportError(String),
    /// 已有提交在途，本次被忽略
    AlreadyInProgress,
}

/// 提交在途标记，析构时清除
struct SubmissionGuard<'a>(&'a AtomicBool);

impl<'a> SubmissionGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn record_submission(outcome: &'static str) {
    metrics::counter!("fpqueue_submissions_total", "outcome" => outcome).increment(1);
}

/// 新任务请求表单
///
/// 每次修改字段都立即写入草稿存储；提交是串行的，在途期间的重复提交直接忽略。
pub struct RequestForm {
    api: Arc<dyn TaskApi>,
    store: Arc<dyn DraftStore>,
    session: Arc<SessionContext>,
    draft: Mutex<FormDraft>,
    errors: Mutex<FieldErrors>,
    http_error: Mutex<Option<String>>,
    in_flight: AtomicBool,
}

impl RequestForm {
    pub fn new(
        api: Arc<dyn TaskApi>,
        store: Arc<dyn DraftStore>,
        session: Arc<SessionContext>,
    ) -> QueueResult<Self> {
        let draft = FormDraft::load(store.as_ref(), mjd_now())?;
        Ok(Self {
            api,
            store,
            session,
            draft: Mutex::new(draft),
            errors: Mutex::new(FieldErrors::new()),
            http_error: Mutex::new(None),
            in_flight: AtomicBool::new(false),
        })
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn draft(&self) -> FormDraft {
        Self::lock(&self.draft).clone()
    }

    pub fn errors(&self) -> FieldErrors {
        Self::lock(&self.errors).clone()
    }

    pub fn http_error(&self) -> Option<String> {
        Self::lock(&self.http_error).clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// 先写入存储，成功后才更新内存中的草稿
    pub fn set_field(&self, field: FormField, value: &str) -> QueueResult<()> {
        let mut draft = Self::lock(&self.draft);
        let mut updated = draft.clone();
        updated.apply(field, value)?;
        self.store.set(field.key(), value)?;
        *draft = updated;
        debug!("Draft field {} updated", field);
        Ok(())
    }

    /// 恢复计算出的 `mjd_min` 默认值并删除已保存的值
    pub fn reset_mjd_min(&self) -> QueueResult<()> {
        self.store.remove(FormField::MjdMin.key())?;
        Self::lock(&self.draft).mjd_min = default_mjd_min(mjd_now());
        Ok(())
    }

    pub fn previews(&self) -> MjdPreviews {
        let draft = Self::lock(&self.draft);
        MjdPreviews {
            mjd_min: mjd_preview(&draft.mjd_min, MJD_MIN_BLANK_HINT),
            mjd_max: mjd_preview(&draft.mjd_max, MJD_MAX_BLANK_HINT),
        }
    }

    /// 清空全部已保存的字段并恢复默认值
    pub fn clear(&self) -> QueueResult<()> {
        let keys: Vec<&str> = FormField::ALL.iter().map(FormField::key).collect();
        self.store.clear_keys(&keys)?;
        *Self::lock(&self.draft) = FormDraft::defaults(mjd_now());
        *Self::lock(&self.errors) = FieldErrors::new();
        Ok(())
    }

    pub async fn submit(&self, controller: &PageController) -> SubmitResult {
        let Some(_guard) = SubmissionGuard::acquire(&self.in_flight) else {
            debug!("Submission already in progress, ignoring");
            return SubmitResult::AlreadyInProgress;
        };

        let draft = self.draft();
        let local_errors = draft.validate();
        if !local_errors.is_empty() {
            *Self::lock(&self.errors) = local_errors.clone();
            record_submission("invalid");
            return SubmitResult::Invalid(local_errors);
        }

        let request = draft.to_request();
        let outcome = self.api.create_tasks(&request).await;

        match outcome {
            Ok(SubmitOutcome::Created(tasks)) => {
                let ids: Vec<i64> = tasks.iter().map(|task| task.id).collect();
                info!("Created {} task(s): {:?}", ids.len(), ids);
                record_submission("created");

                if let Err(e) = self.store.clear_keys(&CLEARED_ON_SUBMIT) {
                    warn!("Failed to clear draft after submission: {}", e);
                }
                let reloaded = FormDraft::load(self.store.as_ref(), mjd_now())
                    .unwrap_or_else(|_| FormDraft::defaults(mjd_now()));
                *Self::lock(&self.draft) = reloaded;
                *Self::lock(&self.errors) = FieldErrors::new();
                *Self::lock(&self.http_error) = None;

                self.session.add_new_tasks(ids.iter().copied());
                controller.go_to_base().await;
                SubmitResult::Created(ids)
            }
            Ok(SubmitOutcome::Invalid(errors)) => {
                warn!("Task request rejected with field errors");
                record_submission("invalid");
                *Self::lock(&self.errors) = errors.clone();
                *Self::lock(&self.http_error) = None;
                SubmitResult::Invalid(errors)
            }
            Ok(SubmitOutcome::Throttled { detail }) => {
                warn!("Task request throttled: {}", detail);
                record_submission("throttled");
                *Self::lock(&self.http_error) = Some(detail.clone());
                SubmitResult::Throttled(detail)
            }
            Ok(SubmitOutcome::Rejected { status, body }) => {
                warn!("Task request failed with HTTP {}: {}", status, body);
                record_submission("rejected");
                *Self::lock(&self.http_error) = Some(format!("HTTP status {status}"));
                SubmitResult::Rejected { status }
            }
            Err(e) => {
                warn!("Task request HTTP request failed: {}", e);
                record_submission("error");
                *Self::lock(&self.http_error) = Some(HTTP_FAILURE_MESSAGE.to_string());
                SubmitResult::TransportError(HTTP_FAILURE_MESSAGE.to_string())
            }
        }
    }
}
