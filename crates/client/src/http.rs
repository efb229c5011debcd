use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, redirect, StatusCode};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use url::Url;

use fpqueue_core::{ApiConfig, QueueError, QueueResult};
use fpqueue_domain::{FieldErrors, ListPayload, NewTaskRequest, Task};

use crate::api::{FetchResponse, ImageRequestOutcome, SubmitOutcome, TaskApi};

/// 基于 reqwest 的队列接口实现
///
/// 客户端从不自动跟随重定向：列表接口的 3xx 意味着会话失效，
/// 请求图像接口的 3xx 携带新任务 id，两者都需要调用方看到原始响应。
pub struct HttpTaskApi {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpTaskApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> QueueResult<Self> {
        let http_client = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| QueueError::Internal(format!("创建HTTP客户端失败: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            http_client,
        })
    }

    pub fn from_config(config: &ApiConfig) -> QueueResult<Self> {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.request_timeout_seconds),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn location(response: &reqwest::Response) -> Option<String> {
        let raw = response.headers().get(header::LOCATION)?.to_str().ok()?;
        // Location 可能是相对路径
        match response.url().join(raw) {
            Ok(resolved) => Some(resolved.to_string()),
            Err(_) => Some(raw.to_string()),
        }
    }
}

fn network_error(e: reqwest::Error) -> QueueError {
    QueueError::Network(e.to_string())
}

/// 从跳转地址中取出并移除 `newids`
fn split_newids(location: &str) -> (Option<i64>, String) {
    let Ok(mut url) = Url::parse(location) else {
        return (None, location.to_string());
    };

    let mut task_id = None;
    let remaining: Vec<(String, String)> = url
        .query_pairs()
        .filter_map(|(key, value)| {
            if key == "newids" {
                task_id = value.split(',').next().and_then(|id| id.trim().parse().ok());
                None
            } else {
                Some((key.into_owned(), value.into_owned()))
            }
        })
        .collect();

    if remaining.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(remaining);
    }

    (task_id, url.to_string())
}

fn parse_created(body: &str) -> QueueResult<Vec<Task>> {
    match serde_json::from_str::<Value>(body)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(QueueError::from))
            .collect(),
        other => Ok(vec![serde_json::from_value(other)?]),
    }
}

fn message_field(body: &str, field: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get(field).and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn fetch_page(&self, url: &str, etag: Option<&str>) -> QueueResult<FetchResponse> {
        let mut request = self
            .http_client
            .get(url)
            .header(header::ACCEPT, "application/json");
        if let Some(etag) = etag {
            request = request.header(header::IF_NONE_MATCH, etag);
        }

        let response = request.send().await.map_err(network_error)?;
        let status = response.status();
        debug!("GET {} -> {}", url, status);

        if status == StatusCode::NOT_MODIFIED {
            return Ok(FetchResponse::NotModified);
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(FetchResponse::NotFound);
        }
        if status.is_redirection() {
            let location = Self::location(&response).unwrap_or_default();
            return Ok(FetchResponse::Redirect { location });
        }
        if !status.is_success() {
            return Ok(FetchResponse::Status(status.as_u16()));
        }

        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(network_error)?;
        let payload: ListPayload = serde_json::from_str(&body)?;

        Ok(FetchResponse::Ok {
            page: payload.into_page(),
            etag,
        })
    }

    async fn create_tasks(&self, request: &NewTaskRequest) -> QueueResult<SubmitOutcome> {
        let response = match self
            .http_client
            .post(&self.base_url)
            .header(header::ACCEPT, "application/json")
            .json(request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!("Failed to submit new task request: {}", e);
                return Err(network_error(e));
            }
        };

        let status = response.status();
        let body = response.text().await.map_err(network_error)?;

        match status {
            StatusCode::CREATED => {
                let tasks = parse_created(&body)?;
                info!("Created {} task(s)", tasks.len());
                Ok(SubmitOutcome::Created(tasks))
            }
            StatusCode::BAD_REQUEST => {
                let errors = match serde_json::from_str::<Value>(&body) {
                    Ok(value) => FieldErrors::from_response_body(&value),
                    Err(_) => FieldErrors::single(fpqueue_domain::NON_FIELD_ERRORS, body),
                };
                debug!("Submission rejected with field errors: {:?}", errors);
                Ok(SubmitOutcome::Invalid(errors))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let detail = message_field(&body, "detail");
                warn!("Submission throttled: {}", detail);
                Ok(SubmitOutcome::Throttled { detail })
            }
            other => {
                warn!("Submission failed: HTTP {} - {}", other, body);
                Ok(SubmitOutcome::Rejected {
                    status: other.as_u16(),
                    body,
                })
            }
        }
    }

    async fn delete_task(&self, task_url: &str) -> QueueResult<()> {
        match self.http_client.delete(task_url).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    info!("Deleted task {}", task_url);
                    Ok(())
                } else {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    warn!("Failed to delete task {}: HTTP {}", task_url, status);
                    Err(QueueError::HttpStatus {
                        status: status.as_u16(),
                        body,
                    })
                }
            }
            Err(e) => {
                warn!("Failed to delete task {}: {}", task_url, e);
                Err(network_error(e))
            }
        }
    }

    async fn request_images(&self, task: &Task) -> QueueResult<ImageRequestOutcome> {
        let url = task.request_images_url()?;
        let response = self
            .http_client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();

        if status.is_redirection() {
            let Some(location) = Self::location(&response) else {
                return Ok(ImageRequestOutcome::NotCreated { location: None });
            };
            let (task_id, location) = split_newids(&location);
            return Ok(match task_id {
                Some(task_id) => {
                    info!("requestimages created task {} for task {}", task_id, task.id);
                    ImageRequestOutcome::Created { task_id, location }
                }
                None => ImageRequestOutcome::NotCreated {
                    location: Some(location),
                },
            });
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Ok(ImageRequestOutcome::Throttled {
                error: message_field(&body, "error"),
            });
        }

        if status.is_success() {
            return Ok(ImageRequestOutcome::NotCreated { location: None });
        }

        warn!("requestimages for task {} failed: HTTP {}", task.id, status);
        Ok(ImageRequestOutcome::Failed {
            status: status.as_u16(),
        })
    }

    async fn fetch_result_data(&self, task: &Task) -> QueueResult<String> {
        let Some(result_url) = task.result_url.as_deref() else {
            return Err(QueueError::InvalidUrl(format!("任务 {} 没有结果数据", task.id)));
        };
        let url = Url::parse(&task.url)
            .and_then(|base| base.join(result_url))
            .map_err(|e| QueueError::InvalidUrl(format!("{result_url}: {e}")))?;

        let response = self
            .http_client
            .get(url.as_str())
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueueError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        response.text().await.map_err(network_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_newids_keeps_other_params() {
        let (id, location) = split_newids("https://example.com/queue/?newids=42&started=true");
        assert_eq!(id, Some(42));
        assert_eq!(location, "https://example.com/queue/?started=true");
    }

    #[test]
    fn test_split_newids_absent() {
        let (id, location) = split_newids("https://example.com/queue/");
        assert_eq!(id, None);
        assert_eq!(location, "https://example.com/queue/");
    }

    #[test]
    fn test_message_field_falls_back_to_body() {
        assert_eq!(message_field(r#"{"detail": "slow down"}"#, "detail"), "slow down");
        assert_eq!(message_field("plain text", "detail"), "plain text");
    }
}
