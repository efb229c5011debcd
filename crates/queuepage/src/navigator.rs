use url::Url;

use fpqueue_core::{QueueError, QueueResult};
use fpqueue_domain::cursor_param;

/// 当前地址与前进/后退历史
///
/// 每次游标、筛选或单任务视图的切换都通过 [`Navigator::push`] 记为一个
/// 独立的可导航状态。
#[derive(Debug, Clone)]
pub struct Navigator {
    base_url: String,
    current: String,
    back_stack: Vec<String>,
    forward_stack: Vec<String>,
}

impl Navigator {
    pub fn new(base_url: &str) -> QueueResult<Self> {
        Self::with_location(base_url, base_url)
    }

    pub fn with_location(base_url: &str, location: &str) -> QueueResult<Self> {
        Url::parse(base_url).map_err(|e| QueueError::InvalidUrl(format!("{base_url}: {e}")))?;
        Url::parse(location).map_err(|e| QueueError::InvalidUrl(format!("{location}: {e}")))?;

        Ok(Self {
            base_url: base_url.to_string(),
            current: location.to_string(),
            back_stack: Vec::new(),
            forward_stack: Vec::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn location(&self) -> &str {
        &self.current
    }

    /// 记录新的地址并清空前进历史；与当前地址相同时不产生新记录
    pub fn push(&mut self, url: impl Into<String>) {
        let url = url.into();
        if url == self.current {
            return;
        }
        let previous = std::mem::replace(&mut self.current, url);
        self.back_stack.push(previous);
        self.forward_stack.clear();
    }

    pub fn back(&mut self) -> bool {
        match self.back_stack.pop() {
            Some(previous) => {
                let current = std::mem::replace(&mut self.current, previous);
                self.forward_stack.push(current);
                true
            }
            None => false,
        }
    }

    pub fn forward(&mut self) -> bool {
        match self.forward_stack.pop() {
            Some(next) => {
                let current = std::mem::replace(&mut self.current, next);
                self.back_stack.push(current);
                true
            }
            None => false,
        }
    }

    pub fn history_len(&self) -> usize {
        self.back_stack.len() + 1 + self.forward_stack.len()
    }

    pub fn cursor(&self) -> Option<String> {
        cursor_param(&self.current)
    }

    pub fn query_param(&self, key: &str) -> Option<String> {
        query_param(&self.current, key)
    }

    /// 是否只显示已开始/已完成的任务
    pub fn started_filter(&self) -> bool {
        self.query_param("started").as_deref() == Some("true")
    }

    pub fn single_task_id(&self) -> Option<i64> {
        single_task_id(&self.base_url, &self.current)
    }

    pub fn single_task_url(&self, task_id: i64) -> String {
        format!("{}{}/", self.base_url, task_id)
    }
}

pub fn query_param(url: &str, key: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// 设置或删除一个查询参数，其他参数保持原有顺序
pub fn with_query_param(url: &str, key: &str, value: Option<&str>) -> QueueResult<String> {
    let mut parsed = Url::parse(url).map_err(|e| QueueError::InvalidUrl(format!("{url}: {e}")))?;
    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if let Some(value) = value {
        pairs.push((key.to_string(), value.to_string()));
    }

    if pairs.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(pairs);
    }
    Ok(parsed.to_string())
}

/// 地址路径在根路径之后恰好是一个数字段时，返回该任务 id
pub fn single_task_id(base_url: &str, url: &str) -> Option<i64> {
    let base = Url::parse(base_url).ok()?;
    let target = Url::parse(url).ok()?;
    if base.origin() != target.origin() {
        return None;
    }

    let rest = target.path().strip_prefix(base.path())?;
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [id] => id.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.com/queue/";

    #[test]
    fn test_push_back_forward() {
        let mut nav = Navigator::new(BASE).unwrap();
        nav.push("https://example.com/queue/?started=true");
        nav.push("https://example.com/queue/5/");
        assert_eq!(nav.history_len(), 3);

        assert!(nav.back());
        assert!(nav.started_filter());
        assert!(nav.back());
        assert_eq!(nav.location(), BASE);
        assert!(!nav.back());

        assert!(nav.forward());
        nav.push("https://example.com/queue/?cursor=abc");
        assert!(!nav.forward());
        assert_eq!(nav.cursor().as_deref(), Some("abc"));
    }

    #[test]
    fn test_push_same_location_is_ignored() {
        let mut nav = Navigator::new(BASE).unwrap();
        nav.push(BASE);
        assert_eq!(nav.history_len(), 1);
    }

    #[test]
    fn test_single_task_id() {
        assert_eq!(single_task_id(BASE, "https://example.com/queue/42/"), Some(42));
        assert_eq!(single_task_id(BASE, "https://example.com/queue/42/?format=json"), Some(42));
        assert_eq!(single_task_id(BASE, BASE), None);
        assert_eq!(single_task_id(BASE, "https://example.com/queue/42/extra/"), None);
        assert_eq!(single_task_id(BASE, "https://example.com/queue/abc/"), None);
    }

    #[test]
    fn test_with_query_param() {
        let url = with_query_param("https://example.com/queue/?format=json&cursor=a", "cursor", Some("b"))
            .unwrap();
        assert_eq!(url, "https://example.com/queue/?format=json&cursor=b");

        let url = with_query_param(&url, "format", None).unwrap();
        let url = with_query_param(&url, "cursor", None).unwrap();
        assert_eq!(url, BASE);
    }
}
