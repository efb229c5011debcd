use serde::{Deserialize, Serialize};

use super::task::Task;

/// 一页任务
///
/// 每次成功获取后整体替换，从不原地修改。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPage {
    pub results: Vec<Task>,
    #[serde(default)]
    pub taskcount: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub pagefirsttaskposition: Option<u64>,
}

/// 列表接口的响应：分页集合，或单任务视图下的裸任务对象
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ListPayload {
    Page(TaskPage),
    Single(Box<Task>),
}

impl ListPayload {
    /// 单任务包装为只有一个元素、没有分页信息的页
    pub fn into_page(self) -> TaskPage {
        match self {
            ListPayload::Page(page) => page,
            ListPayload::Single(task) => TaskPage::single(*task),
        }
    }
}

impl TaskPage {
    pub fn single(task: Task) -> Self {
        Self {
            results: vec![task],
            taskcount: None,
            next: None,
            previous: None,
            pagefirsttaskposition: None,
        }
    }

    pub fn next_cursor(&self) -> Option<String> {
        self.next.as_deref().and_then(cursor_param)
    }

    pub fn previous_cursor(&self) -> Option<String> {
        self.previous.as_deref().and_then(cursor_param)
    }

    /// "Showing tasks A-B of T" 中的 (A, B, T)
    pub fn showing_range(&self) -> Option<(u64, u64, u64)> {
        let total = self.taskcount?;
        let first = self.pagefirsttaskposition.unwrap_or(0);
        Some((first + 1, first + self.results.len() as u64, total))
    }
}

/// 取出 URL 中的 `cursor` 查询参数
pub fn cursor_param(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "cursor")
        .map(|(_, value)| value.into_owned())
}
