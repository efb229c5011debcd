use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// 会话范围内共享的状态：刚创建的任务 id
///
/// 提交成功或请求图像后写入，任务项首次挂载时取出并播放入场效果。
#[derive(Debug, Default)]
pub struct SessionContext {
    new_task_ids: Mutex<HashSet<i64>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_new_tasks(&self, ids: impl IntoIterator<Item = i64>) {
        self.new_task_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(ids);
    }

    pub fn is_new(&self, task_id: i64) -> bool {
        self.new_task_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&task_id)
    }

    /// 返回该任务是否需要入场效果，并将其移出集合
    pub fn take_entrance(&self, task_id: i64) -> bool {
        self.new_task_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&task_id)
    }

    pub fn pending(&self) -> usize {
        self.new_task_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entrance_is_taken_once() {
        let session = SessionContext::new();
        session.add_new_tasks([3, 4]);
        assert!(session.is_new(3));
        assert!(session.take_entrance(3));
        assert!(!session.take_entrance(3));
        assert_eq!(session.pending(), 1);
    }
}
