use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use fpqueue_core::{QueueError, QueueResult};

/// 表单草稿的键值存储
///
/// 键存在表示用户编辑过该字段，不存在表示使用计算出的默认值。
pub trait DraftStore: Send + Sync {
    fn get(&self, key: &str) -> QueueResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> QueueResult<()>;

    fn remove(&self, key: &str) -> QueueResult<()>;

    fn entries(&self) -> QueueResult<BTreeMap<String, String>>;

    fn clear_keys(&self, keys: &[&str]) -> QueueResult<()> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// 内存存储，进程退出即丢失
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStore for MemoryDraftStore {
    fn get(&self, key: &str) -> QueueResult<Option<String>> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> QueueResult<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> QueueResult<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }

    fn entries(&self) -> QueueResult<BTreeMap<String, String>> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.clone())
    }
}

/// 以 JSON 对象持久化到单个文件
///
/// 文件不存在视为空草稿；每次写入都整体重写文件。
#[derive(Debug)]
pub struct FileDraftStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileDraftStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> QueueResult<BTreeMap<String, String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(QueueError::Storage(format!(
                    "读取草稿文件失败 {}: {e}",
                    self.path.display()
                )))
            }
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            QueueError::Storage(format!("草稿文件格式错误 {}: {e}", self.path.display()))
        })
    }

    fn write(&self, values: &BTreeMap<String, String>) -> QueueResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                QueueError::Storage(format!("创建目录失败 {}: {e}", parent.display()))
            })?;
        }
        let content = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, content).map_err(|e| {
            QueueError::Storage(format!("写入草稿文件失败 {}: {e}", self.path.display()))
        })?;
        debug!("Draft saved to {}", self.path.display());
        Ok(())
    }

    fn update<F>(&self, f: F) -> QueueResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.read()?;
        if f(&mut values) {
            self.write(&values)?;
        }
        Ok(())
    }
}

impl DraftStore for FileDraftStore {
    fn get(&self, key: &str) -> QueueResult<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> QueueResult<()> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        })
    }

    fn remove(&self, key: &str) -> QueueResult<()> {
        self.update(|values| values.remove(key).is_some())
    }

    fn entries(&self) -> QueueResult<BTreeMap<String, String>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read()
    }

    fn clear_keys(&self, keys: &[&str]) -> QueueResult<()> {
        self.update(|values| {
            let before = values.len();
            values.retain(|key, _| !keys.contains(&key.as_str()));
            values.len() != before
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_clear_keys() {
        let store = MemoryDraftStore::new();
        store.set("comment", "hi").unwrap();
        store.set("use_reduced", "true").unwrap();
        store.clear_keys(&["comment", "radeclist"]).unwrap();

        assert_eq!(store.get("comment").unwrap(), None);
        assert_eq!(store.get("use_reduced").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("draft.json");

        let store = FileDraftStore::new(&path);
        assert!(store.entries().unwrap().is_empty());
        store.set("radeclist", "110 11").unwrap();

        let reopened = FileDraftStore::new(&path);
        assert_eq!(reopened.get("radeclist").unwrap().as_deref(), Some("110 11"));

        reopened.remove("radeclist").unwrap();
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("draft.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileDraftStore::new(&path);
        assert!(matches!(store.get("comment"), Err(QueueError::Storage(_))));
    }
}
