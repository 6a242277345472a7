mod folder;
mod memory;
mod sqlite;

pub use folder::FolderStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::config::StorageConfig;
use crate::error::Result;
use std::sync::Arc;

/// 键值存储 trait，值为 JSON 文本
pub trait KeyValueStore: Send + Sync {
    /// 读取键值，不存在时返回 None
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// 写入键值（整体覆盖）
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// 删除键
    fn remove(&self, key: &str) -> Result<()>;

    /// 获取存储类型
    fn backend(&self) -> &str;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn backend(&self) -> &str {
        (**self).backend()
    }
}

/// 按配置创建存储实例
pub fn create_store(config: &StorageConfig) -> Result<Arc<dyn KeyValueStore>> {
    let store: Arc<dyn KeyValueStore> = match config.backend.to_lowercase().as_str() {
        "memory" => Arc::new(MemoryStore::new()),
        "folder" => Arc::new(FolderStore::open(&config.path)?),
        _ => Arc::new(SqliteStore::open(&config.path)?),
    };
    log::info!("使用存储: {} ({})", store.backend(), config.path);
    Ok(store)
}
