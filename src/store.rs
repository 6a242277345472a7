//! 区域持久化
//!
//! 所有区域记录以 JSON 数组形式保存在同一个键下，每次保存整体覆盖。

use crate::error::{Result, ZoneError};
use crate::storage::KeyValueStore;
use crate::zone::{ZoneId, ZoneRecord};

pub struct ZoneStore<S: KeyValueStore> {
    backend: S,
    key: String,
}

impl<S: KeyValueStore> ZoneStore<S> {
    pub fn new(backend: S, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// 整体替换已保存的区域集合
    pub fn save(&self, records: &[ZoneRecord]) -> Result<()> {
        let json = serde_json::to_string(records)
            .map_err(|e| ZoneError::StorageWrite(format!("序列化区域失败: {}", e)))?;
        self.backend.set(&self.key, &json)
    }

    /// 读取全部区域；数据缺失或损坏时返回空集合，只记录日志
    pub fn load(&self) -> Vec<ZoneRecord> {
        let raw = match self.backend.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return vec![],
            Err(e) => {
                log::error!("{}", e);
                return vec![];
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::error!(
                "{}",
                ZoneError::StorageRead(format!("{} 数据损坏: {}", self.key, e))
            );
            vec![]
        })
    }

    /// 删除单个区域并返回剩余集合；ID 不存在时不写入，原样返回
    pub fn delete_one(&self, id: &ZoneId) -> Result<Vec<ZoneRecord>> {
        let mut records = self.load();
        let before = records.len();
        records.retain(|r| &r.id != id);
        if records.len() != before {
            self.save(&records)?;
        }
        Ok(records)
    }
}
