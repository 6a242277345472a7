use super::KeyValueStore;
use crate::error::{Result, ZoneError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// 文件夹存储：每个键一个 JSON 文件
pub struct FolderStore {
    base_path: PathBuf,
}

impl FolderStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)
            .map_err(|e| ZoneError::StorageWrite(format!("创建目录失败: {}", e)))?;
        Ok(Self { base_path })
    }

    /// 键名中的非文件名字符替换为下划线
    fn file_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", name))
    }
}

impl KeyValueStore for FolderStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.file_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ZoneError::StorageRead(format!("读取 {} 失败: {}", key, e))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        // 先写临时文件再改名，避免写到一半留下损坏的数据
        let path = self.file_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|e| ZoneError::StorageWrite(format!("保存 {} 失败: {}", key, e)))
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.file_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ZoneError::StorageWrite(format!("删除 {} 失败: {}", key, e))),
        }
    }

    fn backend(&self) -> &str {
        "folder"
    }
}
