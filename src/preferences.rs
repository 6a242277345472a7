//! 用户偏好：首次使用帮助是否已看过
//!
//! 以 trait 注入控制器，测试中可以替换为会话内实现。

use crate::storage::KeyValueStore;

pub trait Preferences {
    fn help_seen(&self) -> bool;

    /// 标记后永久生效
    fn mark_help_seen(&mut self);
}

/// 保存在键值存储中的偏好，与区域数据使用不同的键
pub struct StoredPreferences<S: KeyValueStore> {
    backend: S,
    key: String,
}

impl<S: KeyValueStore> StoredPreferences<S> {
    pub fn new(backend: S, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }
}

impl<S: KeyValueStore> Preferences for StoredPreferences<S> {
    fn help_seen(&self) -> bool {
        match self.backend.get(&self.key) {
            Ok(value) => value.is_some_and(|v| v.trim() == "true"),
            Err(e) => {
                log::warn!("读取偏好失败: {}", e);
                false
            }
        }
    }

    fn mark_help_seen(&mut self) {
        if let Err(e) = self.backend.set(&self.key, "true") {
            log::warn!("保存偏好失败: {}", e);
        }
    }
}

/// 仅在当前会话内有效的偏好
#[derive(Debug, Default, Clone)]
pub struct SessionPreferences {
    help_seen: bool,
}

impl SessionPreferences {
    pub fn new(help_seen: bool) -> Self {
        Self { help_seen }
    }
}

impl Preferences for SessionPreferences {
    fn help_seen(&self) -> bool {
        self.help_seen
    }

    fn mark_help_seen(&mut self) {
        self.help_seen = true;
    }
}
