//! 错误类型
//!
//! 所有错误都可以在触发它的用户操作处恢复，没有致命错误。

use crate::zone::ZoneId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ZoneError>;

#[derive(Debug, Error)]
pub enum ZoneError {
    /// 手动输入或存储中的坐标无法解析，`line` 从 1 开始
    #[error("第 {line} 行坐标格式无效: \"{content}\"")]
    MalformedCoordinate { line: usize, content: String },

    #[error("区域至少需要 3 个顶点，当前只有 {count} 个")]
    InsufficientVertices { count: usize },

    #[error("地址解析失败: {0}")]
    GeocodingFailure(String),

    #[error("读取存储失败: {0}")]
    StorageRead(String),

    #[error("写入存储失败: {0}")]
    StorageWrite(String),

    #[error("请输入坐标或地址")]
    MissingInput,

    #[error("地址解析进行中，请稍候")]
    GeocodeInFlight,

    #[error("无效的颜色值: {0}")]
    InvalidColor(String),

    #[error("区域名称不能为空")]
    EmptyName,

    #[error("未找到区域: {0}")]
    UnknownZone(ZoneId),

    #[error("区域 ID 重复: {0}")]
    DuplicateZone(ZoneId),

    #[error("当前状态 {state} 不允许操作: {action}")]
    InvalidTransition { state: String, action: &'static str },

    #[error("配置错误: {0}")]
    Config(String),

    #[error("文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 处理失败: {0}")]
    Json(#[from] serde_json::Error),
}

impl ZoneError {
    /// 输入类错误：对话框保持打开，提示用户修改
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            ZoneError::MalformedCoordinate { .. }
                | ZoneError::InsufficientVertices { .. }
                | ZoneError::GeocodingFailure(_)
                | ZoneError::MissingInput
                | ZoneError::GeocodeInFlight
                | ZoneError::InvalidColor(_)
                | ZoneError::EmptyName
        )
    }
}
