//! 区域数据模型

use crate::coords::LatLng;
use crate::error::{Result, ZoneError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 构成一个完整区域的最少顶点数
pub const MIN_VERTICES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    pub fn generate() -> Self {
        ZoneId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneId {
    fn from(s: &str) -> Self {
        ZoneId(s.to_string())
    }
}

impl From<String> for ZoneId {
    fn from(s: String) -> Self {
        ZoneId(s)
    }
}

/// `#RRGGBB` 格式的颜色
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

impl Color {
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        let valid = value.len() == 7
            && value.starts_with('#')
            && value[1..].chars().all(|c| c.is_ascii_hexdigit());
        if valid {
            Ok(Color(value.to_string()))
        } else {
            Err(ZoneError::InvalidColor(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Color("#3388FF".to_string())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Color {
    type Error = ZoneError;

    fn try_from(value: String) -> Result<Self> {
        Color::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.0
    }
}

/// 运行时区域，纯数据；地图覆盖物句柄由 OverlayBinding 单独维护
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub description: String,
    pub color: Color,
    pub vertices: Vec<LatLng>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Zone {
    /// 创建新区域，顶点数不足 3 个时失败
    pub fn new(name: String, description: String, color: Color, vertices: Vec<LatLng>) -> Result<Self> {
        check_vertices(&vertices)?;
        let now = Utc::now();
        Ok(Self {
            id: ZoneId::generate(),
            name,
            description,
            color,
            vertices,
            created_at: now,
            updated_at: now,
        })
    }

    /// 刷新更新时间，保证 updated_at >= created_at
    pub fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.created_at);
    }

    pub fn to_record(&self) -> ZoneRecord {
        ZoneRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            color: self.color.as_str().to_string(),
            coordinates: self.vertices.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl TryFrom<ZoneRecord> for Zone {
    type Error = ZoneError;

    fn try_from(record: ZoneRecord) -> Result<Self> {
        check_vertices(&record.coordinates)?;
        let color = Color::parse(&record.color)?;
        Ok(Zone {
            id: record.id,
            name: record.name,
            description: record.description,
            color,
            vertices: record.coordinates,
            created_at: record.created_at,
            updated_at: record.updated_at.max(record.created_at),
        })
    }
}

/// 持久化的区域记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRecord {
    pub id: ZoneId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub color: String,
    pub coordinates: Vec<LatLng>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 区域修改：属性和几何分两条路径，互不影响
#[derive(Debug, Clone, PartialEq)]
pub enum ZonePatch {
    Attributes {
        name: String,
        description: String,
        color: Color,
    },
    Geometry(Vec<LatLng>),
}

/// 顶点数至少 3 个且全部为有限数；非有限数写入 JSON 会变成 null，导致整个集合无法读取
pub fn check_vertices(vertices: &[LatLng]) -> Result<()> {
    if vertices.len() < MIN_VERTICES {
        return Err(ZoneError::InsufficientVertices {
            count: vertices.len(),
        });
    }
    if let Some((idx, c)) = vertices.iter().enumerate().find(|(_, c)| !c.is_finite()) {
        return Err(ZoneError::MalformedCoordinate {
            line: idx + 1,
            content: format!("{},{}", c.latitude, c.longitude),
        });
    }
    Ok(())
}
