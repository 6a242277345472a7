use crate::error::{Result, ZoneError};
use crate::zone::Color;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub editor: EditorSettings,
    pub geocoder: GeocoderConfig,
    pub initial_view: MapView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// sqlite / folder / memory
    pub backend: String,
    pub path: String,
    /// 存储键名前缀，区域数据和首次使用标记各占一个键
    pub namespace: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            path: "zone_data.db".to_string(),
            namespace: "zone-editor".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn zones_key(&self) -> String {
        format!("{}:zones", self.namespace)
    }

    pub fn help_seen_key(&self) -> String {
        format!("{}:help-seen", self.namespace)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub default_color: Color,
    /// 地址生成矩形时相对中心点的偏移（度）
    pub rectangle_offset: f64,
    pub fill_opacity: f32,
    pub stroke_opacity: f32,
    pub stroke_weight: u32,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            default_color: Color::default(),
            rectangle_offset: 0.005,
            fill_opacity: 0.35,
            stroke_opacity: 0.8,
            stroke_weight: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// Nominatim 镜像列表（按优先级排序）
    pub endpoints: Vec<String>,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![
                "https://nominatim.openstreetmap.org/search".to_string(),
                "https://nominatim.geocoding.ai/search".to_string(),
            ],
            user_agent: "zone-editor/0.1".to_string(),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub name: String,
    pub center: (f64, f64),
    pub zoom: u8,
}

impl Default for MapView {
    fn default() -> Self {
        PRESET_VIEWS
            .get("shanghai")
            .cloned()
            .unwrap_or_else(|| MapView {
                name: "上海市".to_string(),
                center: (31.2304, 121.4737),
                zoom: 12,
            })
    }
}

/// 预设初始视图，center 为 (纬度, 经度)
pub static PRESET_VIEWS: Lazy<HashMap<String, MapView>> = Lazy::new(|| {
    let mut m = HashMap::new();

    m.insert("shanghai".to_string(), MapView {
        name: "上海市".to_string(),
        center: (31.2304, 121.4737),
        zoom: 12,
    });

    m.insert("beijing".to_string(), MapView {
        name: "北京市".to_string(),
        center: (39.9042, 116.4074),
        zoom: 12,
    });

    m.insert("nanjing".to_string(), MapView {
        name: "南京市".to_string(),
        center: (32.06, 118.80),
        zoom: 12,
    });

    m.insert("new_york".to_string(), MapView {
        name: "New York".to_string(),
        center: (40.7128, -74.0060),
        zoom: 12,
    });

    m.insert("london".to_string(), MapView {
        name: "London".to_string(),
        center: (51.5074, -0.1278),
        zoom: 12,
    });

    m
});

fn config_path() -> PathBuf {
    PathBuf::from("zone_editor_config.json")
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path())
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    save_config_to(&config_path(), config)
}

/// 读取配置文件，不存在时返回默认配置
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| ZoneError::Config(format!("解析 {} 失败: {}", path.display(), e)))
}

pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}

/// 按预设设置初始视图，调用方负责保存
pub fn set_initial_view_by_preset(config: &mut AppConfig, preset_id: &str) -> Result<MapView> {
    let view = PRESET_VIEWS
        .get(preset_id)
        .cloned()
        .ok_or_else(|| ZoneError::Config(format!("无效的预设视图: {}", preset_id)))?;
    config.initial_view = view.clone();
    Ok(view)
}
