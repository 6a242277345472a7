//! 区域导出

use crate::error::Result;
use crate::zone::Zone;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Json,
    GeoJson,
    Csv,
}

impl From<&str> for ExportFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "geojson" => ExportFormat::GeoJson,
            "csv" | "excel" => ExportFormat::Csv,
            _ => ExportFormat::Json,
        }
    }
}

/// 转为 GeoJSON FeatureCollection，多边形环首尾闭合，坐标顺序 [经度, 纬度]
pub fn zones_to_geojson(zones: &[Zone]) -> Value {
    let features: Vec<Value> = zones
        .iter()
        .map(|zone| {
            let mut ring: Vec<[f64; 2]> = zone
                .vertices
                .iter()
                .map(|v| [v.longitude, v.latitude])
                .collect();
            if let Some(first) = ring.first().copied() {
                ring.push(first);
            }
            json!({
                "type": "Feature",
                "id": zone.id.as_str(),
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [ring],
                },
                "properties": {
                    "name": zone.name,
                    "description": zone.description,
                    "color": zone.color.as_str(),
                    "createdAt": zone.created_at.to_rfc3339(),
                    "updatedAt": zone.updated_at.to_rfc3339(),
                },
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

pub fn zones_to_csv(zones: &[Zone]) -> String {
    let mut csv = String::from("ID,名称,描述,颜色,顶点数,坐标,创建时间,更新时间\n");
    for zone in zones {
        let coords = zone
            .vertices
            .iter()
            .map(|v| format!("{} {}", v.latitude, v.longitude))
            .collect::<Vec<_>>()
            .join(";");
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            zone.id,
            csv_field(&zone.name),
            csv_field(&zone.description),
            zone.color,
            zone.vertices.len(),
            csv_field(&coords),
            zone.created_at.to_rfc3339(),
            zone.updated_at.to_rfc3339(),
        ));
    }
    csv
}

/// 导出到文件，返回导出的区域数量
pub fn export_zones_to_file(zones: &[Zone], path: &Path, format: ExportFormat) -> Result<usize> {
    let bytes = match format {
        ExportFormat::Json => {
            // 添加 UTF-8 BOM
            let records: Vec<_> = zones.iter().map(Zone::to_record).collect();
            let mut bytes = UTF8_BOM.to_vec();
            bytes.extend_from_slice(serde_json::to_string_pretty(&records)?.as_bytes());
            bytes
        }
        ExportFormat::GeoJson => serde_json::to_vec_pretty(&zones_to_geojson(zones))?,
        ExportFormat::Csv => {
            // 添加 UTF-8 BOM 以便 Excel 正确识别中文
            let mut bytes = UTF8_BOM.to_vec();
            bytes.extend_from_slice(zones_to_csv(zones).as_bytes());
            bytes
        }
    };

    std::fs::write(path, bytes)?;
    log::info!("已导出 {} 个区域到 {}", zones.len(), path.display());
    Ok(zones.len())
}
