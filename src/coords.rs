//! 坐标编解码
//! 地图控件的实时点位 <-> 存储用的 {lat, lng} 坐标对，以及手动输入文本的解析

use crate::error::{Result, ZoneError};
use crate::map::MapPoint;
use serde::{Deserialize, Serialize};

/// 经纬度坐标对（十进制度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
}

impl LatLng {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

impl MapPoint for LatLng {
    fn from_lat_lng(lat: f64, lng: f64) -> Self {
        LatLng::new(lat, lng)
    }

    fn lat(&self) -> f64 {
        self.latitude
    }

    fn lng(&self) -> f64 {
        self.longitude
    }
}

/// 边界框
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    /// 边界框中心（不是多边形质心）
    pub fn center(&self) -> LatLng {
        LatLng::new((self.north + self.south) / 2.0, (self.east + self.west) / 2.0)
    }

    pub fn extend(&mut self, point: LatLng) {
        self.north = self.north.max(point.latitude);
        self.south = self.south.min(point.latitude);
        self.east = self.east.max(point.longitude);
        self.west = self.west.min(point.longitude);
    }

    pub fn union(mut self, other: &Bounds) -> Bounds {
        self.north = self.north.max(other.north);
        self.south = self.south.min(other.south);
        self.east = self.east.max(other.east);
        self.west = self.west.min(other.west);
        self
    }
}

/// 计算一组坐标的边界框，空集合返回 None
pub fn bounds_of(coords: &[LatLng]) -> Option<Bounds> {
    let (first, rest) = coords.split_first()?;
    let mut bounds = Bounds {
        north: first.latitude,
        south: first.latitude,
        east: first.longitude,
        west: first.longitude,
    };
    for point in rest {
        bounds.extend(*point);
    }
    Some(bounds)
}

/// 实时点位转存储坐标
pub fn to_record<P: MapPoint>(points: &[P]) -> Vec<LatLng> {
    points.iter().map(|p| LatLng::new(p.lat(), p.lng())).collect()
}

/// 存储坐标转实时点位，任一坐标非有限数即整体失败
pub fn to_live_points<P: MapPoint>(coords: &[LatLng]) -> Result<Vec<P>> {
    coords
        .iter()
        .enumerate()
        .map(|(idx, c)| {
            if c.is_finite() {
                Ok(P::from_lat_lng(c.latitude, c.longitude))
            } else {
                Err(ZoneError::MalformedCoordinate {
                    line: idx + 1,
                    content: format!("{},{}", c.latitude, c.longitude),
                })
            }
        })
        .collect()
}

/// 解析手动输入的坐标文本
///
/// 每行一个顶点 `纬度,经度`，忽略空行和数值两侧空白。
/// 遇到第一行错误即整体失败，不会丢弃坏行后生成残缺区域。
pub fn parse_manual_text(text: &str) -> Result<Vec<LatLng>> {
    let mut coords = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let malformed = || ZoneError::MalformedCoordinate {
            line: idx + 1,
            content: line.to_string(),
        };

        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() != 2 {
            return Err(malformed());
        }

        let lat: f64 = parts[0].trim().parse().map_err(|_| malformed())?;
        let lng: f64 = parts[1].trim().parse().map_err(|_| malformed())?;
        if !lat.is_finite() || !lng.is_finite() {
            return Err(malformed());
        }

        coords.push(LatLng::new(lat, lng));
    }

    Ok(coords)
}

/// 以地址解析结果为中心生成正方形，边长 2 * offset 度
pub fn square_around(center: LatLng, offset: f64) -> Vec<LatLng> {
    vec![
        LatLng::new(center.latitude + offset, center.longitude - offset),
        LatLng::new(center.latitude + offset, center.longitude + offset),
        LatLng::new(center.latitude - offset, center.longitude + offset),
        LatLng::new(center.latitude - offset, center.longitude - offset),
    ]
}
