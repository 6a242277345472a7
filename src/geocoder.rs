//! 地址解析
//!
//! 使用 Nominatim 搜索接口，无需 API Key

use crate::config::GeocoderConfig;
use crate::coords::LatLng;
use crate::error::{Result, ZoneError};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

pub trait Geocoder {
    /// 地址 -> 坐标
    fn resolve(&self, address: &str) -> impl Future<Output = Result<LatLng>> + Send;
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

pub struct NominatimGeocoder {
    client: Client,
    endpoints: Vec<String>,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ZoneError::Config(format!("创建 HTTP 客户端失败: {}", e)))?;
        Ok(Self {
            client,
            endpoints: config.endpoints.clone(),
        })
    }

    async fn query(&self, endpoint: &str, address: &str) -> Result<Option<LatLng>> {
        let url = Url::parse_with_params(
            endpoint,
            &[("q", address), ("format", "json"), ("limit", "1")],
        )
        .map_err(|e| ZoneError::Config(format!("无效的地址解析服务 {}: {}", endpoint, e)))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ZoneError::GeocodingFailure(format!("请求 {} 失败: {}", endpoint, e)))?;

        if !response.status().is_success() {
            return Err(ZoneError::GeocodingFailure(format!(
                "{} 返回错误: {}",
                endpoint,
                response.status()
            )));
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .map_err(|e| ZoneError::GeocodingFailure(format!("解析响应失败: {}", e)))?;

        places.first().map(parse_place).transpose()
    }
}

fn parse_place(place: &NominatimPlace) -> Result<LatLng> {
    let lat: f64 = place.lat.trim().parse().map_err(|_| {
        ZoneError::GeocodingFailure(format!("无效的纬度: {}", place.lat))
    })?;
    let lng: f64 = place.lon.trim().parse().map_err(|_| {
        ZoneError::GeocodingFailure(format!("无效的经度: {}", place.lon))
    })?;
    let point = LatLng::new(lat, lng);
    if !point.is_finite() {
        return Err(ZoneError::GeocodingFailure(format!(
            "无效的坐标: {},{}",
            place.lat, place.lon
        )));
    }
    log::info!("地址解析结果: {} -> {},{}", place.display_name, lat, lng);
    Ok(point)
}

impl Geocoder for NominatimGeocoder {
    fn resolve(&self, address: &str) -> impl Future<Output = Result<LatLng>> + Send {
        let address = address.trim().to_string();
        async move {
            if address.is_empty() {
                return Err(ZoneError::MissingInput);
            }

            let mut last_error = String::new();
            for (idx, endpoint) in self.endpoints.iter().enumerate() {
                log::info!("[Geocoder] 尝试服务器 {}: {}", idx + 1, endpoint);
                match self.query(endpoint, &address).await {
                    Ok(Some(point)) => return Ok(point),
                    Ok(None) => {
                        // 服务正常但没有结果，换镜像也不会有
                        return Err(ZoneError::GeocodingFailure(format!(
                            "未找到地址: {}",
                            address
                        )));
                    }
                    Err(e) => {
                        last_error = e.to_string();
                        log::warn!("[Geocoder] {}", last_error);
                    }
                }
            }

            Err(ZoneError::GeocodingFailure(format!(
                "所有地址解析服务均不可用: {}",
                last_error
            )))
        }
    }
}
