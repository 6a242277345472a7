//! 测试用的地图、存储和地址解析替身

use crate::coords::{Bounds, LatLng};
use crate::error::{Result, ZoneError};
use crate::geocoder::Geocoder;
use crate::map::{MapSurface, OverlayStyle, PopupContent};
use crate::storage::{KeyValueStore, MemoryStore};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn triangle() -> Vec<LatLng> {
    vec![
        LatLng::new(31.20, 121.40),
        LatLng::new(31.20, 121.50),
        LatLng::new(31.30, 121.45),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct FakeOverlay {
    pub path: Vec<LatLng>,
    pub style: OverlayStyle,
    pub editable: bool,
}

/// 记录所有调用的地图替身
#[derive(Debug, Default)]
pub struct RecordingMap {
    next_id: u64,
    pub overlays: BTreeMap<u64, FakeOverlay>,
    pub popup: Option<(LatLng, PopupContent)>,
    pub drawing: bool,
    pub fitted: Option<Bounds>,
}

impl RecordingMap {
    /// 模拟用户拖拽某个顶点
    pub fn drag_vertex(&mut self, overlay: u64, index: usize, to: LatLng) {
        if let Some(o) = self.overlays.get_mut(&overlay) {
            o.path[index] = to;
        }
    }

    pub fn editable_overlays(&self) -> Vec<u64> {
        self.overlays
            .iter()
            .filter(|(_, o)| o.editable)
            .map(|(id, _)| *id)
            .collect()
    }
}

impl MapSurface for RecordingMap {
    type Point = LatLng;
    type Overlay = u64;

    fn add_polygon(&mut self, path: &[LatLng], style: &OverlayStyle) -> u64 {
        self.next_id += 1;
        self.overlays.insert(
            self.next_id,
            FakeOverlay {
                path: path.to_vec(),
                style: style.clone(),
                editable: false,
            },
        );
        self.next_id
    }

    fn remove_polygon(&mut self, overlay: &u64) {
        self.overlays.remove(overlay);
    }

    fn set_style(&mut self, overlay: &u64, style: &OverlayStyle) {
        if let Some(o) = self.overlays.get_mut(overlay) {
            o.style = style.clone();
        }
    }

    fn set_editable(&mut self, overlay: &u64, editable: bool) {
        if let Some(o) = self.overlays.get_mut(overlay) {
            o.editable = editable;
        }
    }

    fn polygon_path(&self, overlay: &u64) -> Vec<LatLng> {
        self.overlays
            .get(overlay)
            .map(|o| o.path.clone())
            .unwrap_or_default()
    }

    fn open_popup(&mut self, anchor: LatLng, content: PopupContent) {
        self.popup = Some((anchor, content));
    }

    fn close_popup(&mut self) {
        self.popup = None;
    }

    fn set_drawing_mode(&mut self, enabled: bool) {
        self.drawing = enabled;
    }

    fn fit_bounds(&mut self, bounds: &Bounds) {
        self.fitted = Some(*bounds);
    }
}

/// 所有写入都失败的存储
#[derive(Default)]
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(ZoneError::StorageRead("不可用".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(ZoneError::StorageWrite("磁盘已满".into()))
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Err(ZoneError::StorageWrite("磁盘已满".into()))
    }

    fn backend(&self) -> &str {
        "failing"
    }
}

/// 统计写入次数的内存存储
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    pub writes: AtomicUsize,
}

impl CountingStore {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for CountingStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key)
    }

    fn backend(&self) -> &str {
        "counting"
    }
}

/// 按地址返回预设结果的解析器
#[derive(Default)]
pub struct ScriptedGeocoder {
    results: Mutex<HashMap<String, LatLng>>,
}

impl ScriptedGeocoder {
    pub fn with(address: &str, point: LatLng) -> Self {
        let geocoder = Self::default();
        geocoder.results.lock().insert(address.to_string(), point);
        geocoder
    }
}

impl Geocoder for ScriptedGeocoder {
    fn resolve(&self, address: &str) -> impl Future<Output = Result<LatLng>> + Send {
        let result = self
            .results
            .lock()
            .get(address)
            .copied()
            .ok_or_else(|| ZoneError::GeocodingFailure(format!("未找到地址: {}", address)));
        async move { result }
    }
}
