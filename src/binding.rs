//! 覆盖物绑定
//!
//! 维护 区域 ID -> 地图覆盖物 的映射，把悬停、点击事件翻译成对区域列表的操作。
//! 同一时刻最多只有一个区域处于顶点编辑状态。

use crate::config::EditorSettings;
use crate::coords::{bounds_of, to_live_points, to_record, LatLng};
use crate::error::{Result, ZoneError};
use crate::map::{MapPoint, MapSurface, OverlayStyle, PopupContent, PopupIntent};
use crate::registry::ZoneRegistry;
use crate::storage::KeyValueStore;
use crate::zone::{Color, Zone, ZoneId};
use std::collections::HashMap;

pub struct OverlayBinding<M: MapSurface> {
    map: M,
    overlays: HashMap<ZoneId, M::Overlay>,
    editing: Option<ZoneId>,
    popup: Option<ZoneId>,
    settings: EditorSettings,
}

impl<M: MapSurface> OverlayBinding<M> {
    pub fn new(map: M, settings: EditorSettings) -> Self {
        Self {
            map,
            overlays: HashMap::new(),
            editing: None,
            popup: None,
            settings,
        }
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn overlay(&self, id: &ZoneId) -> Option<&M::Overlay> {
        self.overlays.get(id)
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    /// 覆盖物句柄反查区域
    pub fn zone_for_overlay(&self, overlay: &M::Overlay) -> Option<&ZoneId> {
        self.overlays
            .iter()
            .find(|(_, o)| *o == overlay)
            .map(|(id, _)| id)
    }

    /// 当前处于顶点编辑的区域
    pub fn editing(&self) -> Option<&ZoneId> {
        self.editing.as_ref()
    }

    pub fn popup_zone(&self) -> Option<&ZoneId> {
        self.popup.as_ref()
    }

    pub fn style_for(&self, color: &Color) -> OverlayStyle {
        OverlayStyle {
            fill_color: color.clone(),
            fill_opacity: self.settings.fill_opacity,
            stroke_color: color.clone(),
            stroke_opacity: self.settings.stroke_opacity,
            stroke_weight: self.settings.stroke_weight,
        }
    }

    /// 为区域渲染覆盖物；已绑定的先移除再重绘
    pub fn bind(&mut self, zone: &Zone) -> Result<()> {
        let path: Vec<M::Point> = to_live_points(&zone.vertices)?;
        if let Some(old) = self.overlays.remove(&zone.id) {
            self.map.remove_polygon(&old);
        }
        let style = self.style_for(&zone.color);
        let overlay = self.map.add_polygon(&path, &style);
        self.overlays.insert(zone.id.clone(), overlay);
        if self.editing.as_ref() == Some(&zone.id) {
            self.editing = None;
        }
        Ok(())
    }

    /// 颜色变化后更新样式
    pub fn restyle(&mut self, zone: &Zone) {
        let style = self.style_for(&zone.color);
        if let Some(overlay) = self.overlays.get(&zone.id) {
            self.map.set_style(overlay, &style);
        }
    }

    /// 移除覆盖物，返回是否存在
    pub fn detach(&mut self, id: &ZoneId) -> bool {
        let Some(overlay) = self.overlays.remove(id) else {
            return false;
        };
        self.map.remove_polygon(&overlay);
        if self.editing.as_ref() == Some(id) {
            self.editing = None;
        }
        if self.popup.as_ref() == Some(id) {
            self.close_popup();
        }
        true
    }

    /// 开启顶点编辑，返回之前处于编辑状态的区域（已被关闭，但几何尚未保存）
    pub fn enable_editing(&mut self, id: &ZoneId) -> Result<Option<(ZoneId, Vec<LatLng>)>> {
        if !self.overlays.contains_key(id) {
            return Err(ZoneError::UnknownZone(id.clone()));
        }
        if self.editing.as_ref() == Some(id) {
            return Ok(None);
        }

        let previous = self.disable_editing();
        if let Some(overlay) = self.overlays.get(id) {
            self.map.set_editable(overlay, true);
        }
        self.editing = Some(id.clone());
        self.close_popup();
        Ok(previous)
    }

    /// 关闭顶点编辑，返回区域及冻结后的顶点
    pub fn disable_editing(&mut self) -> Option<(ZoneId, Vec<LatLng>)> {
        let id = self.editing.take()?;
        let overlay = self.overlays.get(&id)?;
        self.map.set_editable(overlay, false);
        let path = to_record(&self.map.polygon_path(overlay));
        Some((id, path))
    }

    /// 鼠标移入：打开信息框，内容在事件发生时从区域列表读取
    pub fn hover_enter<S: KeyValueStore>(&mut self, id: &ZoneId, registry: &ZoneRegistry<S>) -> bool {
        if self.editing.is_some() {
            return false;
        }
        let (Some(zone), Some(overlay)) = (registry.get(id), self.overlays.get(id)) else {
            return false;
        };
        let path = to_record(&self.map.polygon_path(overlay));
        let Some(bounds) = bounds_of(&path) else {
            return false;
        };

        let center = bounds.center();
        let content = popup_content(zone);
        self.map
            .open_popup(M::Point::from_lat_lng(center.latitude, center.longitude), content);
        self.popup = Some(id.clone());
        true
    }

    /// 鼠标移出：编辑状态下完全忽略
    pub fn hover_exit(&mut self) -> bool {
        if self.editing.is_some() {
            return false;
        }
        self.close_popup();
        true
    }

    /// 点击：非编辑状态下返回 true，表示应打开属性对话框
    pub fn click(&self, id: &ZoneId) -> bool {
        self.editing.is_none() && self.overlays.contains_key(id)
    }

    pub fn close_popup(&mut self) {
        if self.popup.take().is_some() {
            self.map.close_popup();
        }
    }

    pub fn clear(&mut self) {
        self.editing = None;
        self.close_popup();
        for (_, overlay) in self.overlays.drain() {
            self.map.remove_polygon(&overlay);
        }
    }
}

fn popup_content(zone: &Zone) -> PopupContent {
    PopupContent {
        zone_id: zone.id.clone(),
        name: zone.name.clone(),
        description: zone.description.clone(),
        color: zone.color.clone(),
        created_at: zone
            .created_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        actions: vec![
            PopupIntent::Edit(zone.id.clone()),
            PopupIntent::Delete(zone.id.clone()),
        ],
    }
}
