//! 地图控件接口
//!
//! 多边形渲染、拖拽顶点、命中测试都由外部地图控件完成，这里只定义控制器需要的能力。

use crate::coords::Bounds;
use crate::zone::{Color, ZoneId};
use serde::{Deserialize, Serialize};

/// 地图控件的实时点位
pub trait MapPoint: Clone {
    fn from_lat_lng(lat: f64, lng: f64) -> Self;

    fn lat(&self) -> f64;

    fn lng(&self) -> f64;
}

/// 多边形覆盖物样式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayStyle {
    pub fill_color: Color,
    pub fill_opacity: f32,
    pub stroke_color: Color,
    pub stroke_opacity: f32,
    pub stroke_weight: u32,
}

/// 弹出框按钮对应的动作
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "zone_id", rename_all = "snake_case")]
pub enum PopupIntent {
    /// 切换顶点编辑
    Edit(ZoneId),
    Delete(ZoneId),
}

impl PopupIntent {
    pub fn label(&self) -> &'static str {
        match self {
            PopupIntent::Edit(_) => "编辑",
            PopupIntent::Delete(_) => "删除",
        }
    }

    pub fn zone_id(&self) -> &ZoneId {
        match self {
            PopupIntent::Edit(id) | PopupIntent::Delete(id) => id,
        }
    }
}

/// 信息弹出框内容，由 UI 层负责渲染
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupContent {
    pub zone_id: ZoneId,
    pub name: String,
    pub description: String,
    pub color: Color,
    pub created_at: String,
    pub actions: Vec<PopupIntent>,
}

/// 地图控件能力
pub trait MapSurface {
    type Point: MapPoint;
    /// 覆盖物句柄，由控件分配
    type Overlay: Clone + PartialEq + std::fmt::Debug;

    /// 渲染多边形，默认不可编辑
    fn add_polygon(&mut self, path: &[Self::Point], style: &OverlayStyle) -> Self::Overlay;

    fn remove_polygon(&mut self, overlay: &Self::Overlay);

    fn set_style(&mut self, overlay: &Self::Overlay, style: &OverlayStyle);

    /// 切换顶点是否可拖拽
    fn set_editable(&mut self, overlay: &Self::Overlay, editable: bool);

    /// 覆盖物当前的顶点（包含用户拖拽后的位置）
    fn polygon_path(&self, overlay: &Self::Overlay) -> Vec<Self::Point>;

    fn open_popup(&mut self, anchor: Self::Point, content: PopupContent);

    fn close_popup(&mut self);

    /// 开关自由绘制模式，关闭时丢弃未完成的绘制
    fn set_drawing_mode(&mut self, enabled: bool);

    fn fit_bounds(&mut self, bounds: &Bounds);
}
