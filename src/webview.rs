//! 通过 Tauri 事件驱动前端地图控件

use crate::coords::{Bounds, LatLng};
use crate::map::{MapSurface, OverlayStyle, PopupContent};
use serde::Serialize;
use std::collections::HashMap;
use tauri::{AppHandle, Emitter};

pub const MAP_EVENT: &str = "zone-map";

/// 发送给前端的地图指令
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapCommand {
    AddPolygon {
        overlay: u64,
        path: Vec<LatLng>,
        style: OverlayStyle,
    },
    RemovePolygon {
        overlay: u64,
    },
    SetStyle {
        overlay: u64,
        style: OverlayStyle,
    },
    SetEditable {
        overlay: u64,
        editable: bool,
    },
    OpenPopup {
        anchor: LatLng,
        content: PopupContent,
    },
    ClosePopup,
    SetDrawingMode {
        enabled: bool,
    },
    FitBounds {
        bounds: Bounds,
    },
}

pub struct WebviewMap {
    app: AppHandle,
    next_overlay: u64,
    // 前端拖拽顶点后通过 overlay_path_changed 回传
    paths: HashMap<u64, Vec<LatLng>>,
}

impl WebviewMap {
    pub fn new(app: AppHandle) -> Self {
        Self {
            app,
            next_overlay: 0,
            paths: HashMap::new(),
        }
    }

    pub fn update_path(&mut self, overlay: u64, path: Vec<LatLng>) -> bool {
        match self.paths.get_mut(&overlay) {
            Some(current) => {
                *current = path;
                true
            }
            None => false,
        }
    }

    fn emit(&self, command: MapCommand) {
        if let Err(e) = self.app.emit(MAP_EVENT, command) {
            log::warn!("发送地图指令失败: {}", e);
        }
    }
}

impl MapSurface for WebviewMap {
    type Point = LatLng;
    type Overlay = u64;

    fn add_polygon(&mut self, path: &[LatLng], style: &OverlayStyle) -> u64 {
        self.next_overlay += 1;
        let overlay = self.next_overlay;
        self.paths.insert(overlay, path.to_vec());
        self.emit(MapCommand::AddPolygon {
            overlay,
            path: path.to_vec(),
            style: style.clone(),
        });
        overlay
    }

    fn remove_polygon(&mut self, overlay: &u64) {
        self.paths.remove(overlay);
        self.emit(MapCommand::RemovePolygon { overlay: *overlay });
    }

    fn set_style(&mut self, overlay: &u64, style: &OverlayStyle) {
        self.emit(MapCommand::SetStyle {
            overlay: *overlay,
            style: style.clone(),
        });
    }

    fn set_editable(&mut self, overlay: &u64, editable: bool) {
        self.emit(MapCommand::SetEditable {
            overlay: *overlay,
            editable,
        });
    }

    fn polygon_path(&self, overlay: &u64) -> Vec<LatLng> {
        self.paths.get(overlay).cloned().unwrap_or_default()
    }

    fn open_popup(&mut self, anchor: LatLng, content: PopupContent) {
        self.emit(MapCommand::OpenPopup { anchor, content });
    }

    fn close_popup(&mut self) {
        self.emit(MapCommand::ClosePopup);
    }

    fn set_drawing_mode(&mut self, enabled: bool) {
        self.emit(MapCommand::SetDrawingMode { enabled });
    }

    fn fit_bounds(&mut self, bounds: &Bounds) {
        self.emit(MapCommand::FitBounds { bounds: *bounds });
    }
}
