use once_cell::sync::{Lazy, OnceCell};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tauri::{AppHandle, Emitter};

use crate::config::{self, AppConfig, MapView, PRESET_VIEWS};
use crate::controller::{AttributeForm, EditorState, ManualCreateForm, ManualSubmit, ZoneEditor};
use crate::coords::LatLng;
use crate::error::ZoneError;
use crate::export::{export_zones_to_file, ExportFormat};
use crate::geocoder::{Geocoder, NominatimGeocoder};
use crate::map::PopupIntent;
use crate::preferences::StoredPreferences;
use crate::storage::{create_store, KeyValueStore};
use crate::store::ZoneStore;
use crate::webview::WebviewMap;
use crate::zone::{ZoneId, ZoneRecord};

type SharedStore = Arc<dyn KeyValueStore>;
type DesktopEditor = ZoneEditor<SharedStore, WebviewMap, StoredPreferences<SharedStore>>;

const STATE_EVENT: &str = "zone-editor-state";

// Global state
static EDITOR: Lazy<Mutex<Option<DesktopEditor>>> = Lazy::new(|| Mutex::new(None));

static CONFIG: Lazy<RwLock<AppConfig>> = Lazy::new(|| RwLock::new(AppConfig::default()));

static GEOCODER: OnceCell<NominatimGeocoder> = OnceCell::new();

#[derive(Debug, Clone, Serialize)]
pub struct ViewPreset {
    pub id: String,
    pub name: String,
}

/// 读取配置、打开存储并加载区域
pub fn init_editor(app: &AppHandle) -> Result<(), ZoneError> {
    let config = config::load_config()?;
    let backend = create_store(&config.storage)?;

    let store = ZoneStore::new(backend.clone(), config.storage.zones_key());
    let prefs = StoredPreferences::new(backend, config.storage.help_seen_key());
    let editor = ZoneEditor::new(store, WebviewMap::new(app.clone()), prefs, config.editor.clone());

    if GEOCODER.set(NominatimGeocoder::new(&config.geocoder)?).is_err() {
        log::warn!("地址解析服务已初始化");
    }
    *EDITOR.lock() = Some(editor);
    *CONFIG.write() = config;
    log::info!("区域编辑器已初始化");
    Ok(())
}

fn with_editor<T>(
    app: &AppHandle,
    f: impl FnOnce(&mut DesktopEditor) -> Result<T, ZoneError>,
) -> Result<T, String> {
    let mut guard = EDITOR.lock();
    let editor = guard
        .as_mut()
        .ok_or_else(|| "编辑器尚未初始化".to_string())?;
    let result = f(editor).map_err(|e| e.to_string());
    if let Err(e) = app.emit(STATE_EVENT, editor.state().clone()) {
        log::warn!("发送编辑器状态失败: {}", e);
    }
    result
}

fn read_editor<T>(f: impl FnOnce(&DesktopEditor) -> T) -> Result<T, String> {
    let guard = EDITOR.lock();
    let editor = guard
        .as_ref()
        .ok_or_else(|| "编辑器尚未初始化".to_string())?;
    Ok(f(editor))
}

fn zone_for_overlay(editor: &DesktopEditor, overlay: u64) -> Result<ZoneId, ZoneError> {
    editor
        .binding()
        .zone_for_overlay(&overlay)
        .cloned()
        .ok_or_else(|| ZoneError::UnknownZone(ZoneId::from(format!("overlay-{}", overlay))))
}

// Tauri Commands

/// 前端地图加载完成，重绘全部区域
#[tauri::command]
pub fn map_ready(app: AppHandle) -> Result<Vec<ZoneRecord>, String> {
    with_editor(&app, |e| {
        e.redraw_all();
        Ok(e.registry().records())
    })
}

#[tauri::command]
pub fn get_zones() -> Result<Vec<ZoneRecord>, String> {
    read_editor(|e| e.registry().records())
}

#[tauri::command]
pub fn get_editor_state() -> Result<EditorState, String> {
    read_editor(|e| e.state().clone())
}

#[tauri::command]
pub fn request_draw(app: AppHandle) -> Result<EditorState, String> {
    with_editor(&app, |e| e.request_draw().cloned())
}

#[tauri::command]
pub fn acknowledge_help(app: AppHandle) -> Result<(), String> {
    with_editor(&app, |e| e.acknowledge_help())
}

#[tauri::command]
pub fn drawing_completed(app: AppHandle, path: Vec<LatLng>) -> Result<String, String> {
    with_editor(&app, |e| e.complete_drawing(&path).map(|id| id.to_string()))
}

#[tauri::command]
pub fn cancel_drawing(app: AppHandle) -> Result<(), String> {
    with_editor(&app, |e| e.cancel_drawing())
}

#[tauri::command]
pub fn overlay_hovered(app: AppHandle, overlay: u64) -> Result<bool, String> {
    with_editor(&app, |e| {
        let id = zone_for_overlay(e, overlay)?;
        Ok(e.hover_enter(&id))
    })
}

#[tauri::command]
pub fn overlay_unhovered(app: AppHandle) -> Result<bool, String> {
    with_editor(&app, |e| Ok(e.hover_exit()))
}

#[tauri::command]
pub fn overlay_clicked(app: AppHandle, overlay: u64) -> Result<Option<AttributeForm>, String> {
    with_editor(&app, |e| {
        let id = zone_for_overlay(e, overlay)?;
        Ok(e.click(&id))
    })
}

/// 前端拖拽顶点后回传当前路径，只在关闭编辑时才会保存
#[tauri::command]
pub fn overlay_path_changed(app: AppHandle, overlay: u64, path: Vec<LatLng>) -> Result<bool, String> {
    with_editor(&app, |e| Ok(e.map_mut().update_path(overlay, path)))
}

#[tauri::command]
pub fn popup_action(app: AppHandle, intent: PopupIntent) -> Result<(), String> {
    with_editor(&app, |e| e.handle_popup_intent(intent))
}

#[tauri::command]
pub fn get_attribute_form() -> Result<Option<AttributeForm>, String> {
    read_editor(|e| e.attribute_form())
}

#[tauri::command]
pub fn save_attributes(app: AppHandle, form: AttributeForm) -> Result<(), String> {
    with_editor(&app, |e| e.save_attributes(form))
}

#[tauri::command]
pub fn delete_zone_from_dialog(app: AppHandle) -> Result<bool, String> {
    with_editor(&app, |e| e.delete_from_dialog())
}

#[tauri::command]
pub fn cancel_dialog(app: AppHandle) -> Result<(), String> {
    with_editor(&app, |e| e.cancel_dialog())
}

#[tauri::command]
pub fn open_manual_create(app: AppHandle) -> Result<(), String> {
    with_editor(&app, |e| e.open_manual_create())
}

/// 提交手动创建表单；只有地址时在此等待解析结果，期间不持有编辑器锁
#[tauri::command]
pub async fn submit_manual_create(
    app: AppHandle,
    form: ManualCreateForm,
) -> Result<Option<String>, String> {
    let request = match with_editor(&app, |e| e.submit_manual_create(form))? {
        ManualSubmit::Created(id) => return Ok(Some(id.to_string())),
        ManualSubmit::Geocoding(request) => request,
    };

    let geocoder = GEOCODER
        .get()
        .ok_or_else(|| "地址解析服务尚未初始化".to_string())?;
    let result = geocoder.resolve(&request.address).await;

    with_editor(&app, |e| e.complete_geocode(request.ticket, result))
        .map(|id| id.map(|id| id.to_string()))
}

#[tauri::command]
pub fn toggle_vertex_editing(app: AppHandle, zone_id: String) -> Result<bool, String> {
    with_editor(&app, |e| e.toggle_vertex_editing(&ZoneId::from(zone_id)))
}

#[tauri::command]
pub fn focus_zone(app: AppHandle, zone_id: String) -> Result<(), String> {
    with_editor(&app, |e| e.focus_zone(&ZoneId::from(zone_id)))
}

#[tauri::command]
pub fn fit_all_zones(app: AppHandle) -> Result<bool, String> {
    with_editor(&app, |e| Ok(e.fit_all()))
}

// 导出相关命令

#[tauri::command]
pub fn export_zones(path: String, format: String) -> Result<usize, String> {
    let guard = EDITOR.lock();
    let editor = guard
        .as_ref()
        .ok_or_else(|| "编辑器尚未初始化".to_string())?;
    export_zones_to_file(editor.zones(), Path::new(&path), ExportFormat::from(format.as_str()))
        .map_err(|e| e.to_string())
}

// 视图相关命令

#[tauri::command]
pub fn get_initial_view() -> MapView {
    CONFIG.read().initial_view.clone()
}

#[tauri::command]
pub fn get_view_presets() -> Vec<ViewPreset> {
    PRESET_VIEWS
        .iter()
        .map(|(id, v)| ViewPreset {
            id: id.clone(),
            name: v.name.clone(),
        })
        .collect()
}

#[tauri::command]
pub fn set_initial_view(preset_id: String) -> Result<MapView, String> {
    let mut app_config = CONFIG.write();
    let view = config::set_initial_view_by_preset(&mut app_config, &preset_id)
        .map_err(|e| e.to_string())?;
    config::save_config(&app_config).map_err(|e| e.to_string())?;
    log::info!("初始视图已切换为: {}", view.name);
    Ok(view)
}
