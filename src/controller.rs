//! 区域编辑控制器
//!
//! 驱动绘制、属性对话框、手动创建对话框和首次使用帮助之间的状态切换。
//! 顶点编辑与对话框状态相互独立，由 OverlayBinding 单独跟踪。

use crate::binding::OverlayBinding;
use crate::config::EditorSettings;
use crate::coords::{bounds_of, parse_manual_text, square_around, to_record, Bounds, LatLng};
use crate::error::{Result, ZoneError};
use crate::map::{MapSurface, PopupIntent};
use crate::preferences::Preferences;
use crate::registry::ZoneRegistry;
use crate::storage::KeyValueStore;
use crate::store::ZoneStore;
use crate::zone::{check_vertices, Color, Zone, ZoneId, ZonePatch};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "zone_id", rename_all = "snake_case")]
pub enum EditorState {
    Idle,
    Drawing,
    /// None 表示对话框对应的区域已被删除
    AttributeDialogOpen(Option<ZoneId>),
    ManualCreateDialogOpen,
    FirstRunHelpOpen,
}

impl EditorState {
    pub fn name(&self) -> &'static str {
        match self {
            EditorState::Idle => "idle",
            EditorState::Drawing => "drawing",
            EditorState::AttributeDialogOpen(_) => "attribute_dialog_open",
            EditorState::ManualCreateDialogOpen => "manual_create_dialog_open",
            EditorState::FirstRunHelpOpen => "first_run_help_open",
        }
    }
}

/// 属性对话框表单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub color: String,
}

/// 手动创建对话框表单，坐标优先于地址
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualCreateForm {
    pub name: String,
    pub description: String,
    pub color: String,
    pub coordinates: String,
    pub address: String,
}

/// 一次地址解析请求的凭据，对话框关闭或重新打开后失效
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocodeTicket {
    dialog: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeRequest {
    pub ticket: GeocodeTicket,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ManualSubmit {
    Created(ZoneId),
    /// 需要先解析地址，再调用 `complete_geocode`
    Geocoding(GeocodeRequest),
}

struct PendingGeocode {
    ticket: GeocodeTicket,
    form: ManualCreateForm,
}

pub struct ZoneEditor<S, M, P>
where
    S: KeyValueStore,
    M: MapSurface,
    P: Preferences,
{
    registry: ZoneRegistry<S>,
    binding: OverlayBinding<M>,
    prefs: P,
    settings: EditorSettings,
    state: EditorState,
    dialog_generation: u64,
    pending: Option<PendingGeocode>,
}

impl<S, M, P> ZoneEditor<S, M, P>
where
    S: KeyValueStore,
    M: MapSurface,
    P: Preferences,
{
    /// 从存储加载区域并渲染到地图
    pub fn new(store: ZoneStore<S>, map: M, prefs: P, settings: EditorSettings) -> Self {
        let registry = ZoneRegistry::load(store);
        let mut binding = OverlayBinding::new(map, settings.clone());
        for zone in registry.zones() {
            if let Err(e) = binding.bind(zone) {
                log::warn!("渲染区域 {} 失败: {}", zone.id, e);
            }
        }

        let mut editor = Self {
            registry,
            binding,
            prefs,
            settings,
            state: EditorState::Idle,
            dialog_generation: 0,
            pending: None,
        };
        editor.fit_all();
        editor
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn registry(&self) -> &ZoneRegistry<S> {
        &self.registry
    }

    pub fn binding(&self) -> &OverlayBinding<M> {
        &self.binding
    }

    pub fn map(&self) -> &M {
        self.binding.map()
    }

    pub fn map_mut(&mut self) -> &mut M {
        self.binding.map_mut()
    }

    pub fn zones(&self) -> &[Zone] {
        self.registry.zones()
    }

    pub fn editing_zone(&self) -> Option<&ZoneId> {
        self.binding.editing()
    }

    pub fn geocode_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn invalid(&self, action: &'static str) -> ZoneError {
        ZoneError::InvalidTransition {
            state: self.state.name().to_string(),
            action,
        }
    }

    // ---- 绘制 ----

    /// 请求绘制：首次使用先显示帮助
    pub fn request_draw(&mut self) -> Result<&EditorState> {
        if self.state != EditorState::Idle {
            return Err(self.invalid("request_draw"));
        }
        self.stop_vertex_editing();

        if self.prefs.help_seen() {
            self.enter_drawing();
        } else {
            self.state = EditorState::FirstRunHelpOpen;
        }
        Ok(&self.state)
    }

    /// 确认帮助后进入绘制，标记永久生效
    pub fn acknowledge_help(&mut self) -> Result<()> {
        if self.state != EditorState::FirstRunHelpOpen {
            return Err(self.invalid("acknowledge_help"));
        }
        self.prefs.mark_help_seen();
        self.enter_drawing();
        Ok(())
    }

    fn enter_drawing(&mut self) {
        self.binding.close_popup();
        self.binding.map_mut().set_drawing_mode(true);
        self.state = EditorState::Drawing;
    }

    /// 绘制完成：创建区域并打开属性对话框
    pub fn complete_drawing(&mut self, points: &[M::Point]) -> Result<ZoneId> {
        if self.state != EditorState::Drawing {
            return Err(self.invalid("complete_drawing"));
        }
        // 控件已退出绘制，任何失败都回到空闲状态
        self.binding.map_mut().set_drawing_mode(false);
        self.state = EditorState::Idle;

        let vertices = to_record(points);
        if let Err(e) = check_vertices(&vertices) {
            log::warn!("绘制的区域无效: {}", e);
            return Err(e);
        }

        let zone = Zone::new(
            self.registry.generate_name(),
            String::new(),
            self.settings.default_color.clone(),
            vertices,
        )?;
        let id = self.insert_zone(zone)?;
        self.state = EditorState::AttributeDialogOpen(Some(id.clone()));
        Ok(id)
    }

    /// 取消绘制，控件中未完成的图形一并丢弃
    pub fn cancel_drawing(&mut self) -> Result<()> {
        if self.state != EditorState::Drawing {
            return Err(self.invalid("cancel_drawing"));
        }
        self.binding.map_mut().set_drawing_mode(false);
        self.state = EditorState::Idle;
        Ok(())
    }

    fn insert_zone(&mut self, zone: Zone) -> Result<ZoneId> {
        let id = zone.id.clone();
        self.binding.bind(&zone)?;
        if let Err(e) = self.registry.add(zone) {
            self.binding.detach(&id);
            return Err(e);
        }
        Ok(id)
    }

    // ---- 属性对话框 ----

    /// 打开属性对话框（点击覆盖物）
    pub fn open_attribute_dialog(&mut self, id: &ZoneId) -> Result<AttributeForm> {
        if self.state != EditorState::Idle {
            return Err(self.invalid("open_attribute_dialog"));
        }
        if !self.binding.click(id) {
            return Err(self.invalid("open_attribute_dialog"));
        }
        let form = self.attribute_form_for(id)?;
        self.binding.close_popup();
        self.state = EditorState::AttributeDialogOpen(Some(id.clone()));
        Ok(form)
    }

    /// 当前属性对话框的预填内容
    pub fn attribute_form(&self) -> Option<AttributeForm> {
        match &self.state {
            EditorState::AttributeDialogOpen(Some(id)) => self.attribute_form_for(id).ok(),
            _ => None,
        }
    }

    fn attribute_form_for(&self, id: &ZoneId) -> Result<AttributeForm> {
        let zone = self
            .registry
            .get(id)
            .ok_or_else(|| ZoneError::UnknownZone(id.clone()))?;
        Ok(AttributeForm {
            name: zone.name.clone(),
            description: zone.description.clone(),
            color: zone.color.to_string(),
        })
    }

    /// 保存名称、描述和颜色；输入无效时对话框保持打开
    pub fn save_attributes(&mut self, form: AttributeForm) -> Result<()> {
        let target = match &self.state {
            EditorState::AttributeDialogOpen(target) => target.clone(),
            _ => return Err(self.invalid("save_attributes")),
        };
        let Some(id) = target else {
            self.state = EditorState::Idle;
            return Ok(());
        };

        let name = form.name.trim().to_string();
        if name.is_empty() {
            return Err(ZoneError::EmptyName);
        }
        let color = Color::parse(&form.color)?;

        let zone = self.registry.replace(
            &id,
            ZonePatch::Attributes {
                name,
                description: form.description.trim().to_string(),
                color,
            },
        )?;
        self.binding.restyle(zone);
        self.binding.close_popup();
        self.state = EditorState::Idle;
        Ok(())
    }

    /// 在属性对话框中删除区域
    pub fn delete_from_dialog(&mut self) -> Result<bool> {
        let target = match &self.state {
            EditorState::AttributeDialogOpen(target) => target.clone(),
            _ => return Err(self.invalid("delete_from_dialog")),
        };
        let deleted = match target {
            Some(id) => self.delete_zone(&id),
            None => false,
        };
        self.state = EditorState::Idle;
        Ok(deleted)
    }

    /// 关闭任意对话框，不做修改
    pub fn cancel_dialog(&mut self) -> Result<()> {
        match self.state {
            EditorState::AttributeDialogOpen(_) | EditorState::FirstRunHelpOpen => {}
            EditorState::ManualCreateDialogOpen => {
                if self.pending.take().is_some() {
                    log::info!("对话框已关闭，丢弃进行中的地址解析");
                }
            }
            _ => return Err(self.invalid("cancel_dialog")),
        }
        self.state = EditorState::Idle;
        Ok(())
    }

    // ---- 删除 ----

    /// 删除区域：移除覆盖物和存储记录
    pub fn delete_zone(&mut self, id: &ZoneId) -> bool {
        if self.binding.editing() == Some(id) {
            // 区域即将删除，编辑中的几何不再保存
            self.binding.disable_editing();
        }
        let detached = self.binding.detach(id);
        let removed = self.registry.remove(id).is_some();

        if self.state == EditorState::AttributeDialogOpen(Some(id.clone())) {
            self.state = EditorState::AttributeDialogOpen(None);
        }
        detached || removed
    }

    // ---- 手动创建 ----

    pub fn open_manual_create(&mut self) -> Result<()> {
        if self.state != EditorState::Idle {
            return Err(self.invalid("open_manual_create"));
        }
        self.dialog_generation += 1;
        self.pending = None;
        self.binding.close_popup();
        self.state = EditorState::ManualCreateDialogOpen;
        Ok(())
    }

    /// 提交手动创建表单
    ///
    /// 坐标文本直接生成区域；只有地址时返回解析请求，解析完成后调用 `complete_geocode`。
    /// 任何失败都不会创建区域，对话框保持打开。
    pub fn submit_manual_create(&mut self, form: ManualCreateForm) -> Result<ManualSubmit> {
        if self.state != EditorState::ManualCreateDialogOpen {
            return Err(self.invalid("submit_manual_create"));
        }
        if self.pending.is_some() {
            return Err(ZoneError::GeocodeInFlight);
        }
        if !form.color.trim().is_empty() {
            Color::parse(&form.color)?;
        }

        if !form.coordinates.trim().is_empty() {
            let vertices = parse_manual_text(&form.coordinates)?;
            let id = self.create_from_form(&form, vertices)?;
            return Ok(ManualSubmit::Created(id));
        }

        let address = form.address.trim().to_string();
        if address.is_empty() {
            return Err(ZoneError::MissingInput);
        }

        let ticket = GeocodeTicket {
            dialog: self.dialog_generation,
        };
        log::info!("开始解析地址: {}", address);
        self.pending = Some(PendingGeocode { ticket, form });
        Ok(ManualSubmit::Geocoding(GeocodeRequest { ticket, address }))
    }

    /// 地址解析完成
    ///
    /// 对话框已关闭或已重新打开时结果被丢弃，返回 Ok(None)。
    pub fn complete_geocode(
        &mut self,
        ticket: GeocodeTicket,
        result: Result<LatLng>,
    ) -> Result<Option<ZoneId>> {
        let current = self.state == EditorState::ManualCreateDialogOpen
            && self.pending.as_ref().is_some_and(|p| p.ticket == ticket);
        if !current {
            log::info!("丢弃过期的地址解析结果");
            return Ok(None);
        }
        let Some(pending) = self.pending.take() else {
            return Ok(None);
        };

        let center = result?;
        let vertices = square_around(center, self.settings.rectangle_offset);
        self.create_from_form(&pending.form, vertices).map(Some)
    }

    fn create_from_form(&mut self, form: &ManualCreateForm, vertices: Vec<LatLng>) -> Result<ZoneId> {
        check_vertices(&vertices)?;

        let name = match form.name.trim() {
            "" => self.registry.generate_name(),
            name => name.to_string(),
        };
        let color = match form.color.trim() {
            "" => self.settings.default_color.clone(),
            color => Color::parse(color)?,
        };

        let zone = Zone::new(name, form.description.trim().to_string(), color, vertices)?;
        let bounds = bounds_of(&zone.vertices);
        let id = self.insert_zone(zone)?;
        if let Some(bounds) = bounds {
            self.binding.map_mut().fit_bounds(&bounds);
        }
        self.state = EditorState::Idle;
        Ok(id)
    }

    // ---- 顶点编辑 ----

    /// 切换顶点编辑，返回切换后该区域是否处于编辑状态
    pub fn toggle_vertex_editing(&mut self, id: &ZoneId) -> Result<bool> {
        if self.binding.editing() == Some(id) {
            self.stop_vertex_editing();
            return Ok(false);
        }
        if !self.registry.contains(id) {
            return Err(ZoneError::UnknownZone(id.clone()));
        }
        if let Some((previous, path)) = self.binding.enable_editing(id)? {
            self.commit_geometry(&previous, path);
        }
        Ok(true)
    }

    /// 关闭顶点编辑并保存拖拽后的几何（只在此刻保存一次）
    pub fn stop_vertex_editing(&mut self) -> Option<ZoneId> {
        let (id, path) = self.binding.disable_editing()?;
        self.commit_geometry(&id, path);
        Some(id)
    }

    fn commit_geometry(&mut self, id: &ZoneId, path: Vec<LatLng>) {
        let Some(zone) = self.registry.get(id) else {
            return;
        };
        if zone.vertices == path {
            return;
        }

        let committed = self
            .registry
            .replace(id, ZonePatch::Geometry(path))
            .map(|zone| (zone.name.clone(), zone.vertices.len()));
        match committed {
            Ok((name, count)) => log::info!("已保存区域几何: {} ({} 个顶点)", name, count),
            Err(e) => {
                log::warn!("拖拽后的几何无效，恢复原状: {}", e);
                if let Some(zone) = self.registry.get(id) {
                    if let Err(e) = self.binding.bind(zone) {
                        log::error!("重绘区域 {} 失败: {}", id, e);
                    }
                }
            }
        }
    }

    // ---- 覆盖物事件 ----

    /// 悬停信息框：顶点编辑中或有对话框、绘制进行时都不显示
    pub fn hover_enter(&mut self, id: &ZoneId) -> bool {
        if self.state != EditorState::Idle {
            return false;
        }
        self.binding.hover_enter(id, &self.registry)
    }

    pub fn hover_exit(&mut self) -> bool {
        self.binding.hover_exit()
    }

    /// 点击覆盖物，空闲且无顶点编辑时打开属性对话框
    pub fn click(&mut self, id: &ZoneId) -> Option<AttributeForm> {
        if self.state != EditorState::Idle || !self.binding.click(id) {
            return None;
        }
        self.open_attribute_dialog(id).ok()
    }

    /// 弹出框按钮
    pub fn handle_popup_intent(&mut self, intent: PopupIntent) -> Result<()> {
        match intent {
            PopupIntent::Edit(id) => {
                self.toggle_vertex_editing(&id)?;
            }
            PopupIntent::Delete(id) => {
                if !self.delete_zone(&id) {
                    return Err(ZoneError::UnknownZone(id));
                }
            }
        }
        Ok(())
    }

    // ---- 视图 ----

    /// 地图控件重新加载后重绘全部区域，进行中的顶点编辑不保存
    pub fn redraw_all(&mut self) {
        self.binding.clear();
        for zone in self.registry.zones() {
            if let Err(e) = self.binding.bind(zone) {
                log::warn!("渲染区域 {} 失败: {}", zone.id, e);
            }
        }
        self.fit_all();
    }

    pub fn all_bounds(&self) -> Option<Bounds> {
        self.registry
            .zones()
            .iter()
            .filter_map(|z| bounds_of(&z.vertices))
            .reduce(|a, b| a.union(&b))
    }

    /// 缩放地图以显示全部区域
    pub fn fit_all(&mut self) -> bool {
        match self.all_bounds() {
            Some(bounds) => {
                self.binding.map_mut().fit_bounds(&bounds);
                true
            }
            None => false,
        }
    }

    pub fn focus_zone(&mut self, id: &ZoneId) -> Result<()> {
        let bounds = self
            .registry
            .get(id)
            .and_then(|z| bounds_of(&z.vertices))
            .ok_or_else(|| ZoneError::UnknownZone(id.clone()))?;
        self.binding.map_mut().fit_bounds(&bounds);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocoder::Geocoder;
    use crate::preferences::{SessionPreferences, StoredPreferences};
    use crate::storage::MemoryStore;
    use crate::testing::{triangle, CountingStore, RecordingMap, ScriptedGeocoder};
    use crate::zone::ZoneRecord;
    use std::sync::Arc;

    type Editor<S> = ZoneEditor<Arc<S>, RecordingMap, SessionPreferences>;

    fn editor_with<S: KeyValueStore>(backend: Arc<S>, help_seen: bool) -> Editor<S> {
        ZoneEditor::new(
            ZoneStore::new(backend, "t:zones"),
            RecordingMap::default(),
            SessionPreferences::new(help_seen),
            EditorSettings::default(),
        )
    }

    fn editor() -> (Arc<MemoryStore>, Editor<MemoryStore>) {
        let backend = Arc::new(MemoryStore::new());
        (backend.clone(), editor_with(backend, true))
    }

    fn stored<S: KeyValueStore>(backend: &Arc<S>) -> Vec<ZoneRecord> {
        ZoneStore::new(backend.clone(), "t:zones").load()
    }

    fn draw<S: KeyValueStore>(editor: &mut Editor<S>) -> ZoneId {
        editor.request_draw().unwrap();
        let id = editor.complete_drawing(&triangle()).unwrap();
        editor.cancel_dialog().unwrap();
        id
    }

    #[test]
    fn test_first_run_help_then_drawing() {
        let backend = Arc::new(MemoryStore::new());
        let mut editor = ZoneEditor::new(
            ZoneStore::new(backend.clone(), "t:zones"),
            RecordingMap::default(),
            StoredPreferences::new(backend.clone(), "t:help-seen"),
            EditorSettings::default(),
        );

        assert_eq!(editor.request_draw().unwrap(), &EditorState::FirstRunHelpOpen);
        assert!(!editor.map().drawing);
        editor.acknowledge_help().unwrap();
        assert_eq!(editor.state(), &EditorState::Drawing);
        assert!(editor.map().drawing);

        editor.cancel_drawing().unwrap();
        assert_eq!(editor.state(), &EditorState::Idle);
        assert!(!editor.map().drawing);

        // 标记已保存，下次直接进入绘制
        assert_eq!(editor.request_draw().unwrap(), &EditorState::Drawing);
        assert_eq!(backend.get("t:help-seen").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn test_dismissing_help_does_not_set_flag() {
        let backend = Arc::new(MemoryStore::new());
        let mut editor = editor_with(backend, false);
        editor.request_draw().unwrap();
        editor.cancel_dialog().unwrap();
        assert_eq!(editor.request_draw().unwrap(), &EditorState::FirstRunHelpOpen);
    }

    #[test]
    fn test_complete_drawing_creates_zone_and_opens_dialog() {
        let (backend, mut editor) = editor();
        editor.request_draw().unwrap();
        let id = editor.complete_drawing(&triangle()).unwrap();

        assert_eq!(editor.state(), &EditorState::AttributeDialogOpen(Some(id.clone())));
        let form = editor.attribute_form().unwrap();
        assert_eq!(form.name, "Zone 1");
        assert_eq!(form.description, "");
        assert_eq!(form.color, "#3388FF");
        assert_eq!(editor.map().overlays.len(), 1);
        assert_eq!(stored(&backend).len(), 1);
        assert!(!editor.map().drawing);
    }

    #[test]
    fn test_complete_drawing_with_too_few_points() {
        let (backend, mut editor) = editor();
        editor.request_draw().unwrap();
        let err = editor.complete_drawing(&triangle()[..2]).unwrap_err();
        assert!(matches!(err, ZoneError::InsufficientVertices { count: 2 }));
        assert_eq!(editor.state(), &EditorState::Idle);
        assert!(editor.zones().is_empty());
        assert!(stored(&backend).is_empty());
    }

    #[test]
    fn test_complete_drawing_with_non_finite_point() {
        let (backend, mut editor) = editor();
        editor.request_draw().unwrap();
        let mut points = triangle();
        points[2] = LatLng::new(f64::NAN, 121.45);

        let err = editor.complete_drawing(&points).unwrap_err();
        assert!(matches!(err, ZoneError::MalformedCoordinate { line: 3, .. }));
        assert_eq!(editor.state(), &EditorState::Idle);
        assert!(!editor.map().drawing);
        assert!(editor.map().overlays.is_empty());
        assert!(stored(&backend).is_empty());

        // 可以重新进入绘制
        assert_eq!(editor.request_draw().unwrap(), &EditorState::Drawing);
    }

    #[test]
    fn test_default_name_after_huge_suffix() {
        let (_, mut editor) = editor();
        editor.request_draw().unwrap();
        editor.complete_drawing(&triangle()).unwrap();
        editor
            .save_attributes(AttributeForm {
                name: "Zone 18446744073709551615".into(),
                description: String::new(),
                color: "#3388FF".into(),
            })
            .unwrap();

        editor.request_draw().unwrap();
        let id = editor.complete_drawing(&triangle()).unwrap();
        assert_eq!(editor.registry().get(&id).unwrap().name, "Zone 1");
    }

    #[test]
    fn test_save_attributes() {
        let (backend, mut editor) = editor();
        editor.request_draw().unwrap();
        let id = editor.complete_drawing(&triangle()).unwrap();

        let err = editor
            .save_attributes(AttributeForm {
                name: "Park".into(),
                description: String::new(),
                color: "pink".into(),
            })
            .unwrap_err();
        assert!(matches!(err, ZoneError::InvalidColor(_)));
        assert!(matches!(editor.state(), EditorState::AttributeDialogOpen(_)));

        editor
            .save_attributes(AttributeForm {
                name: " Park ".into(),
                description: "green space".into(),
                color: "#00AA00".into(),
            })
            .unwrap();
        assert_eq!(editor.state(), &EditorState::Idle);

        let saved = stored(&backend);
        assert_eq!(saved[0].name, "Park");
        assert_eq!(saved[0].description, "green space");
        assert_eq!(saved[0].color, "#00AA00");
        let overlay = editor.binding().overlay(&id).unwrap();
        assert_eq!(editor.map().overlays[overlay].style.fill_color.as_str(), "#00AA00");
    }

    #[test]
    fn test_cancel_attribute_dialog_does_not_mutate() {
        let backend = Arc::new(CountingStore::default());
        let mut editor = editor_with(backend.clone(), true);
        let id = draw(&mut editor);
        let writes = backend.writes();

        editor.open_attribute_dialog(&id).unwrap();
        editor.cancel_dialog().unwrap();
        assert_eq!(editor.state(), &EditorState::Idle);
        assert_eq!(backend.writes(), writes);
    }

    #[test]
    fn test_delete_from_dialog() {
        let (backend, mut editor) = editor();
        let keep = draw(&mut editor);
        let id = draw(&mut editor);

        editor.click(&id).unwrap();
        assert!(editor.delete_from_dialog().unwrap());
        assert_eq!(editor.state(), &EditorState::Idle);

        let saved = stored(&backend);
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id, keep);
        assert_eq!(editor.map().overlays.len(), 1);
        assert!(!editor.delete_zone(&id));
    }

    #[test]
    fn test_popup_delete_while_dialog_open() {
        let (_, mut editor) = editor();
        let id = draw(&mut editor);
        editor.open_attribute_dialog(&id).unwrap();

        editor.handle_popup_intent(PopupIntent::Delete(id)).unwrap();
        assert_eq!(editor.state(), &EditorState::AttributeDialogOpen(None));
        editor
            .save_attributes(AttributeForm {
                name: "x".into(),
                description: String::new(),
                color: "#000000".into(),
            })
            .unwrap();
        assert_eq!(editor.state(), &EditorState::Idle);
        assert!(editor.zones().is_empty());
    }

    #[test]
    fn test_manual_create_from_coordinates() {
        let (backend, mut editor) = editor();
        editor.open_manual_create().unwrap();
        let outcome = editor
            .submit_manual_create(ManualCreateForm {
                name: "Block".into(),
                coordinates: "40.1,-74.2\n41.0,-75.0\n40.5,-73.0".into(),
                ..Default::default()
            })
            .unwrap();

        let ManualSubmit::Created(id) = outcome else {
            panic!("expected zone to be created");
        };
        assert_eq!(editor.state(), &EditorState::Idle);
        let zone = editor.registry().get(&id).unwrap();
        assert_eq!(zone.name, "Block");
        assert_eq!(zone.vertices[0], LatLng::new(40.1, -74.2));
        assert_eq!(stored(&backend).len(), 1);
        assert!(editor.map().fitted.is_some());
    }

    #[test]
    fn test_manual_create_failures_keep_dialog_open() {
        let backend = Arc::new(CountingStore::default());
        let mut editor = editor_with(backend.clone(), true);
        editor.open_manual_create().unwrap();

        let cases = [
            (ManualCreateForm::default(), "missing"),
            (
                ManualCreateForm {
                    coordinates: "abc,def".into(),
                    ..Default::default()
                },
                "malformed",
            ),
            (
                ManualCreateForm {
                    coordinates: "1,1\n2,2".into(),
                    ..Default::default()
                },
                "insufficient",
            ),
        ];
        for (form, case) in cases {
            let err = editor.submit_manual_create(form).unwrap_err();
            match case {
                "missing" => assert!(matches!(err, ZoneError::MissingInput)),
                "malformed" => assert!(matches!(err, ZoneError::MalformedCoordinate { .. })),
                _ => assert!(matches!(err, ZoneError::InsufficientVertices { count: 2 })),
            }
            assert!(err.is_user_input());
            assert_eq!(editor.state(), &EditorState::ManualCreateDialogOpen);
        }

        assert!(editor.zones().is_empty());
        assert_eq!(backend.writes(), 0);
    }

    #[tokio::test]
    async fn test_manual_create_from_address() {
        let (backend, mut editor) = editor();
        let geocoder = ScriptedGeocoder::with("东方明珠", LatLng::new(31.2397, 121.4998));
        editor.open_manual_create().unwrap();

        let ManualSubmit::Geocoding(request) = editor
            .submit_manual_create(ManualCreateForm {
                address: " 东方明珠 ".into(),
                ..Default::default()
            })
            .unwrap()
        else {
            panic!("expected geocoding request");
        };
        assert_eq!(request.address, "东方明珠");

        // 解析期间再次提交会被拒绝
        assert!(matches!(
            editor.submit_manual_create(ManualCreateForm {
                address: "other".into(),
                ..Default::default()
            }),
            Err(ZoneError::GeocodeInFlight)
        ));

        let result = geocoder.resolve(&request.address).await;
        let id = editor.complete_geocode(request.ticket, result).unwrap().unwrap();

        let zone = editor.registry().get(&id).unwrap();
        assert_eq!(zone.name, "Zone 1");
        assert_eq!(zone.vertices.len(), 4);
        let bounds = bounds_of(&zone.vertices).unwrap();
        assert!((bounds.north - bounds.south - 0.01).abs() < 1e-9);
        assert!((bounds.east - bounds.west - 0.01).abs() < 1e-9);
        assert!((bounds.center().latitude - 31.2397).abs() < 1e-9);
        assert!((bounds.center().longitude - 121.4998).abs() < 1e-9);
        assert_eq!(editor.state(), &EditorState::Idle);
        assert_eq!(stored(&backend).len(), 1);
    }

    #[tokio::test]
    async fn test_geocode_failure_keeps_dialog_open() {
        let (_, mut editor) = editor();
        let geocoder = ScriptedGeocoder::default();
        editor.open_manual_create().unwrap();
        let ManualSubmit::Geocoding(request) = editor
            .submit_manual_create(ManualCreateForm {
                address: "nowhere".into(),
                ..Default::default()
            })
            .unwrap()
        else {
            panic!("expected geocoding request");
        };

        let result = geocoder.resolve(&request.address).await;
        let err = editor.complete_geocode(request.ticket, result).unwrap_err();
        assert!(matches!(err, ZoneError::GeocodingFailure(_)));
        assert_eq!(editor.state(), &EditorState::ManualCreateDialogOpen);
        assert!(!editor.geocode_pending());
        assert!(editor.zones().is_empty());
    }

    #[test]
    fn test_geocode_result_discarded_after_close() {
        let (backend, mut editor) = editor();
        editor.open_manual_create().unwrap();
        let ManualSubmit::Geocoding(request) = editor
            .submit_manual_create(ManualCreateForm {
                address: "somewhere".into(),
                ..Default::default()
            })
            .unwrap()
        else {
            panic!("expected geocoding request");
        };

        editor.cancel_dialog().unwrap();
        editor.open_manual_create().unwrap();

        let outcome = editor
            .complete_geocode(request.ticket, Ok(LatLng::new(1.0, 1.0)))
            .unwrap();
        assert!(outcome.is_none());
        assert!(editor.zones().is_empty());
        assert!(stored(&backend).is_empty());
        assert_eq!(editor.state(), &EditorState::ManualCreateDialogOpen);
    }

    #[test]
    fn test_single_vertex_edit_and_commit_on_switch() {
        let (backend, mut editor) = editor();
        let a = draw(&mut editor);
        let b = draw(&mut editor);
        let a_overlay = *editor.binding().overlay(&a).unwrap();
        let b_overlay = *editor.binding().overlay(&b).unwrap();

        assert!(editor.toggle_vertex_editing(&a).unwrap());
        editor.map_mut().drag_vertex(a_overlay, 0, LatLng::new(31.0, 121.0));
        // 拖拽期间不保存
        assert_eq!(stored(&backend)[0].coordinates, triangle());

        assert!(editor.toggle_vertex_editing(&b).unwrap());
        assert_eq!(editor.map().editable_overlays(), vec![b_overlay]);
        assert_eq!(editor.editing_zone(), Some(&b));
        assert_eq!(stored(&backend)[0].coordinates[0], LatLng::new(31.0, 121.0));

        assert!(!editor.toggle_vertex_editing(&b).unwrap());
        assert!(editor.map().editable_overlays().is_empty());
    }

    #[test]
    fn test_geometry_committed_exactly_once() {
        let backend = Arc::new(CountingStore::default());
        let mut editor = editor_with(backend.clone(), true);
        let id = draw(&mut editor);
        let overlay = *editor.binding().overlay(&id).unwrap();
        let writes = backend.writes();

        editor.toggle_vertex_editing(&id).unwrap();
        editor.map_mut().drag_vertex(overlay, 1, LatLng::new(31.25, 121.55));
        editor.map_mut().drag_vertex(overlay, 2, LatLng::new(31.35, 121.45));
        assert_eq!(backend.writes(), writes);

        assert_eq!(editor.stop_vertex_editing(), Some(id.clone()));
        assert_eq!(backend.writes(), writes + 1);
        assert!(editor.stop_vertex_editing().is_none());

        // 未拖拽时不写入
        editor.toggle_vertex_editing(&id).unwrap();
        editor.toggle_vertex_editing(&id).unwrap();
        assert_eq!(backend.writes(), writes + 1);

        let zone = editor.registry().get(&id).unwrap();
        assert_eq!(zone.vertices[2], LatLng::new(31.35, 121.45));
        assert!(zone.updated_at >= zone.created_at);
    }

    #[test]
    fn test_degenerate_drag_is_reverted() {
        let (_, mut editor) = editor();
        let id = draw(&mut editor);
        let overlay = *editor.binding().overlay(&id).unwrap();
        editor.toggle_vertex_editing(&id).unwrap();
        editor.map_mut().overlays.get_mut(&overlay).unwrap().path.truncate(2);

        editor.stop_vertex_editing();
        assert_eq!(editor.registry().get(&id).unwrap().vertices, triangle());
        let redrawn = editor.binding().overlay(&id).unwrap();
        assert_eq!(editor.map().overlays[redrawn].path, triangle());
        assert_eq!(editor.map().overlays.len(), 1);
    }

    #[test]
    fn test_non_finite_drag_is_reverted_and_store_stays_readable() {
        let (backend, mut editor) = editor();
        let id = draw(&mut editor);
        draw(&mut editor);
        draw(&mut editor);
        let overlay = *editor.binding().overlay(&id).unwrap();

        editor.toggle_vertex_editing(&id).unwrap();
        editor.map_mut().drag_vertex(overlay, 0, LatLng::new(f64::NAN, 1.0));
        editor.stop_vertex_editing();

        assert_eq!(editor.registry().get(&id).unwrap().vertices, triangle());
        let redrawn = editor.binding().overlay(&id).unwrap();
        assert_eq!(editor.map().overlays[redrawn].path, triangle());

        let reloaded = editor_with(backend, true);
        assert_eq!(reloaded.zones().len(), 3);
    }

    #[test]
    fn test_events_suppressed_while_editing() {
        let (_, mut editor) = editor();
        let a = draw(&mut editor);
        let b = draw(&mut editor);

        assert!(editor.hover_enter(&b));
        editor.handle_popup_intent(PopupIntent::Edit(a.clone())).unwrap();
        assert!(editor.map().popup.is_none());
        assert!(!editor.hover_enter(&b));
        assert!(editor.click(&b).is_none());
        assert_eq!(editor.state(), &EditorState::Idle);

        editor.toggle_vertex_editing(&a).unwrap();
        assert!(editor.click(&b).is_some());
    }

    #[test]
    fn test_hover_suppressed_while_dialog_or_drawing() {
        let (_, mut editor) = editor();
        let id = draw(&mut editor);

        editor.open_attribute_dialog(&id).unwrap();
        assert!(!editor.hover_enter(&id));
        editor.cancel_dialog().unwrap();

        editor.request_draw().unwrap();
        assert!(!editor.hover_enter(&id));
        editor.cancel_drawing().unwrap();

        assert!(editor.hover_enter(&id));
    }

    #[test]
    fn test_startup_loads_and_fits() {
        let (backend, mut editor) = editor();
        draw(&mut editor);
        draw(&mut editor);
        drop(editor);

        let reloaded = editor_with(backend, true);
        assert_eq!(reloaded.zones().len(), 2);
        assert_eq!(reloaded.map().overlays.len(), 2);
        assert_eq!(reloaded.map().fitted, reloaded.all_bounds());
        assert!(reloaded.map().fitted.is_some());
    }

    #[test]
    fn test_redraw_all_rebinds_overlays() {
        let (_, mut editor) = editor();
        let a = draw(&mut editor);
        draw(&mut editor);
        editor.toggle_vertex_editing(&a).unwrap();
        let before = *editor.binding().overlay(&a).unwrap();

        editor.redraw_all();
        assert_eq!(editor.map().overlays.len(), 2);
        assert_ne!(editor.binding().overlay(&a), Some(&before));
        assert!(editor.editing_zone().is_none());
        assert!(editor.map().editable_overlays().is_empty());
    }

    #[test]
    fn test_invalid_transitions() {
        let (_, mut editor) = editor();
        assert!(matches!(
            editor.complete_drawing(&triangle()),
            Err(ZoneError::InvalidTransition { .. })
        ));
        assert!(editor.cancel_dialog().is_err());
        assert!(editor.submit_manual_create(ManualCreateForm::default()).is_err());

        editor.open_manual_create().unwrap();
        assert!(editor.request_draw().is_err());
        assert!(editor.focus_zone(&ZoneId::from("nope")).is_err());
    }
}
