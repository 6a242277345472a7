//! 内存中的区域列表
//!
//! 插入顺序即显示顺序。每次修改后立即把整个列表序列化并覆盖存储；
//! 写入失败只记录日志，内存中的数据仍然是当前会话的准确状态。

use crate::error::{Result, ZoneError};
use crate::storage::KeyValueStore;
use crate::store::ZoneStore;
use crate::zone::{check_vertices, Zone, ZoneId, ZonePatch, ZoneRecord};

const NAME_PREFIX: &str = "Zone ";

pub struct ZoneRegistry<S: KeyValueStore> {
    zones: Vec<Zone>,
    store: ZoneStore<S>,
    durable: bool,
}

impl<S: KeyValueStore> ZoneRegistry<S> {
    pub fn new(store: ZoneStore<S>) -> Self {
        Self {
            zones: Vec::new(),
            store,
            durable: true,
        }
    }

    /// 从存储加载，跳过无效或重复的记录
    pub fn load(store: ZoneStore<S>) -> Self {
        let mut zones: Vec<Zone> = Vec::new();
        for record in store.load() {
            let id = record.id.clone();
            if zones.iter().any(|z| z.id == id) {
                log::warn!("跳过重复的区域记录: {}", id);
                continue;
            }
            match Zone::try_from(record) {
                Ok(zone) => zones.push(zone),
                Err(e) => log::warn!("跳过无效的区域记录 {}: {}", id, e),
            }
        }
        log::info!("已加载 {} 个区域", zones.len());

        Self {
            zones,
            store,
            durable: true,
        }
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn get(&self, id: &ZoneId) -> Option<&Zone> {
        self.zones.iter().find(|z| &z.id == id)
    }

    pub fn contains(&self, id: &ZoneId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// 最近一次同步是否成功写入存储
    pub fn is_durable(&self) -> bool {
        self.durable
    }

    pub fn records(&self) -> Vec<ZoneRecord> {
        self.zones.iter().map(Zone::to_record).collect()
    }

    pub fn add(&mut self, zone: Zone) -> Result<()> {
        if self.contains(&zone.id) {
            return Err(ZoneError::DuplicateZone(zone.id));
        }
        check_vertices(&zone.vertices)?;

        log::info!("新增区域: {} ({})", zone.name, zone.id);
        self.zones.push(zone);
        self.sync();
        Ok(())
    }

    pub fn replace(&mut self, id: &ZoneId, patch: ZonePatch) -> Result<&Zone> {
        let idx = self
            .zones
            .iter()
            .position(|z| &z.id == id)
            .ok_or_else(|| ZoneError::UnknownZone(id.clone()))?;

        {
            let zone = &mut self.zones[idx];
            match patch {
                ZonePatch::Attributes {
                    name,
                    description,
                    color,
                } => {
                    zone.name = name;
                    zone.description = description;
                    zone.color = color;
                }
                ZonePatch::Geometry(vertices) => {
                    check_vertices(&vertices)?;
                    zone.vertices = vertices;
                }
            }
            zone.touch();
        }

        self.sync();
        Ok(&self.zones[idx])
    }

    /// 移除区域；覆盖物由调用方通过 OverlayBinding 同步销毁
    pub fn remove(&mut self, id: &ZoneId) -> Option<Zone> {
        let idx = self.zones.iter().position(|z| &z.id == id)?;
        let zone = self.zones.remove(idx);
        log::info!("删除区域: {} ({})", zone.name, zone.id);
        self.sync();
        Some(zone)
    }

    /// 生成默认名称：现有 "Zone N" 中最大的 N 加 1，其他名称一律忽略
    ///
    /// 超出 u64 范围或无法再加 1 的编号同样忽略。
    pub fn generate_name(&self) -> String {
        let next = self
            .zones
            .iter()
            .filter_map(|z| z.name.strip_prefix(NAME_PREFIX))
            .filter(|suffix| !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()))
            .filter_map(|suffix| suffix.parse::<u64>().ok())
            .filter_map(|n| n.checked_add(1))
            .max()
            .unwrap_or(1);
        format!("{}{}", NAME_PREFIX, next)
    }

    fn sync(&mut self) {
        match self.store.save(&self.records()) {
            Ok(()) => self.durable = true,
            Err(e) => {
                log::error!("同步区域到存储失败: {}", e);
                self.durable = false;
            }
        }
    }
}
