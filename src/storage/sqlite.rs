use super::KeyValueStore;
use crate::error::{Result, ZoneError};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite 键值存储
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ZoneError::StorageWrite(format!("创建目录失败: {}", e)))?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| ZoneError::StorageRead(format!("打开数据库失败: {}", e)))?;

        // 启用 WAL 模式，避免 journal 文件频繁出现/消失
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| ZoneError::StorageWrite(e.to_string()))?;

        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ZoneError::StorageRead(format!("打开数据库失败: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> Result<()> {
        self.conn
            .lock()
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS kv (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT DEFAULT CURRENT_TIMESTAMP
                );
                "#,
            )
            .map_err(|e| ZoneError::StorageWrite(format!("初始化表结构失败: {}", e)))
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .lock()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .map_err(|e| ZoneError::StorageRead(e.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .lock()
            .execute(
                r#"INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
                   ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP"#,
                params![key, value],
            )
            .map_err(|e| ZoneError::StorageWrite(e.to_string()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .lock()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(|e| ZoneError::StorageWrite(e.to_string()))?;
        Ok(())
    }

    fn backend(&self) -> &str {
        "sqlite"
    }
}
