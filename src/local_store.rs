// 本地持久化存储
//
// 与后端配置独立，保存：
// - 历史记录（最多 50 条）
// - 旧版凭据/词库缓存（迁移完成后删除）
// - 最近一次看到的应用版本号
//
// 每个 key 对应一个 JSON 文件，写入采用临时文件 + 原子替换

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::history::HistoryRecord;
use crate::migration::LegacyAsrCache;

pub const HISTORY_KEY: &str = "history";
pub const ASR_CACHE_KEY: &str = "asr_cache";
pub const DICTIONARY_KEY: &str = "dictionary";
pub const LAST_SEEN_VERSION_KEY: &str = "last_seen_version";

lazy_static::lazy_static! {
    // 串行化所有文件写入（读-改-写不交错）
    static ref STORE_LOCK: Mutex<()> = Mutex::new(());
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// 默认位置：<config_dir>/PushToTalk/console
    pub fn open_default() -> Result<Self> {
        let dir = dirs::config_dir()
            .context("无法获取配置目录")?
            .join("PushToTalk")
            .join("console");
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("创建本地存储目录失败: {:?}", dir))?;
        Ok(Self { dir })
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    pub fn exists(&self, key: &str) -> bool {
        self.path(key).exists()
    }

    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content =
            std::fs::read_to_string(&path).with_context(|| format!("读取 {:?} 失败", path))?;
        let value = serde_json::from_str(&content)
            .with_context(|| format!("解析 {:?} 失败", path))?;
        Ok(Some(value))
    }

    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let _guard = STORE_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::fs::create_dir_all(&self.dir)?;

        let path = self.path(key);
        let content = serde_json::to_string_pretty(value)?;
        let temp_path = path.with_extension("json.tmp");
        let backup_path = path.with_extension("json.bak");

        std::fs::write(&temp_path, &content).map_err(|e| {
            tracing::error!("写入临时文件失败: {}", e);
            e
        })?;

        if path.exists() {
            if backup_path.exists() {
                let _ = std::fs::remove_file(&backup_path);
            }
            std::fs::rename(&path, &backup_path)?;
        }

        match std::fs::rename(&temp_path, &path) {
            Ok(_) => {
                let _ = std::fs::remove_file(&backup_path);
                Ok(())
            }
            Err(e) => {
                tracing::error!("替换 {:?} 失败: {}", path, e);
                if backup_path.exists() {
                    if let Err(restore_err) = std::fs::rename(&backup_path, &path) {
                        tracing::error!("恢复备份失败: {}", restore_err);
                    }
                }
                Err(e.into())
            }
        }
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let _guard = STORE_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.path(key);
        if path.exists() {
            std::fs::remove_file(&path).with_context(|| format!("删除 {:?} 失败", path))?;
        }
        Ok(())
    }

    // ========================================================================
    // 历史记录
    // ========================================================================

    /// 读取历史记录；文件损坏时返回空列表
    pub fn load_history(&self) -> Vec<HistoryRecord> {
        match self.read::<Vec<HistoryRecord>>(HISTORY_KEY) {
            Ok(records) => records.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("加载历史记录失败，使用空列表: {}", e);
                Vec::new()
            }
        }
    }

    pub fn save_history(&self, records: &[HistoryRecord]) -> Result<()> {
        self.write(HISTORY_KEY, &records)
    }

    // ========================================================================
    // 旧版缓存
    // ========================================================================

    pub fn legacy_asr_cache(&self) -> Option<LegacyAsrCache> {
        match self.read::<LegacyAsrCache>(ASR_CACHE_KEY) {
            Ok(cache) => cache,
            Err(e) => {
                tracing::warn!("[迁移] 旧版凭据缓存无法解析: {}", e);
                None
            }
        }
    }

    /// 旧版词库缓存，只保留字符串元素
    pub fn legacy_dictionary(&self) -> Vec<String> {
        match self.read::<serde_json::Value>(DICTIONARY_KEY) {
            Ok(Some(serde_json::Value::Array(items))) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Ok(_) => Vec::new(),
            Err(e) => {
                tracing::warn!("[迁移] 旧版词库缓存无法解析: {}", e);
                Vec::new()
            }
        }
    }

    pub fn remove_legacy_caches(&self) -> Result<()> {
        self.remove(ASR_CACHE_KEY)?;
        self.remove(DICTIONARY_KEY)
    }

    // ========================================================================
    // 版本号
    // ========================================================================

    pub fn last_seen_version(&self) -> Option<String> {
        self.read::<String>(LAST_SEEN_VERSION_KEY).ok().flatten()
    }

    pub fn set_last_seen_version(&self, version: &str) -> Result<()> {
        self.write(LAST_SEEN_VERSION_KEY, &version)
    }
}
