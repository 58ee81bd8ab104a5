// 历史记录：最新在前，最多保留 MAX_HISTORY 条，每次追加后写入本地存储

use serde::{Deserialize, Serialize};

use crate::bridge::TranscriptionResult;
use crate::local_store::LocalStore;

pub const MAX_HISTORY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryMode {
    Normal,
    Assistant,
}

impl HistoryMode {
    /// 后端 mode 字段："normal" / "assistant"，其他值视为未知
    pub fn parse(mode: Option<&str>) -> Option<Self> {
        match mode {
            Some("normal") => Some(HistoryMode::Normal),
            Some("assistant") => Some(HistoryMode::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: String,
    /// 毫秒时间戳
    pub timestamp: i64,
    pub original_text: String,
    pub polished_text: Option<String>,
    pub preset_name: Option<String>,
    pub mode: Option<HistoryMode>,
    pub asr_time_ms: u64,
    pub llm_time_ms: Option<u64>,
    pub total_time_ms: u64,
    pub success: bool,
    pub error_message: Option<String>,
}

/// 8 位短 ID
pub fn short_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

impl HistoryRecord {
    /// 由转录结果生成成功记录
    ///
    /// 只有经过润色（存在原文）且不是助手模式时才记录预设名
    pub fn from_transcription(result: &TranscriptionResult, active_preset_name: Option<&str>) -> Self {
        let mode = HistoryMode::parse(result.mode.as_deref());
        let polished = result.original_text.is_some();
        let preset_name = if polished && mode != Some(HistoryMode::Assistant) {
            active_preset_name.map(str::to_string)
        } else {
            None
        };

        Self {
            id: short_id(),
            timestamp: now_millis(),
            original_text: result
                .original_text
                .clone()
                .unwrap_or_else(|| result.text.clone()),
            polished_text: polished.then(|| result.text.clone()),
            preset_name,
            mode,
            asr_time_ms: result.asr_time_ms,
            llm_time_ms: result.llm_time_ms,
            total_time_ms: result.total_time_ms,
            success: true,
            error_message: None,
        }
    }

    /// 失败记录
    pub fn from_error(message: &str) -> Self {
        Self {
            id: short_id(),
            timestamp: now_millis(),
            original_text: String::new(),
            polished_text: None,
            preset_name: None,
            mode: None,
            asr_time_ms: 0,
            llm_time_ms: None,
            total_time_ms: 0,
            success: false,
            error_message: Some(message.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    records: Vec<HistoryRecord>,
}

impl HistoryLog {
    pub fn load(store: &LocalStore) -> Self {
        let mut records = store.load_history();
        records.truncate(MAX_HISTORY);
        Self { records }
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 插入到最前，超出上限时丢弃最旧的记录
    pub fn push(&mut self, record: HistoryRecord) {
        self.records.insert(0, record);
        self.records.truncate(MAX_HISTORY);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn persist(&self, store: &LocalStore) {
        if let Err(e) = store.save_history(&self.records) {
            tracing::error!("保存历史记录失败: {}", e);
        }
    }
}
