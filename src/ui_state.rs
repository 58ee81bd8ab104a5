// 界面状态：运行状态、转录显示、提示信息

use serde::{Deserialize, Serialize};

use crate::config::HotkeyKey;
use crate::usage_stats::UsageStats;

/// 应用运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppStatus {
    #[default]
    Idle,
    Running,
    Recording,
    Transcribing,
    Polishing,
    AssistantProcessing,
}

impl AppStatus {
    /// 正在录音或处理中（此时不自动保存）
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            AppStatus::Recording
                | AppStatus::Transcribing
                | AppStatus::Polishing
                | AppStatus::AssistantProcessing
        )
    }
}

/// 限时显示的值
///
/// 每次 set 递增代数，过期清理只在代数未变时生效，
/// 这样旧的定时器不会清掉新显示的内容
#[derive(Debug, Clone, Default)]
pub struct Transient<T> {
    value: Option<T>,
    generation: u64,
}

impl<T> Transient<T> {
    pub fn set(&mut self, value: T) -> u64 {
        self.generation += 1;
        self.value = Some(value);
        self.generation
    }

    pub fn clear(&mut self) {
        self.generation += 1;
        self.value = None;
    }

    /// 仅当代数仍为 generation 时清除
    pub fn expire(&mut self, generation: u64) {
        if self.generation == generation {
            self.value = None;
        }
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub status: AppStatus,
    /// 常驻错误横幅，直到下一次用户操作覆盖
    pub error: Option<String>,

    // 最近一次转录
    pub transcript: String,
    pub original_transcript: Option<String>,
    pub current_mode: Option<String>,
    pub asr_time_ms: Option<u64>,
    pub llm_time_ms: Option<u64>,
    pub total_time_ms: Option<u64>,

    pub usage_stats: UsageStats,

    // 关闭确认对话框
    pub show_close_dialog: bool,
    pub remember_close_choice: bool,

    pub success_toast: Transient<()>,
    pub copy_toast: Transient<String>,

    // 热键录制
    pub is_recording_hotkey: bool,
    pub recording_keys: Vec<HotkeyKey>,
    pub hotkey_error: Transient<String>,

    pub duplicate_hint: Transient<()>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_expire_only_matches_latest() {
        let mut hint: Transient<String> = Transient::default();
        let first = hint.set("a".to_string());
        let second = hint.set("b".to_string());

        hint.expire(first);
        assert_eq!(hint.get().map(String::as_str), Some("b"));

        hint.expire(second);
        assert!(!hint.is_set());
    }

    #[test]
    fn test_busy_statuses() {
        assert!(AppStatus::Recording.is_busy());
        assert!(AppStatus::AssistantProcessing.is_busy());
        assert!(!AppStatus::Running.is_busy());
        assert!(!AppStatus::Idle.is_busy());
    }
}
