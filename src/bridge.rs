// src/bridge.rs
//
// 后端命令/事件桥接
//
// 原生后端（ASR、LLM、全局热键、录音）运行在独立进程中，
// 这里只描述它对外暴露的命令和事件。

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{
    AppConfig, AsrConfig, AssistantConfig, CloseAction, DualHotkeyConfig, LlmConfig,
};
use crate::usage_stats::UsageStats;

// ============================================================================
// 命令参数
// ============================================================================

/// save_config / start_app 的完整参数（字段名与后端命令参数一致）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPayload {
    pub api_key: String,
    pub fallback_api_key: String,
    pub use_realtime: bool,
    pub enable_post_process: bool,
    pub llm_config: LlmConfig,
    pub assistant_config: AssistantConfig,
    pub asr_config: AsrConfig,
    pub dual_hotkey_config: DualHotkeyConfig,
    pub enable_mute_other_apps: bool,
    pub dictionary: Vec<String>,
    pub close_action: Option<CloseAction>,
}

/// update_runtime_config 的参数：无需重启即可生效的字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfigUpdate {
    pub enable_post_process: bool,
    pub llm_config: LlmConfig,
    pub assistant_config: AssistantConfig,
    pub enable_mute_other_apps: bool,
    pub dictionary: Vec<String>,
}

// ============================================================================
// 事件
// ============================================================================

/// 后端事件名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RecordingStarted,
    RecordingStopped,
    Transcribing,
    PostProcessing,
    TranscriptionComplete,
    Error,
    TranscriptionCancelled,
    CloseRequested,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::RecordingStarted,
        EventKind::RecordingStopped,
        EventKind::Transcribing,
        EventKind::PostProcessing,
        EventKind::TranscriptionComplete,
        EventKind::Error,
        EventKind::TranscriptionCancelled,
        EventKind::CloseRequested,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::RecordingStarted => "recording_started",
            EventKind::RecordingStopped => "recording_stopped",
            EventKind::Transcribing => "transcribing",
            EventKind::PostProcessing => "post_processing",
            EventKind::TranscriptionComplete => "transcription_complete",
            EventKind::Error => "error",
            EventKind::TranscriptionCancelled => "transcription_cancelled",
            EventKind::CloseRequested => "close_requested",
        }
    }
}

/// transcription_complete 事件载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    /// 润色前的原文；未经过 LLM 处理时为 None
    #[serde(default)]
    pub original_text: Option<String>,
    pub asr_time_ms: u64,
    #[serde(default)]
    pub llm_time_ms: Option<u64>,
    pub total_time_ms: u64,
    /// "normal" | "assistant"
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub inserted: Option<bool>,
}

/// 后端推送的事件
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    RecordingStarted,
    RecordingStopped,
    Transcribing,
    /// 载荷为处理模式: "polishing" | "assistant"
    PostProcessing(String),
    TranscriptionComplete(TranscriptionResult),
    Error(String),
    TranscriptionCancelled,
    CloseRequested,
}

impl BackendEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            BackendEvent::RecordingStarted => EventKind::RecordingStarted,
            BackendEvent::RecordingStopped => EventKind::RecordingStopped,
            BackendEvent::Transcribing => EventKind::Transcribing,
            BackendEvent::PostProcessing(_) => EventKind::PostProcessing,
            BackendEvent::TranscriptionComplete(_) => EventKind::TranscriptionComplete,
            BackendEvent::Error(_) => EventKind::Error,
            BackendEvent::TranscriptionCancelled => EventKind::TranscriptionCancelled,
            BackendEvent::CloseRequested => EventKind::CloseRequested,
        }
    }
}

pub type EventHandler = Arc<dyn Fn(BackendEvent) + Send + Sync>;

/// 取消监听的句柄，调用后不再投递事件
pub type Unlisten = Box<dyn FnOnce() + Send>;

// ============================================================================
// 后端接口
// ============================================================================

#[async_trait]
pub trait Backend: Send + Sync {
    async fn load_config(&self) -> Result<AppConfig>;
    async fn save_config(&self, payload: ConfigPayload) -> Result<()>;

    async fn start_app(&self, payload: ConfigPayload) -> Result<()>;
    async fn stop_app(&self) -> Result<()>;
    /// 热更新运行时配置（无需重启服务）
    async fn update_runtime_config(&self, update: RuntimeConfigUpdate) -> Result<()>;

    async fn get_autostart(&self) -> Result<bool>;
    async fn set_autostart(&self, enabled: bool) -> Result<()>;

    async fn get_hotkey_service_active(&self) -> Result<bool>;
    async fn set_hotkey_service_active(&self, active: bool) -> Result<()>;

    async fn cancel_transcription(&self) -> Result<()>;
    async fn quit_app(&self) -> Result<()>;
    async fn hide_to_tray(&self) -> Result<()>;

    async fn load_usage_stats(&self) -> Result<UsageStats>;

    /// 注册事件监听
    async fn listen(&self, kind: EventKind, handler: EventHandler) -> Result<Unlisten>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_uses_command_argument_names() {
        let payload = ConfigPayload {
            api_key: "k".to_string(),
            fallback_api_key: String::new(),
            use_realtime: true,
            enable_post_process: false,
            llm_config: LlmConfig::default(),
            assistant_config: AssistantConfig::default(),
            asr_config: AsrConfig::default(),
            dual_hotkey_config: DualHotkeyConfig::default(),
            enable_mute_other_apps: false,
            dictionary: vec![],
            close_action: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["apiKey"], "k");
        assert_eq!(value["useRealtime"], true);
        assert!(value.get("dualHotkeyConfig").is_some());
        assert!(value["closeAction"].is_null());
        assert_eq!(
            value["dualHotkeyConfig"]["dictation"]["keys"][0],
            "control_left"
        );
    }

    #[test]
    fn test_event_kind_names() {
        assert_eq!(EventKind::ALL.len(), 8);
        for kind in EventKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_transcription_result_accepts_null_original() {
        let result: TranscriptionResult = serde_json::from_str(
            r#"{"text":"hi","original_text":null,"asr_time_ms":120,"llm_time_ms":null,"total_time_ms":150}"#,
        )
        .unwrap();
        assert!(result.original_text.is_none());
        assert!(result.mode.is_none());
        assert_eq!(result.asr_time_ms, 120);
    }
}
