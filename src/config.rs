// src/config.rs
//
// 配置数据模型：与后端 load_config / save_config 交换的文档结构，
// 以及内置默认值（预设、AI 助手提示词、双快捷键）。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

// ============================================================================
// 热键配置
// ============================================================================

/// 热键配置支持的按键类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HotkeyKey {
    // 修饰键
    ControlLeft,
    ControlRight,
    ShiftLeft,
    ShiftRight,
    AltLeft,
    AltRight,
    MetaLeft,  // Win/Cmd 左
    MetaRight, // Win/Cmd 右

    // 功能键
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,

    // 常用键
    Space,
    Tab,
    CapsLock,
    Escape,

    // 字母键
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF,
    KeyG,
    KeyH,
    KeyI,
    KeyJ,
    KeyK,
    KeyL,
    KeyM,
    KeyN,
    KeyO,
    KeyP,
    KeyQ,
    KeyR,
    KeyS,
    KeyT,
    KeyU,
    KeyV,
    KeyW,
    KeyX,
    KeyY,
    KeyZ,

    // 数字键（后端使用 num_0 形式）
    #[serde(rename = "num_0")]
    Num0,
    #[serde(rename = "num_1")]
    Num1,
    #[serde(rename = "num_2")]
    Num2,
    #[serde(rename = "num_3")]
    Num3,
    #[serde(rename = "num_4")]
    Num4,
    #[serde(rename = "num_5")]
    Num5,
    #[serde(rename = "num_6")]
    Num6,
    #[serde(rename = "num_7")]
    Num7,
    #[serde(rename = "num_8")]
    Num8,
    #[serde(rename = "num_9")]
    Num9,

    // 方向键
    Up,
    Down,
    Left,
    Right,

    // 编辑键
    Return,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
}

impl HotkeyKey {
    /// 判断是否为修饰键
    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            HotkeyKey::ControlLeft
                | HotkeyKey::ControlRight
                | HotkeyKey::ShiftLeft
                | HotkeyKey::ShiftRight
                | HotkeyKey::AltLeft
                | HotkeyKey::AltRight
                | HotkeyKey::MetaLeft
                | HotkeyKey::MetaRight
        )
    }

    /// 判断是否为功能键 (F1-F12)
    pub fn is_function_key(&self) -> bool {
        matches!(
            self,
            HotkeyKey::F1
                | HotkeyKey::F2
                | HotkeyKey::F3
                | HotkeyKey::F4
                | HotkeyKey::F5
                | HotkeyKey::F6
                | HotkeyKey::F7
                | HotkeyKey::F8
                | HotkeyKey::F9
                | HotkeyKey::F10
                | HotkeyKey::F11
                | HotkeyKey::F12
        )
    }

    /// 界面显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            HotkeyKey::ControlLeft => "Ctrl(左)",
            HotkeyKey::ControlRight => "Ctrl(右)",
            HotkeyKey::ShiftLeft => "Shift(左)",
            HotkeyKey::ShiftRight => "Shift(右)",
            HotkeyKey::AltLeft => "Alt(左)",
            HotkeyKey::AltRight => "Alt(右)",
            HotkeyKey::MetaLeft => "Win(左)",
            HotkeyKey::MetaRight => "Win(右)",
            HotkeyKey::Space => "Space",
            HotkeyKey::Tab => "Tab",
            HotkeyKey::CapsLock => "CapsLock",
            HotkeyKey::Escape => "Esc",
            HotkeyKey::F1 => "F1",
            HotkeyKey::F2 => "F2",
            HotkeyKey::F3 => "F3",
            HotkeyKey::F4 => "F4",
            HotkeyKey::F5 => "F5",
            HotkeyKey::F6 => "F6",
            HotkeyKey::F7 => "F7",
            HotkeyKey::F8 => "F8",
            HotkeyKey::F9 => "F9",
            HotkeyKey::F10 => "F10",
            HotkeyKey::F11 => "F11",
            HotkeyKey::F12 => "F12",
            HotkeyKey::KeyA => "A",
            HotkeyKey::KeyB => "B",
            HotkeyKey::KeyC => "C",
            HotkeyKey::KeyD => "D",
            HotkeyKey::KeyE => "E",
            HotkeyKey::KeyF => "F",
            HotkeyKey::KeyG => "G",
            HotkeyKey::KeyH => "H",
            HotkeyKey::KeyI => "I",
            HotkeyKey::KeyJ => "J",
            HotkeyKey::KeyK => "K",
            HotkeyKey::KeyL => "L",
            HotkeyKey::KeyM => "M",
            HotkeyKey::KeyN => "N",
            HotkeyKey::KeyO => "O",
            HotkeyKey::KeyP => "P",
            HotkeyKey::KeyQ => "Q",
            HotkeyKey::KeyR => "R",
            HotkeyKey::KeyS => "S",
            HotkeyKey::KeyT => "T",
            HotkeyKey::KeyU => "U",
            HotkeyKey::KeyV => "V",
            HotkeyKey::KeyW => "W",
            HotkeyKey::KeyX => "X",
            HotkeyKey::KeyY => "Y",
            HotkeyKey::KeyZ => "Z",
            HotkeyKey::Num0 => "0",
            HotkeyKey::Num1 => "1",
            HotkeyKey::Num2 => "2",
            HotkeyKey::Num3 => "3",
            HotkeyKey::Num4 => "4",
            HotkeyKey::Num5 => "5",
            HotkeyKey::Num6 => "6",
            HotkeyKey::Num7 => "7",
            HotkeyKey::Num8 => "8",
            HotkeyKey::Num9 => "9",
            HotkeyKey::Up => "↑",
            HotkeyKey::Down => "↓",
            HotkeyKey::Left => "←",
            HotkeyKey::Right => "→",
            HotkeyKey::Return => "Enter",
            HotkeyKey::Backspace => "Backspace",
            HotkeyKey::Delete => "Delete",
            HotkeyKey::Insert => "Insert",
            HotkeyKey::Home => "Home",
            HotkeyKey::End => "End",
            HotkeyKey::PageUp => "PageUp",
            HotkeyKey::PageDown => "PageDown",
        }
    }
}

/// 热键组合校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HotkeyError {
    #[error("热键配置不能为空")]
    Empty,
    #[error("必须包含修饰键(Ctrl/Alt/Shift/Win) 或 功能键(F1-F12)")]
    MissingModifier,
}

/// 校验一组按键：必须包含修饰键，或全部为功能键
pub fn validate_key_set(keys: &[HotkeyKey]) -> Result<(), HotkeyError> {
    if keys.is_empty() {
        return Err(HotkeyError::Empty);
    }

    let has_modifier = keys.iter().any(|k| k.is_modifier());
    let all_function_keys = keys.iter().all(|k| k.is_function_key());
    if !has_modifier && !all_function_keys {
        return Err(HotkeyError::MissingModifier);
    }

    Ok(())
}

/// 格式化为显示字符串，如 "Ctrl(左)+Win(左)"
pub fn format_keys(keys: &[HotkeyKey]) -> String {
    keys.iter()
        .map(|k| k.display_name())
        .collect::<Vec<_>>()
        .join("+")
}

/// 单个快捷键配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyConfig {
    /// 需要同时按下的按键列表（按按下顺序）
    #[serde(default)]
    pub keys: Vec<HotkeyKey>,
    /// 松手模式独立快捷键（仅听写模式使用）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_mode_keys: Option<Vec<HotkeyKey>>,
}

impl HotkeyConfig {
    pub fn with_keys(keys: Vec<HotkeyKey>) -> Self {
        Self {
            keys,
            release_mode_keys: None,
        }
    }

    /// 校验主快捷键与松手模式快捷键
    pub fn validate(&self) -> Result<(), HotkeyError> {
        validate_key_set(&self.keys)?;
        if let Some(ref release_keys) = self.release_mode_keys {
            validate_key_set(release_keys)?;
        }
        Ok(())
    }

    /// 格式化为显示字符串（用于日志）
    pub fn format_display(&self) -> String {
        format_keys(&self.keys)
    }
}

// ============================================================================
// 双快捷键配置
// ============================================================================

pub const DEFAULT_DICTATION_KEYS: [HotkeyKey; 2] = [HotkeyKey::ControlLeft, HotkeyKey::MetaLeft];
pub const DEFAULT_ASSISTANT_KEYS: [HotkeyKey; 2] = [HotkeyKey::AltLeft, HotkeyKey::Space];
pub const DEFAULT_RELEASE_MODE_KEYS: [HotkeyKey; 1] = [HotkeyKey::F2];

/// 双快捷键配置：听写模式 + AI 助手模式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DualHotkeyConfig {
    /// 听写模式快捷键（默认 Ctrl+Win，松手模式默认 F2）
    #[serde(default = "default_dictation_hotkey")]
    pub dictation: HotkeyConfig,
    /// AI助手模式快捷键（默认 Alt+Space）
    #[serde(default = "default_assistant_hotkey")]
    pub assistant: HotkeyConfig,
}

fn default_dictation_hotkey() -> HotkeyConfig {
    HotkeyConfig {
        keys: DEFAULT_DICTATION_KEYS.to_vec(),
        release_mode_keys: Some(DEFAULT_RELEASE_MODE_KEYS.to_vec()),
    }
}

fn default_assistant_hotkey() -> HotkeyConfig {
    HotkeyConfig::with_keys(DEFAULT_ASSISTANT_KEYS.to_vec())
}

impl Default for DualHotkeyConfig {
    fn default() -> Self {
        Self {
            dictation: default_dictation_hotkey(),
            assistant: default_assistant_hotkey(),
        }
    }
}

impl DualHotkeyConfig {
    /// 由旧版单快捷键配置推导：旧快捷键用于听写，助手使用默认值
    pub fn from_legacy(legacy: HotkeyConfig) -> Self {
        Self {
            dictation: legacy,
            assistant: default_assistant_hotkey(),
        }
    }

    /// 两组快捷键是否使用了完全相同的按键集合
    pub fn has_identical_bindings(&self) -> bool {
        let dictation: HashSet<_> = self.dictation.keys.iter().collect();
        let assistant: HashSet<_> = self.assistant.keys.iter().collect();
        dictation == assistant
    }
}

// ============================================================================
// ASR 配置
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AsrProvider {
    #[default]
    Qwen,
    Doubao,
    #[serde(rename = "siliconflow")]
    SiliconFlow,
}

impl AsrProvider {
    pub fn display_name(&self) -> &'static str {
        match self {
            AsrProvider::Qwen => "阿里千问",
            AsrProvider::Doubao => "豆包",
            AsrProvider::SiliconFlow => "硅基流动",
        }
    }

    /// 从旧版缓存中的字符串解析，未知值返回 None
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "qwen" => Some(AsrProvider::Qwen),
            "doubao" => Some(AsrProvider::Doubao),
            "siliconflow" => Some(AsrProvider::SiliconFlow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AsrCredentials {
    #[serde(default)]
    pub qwen_api_key: String,
    #[serde(default)]
    pub sensevoice_api_key: String,
    #[serde(default)]
    pub doubao_app_id: String,
    #[serde(default)]
    pub doubao_access_token: String,
}

impl AsrCredentials {
    /// 是否存在任意一项非空凭据
    pub fn has_any(&self) -> bool {
        [
            &self.qwen_api_key,
            &self.sensevoice_api_key,
            &self.doubao_app_id,
            &self.doubao_access_token,
        ]
        .iter()
        .any(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AsrSelection {
    #[serde(default)]
    pub active_provider: AsrProvider,
    #[serde(default)]
    pub enable_fallback: bool,
    /// 备用服务商；不校验是否与主服务商相同
    #[serde(default)]
    pub fallback_provider: Option<AsrProvider>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AsrConfig {
    #[serde(default)]
    pub credentials: AsrCredentials,
    #[serde(default)]
    pub selection: AsrSelection,
}

impl AsrConfig {
    /// 当前服务商所需的凭据是否都已填写
    pub fn is_valid(&self) -> bool {
        let creds = &self.credentials;
        match self.selection.active_provider {
            AsrProvider::Qwen => !creds.qwen_api_key.trim().is_empty(),
            AsrProvider::Doubao => {
                !creds.doubao_app_id.trim().is_empty()
                    && !creds.doubao_access_token.trim().is_empty()
            }
            AsrProvider::SiliconFlow => !creds.sensevoice_api_key.trim().is_empty(),
        }
    }
}

// ============================================================================
// LLM 润色配置
// ============================================================================

pub const DEFAULT_LLM_ENDPOINT: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "glm-4-flash-250414";
pub const DEFAULT_ACTIVE_PRESET_ID: &str = "polishing";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmPreset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub system_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    /// 预设列表（id 唯一）
    #[serde(default)]
    pub presets: Vec<LlmPreset>,
    /// 当前选中的预设ID
    #[serde(default)]
    pub active_preset_id: String,
}

fn default_llm_endpoint() -> String {
    DEFAULT_LLM_ENDPOINT.to_string()
}

fn default_llm_model() -> String {
    DEFAULT_LLM_MODEL.to_string()
}

/// 内置预设
pub fn default_presets() -> Vec<LlmPreset> {
    vec![
        LlmPreset {
            id: "polishing".to_string(),
            name: "文本润色".to_string(),
            system_prompt: "你是一个语音转写润色助手。请在不改变原意的前提下：1）删除重复或意义相近的句子；2）合并同一主题的内容；3）去除「嗯」「啊」等口头禅；4）保留数字与关键信息；5）相关数字和时间不要使用中文；6）整理成自然的段落。输出纯文本即可。".to_string(),
        },
        LlmPreset {
            id: "email".to_string(),
            name: "邮件整理".to_string(),
            system_prompt: "你是一个专业的邮件助手。请将用户的语音转写内容整理成一封格式规范、语气得体的工作邮件。请提取核心意图，补充必要的开场白和结语。输出仅包含邮件正文。".to_string(),
        },
        LlmPreset {
            id: "translation".to_string(),
            name: "中译英".to_string(),
            system_prompt: "你是一个专业的翻译助手。请将用户的中文语音转写内容翻译成地道、流畅的英文。不要输出任何解释性文字，只输出翻译结果。".to_string(),
        },
    ]
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            api_key: String::new(),
            presets: default_presets(),
            active_preset_id: DEFAULT_ACTIVE_PRESET_ID.to_string(),
        }
    }
}

impl LlmConfig {
    /// 修复预设列表：
    /// - 列表为空 → 注入内置预设
    /// - 选中的预设不存在 → 选中第一个
    ///
    /// 返回是否发生了修复
    pub fn repair_presets(&mut self) -> bool {
        if self.presets.is_empty() {
            tracing::warn!("[配置修复] 检测到空 presets，使用默认值");
            self.presets = default_presets();
            self.active_preset_id = DEFAULT_ACTIVE_PRESET_ID.to_string();
            return true;
        }

        if !self.presets.iter().any(|p| p.id == self.active_preset_id) {
            tracing::warn!(
                "[配置修复] 选中的预设 {} 不存在，改为第一个预设",
                self.active_preset_id
            );
            self.active_preset_id = self.presets[0].id.clone();
            return true;
        }

        false
    }

    pub fn active_preset(&self) -> Option<&LlmPreset> {
        self.presets
            .iter()
            .find(|p| p.id == self.active_preset_id)
            .or_else(|| self.presets.first())
    }
}

// ============================================================================
// AI 助手配置
// ============================================================================

/// AI 助手默认系统提示词 - 问答模式（无选中文本）
pub const DEFAULT_ASSISTANT_QA_PROMPT: &str = r#"你是一个智能语音助手。用户会通过语音向你提问，你需要：
1. 理解用户的问题
2. 给出简洁、准确、有用的回答
3. 如果问题不够明确，给出最可能的解答
注意：
- 回答要简洁明了，适合直接粘贴使用
- 避免过多的解释和废话
- 如果是代码相关问题，直接给出代码"#;

/// AI 助手默认系统提示词 - 文本处理模式（有选中文本）
pub const DEFAULT_ASSISTANT_TEXT_PROCESSING_PROMPT: &str = r#"你是一个文本处理助手。用户会选中一段文本，然后通过语音告诉你要如何处理这段文本。
你的任务：
1. 理解用户的语音指令
2. 对选中的文本执行相应操作（润色、翻译、总结、改写等）
3. 直接输出处理后的文本
注意：
- 只输出处理后的结果，不要输出任何解释
- 保持原文的格式和结构（除非用户要求改变）
- 如果指令不明确，按最合理的方式处理"#;

/// AI 助手配置（双系统提示词）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    /// 问答模式提示词
    #[serde(default)]
    pub qa_system_prompt: String,
    /// 文本处理提示词
    #[serde(default)]
    pub text_processing_system_prompt: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            api_key: String::new(),
            qa_system_prompt: DEFAULT_ASSISTANT_QA_PROMPT.to_string(),
            text_processing_system_prompt: DEFAULT_ASSISTANT_TEXT_PROCESSING_PROMPT.to_string(),
        }
    }
}

impl AssistantConfig {
    /// 两个提示词是否都已填写
    pub fn is_complete(&self) -> bool {
        !self.qa_system_prompt.is_empty() && !self.text_processing_system_prompt.is_empty()
    }
}

// ============================================================================
// 关闭行为
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloseAction {
    /// 直接退出
    Close,
    /// 最小化到托盘
    Minimize,
}

// ============================================================================
// 后端配置文档
// ============================================================================

/// load_config 返回的完整配置文档
///
/// 所有字段都允许缺失，缺失项在 ConfigStore::load 中补齐
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub dashscope_api_key: String,
    #[serde(default)]
    pub siliconflow_api_key: String,
    #[serde(default)]
    pub asr_config: Option<AsrConfig>,
    #[serde(default)]
    pub use_realtime_asr: Option<bool>,
    #[serde(default)]
    pub enable_llm_post_process: Option<bool>,
    #[serde(default)]
    pub llm_config: Option<LlmConfig>,
    #[serde(default)]
    pub assistant_config: Option<AssistantConfig>,
    /// 关闭行为: None = 每次询问
    #[serde(default)]
    pub close_action: Option<CloseAction>,
    /// 热键配置（旧版，保留以便迁移）
    #[serde(default)]
    pub hotkey_config: Option<HotkeyConfig>,
    /// 双快捷键配置（新版）
    #[serde(default)]
    pub dual_hotkey_config: Option<DualHotkeyConfig>,
    #[serde(default)]
    pub enable_mute_other_apps: Option<bool>,
    #[serde(default)]
    pub dictionary: Option<Vec<String>>,
}

impl AppConfig {
    /// 后端是否已持有任意 ASR 凭据
    pub fn has_asr_credentials(&self) -> bool {
        self.asr_config
            .as_ref()
            .map(|c| c.credentials.has_any())
            .unwrap_or(false)
    }
}
