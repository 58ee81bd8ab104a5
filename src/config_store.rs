// src/config_store.rs
//
// 内存中的完整配置
//
// 启动时从后端加载（必要时先执行一次旧版数据迁移），加载后补齐缺失或
// 不完整的字段；之后所有修改都在这里完成，持久化交给 SyncCoordinator。

use anyhow::Result;

use crate::bridge::{Backend, ConfigPayload, RuntimeConfigUpdate};
use crate::config::{
    AppConfig, AsrConfig, AssistantConfig, CloseAction, DualHotkeyConfig, LlmConfig,
};
use crate::dictionary::normalize_words;
use crate::local_store::LocalStore;
use crate::migration;

// ============================================================================
// 设置
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// 旧版 DashScope Key（后端字段 dashscope_api_key）
    pub api_key: String,
    /// 旧版备用 Key（后端字段 siliconflow_api_key）
    pub fallback_api_key: String,
    pub asr_config: AsrConfig,
    pub use_realtime: bool,
    pub enable_post_process: bool,
    pub llm_config: LlmConfig,
    pub assistant_config: AssistantConfig,
    pub dual_hotkey_config: DualHotkeyConfig,
    pub enable_mute_other_apps: bool,
    pub dictionary: Vec<String>,
    /// None = 每次询问
    pub close_action: Option<CloseAction>,
    /// 与系统开机自启注册状态同步，不写入配置文档
    pub enable_autostart: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            fallback_api_key: String::new(),
            asr_config: AsrConfig::default(),
            use_realtime: true,
            enable_post_process: false,
            llm_config: LlmConfig::default(),
            assistant_config: AssistantConfig::default(),
            dual_hotkey_config: DualHotkeyConfig::default(),
            enable_mute_other_apps: false,
            dictionary: Vec::new(),
            close_action: None,
            enable_autostart: false,
        }
    }
}

impl Settings {
    /// 由后端文档构建，并补齐缺失字段
    pub fn from_document(doc: AppConfig) -> Self {
        let mut llm_config = doc.llm_config.unwrap_or_default();
        llm_config.repair_presets();

        // 任一提示词为空则整体回退默认值
        let assistant_config = match doc.assistant_config {
            Some(config) if config.is_complete() => config,
            Some(_) => {
                tracing::warn!("[配置修复] 检测到不完整的 assistant_config，使用默认值");
                AssistantConfig::default()
            }
            None => AssistantConfig::default(),
        };

        let dual_hotkey_config = match (doc.dual_hotkey_config, doc.hotkey_config) {
            (Some(dual), _) => dual,
            (None, Some(legacy)) if !legacy.keys.is_empty() => {
                tracing::info!(
                    "[配置修复] 由旧版热键 {} 推导双快捷键配置",
                    legacy.format_display()
                );
                DualHotkeyConfig::from_legacy(legacy)
            }
            _ => DualHotkeyConfig::default(),
        };

        Self {
            api_key: doc.dashscope_api_key,
            fallback_api_key: doc.siliconflow_api_key,
            asr_config: doc.asr_config.unwrap_or_default(),
            use_realtime: doc.use_realtime_asr.unwrap_or(true),
            enable_post_process: doc.enable_llm_post_process.unwrap_or(false),
            llm_config,
            assistant_config,
            dual_hotkey_config,
            enable_mute_other_apps: doc.enable_mute_other_apps.unwrap_or(false),
            dictionary: normalize_words(doc.dictionary.unwrap_or_default()),
            close_action: doc.close_action,
            enable_autostart: false,
        }
    }

    /// save_config / start_app 参数（空词条不写入）
    pub fn to_payload(&self) -> ConfigPayload {
        ConfigPayload {
            api_key: self.api_key.clone(),
            fallback_api_key: self.fallback_api_key.clone(),
            use_realtime: self.use_realtime,
            enable_post_process: self.enable_post_process,
            llm_config: self.llm_config.clone(),
            assistant_config: self.assistant_config.clone(),
            asr_config: self.asr_config.clone(),
            dual_hotkey_config: self.dual_hotkey_config.clone(),
            enable_mute_other_apps: self.enable_mute_other_apps,
            dictionary: self.valid_dictionary(),
            close_action: self.close_action,
        }
    }

    /// 可热更新的字段
    pub fn runtime_subset(&self) -> RuntimeConfigUpdate {
        RuntimeConfigUpdate {
            enable_post_process: self.enable_post_process,
            llm_config: self.llm_config.clone(),
            assistant_config: self.assistant_config.clone(),
            enable_mute_other_apps: self.enable_mute_other_apps,
            dictionary: self.valid_dictionary(),
        }
    }

    pub fn valid_dictionary(&self) -> Vec<String> {
        self.dictionary
            .iter()
            .filter(|w| !w.trim().is_empty())
            .cloned()
            .collect()
    }

    /// 用调用方传入的最新值覆盖当前设置
    pub fn merged(&self, overrides: &ConfigOverrides) -> Settings {
        let mut merged = self.clone();
        if let Some(v) = overrides.use_realtime {
            merged.use_realtime = v;
        }
        if let Some(v) = overrides.enable_post_process {
            merged.enable_post_process = v;
        }
        if let Some(ref v) = overrides.llm_config {
            merged.llm_config = v.clone();
        }
        if let Some(ref v) = overrides.assistant_config {
            merged.assistant_config = v.clone();
        }
        if let Some(ref v) = overrides.asr_config {
            merged.asr_config = v.clone();
        }
        if let Some(ref v) = overrides.dual_hotkey_config {
            merged.dual_hotkey_config = v.clone();
        }
        if let Some(v) = overrides.enable_mute_other_apps {
            merged.enable_mute_other_apps = v;
        }
        if let Some(ref v) = overrides.dictionary {
            merged.dictionary = v.clone();
        }
        merged
    }

    /// 应用单项修改，返回修改前的值（用于回滚）
    pub fn apply(&mut self, change: SettingChange) -> SettingChange {
        match change {
            SettingChange::AsrConfig(v) => {
                SettingChange::AsrConfig(std::mem::replace(&mut self.asr_config, v))
            }
            SettingChange::UseRealtime(v) => {
                SettingChange::UseRealtime(std::mem::replace(&mut self.use_realtime, v))
            }
            SettingChange::EnablePostProcess(v) => SettingChange::EnablePostProcess(
                std::mem::replace(&mut self.enable_post_process, v),
            ),
            SettingChange::LlmConfig(v) => {
                SettingChange::LlmConfig(std::mem::replace(&mut self.llm_config, v))
            }
            SettingChange::AssistantConfig(v) => {
                SettingChange::AssistantConfig(std::mem::replace(&mut self.assistant_config, v))
            }
            SettingChange::DualHotkeyConfig(v) => SettingChange::DualHotkeyConfig(
                std::mem::replace(&mut self.dual_hotkey_config, v),
            ),
            SettingChange::EnableMuteOtherApps(v) => SettingChange::EnableMuteOtherApps(
                std::mem::replace(&mut self.enable_mute_other_apps, v),
            ),
            SettingChange::Dictionary(v) => {
                SettingChange::Dictionary(std::mem::replace(&mut self.dictionary, v))
            }
        }
    }
}

// ============================================================================
// 覆盖值与单项修改
// ============================================================================

/// 即时保存时由调用方显式传入的最新值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub use_realtime: Option<bool>,
    pub enable_post_process: Option<bool>,
    pub llm_config: Option<LlmConfig>,
    pub assistant_config: Option<AssistantConfig>,
    pub asr_config: Option<AsrConfig>,
    pub dual_hotkey_config: Option<DualHotkeyConfig>,
    pub enable_mute_other_apps: Option<bool>,
    pub dictionary: Option<Vec<String>>,
}

/// 需要即时生效的单项设置修改
#[derive(Debug, Clone, PartialEq)]
pub enum SettingChange {
    AsrConfig(AsrConfig),
    UseRealtime(bool),
    EnablePostProcess(bool),
    LlmConfig(LlmConfig),
    AssistantConfig(AssistantConfig),
    DualHotkeyConfig(DualHotkeyConfig),
    EnableMuteOtherApps(bool),
    Dictionary(Vec<String>),
}

impl SettingChange {
    pub fn to_overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::default();
        match self {
            SettingChange::AsrConfig(v) => overrides.asr_config = Some(v.clone()),
            SettingChange::UseRealtime(v) => overrides.use_realtime = Some(*v),
            SettingChange::EnablePostProcess(v) => overrides.enable_post_process = Some(*v),
            SettingChange::LlmConfig(v) => overrides.llm_config = Some(v.clone()),
            SettingChange::AssistantConfig(v) => overrides.assistant_config = Some(v.clone()),
            SettingChange::DualHotkeyConfig(v) => overrides.dual_hotkey_config = Some(v.clone()),
            SettingChange::EnableMuteOtherApps(v) => overrides.enable_mute_other_apps = Some(*v),
            SettingChange::Dictionary(v) => overrides.dictionary = Some(v.clone()),
        }
        overrides
    }
}

// ============================================================================
// ConfigStore
// ============================================================================

#[derive(Debug, Default)]
pub struct ConfigStore {
    settings: Settings,
    loaded: bool,
}

impl ConfigStore {
    /// 从后端加载配置
    ///
    /// 后端尚无任何 ASR 凭据而本地存在旧版缓存时，先迁移再重新加载
    pub async fn load(backend: &dyn Backend, local: &LocalStore) -> Result<Settings> {
        let mut doc = backend.load_config().await?;

        if !doc.has_asr_credentials() {
            match migration::migrate_legacy_cache(backend, local, &doc).await {
                Ok(Some(reloaded)) => doc = reloaded,
                Ok(None) => {}
                Err(e) => tracing::error!("[迁移] 迁移失败: {}", e),
            }
        }

        Ok(Settings::from_document(doc))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// 替换为新加载的配置，并标记初次加载完成
    pub fn replace(&mut self, settings: Settings) {
        let autostart = self.settings.enable_autostart;
        self.settings = settings;
        self.settings.enable_autostart = autostart;
        self.loaded = true;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// 当前服务商的凭据是否完整
    pub fn is_valid(&self) -> bool {
        self.settings.asr_config.is_valid()
    }
}
