// 旧版本地缓存迁移
//
// 早期版本把 ASR 凭据和词库保存在本地缓存中，现在统一由后端配置管理。
// 仅在后端没有任何凭据时执行，成功后删除本地缓存，因此重复执行是安全的。

use anyhow::Result;
use serde::Deserialize;

use crate::bridge::{Backend, ConfigPayload};
use crate::config::{
    AppConfig, AsrConfig, AsrCredentials, AsrProvider, AsrSelection, AssistantConfig,
    DualHotkeyConfig,
};
use crate::dictionary::normalize_words;
use crate::local_store::LocalStore;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyApiKey {
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyDoubao {
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

/// 旧版凭据缓存
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyAsrCache {
    #[serde(default)]
    pub active_provider: Option<String>,
    #[serde(default)]
    pub qwen: Option<LegacyApiKey>,
    #[serde(default)]
    pub doubao: Option<LegacyDoubao>,
    #[serde(default)]
    pub siliconflow: Option<LegacyApiKey>,
}

impl LegacyAsrCache {
    /// 构建新的 AsrConfig，未知服务商按 qwen 处理
    pub fn to_asr_config(&self) -> AsrConfig {
        let active_provider = self
            .active_provider
            .as_deref()
            .and_then(AsrProvider::parse)
            .unwrap_or(AsrProvider::Qwen);

        let api_key = |entry: &Option<LegacyApiKey>| {
            entry
                .as_ref()
                .and_then(|e| e.api_key.clone())
                .unwrap_or_default()
        };
        let doubao = self.doubao.clone().unwrap_or_default();

        AsrConfig {
            credentials: AsrCredentials {
                qwen_api_key: api_key(&self.qwen),
                sensevoice_api_key: api_key(&self.siliconflow),
                doubao_app_id: doubao.app_id.unwrap_or_default(),
                doubao_access_token: doubao.access_token.unwrap_or_default(),
            },
            selection: AsrSelection {
                active_provider,
                enable_fallback: false,
                fallback_provider: None,
            },
        }
    }
}

/// 执行迁移
///
/// 返回 Some(重新加载的文档) 表示发生了迁移；
/// 后端已有凭据或本地没有旧缓存时返回 None
pub async fn migrate_legacy_cache(
    backend: &dyn Backend,
    local: &LocalStore,
    doc: &AppConfig,
) -> Result<Option<AppConfig>> {
    if doc.has_asr_credentials() {
        return Ok(None);
    }
    let Some(cache) = local.legacy_asr_cache() else {
        return Ok(None);
    };

    tracing::info!("[迁移] 检测到后端配置为空且发现本地旧版缓存，开始迁移");

    let mut merged = doc.dictionary.clone().unwrap_or_default();
    merged.extend(local.legacy_dictionary());
    let dictionary = normalize_words(merged);

    let payload = ConfigPayload {
        api_key: doc.dashscope_api_key.clone(),
        fallback_api_key: doc.siliconflow_api_key.clone(),
        use_realtime: doc.use_realtime_asr.unwrap_or(true),
        enable_post_process: doc.enable_llm_post_process.unwrap_or(false),
        llm_config: doc.llm_config.clone().unwrap_or_default(),
        assistant_config: doc
            .assistant_config
            .clone()
            .unwrap_or_else(AssistantConfig::default),
        asr_config: cache.to_asr_config(),
        dual_hotkey_config: doc
            .dual_hotkey_config
            .clone()
            .unwrap_or_else(DualHotkeyConfig::default),
        enable_mute_other_apps: doc.enable_mute_other_apps.unwrap_or(false),
        dictionary,
        close_action: doc.close_action,
    };

    backend.save_config(payload).await?;

    tracing::info!("[迁移] 配置已保存到后端，清理本地缓存");
    if let Err(e) = local.remove_legacy_caches() {
        tracing::warn!("[迁移] 清理本地缓存失败: {}", e);
    }

    let reloaded = backend.load_config().await?;
    Ok(Some(reloaded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_store::ConfigStore;
    use crate::local_store::{ASR_CACHE_KEY, DICTIONARY_KEY};
    use crate::test_support::FakeBackend;

    fn write_legacy(dir: &std::path::Path) {
        std::fs::write(
            dir.join("asr_cache.json"),
            r#"{"active_provider":"doubao","qwen":{"api_key":"sk-old"},"doubao":{"app_id":"app","access_token":"tok"}}"#,
        )
        .unwrap();
        std::fs::write(dir.join("dictionary.json"), r#"["claude", " rust ", ""]"#).unwrap();
    }

    #[test]
    fn test_unknown_provider_maps_to_qwen() {
        let cache: LegacyAsrCache =
            serde_json::from_str(r#"{"active_provider":"whisper","qwen":{"api_key":"k"}}"#)
                .unwrap();
        let config = cache.to_asr_config();
        assert_eq!(config.selection.active_provider, AsrProvider::Qwen);
        assert_eq!(config.credentials.qwen_api_key, "k");
        assert!(config.credentials.doubao_app_id.is_empty());
    }

    #[tokio::test]
    async fn test_migration_moves_credentials_and_dictionary() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write_legacy(dir.path());
        let local = LocalStore::at(dir.path());
        let backend = FakeBackend::with_config(AppConfig {
            dictionary: Some(vec!["rust".to_string(), "tokio".to_string()]),
            ..AppConfig::default()
        });

        let settings = ConfigStore::load(&backend, &local).await.unwrap();

        assert_eq!(settings.asr_config.selection.active_provider, AsrProvider::Doubao);
        assert_eq!(settings.asr_config.credentials.doubao_access_token, "tok");
        assert_eq!(settings.dictionary, vec!["rust", "tokio", "claude"]);
        assert_eq!(backend.calls(), vec!["load_config", "save_config", "load_config"]);
        assert!(!local.exists(ASR_CACHE_KEY));
        assert!(!local.exists(DICTIONARY_KEY));
    }

    #[tokio::test]
    async fn test_second_run_is_noop() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write_legacy(dir.path());
        let local = LocalStore::at(dir.path());
        let backend = FakeBackend::new();

        ConfigStore::load(&backend, &local).await.unwrap();
        let after_first = backend.stored_config();

        // 即使旧缓存再次出现，后端已有凭据也不会再迁移
        write_legacy(dir.path());
        backend.clear_calls();
        ConfigStore::load(&backend, &local).await.unwrap();

        assert_eq!(backend.calls(), vec!["load_config"]);
        assert_eq!(
            serde_json::to_value(backend.stored_config().asr_config).unwrap(),
            serde_json::to_value(after_first.asr_config).unwrap()
        );
        assert_eq!(backend.stored_config().dictionary, after_first.dictionary);
    }

    #[tokio::test]
    async fn test_no_legacy_cache_skips_migration() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let local = LocalStore::at(dir.path());
        let backend = FakeBackend::new();

        let outcome = migrate_legacy_cache(&backend, &local, &AppConfig::default())
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_legacy_cache() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write_legacy(dir.path());
        let local = LocalStore::at(dir.path());
        let backend = FakeBackend::new();
        backend.fail_on("save_config");

        let settings = ConfigStore::load(&backend, &local).await.unwrap();
        assert!(!settings.asr_config.is_valid());
        assert!(local.exists(ASR_CACHE_KEY));
    }
}
