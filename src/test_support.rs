// 测试用内存后端：记录命令调用顺序，可按命令名注入失败

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::bridge::{
    Backend, BackendEvent, ConfigPayload, EventHandler, EventKind, RuntimeConfigUpdate, Unlisten,
};
use crate::config::AppConfig;
use crate::usage_stats::UsageStats;

type ListenerMap = HashMap<EventKind, Vec<(u64, EventHandler)>>;

#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    config: Mutex<AppConfig>,
    saved: Mutex<Vec<ConfigPayload>>,
    started: Mutex<Vec<ConfigPayload>>,
    runtime_updates: Mutex<Vec<RuntimeConfigUpdate>>,
    autostart: Mutex<bool>,
    hotkey_active: Mutex<bool>,
    usage_stats: Mutex<UsageStats>,
    listeners: Arc<Mutex<ListenerMap>>,
    next_listener_id: AtomicU64,
    listen_delay: Mutex<Option<Duration>>,
    save_delay: Mutex<Option<Duration>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AppConfig) -> Self {
        let backend = Self::default();
        *backend.config.lock().unwrap() = config;
        backend
    }

    pub fn fail_on(&self, command: &str) {
        self.failing.lock().unwrap().insert(command.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == command)
            .count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn saved(&self) -> Vec<ConfigPayload> {
        self.saved.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<ConfigPayload> {
        self.started.lock().unwrap().clone()
    }

    pub fn runtime_updates(&self) -> Vec<RuntimeConfigUpdate> {
        self.runtime_updates.lock().unwrap().clone()
    }

    pub fn stored_config(&self) -> AppConfig {
        self.config.lock().unwrap().clone()
    }

    pub fn set_close_action(&self, action: Option<crate::config::CloseAction>) {
        self.config.lock().unwrap().close_action = action;
    }

    pub fn set_hotkey_active(&self, active: bool) {
        *self.hotkey_active.lock().unwrap() = active;
    }

    pub fn hotkey_active(&self) -> bool {
        *self.hotkey_active.lock().unwrap()
    }

    pub fn set_usage_stats(&self, stats: UsageStats) {
        *self.usage_stats.lock().unwrap() = stats;
    }

    pub fn set_listen_delay(&self, delay: Duration) {
        *self.listen_delay.lock().unwrap() = Some(delay);
    }

    /// save_config 在记录调用后等待 delay 再返回结果
    pub fn set_save_delay(&self, delay: Duration) {
        *self.save_delay.lock().unwrap() = Some(delay);
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .lock()
            .unwrap()
            .get(&kind)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    /// 向所有已注册的监听器投递事件
    pub fn emit(&self, event: BackendEvent) {
        let handlers: Vec<EventHandler> = self
            .listeners
            .lock()
            .unwrap()
            .get(&event.kind())
            .map(|v| v.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();
        for handler in handlers {
            handler(event.clone());
        }
    }

    fn record(&self, command: &str) -> Result<()> {
        self.calls.lock().unwrap().push(command.to_string());
        if self.failing.lock().unwrap().contains(command) {
            return Err(anyhow!("{} failed", command));
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn load_config(&self) -> Result<AppConfig> {
        self.record("load_config")?;
        Ok(self.config.lock().unwrap().clone())
    }

    async fn save_config(&self, payload: ConfigPayload) -> Result<()> {
        let recorded = self.record("save_config");
        let delay = *self.save_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        recorded?;
        {
            let mut config = self.config.lock().unwrap();
            config.dashscope_api_key = payload.api_key.clone();
            config.siliconflow_api_key = payload.fallback_api_key.clone();
            config.asr_config = Some(payload.asr_config.clone());
            config.use_realtime_asr = Some(payload.use_realtime);
            config.enable_llm_post_process = Some(payload.enable_post_process);
            config.llm_config = Some(payload.llm_config.clone());
            config.assistant_config = Some(payload.assistant_config.clone());
            config.dual_hotkey_config = Some(payload.dual_hotkey_config.clone());
            config.enable_mute_other_apps = Some(payload.enable_mute_other_apps);
            config.dictionary = Some(payload.dictionary.clone());
            config.close_action = payload.close_action;
        }
        self.saved.lock().unwrap().push(payload);
        Ok(())
    }

    async fn start_app(&self, payload: ConfigPayload) -> Result<()> {
        self.record("start_app")?;
        self.started.lock().unwrap().push(payload);
        Ok(())
    }

    async fn stop_app(&self) -> Result<()> {
        self.record("stop_app")
    }

    async fn update_runtime_config(&self, update: RuntimeConfigUpdate) -> Result<()> {
        self.record("update_runtime_config")?;
        self.runtime_updates.lock().unwrap().push(update);
        Ok(())
    }

    async fn get_autostart(&self) -> Result<bool> {
        self.record("get_autostart")?;
        Ok(*self.autostart.lock().unwrap())
    }

    async fn set_autostart(&self, enabled: bool) -> Result<()> {
        self.record("set_autostart")?;
        *self.autostart.lock().unwrap() = enabled;
        Ok(())
    }

    async fn get_hotkey_service_active(&self) -> Result<bool> {
        self.record("get_hotkey_service_active")?;
        Ok(*self.hotkey_active.lock().unwrap())
    }

    async fn set_hotkey_service_active(&self, active: bool) -> Result<()> {
        self.record("set_hotkey_service_active")?;
        *self.hotkey_active.lock().unwrap() = active;
        Ok(())
    }

    async fn cancel_transcription(&self) -> Result<()> {
        self.record("cancel_transcription")
    }

    async fn quit_app(&self) -> Result<()> {
        self.record("quit_app")
    }

    async fn hide_to_tray(&self) -> Result<()> {
        self.record("hide_to_tray")
    }

    async fn load_usage_stats(&self) -> Result<UsageStats> {
        self.record("load_usage_stats")?;
        Ok(*self.usage_stats.lock().unwrap())
    }

    async fn listen(&self, kind: EventKind, handler: EventHandler) -> Result<Unlisten> {
        let delay = *self.listen_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.record("listen")?;

        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push((id, handler));

        let listeners = Arc::clone(&self.listeners);
        Ok(Box::new(move || {
            if let Some(list) = listeners.lock().unwrap().get_mut(&kind) {
                list.retain(|(existing, _)| *existing != id);
            }
        }))
    }
}
