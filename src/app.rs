// src/app.rs
//
// 应用根状态
//
// 所有控制器共享同一个 Arc<AppContext>。内部锁都是同步锁，
// 只做短暂的读写，绝不跨 await 持有。

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::bridge::Backend;
use crate::config_store::{ConfigStore, Settings};
use crate::dictionary::DictionaryEditor;
use crate::history::{HistoryLog, HistoryRecord};
use crate::local_store::LocalStore;
use crate::sync::SyncTimings;
use crate::ui_state::{AppStatus, Transient, UiState};
use crate::usage_stats;

pub struct AppContext {
    pub backend: Arc<dyn Backend>,
    pub local: LocalStore,
    pub timings: SyncTimings,
    store: Mutex<ConfigStore>,
    ui: Mutex<UiState>,
    history: Mutex<HistoryLog>,
    dictionary_editor: Mutex<DictionaryEditor>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl AppContext {
    /// 创建上下文并读取本地历史记录
    pub fn new(backend: Arc<dyn Backend>, local: LocalStore, timings: SyncTimings) -> Arc<Self> {
        let history = HistoryLog::load(&local);
        tracing::info!("已加载 {} 条历史记录", history.len());
        Arc::new(Self {
            backend,
            local,
            timings,
            store: Mutex::new(ConfigStore::default()),
            ui: Mutex::new(UiState::default()),
            history: Mutex::new(history),
            dictionary_editor: Mutex::new(DictionaryEditor::default()),
        })
    }

    pub fn store(&self) -> MutexGuard<'_, ConfigStore> {
        lock(&self.store)
    }

    pub fn ui(&self) -> MutexGuard<'_, UiState> {
        lock(&self.ui)
    }

    pub fn history(&self) -> MutexGuard<'_, HistoryLog> {
        lock(&self.history)
    }

    pub fn dictionary_editor(&self) -> MutexGuard<'_, DictionaryEditor> {
        lock(&self.dictionary_editor)
    }

    /// 当前设置的快照
    pub fn settings(&self) -> Settings {
        self.store().settings().clone()
    }

    pub fn status(&self) -> AppStatus {
        self.ui().status
    }

    pub fn set_status(&self, status: AppStatus) {
        self.ui().status = status;
    }

    pub fn error(&self) -> Option<String> {
        self.ui().error.clone()
    }

    pub fn set_error(&self, error: Option<String>) {
        self.ui().error = error;
    }

    // ========================================================================
    // 限时提示
    // ========================================================================

    /// 显示一条限时提示，after 之后自动清除（若期间未被新值替换）
    pub fn flash<T>(
        self: &Arc<Self>,
        field: fn(&mut UiState) -> &mut Transient<T>,
        value: T,
        after: Duration,
    ) where
        T: Send + 'static,
    {
        let generation = field(&mut self.ui()).set(value);

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("无 tokio 运行时，提示不会自动清除");
            return;
        };
        let ctx = Arc::clone(self);
        handle.spawn(async move {
            tokio::time::sleep(after).await;
            field(&mut ctx.ui()).expire(generation);
        });
    }

    pub fn show_success_toast(self: &Arc<Self>) {
        self.flash(|ui| &mut ui.success_toast, (), self.timings.success_toast);
    }

    pub fn show_copy_toast(self: &Arc<Self>, message: impl Into<String>) {
        self.flash(|ui| &mut ui.copy_toast, message.into(), self.timings.copy_toast);
    }

    pub fn show_hotkey_error(self: &Arc<Self>, message: impl Into<String>) {
        self.flash(|ui| &mut ui.hotkey_error, message.into(), self.timings.hotkey_error);
    }

    pub fn show_duplicate_hint(self: &Arc<Self>) {
        self.flash(|ui| &mut ui.duplicate_hint, (), self.timings.duplicate_hint);
    }

    // ========================================================================
    // 历史记录与统计
    // ========================================================================

    /// 追加历史记录并立即写入本地存储
    pub fn append_history(&self, record: HistoryRecord) {
        let mut history = self.history();
        history.push(record);
        history.persist(&self.local);
    }

    pub fn clear_history(&self) {
        let mut history = self.history();
        history.clear();
        history.persist(&self.local);
        tracing::info!("历史记录已清空");
    }

    /// 复制历史文本后的提示
    pub fn copy_history_text(self: &Arc<Self>, id: &str) -> Option<String> {
        let text = self
            .history()
            .records()
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.polished_text.clone().unwrap_or_else(|| r.original_text.clone()))?;
        self.show_copy_toast("已复制到剪贴板");
        Some(text)
    }

    /// 从后端重新读取使用统计
    pub async fn reload_usage_stats(&self) {
        let stats = usage_stats::load_usage_stats(self.backend.as_ref()).await;
        self.ui().usage_stats = stats;
    }
}
