// src/hotkey_recorder.rs
//
// 热键录制
//
// 一次录制只捕获一个组合键：
// 1. 开始时暂停后端全局热键监听（结束后恢复到原状态），避免录制时触发听写
// 2. 按下的键按顺序累积，重复按下忽略
// 3. 第一次松开任意键时校验并结束录制；合法则即时保存，否则显示错误

use std::sync::{Arc, Mutex};

use crate::config::{
    DualHotkeyConfig, HotkeyConfig, HotkeyKey, DEFAULT_ASSISTANT_KEYS, DEFAULT_DICTATION_KEYS,
    DEFAULT_RELEASE_MODE_KEYS,
};
use crate::config_store::SettingChange;
use crate::hotkey::{map_raw_key, RawKey};
use crate::sync::{SyncCoordinator, SyncIndicator};

pub const SAVE_FAILED_MESSAGE: &str = "保存热键配置失败";

/// 录制目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingTarget {
    /// 听写模式快捷键
    Dictation,
    /// AI 助手快捷键
    Assistant,
    /// 听写模式的松手模式快捷键
    Release,
}

impl RecordingTarget {
    /// 把按键写入对应的位置，返回新的双快捷键配置
    pub fn apply(&self, current: &DualHotkeyConfig, keys: Vec<HotkeyKey>) -> DualHotkeyConfig {
        let mut next = current.clone();
        match self {
            RecordingTarget::Dictation => next.dictation.keys = keys,
            RecordingTarget::Assistant => next.assistant.keys = keys,
            RecordingTarget::Release => next.dictation.release_mode_keys = Some(keys),
        }
        next
    }

    pub fn default_keys(&self) -> Vec<HotkeyKey> {
        match self {
            RecordingTarget::Dictation => DEFAULT_DICTATION_KEYS.to_vec(),
            RecordingTarget::Assistant => DEFAULT_ASSISTANT_KEYS.to_vec(),
            RecordingTarget::Release => DEFAULT_RELEASE_MODE_KEYS.to_vec(),
        }
    }
}

/// key_up 的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum KeyUpOutcome {
    /// 未在录制，或尚未按下任何键
    Ignored,
    /// 组合键不合法，配置未修改
    Rejected,
    /// 已保存
    Saved(DualHotkeyConfig),
    /// 保存失败，配置已回滚
    SaveFailed,
    /// 上一次热键保存仍在进行
    Busy,
}

#[derive(Debug)]
struct Session {
    id: u64,
    target: RecordingTarget,
    pressed: Vec<HotkeyKey>,
    /// 开始录制时热键服务是否处于激活状态
    was_service_active: Option<bool>,
}

pub struct HotkeyRecorder {
    coordinator: Arc<SyncCoordinator>,
    session: Mutex<Option<Session>>,
    next_id: Mutex<u64>,
    indicator: SyncIndicator,
}

impl HotkeyRecorder {
    pub fn new(coordinator: Arc<SyncCoordinator>) -> Self {
        Self {
            coordinator,
            session: Mutex::new(None),
            next_id: Mutex::new(0),
            indicator: SyncIndicator::new(),
        }
    }

    fn session(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_recording(&self) -> bool {
        self.session().is_some()
    }

    pub fn indicator(&self) -> &SyncIndicator {
        &self.indicator
    }

    /// 开始录制
    ///
    /// 已在录制时只切换目标并清空已按下的键，热键服务的原始状态保持不变
    pub async fn begin(&self, target: RecordingTarget) {
        let id = {
            let mut session = self.session();
            if let Some(active) = session.as_mut() {
                active.target = target;
                active.pressed.clear();
                drop(session);
                self.coordinator.context().ui().recording_keys.clear();
                tracing::info!("切换热键录制目标: {:?}", target);
                return;
            }

            let mut next_id = self.next_id.lock().unwrap_or_else(|e| e.into_inner());
            *next_id += 1;
            *session = Some(Session {
                id: *next_id,
                target,
                pressed: Vec::new(),
                was_service_active: None,
            });
            *next_id
        };
        {
            let mut ui = self.coordinator.context().ui();
            ui.is_recording_hotkey = true;
            ui.recording_keys.clear();
        }
        tracing::info!("开始热键录制: {:?}", target);

        let backend = &self.coordinator.context().backend;
        let was_active = match backend.get_hotkey_service_active().await {
            Ok(active) => active,
            Err(e) => {
                tracing::warn!("查询热键服务状态失败: {}", e);
                return;
            }
        };

        // 查询期间录制可能已经结束
        let still_recording = {
            let mut session = self.session();
            match session.as_mut() {
                Some(s) if s.id == id => {
                    s.was_service_active = Some(was_active);
                    true
                }
                _ => false,
            }
        };
        if still_recording && was_active {
            if let Err(e) = backend.set_hotkey_service_active(false).await {
                tracing::warn!("暂停热键服务失败: {}", e);
            }
        }
    }

    /// 按键按下：累积并同步到界面显示
    pub fn key_down(&self, raw: &RawKey) {
        let Some(key) = map_raw_key(raw) else {
            tracing::debug!("忽略不支持的按键: {} / {}", raw.key, raw.code);
            return;
        };

        let keys = {
            let mut session = self.session();
            let Some(session) = session.as_mut() else {
                return;
            };
            if session.pressed.contains(&key) {
                return;
            }
            session.pressed.push(key);
            session.pressed.clone()
        };
        tracing::debug!("当前按下的键: {:?}", keys);
        self.coordinator.context().ui().recording_keys = keys;
    }

    /// 按键松开：录制到按键后第一次松开即结束录制
    pub async fn key_up(&self, _raw: &RawKey) -> KeyUpOutcome {
        let session = {
            let mut session = self.session();
            let has_keys = matches!(session.as_ref(), Some(s) if !s.pressed.is_empty());
            if has_keys {
                session.take()
            } else {
                None
            }
        };
        let Some(session) = session else {
            return KeyUpOutcome::Ignored;
        };
        self.end_display();

        let ctx = Arc::clone(self.coordinator.context());
        let outcome = match HotkeyConfig::with_keys(session.pressed.clone()).validate() {
            Err(e) => {
                tracing::warn!("热键组合无效: {:?} ({})", session.pressed, e);
                ctx.show_hotkey_error(e.to_string());
                KeyUpOutcome::Rejected
            }
            Ok(()) => {
                let current = ctx.settings().dual_hotkey_config;
                let next = session.target.apply(&current, session.pressed.clone());
                ctx.ui().hotkey_error.clear();
                self.save(next).await
            }
        };

        self.restore_service(session.was_service_active).await;
        outcome
    }

    /// 放弃录制（例如窗口失去焦点），不修改配置
    pub async fn abandon(&self) {
        let session = self.session().take();
        if let Some(session) = session {
            tracing::info!("热键录制已取消");
            self.end_display();
            self.restore_service(session.was_service_active).await;
        }
    }

    /// 恢复某个位置的默认快捷键并即时保存
    pub async fn reset_hotkey_to_default(&self, target: RecordingTarget) -> KeyUpOutcome {
        let current = self.coordinator.context().settings().dual_hotkey_config;
        let next = target.apply(&current, target.default_keys());
        self.save(next).await
    }

    async fn save(&self, next: DualHotkeyConfig) -> KeyUpOutcome {
        if next.has_identical_bindings() {
            tracing::warn!(
                "听写与助手快捷键相同 ({})，按下时只会触发其中一个",
                next.dictation.format_display()
            );
        }
        let update = self
            .coordinator
            .commit_setting(&self.indicator, SettingChange::DualHotkeyConfig(next.clone()))
            .await;
        match update {
            None => KeyUpOutcome::Busy,
            Some(u) if u.is_committed() => {
                tracing::info!(
                    "热键已保存: 听写={}, 助手={}",
                    next.dictation.format_display(),
                    next.assistant.format_display()
                );
                KeyUpOutcome::Saved(next)
            }
            Some(_) => {
                self.coordinator
                    .context()
                    .show_hotkey_error(SAVE_FAILED_MESSAGE);
                KeyUpOutcome::SaveFailed
            }
        }
    }

    fn end_display(&self) {
        let mut ui = self.coordinator.context().ui();
        ui.is_recording_hotkey = false;
        ui.recording_keys.clear();
    }

    async fn restore_service(&self, was_active: Option<bool>) {
        if was_active != Some(true) {
            return;
        }
        let backend = &self.coordinator.context().backend;
        if let Err(e) = backend.set_hotkey_service_active(true).await {
            tracing::warn!("恢复热键服务失败: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppContext;
    use crate::config_store::Settings;
    use crate::hotkey::{LOCATION_LEFT, LOCATION_RIGHT};
    use crate::local_store::LocalStore;
    use crate::sync::SyncTimings;
    use crate::test_support::FakeBackend;
    use crate::ui_state::AppStatus;
    use std::time::Duration;

    struct Harness {
        _dir: tempfile::TempDir,
        backend: Arc<FakeBackend>,
        ctx: Arc<AppContext>,
        recorder: HotkeyRecorder,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().expect("create temp dir");
        let backend = Arc::new(FakeBackend::new());
        backend.set_hotkey_active(true);
        let ctx = AppContext::new(
            backend.clone(),
            LocalStore::at(dir.path()),
            SyncTimings::default(),
        );
        ctx.store().replace(Settings::default());
        ctx.set_status(AppStatus::Running);
        let recorder = HotkeyRecorder::new(SyncCoordinator::new(ctx.clone()));
        Harness {
            _dir: dir,
            backend,
            ctx,
            recorder,
        }
    }

    fn ctrl() -> RawKey {
        RawKey::new("Control", "ControlLeft", LOCATION_LEFT)
    }

    fn win() -> RawKey {
        RawKey::new("Meta", "MetaLeft", LOCATION_LEFT)
    }

    #[tokio::test(start_paused = true)]
    async fn test_records_chord_in_press_order() {
        let h = harness();
        h.recorder.begin(RecordingTarget::Dictation).await;
        assert!(!h.backend.hotkey_active());

        h.recorder.key_down(&ctrl());
        h.recorder.key_down(&ctrl());
        h.recorder.key_down(&win());
        assert_eq!(
            h.ctx.ui().recording_keys,
            vec![HotkeyKey::ControlLeft, HotkeyKey::MetaLeft]
        );

        let outcome = h.recorder.key_up(&win()).await;
        assert!(matches!(outcome, KeyUpOutcome::Saved(_)));

        let keys = vec![HotkeyKey::ControlLeft, HotkeyKey::MetaLeft];
        assert_eq!(h.ctx.settings().dual_hotkey_config.dictation.keys, keys);
        let saved = h.backend.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].dual_hotkey_config.dictation.keys, keys);
        assert!(h.backend.count("start_app") == 1);

        assert!(!h.recorder.is_recording());
        assert!(!h.ctx.ui().is_recording_hotkey);
        assert!(h.backend.hotkey_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_chord_leaves_config_unchanged() {
        let h = harness();
        let before = h.ctx.settings().dual_hotkey_config;

        h.recorder.begin(RecordingTarget::Assistant).await;
        h.recorder.key_down(&RawKey::new(" ", "Space", 0));
        h.recorder.key_down(&RawKey::new("a", "KeyA", 0));
        let outcome = h.recorder.key_up(&RawKey::new("a", "KeyA", 0)).await;

        assert_eq!(outcome, KeyUpOutcome::Rejected);
        assert_eq!(h.ctx.settings().dual_hotkey_config, before);
        assert_eq!(h.backend.count("save_config"), 0);
        assert_eq!(
            h.ctx.ui().hotkey_error.get().map(String::as_str),
            Some("必须包含修饰键(Ctrl/Alt/Shift/Win) 或 功能键(F1-F12)")
        );
        assert!(h.backend.hotkey_active());

        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert!(!h.ctx.ui().hotkey_error.is_set());
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_up_before_any_key_is_ignored() {
        let h = harness();
        h.recorder.begin(RecordingTarget::Dictation).await;
        assert_eq!(h.recorder.key_up(&ctrl()).await, KeyUpOutcome::Ignored);
        assert!(h.recorder.is_recording());
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_target_sets_release_mode_keys() {
        let h = harness();
        h.recorder.begin(RecordingTarget::Release).await;
        h.recorder.key_down(&RawKey::new("F8", "F8", 0));
        h.recorder.key_up(&RawKey::new("F8", "F8", 0)).await;

        let dual = h.ctx.settings().dual_hotkey_config;
        assert_eq!(dual.dictation.release_mode_keys, Some(vec![HotkeyKey::F8]));
        assert_eq!(dual.dictation.keys, DEFAULT_DICTATION_KEYS.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_failure_rolls_back_and_shows_error() {
        let h = harness();
        h.backend.fail_on("save_config");
        let before = h.ctx.settings().dual_hotkey_config;

        h.recorder.begin(RecordingTarget::Assistant).await;
        h.recorder
            .key_down(&RawKey::new("Alt", "AltRight", LOCATION_RIGHT));
        h.recorder.key_down(&RawKey::new("q", "KeyQ", 0));
        let outcome = h.recorder.key_up(&RawKey::new("q", "KeyQ", 0)).await;

        assert_eq!(outcome, KeyUpOutcome::SaveFailed);
        assert_eq!(h.ctx.settings().dual_hotkey_config, before);
        assert_eq!(
            h.ctx.ui().hotkey_error.get().map(String::as_str),
            Some(SAVE_FAILED_MESSAGE)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandon_restores_hotkey_service() {
        let h = harness();
        h.recorder.begin(RecordingTarget::Dictation).await;
        h.recorder.key_down(&ctrl());
        assert!(!h.backend.hotkey_active());

        h.recorder.abandon().await;
        assert!(h.backend.hotkey_active());
        assert!(!h.recorder.is_recording());
        assert_eq!(h.backend.count("save_config"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_begin_twice_keeps_original_service_state() {
        let h = harness();
        h.recorder.begin(RecordingTarget::Dictation).await;
        h.recorder.key_down(&ctrl());
        h.recorder.begin(RecordingTarget::Assistant).await;
        assert!(h.ctx.ui().recording_keys.is_empty());
        assert_eq!(h.backend.count("get_hotkey_service_active"), 1);

        h.recorder.key_down(&ctrl());
        h.recorder.key_down(&RawKey::new("j", "KeyJ", 0));
        let outcome = h.recorder.key_up(&ctrl()).await;
        assert!(matches!(outcome, KeyUpOutcome::Saved(_)));

        let dual = h.ctx.settings().dual_hotkey_config;
        assert_eq!(dual.assistant.keys, vec![HotkeyKey::ControlLeft, HotkeyKey::KeyJ]);
        assert_eq!(dual.dictation.keys, DEFAULT_DICTATION_KEYS.to_vec());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(h.backend.hotkey_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_bindings_are_still_saved() {
        let h = harness();
        h.recorder.begin(RecordingTarget::Assistant).await;
        h.recorder.key_down(&ctrl());
        h.recorder.key_down(&win());
        let outcome = h.recorder.key_up(&win()).await;

        let KeyUpOutcome::Saved(dual) = outcome else {
            panic!("expected saved, got {:?}", outcome);
        };
        assert!(dual.has_identical_bindings());
        assert_eq!(h.backend.saved().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactive_service_stays_inactive() {
        let h = harness();
        h.backend.set_hotkey_active(false);
        h.recorder.begin(RecordingTarget::Dictation).await;
        h.recorder.abandon().await;
        assert!(!h.backend.hotkey_active());
        assert_eq!(h.backend.count("set_hotkey_service_active"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_to_default() {
        let h = harness();
        h.ctx.store().settings_mut().dual_hotkey_config.assistant.keys =
            vec![HotkeyKey::ControlRight, HotkeyKey::KeyJ];

        let outcome = h
            .recorder
            .reset_hotkey_to_default(RecordingTarget::Assistant)
            .await;
        assert!(matches!(outcome, KeyUpOutcome::Saved(_)));
        assert_eq!(
            h.ctx.settings().dual_hotkey_config.assistant.keys,
            DEFAULT_ASSISTANT_KEYS.to_vec()
        );
        assert_eq!(
            h.backend.saved()[0].dual_hotkey_config.assistant.keys,
            DEFAULT_ASSISTANT_KEYS.to_vec()
        );
    }
}
