// src/service.rs
//
// 服务控制：启动加载、启停、开机自启、取消转录、关闭行为

use std::sync::Arc;
use std::time::Duration;

use crate::app::AppContext;
use crate::config::CloseAction;
use crate::config_store::ConfigStore;
use crate::sync::SyncCoordinator;
use crate::ui_state::AppStatus;

/// 启动时自动开启服务前的等待，给后端留出初始化时间
const STARTUP_DELAY: Duration = Duration::from_millis(100);

pub const MISSING_API_KEY_MESSAGE: &str = "请先配置 ASR API Key";

pub struct ServiceController {
    coordinator: Arc<SyncCoordinator>,
}

impl ServiceController {
    pub fn new(coordinator: Arc<SyncCoordinator>) -> Self {
        Self { coordinator }
    }

    fn ctx(&self) -> &Arc<AppContext> {
        self.coordinator.context()
    }

    /// 启动时加载配置
    ///
    /// 必要时先迁移旧版缓存；ASR 配置有效时自动启动服务。
    /// 任何失败都只记录日志，界面保持空闲状态。
    pub async fn load_config(&self) {
        let ctx = self.ctx();

        let settings = match ConfigStore::load(ctx.backend.as_ref(), &ctx.local).await {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!("加载配置失败: {}", e);
                return;
            }
        };
        ctx.store().replace(settings);
        tracing::info!("配置已加载");

        match ctx.backend.get_autostart().await {
            Ok(enabled) => ctx.store().settings_mut().enable_autostart = enabled,
            Err(e) => tracing::error!("获取开机自启状态失败: {}", e),
        }

        let (valid, payload) = {
            let store = ctx.store();
            (store.is_valid(), store.settings().to_payload())
        };
        if !valid {
            tracing::info!("ASR 配置不完整，等待用户配置");
            return;
        }

        tokio::time::sleep(STARTUP_DELAY).await;
        match ctx.backend.start_app(payload).await {
            Ok(()) => {
                let mut ui = ctx.ui();
                ui.status = AppStatus::Running;
                ui.error = None;
                tracing::info!("服务已自动启动");
            }
            Err(e) => tracing::error!("加载配置失败: {}", e),
        }
    }

    /// 启动或停止服务
    pub async fn handle_start_stop(&self) {
        let ctx = self.ctx();

        if ctx.status() == AppStatus::Idle {
            let (valid, payload) = {
                let store = ctx.store();
                (store.is_valid(), store.settings().to_payload())
            };
            if !valid {
                ctx.set_error(Some(MISSING_API_KEY_MESSAGE.to_string()));
                return;
            }

            let result = async {
                ctx.backend.save_config(payload.clone()).await?;
                ctx.backend.start_app(payload).await
            }
            .await;
            match result {
                Ok(()) => {
                    let mut ui = ctx.ui();
                    ui.status = AppStatus::Running;
                    ui.error = None;
                    tracing::info!("服务已启动");
                }
                Err(e) => {
                    tracing::error!("启动服务失败: {}", e);
                    ctx.set_error(Some(e.to_string()));
                }
            }
            return;
        }

        match ctx.backend.stop_app().await {
            Ok(()) => {
                ctx.set_status(AppStatus::Idle);
                tracing::info!("服务已停止");
            }
            Err(e) => {
                tracing::error!("停止服务失败: {}", e);
                ctx.set_error(Some(e.to_string()));
            }
        }
    }

    pub async fn handle_autostart_toggle(&self) {
        let ctx = self.ctx();
        let enabled = !ctx.store().settings().enable_autostart;

        match ctx.backend.set_autostart(enabled).await {
            Ok(()) => {
                ctx.store().settings_mut().enable_autostart = enabled;
                ctx.show_success_toast();
            }
            Err(e) => {
                tracing::error!("设置开机自启失败: {}", e);
                ctx.set_error(Some(e.to_string()));
            }
        }
    }

    pub async fn handle_cancel_transcription(&self) {
        let ctx = self.ctx();
        if let Err(e) = ctx.backend.cancel_transcription().await {
            ctx.set_error(Some(e.to_string()));
        }
    }

    /// 关闭确认框的选择
    ///
    /// 勾选“记住选择”时先保存关闭行为，保存失败不影响后续的退出/隐藏
    pub async fn handle_close_action(&self, action: CloseAction) {
        let ctx = self.ctx();
        let remember = ctx.ui().remember_close_choice;

        if remember {
            let payload = {
                let mut store = ctx.store();
                store.settings_mut().close_action = Some(action);
                store.settings().to_payload()
            };
            if let Err(e) = ctx.backend.save_config(payload).await {
                tracing::error!("保存关闭配置失败: {}", e);
            }
        }

        {
            let mut ui = ctx.ui();
            ui.show_close_dialog = false;
            ui.remember_close_choice = false;
        }

        let result = match action {
            CloseAction::Close => ctx.backend.quit_app().await,
            CloseAction::Minimize => ctx.backend.hide_to_tray().await,
        };
        if let Err(e) = result {
            tracing::error!("执行关闭行为失败: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, AsrConfig, AsrProvider};
    use crate::config_store::Settings;
    use crate::local_store::LocalStore;
    use crate::sync::SyncTimings;
    use crate::test_support::FakeBackend;

    fn valid_asr() -> AsrConfig {
        let mut asr = AsrConfig::default();
        asr.credentials.qwen_api_key = "sk-qwen".to_string();
        asr.selection.active_provider = AsrProvider::Qwen;
        asr
    }

    fn controller(
        backend: Arc<FakeBackend>,
        dir: &std::path::Path,
    ) -> (Arc<AppContext>, ServiceController) {
        let ctx = AppContext::new(backend, LocalStore::at(dir), SyncTimings::default());
        let coordinator = SyncCoordinator::new(ctx.clone());
        (ctx, ServiceController::new(coordinator))
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_config_autostarts_valid_service() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let backend = Arc::new(FakeBackend::with_config(AppConfig {
            asr_config: Some(valid_asr()),
            ..Default::default()
        }));
        let (ctx, service) = controller(backend.clone(), dir.path());

        service.load_config().await;

        assert!(ctx.store().is_loaded());
        assert_eq!(ctx.status(), AppStatus::Running);
        assert_eq!(
            backend.calls(),
            vec!["load_config", "get_autostart", "start_app"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_config_without_credentials_stays_idle() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let backend = Arc::new(FakeBackend::new());
        backend.fail_on("get_autostart");
        let (ctx, service) = controller(backend.clone(), dir.path());

        service.load_config().await;

        assert!(ctx.store().is_loaded());
        assert_eq!(ctx.status(), AppStatus::Idle);
        assert_eq!(backend.count("start_app"), 0);
        assert!(ctx.error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_requires_valid_asr_config() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let backend = Arc::new(FakeBackend::new());
        let (ctx, service) = controller(backend.clone(), dir.path());
        ctx.store().replace(Settings::default());

        service.handle_start_stop().await;

        assert_eq!(ctx.error().as_deref(), Some(MISSING_API_KEY_MESSAGE));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_then_stop() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let backend = Arc::new(FakeBackend::new());
        let (ctx, service) = controller(backend.clone(), dir.path());
        ctx.store().replace(Settings {
            asr_config: valid_asr(),
            ..Default::default()
        });

        service.handle_start_stop().await;
        assert_eq!(ctx.status(), AppStatus::Running);
        assert_eq!(backend.calls(), vec!["save_config", "start_app"]);

        service.handle_start_stop().await;
        assert_eq!(ctx.status(), AppStatus::Idle);
        assert_eq!(backend.count("stop_app"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_failure_shows_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let backend = Arc::new(FakeBackend::new());
        backend.fail_on("start_app");
        let (ctx, service) = controller(backend.clone(), dir.path());
        ctx.store().replace(Settings {
            asr_config: valid_asr(),
            ..Default::default()
        });

        service.handle_start_stop().await;
        assert_eq!(ctx.status(), AppStatus::Idle);
        assert_eq!(ctx.error().as_deref(), Some("start_app failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_autostart_toggle() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let backend = Arc::new(FakeBackend::new());
        let (ctx, service) = controller(backend.clone(), dir.path());

        service.handle_autostart_toggle().await;
        assert!(ctx.store().settings().enable_autostart);
        assert!(ctx.ui().success_toast.is_set());

        backend.fail_on("set_autostart");
        service.handle_autostart_toggle().await;
        assert!(ctx.store().settings().enable_autostart);
        assert_eq!(ctx.error().as_deref(), Some("set_autostart failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_transcription_failure_shows_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let backend = Arc::new(FakeBackend::new());
        backend.fail_on("cancel_transcription");
        let (ctx, service) = controller(backend.clone(), dir.path());

        service.handle_cancel_transcription().await;
        assert_eq!(ctx.error().as_deref(), Some("cancel_transcription failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_action_remembered() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let backend = Arc::new(FakeBackend::new());
        let (ctx, service) = controller(backend.clone(), dir.path());
        ctx.store().replace(Settings::default());
        {
            let mut ui = ctx.ui();
            ui.show_close_dialog = true;
            ui.remember_close_choice = true;
        }

        service.handle_close_action(CloseAction::Minimize).await;

        assert_eq!(backend.calls(), vec!["save_config", "hide_to_tray"]);
        assert_eq!(backend.stored_config().close_action, Some(CloseAction::Minimize));
        let ui = ctx.ui();
        assert!(!ui.show_close_dialog);
        assert!(!ui.remember_close_choice);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_action_not_remembered_skips_save() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let backend = Arc::new(FakeBackend::new());
        let (ctx, service) = controller(backend.clone(), dir.path());
        ctx.ui().show_close_dialog = true;

        service.handle_close_action(CloseAction::Close).await;

        assert_eq!(backend.calls(), vec!["quit_app"]);
        assert!(!ctx.ui().show_close_dialog);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_action_save_failure_still_quits() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let backend = Arc::new(FakeBackend::new());
        backend.fail_on("save_config");
        let (ctx, service) = controller(backend.clone(), dir.path());
        ctx.ui().remember_close_choice = true;

        service.handle_close_action(CloseAction::Close).await;
        assert_eq!(backend.count("quit_app"), 1);
    }
}
