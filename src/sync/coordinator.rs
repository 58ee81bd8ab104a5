// 配置同步协调器
//
// 负责把内存中的设置写回后端，并在服务运行时让新配置生效。
// 即时保存总是先取消待执行的自动保存，避免延迟的自动保存用旧值覆盖刚生效的修改。

use anyhow::Result;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use crate::app::AppContext;
use crate::bridge::{ConfigPayload, RuntimeConfigUpdate};
use crate::config_store::{ConfigOverrides, SettingChange, Settings};
use crate::ui_state::AppStatus;

use super::debounce::Debouncer;
use super::status::{OptimisticUpdate, SyncIndicator, SyncStatus};

pub struct SyncCoordinator {
    ctx: Arc<AppContext>,
    debounce: Debouncer,
    /// 程序触发的保存之后，跳过紧随其后的一次自动保存
    suppress_next_autosave: AtomicBool,
    /// 即时保存的全局状态
    indicator: SyncIndicator,
    /// 进行中的即时保存数；只有最后一个结束时才给出结果
    in_flight: AtomicUsize,
    /// 重叠的即时保存中是否有失败
    overlap_failed: AtomicBool,
}

impl SyncCoordinator {
    pub fn new(ctx: Arc<AppContext>) -> Arc<Self> {
        Arc::new(Self {
            ctx,
            debounce: Debouncer::new(),
            suppress_next_autosave: AtomicBool::new(false),
            indicator: SyncIndicator::new(),
            in_flight: AtomicUsize::new(0),
            overlap_failed: AtomicBool::new(false),
        })
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.ctx
    }

    pub fn indicator(&self) -> &SyncIndicator {
        &self.indicator
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.indicator.status()
    }

    pub fn is_autosave_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    // ========================================================================
    // 即时保存
    // ========================================================================

    /// 立即保存并（运行中则）重启服务
    ///
    /// overrides 为调用方刚修改的值，优先于内存中的快照。
    /// 失败时返回错误，由调用方回滚自己的乐观更新。
    ///
    /// 多个即时保存可以重叠执行（各控件自己的指示器负责拒绝重复提交）；
    /// 全局指示器保持 syncing 直到最后一个结束，任何一个失败则显示 error。
    pub async fn save_immediately(self: &Arc<Self>, overrides: ConfigOverrides) -> Result<()> {
        self.debounce.cancel();
        if self.in_flight.fetch_add(1, Ordering::SeqCst) == 0 {
            self.overlap_failed.store(false, Ordering::SeqCst);
            self.indicator.try_begin();
        }

        let merged = self.ctx.settings().merged(&overrides);
        let payload = merged.to_payload();
        tracing::info!(
            "即时保存配置: provider={}, realtime={}",
            payload.asr_config.selection.active_provider.display_name(),
            payload.use_realtime
        );

        let result = self.persist_and_restart(&payload).await;
        match &result {
            Ok(()) => {
                self.write_back_dictionary(payload.dictionary);
                self.ctx.set_error(None);
            }
            Err(e) => {
                tracing::error!("即时保存失败: {}", e);
                self.ctx.set_error(Some(e.to_string()));
                self.overlap_failed.store(true, Ordering::SeqCst);
            }
        }

        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            if self.overlap_failed.swap(false, Ordering::SeqCst) {
                self.indicator
                    .finish(SyncStatus::Error, self.ctx.timings.error_reset);
            } else {
                self.indicator
                    .finish(SyncStatus::Success, self.ctx.timings.success_reset);
            }
        }
        result
    }

    /// 乐观提交单项设置
    ///
    /// 控件仍在同步中时直接忽略并返回 None；否则先写入内存，再即时保存，
    /// 失败时把内存值恢复为修改前的值
    pub async fn commit_setting(
        self: &Arc<Self>,
        indicator: &SyncIndicator,
        change: SettingChange,
    ) -> Option<OptimisticUpdate<SettingChange>> {
        if !indicator.try_begin() {
            tracing::debug!("控件正在同步中，忽略本次修改");
            return None;
        }

        let previous = self.ctx.store().settings_mut().apply(change.clone());
        let overrides = change.to_overrides();
        let update = OptimisticUpdate::new(previous, change);

        match self.save_immediately(overrides).await {
            Ok(()) => {
                indicator.finish(SyncStatus::Success, self.ctx.timings.success_reset);
                Some(update.commit())
            }
            Err(_) => {
                let update = update.rollback();
                self.ctx.store().settings_mut().apply(update.value().clone());
                tracing::warn!("保存失败，已回滚设置");
                indicator.finish(SyncStatus::Error, self.ctx.timings.error_reset);
                Some(update)
            }
        }
    }

    // ========================================================================
    // 自动保存
    // ========================================================================

    /// 保存当前全部设置（防抖触发或手动保存）
    pub async fn handle_save_config(self: &Arc<Self>) {
        let payload = self.ctx.settings().to_payload();

        match self.persist_and_restart(&payload).await {
            Ok(()) => {
                self.write_back_dictionary(payload.dictionary);
                self.ctx.set_error(None);
                self.ctx.show_success_toast();
            }
            Err(e) => {
                tracing::error!("保存配置失败: {}", e);
                self.ctx.set_error(Some(e.to_string()));
            }
        }
    }

    /// 最后一次修改后延迟触发自动保存
    pub fn schedule_autosave(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.debounce
            .schedule(self.ctx.timings.autosave_debounce, async move {
                if let Some(coordinator) = weak.upgrade() {
                    coordinator.run_autosave().await;
                }
            });
    }

    pub fn cancel_autosave(&self) -> bool {
        self.debounce.cancel()
    }

    async fn run_autosave(self: &Arc<Self>) {
        if self.suppress_next_autosave.swap(false, Ordering::SeqCst) {
            tracing::debug!("跳过程序保存后的自动保存");
            return;
        }
        let status = self.ctx.status();
        if status.is_busy() {
            tracing::debug!("录音/处理中 ({:?})，跳过自动保存", status);
            return;
        }
        self.handle_save_config().await;
    }

    // ========================================================================
    // 热更新
    // ========================================================================

    /// 推送无需重启的字段；失败只记录日志
    pub async fn apply_runtime_config(&self, update: RuntimeConfigUpdate) {
        if self.ctx.status() != AppStatus::Running || !self.ctx.store().is_loaded() {
            return;
        }
        match self.ctx.backend.update_runtime_config(update).await {
            Ok(()) => tracing::info!("运行时配置已热更新"),
            Err(e) => tracing::warn!("热更新配置失败: {}", e),
        }
    }

    /// 修改内存设置
    ///
    /// 初次加载完成后：可热更新字段变化时推送给服务，任何变化都安排一次自动保存
    pub fn update_settings<R>(self: &Arc<Self>, mutate: impl FnOnce(&mut Settings) -> R) -> R {
        let (result, changed, runtime_update, loaded) = {
            let mut store = self.ctx.store();
            let before = store.settings().clone();
            let result = mutate(store.settings_mut());
            let after = store.settings();

            let runtime = after.runtime_subset();
            let runtime_update = (runtime != before.runtime_subset()).then_some(runtime);
            (result, before != *after, runtime_update, store.is_loaded())
        };

        if !loaded {
            return result;
        }

        if let Some(update) = runtime_update {
            let coordinator = Arc::clone(self);
            tokio::spawn(async move {
                coordinator.apply_runtime_config(update).await;
            });
        }
        if changed {
            // 用户的修改必须保存，不能被写回词库时设置的跳过标记吞掉
            self.suppress_next_autosave.store(false, Ordering::SeqCst);
            self.schedule_autosave();
        }
        result
    }

    // ========================================================================
    // 内部
    // ========================================================================

    /// save_config；服务运行中时依次 stop → start
    async fn persist_and_restart(&self, payload: &ConfigPayload) -> Result<()> {
        self.ctx.backend.save_config(payload.clone()).await?;

        if self.ctx.status() == AppStatus::Running {
            tracing::info!("服务运行中，重启以应用新配置");
            self.ctx.backend.stop_app().await?;
            self.ctx.backend.start_app(payload.clone()).await?;
        }
        Ok(())
    }

    /// 把过滤后的词库写回内存，并跳过由此引起的下一次自动保存
    fn write_back_dictionary(self: &Arc<Self>, dictionary: Vec<String>) {
        self.ctx.store().settings_mut().dictionary = dictionary;
        if self.ctx.store().is_loaded() {
            self.suppress_next_autosave.store(true, Ordering::SeqCst);
            self.schedule_autosave();
        }
    }
}
