// src/events.rs
//
// 后端事件监听
//
// setup 可能被重复调用（先 teardown 再 setup）。每次 setup 持有自己的取消标记：
// 注册是异步的，若注册完成时已经 teardown，则立即取消该监听，避免重复投递。

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;

use crate::app::AppContext;
use crate::bridge::{BackendEvent, EventHandler, EventKind, TranscriptionResult, Unlisten};
use crate::config::CloseAction;
use crate::history::HistoryRecord;
use crate::ui_state::AppStatus;

pub struct EventBridge {
    ctx: Arc<AppContext>,
    cancelled: Mutex<Arc<AtomicBool>>,
    unlisteners: Mutex<Vec<Unlisten>>,
}

impl EventBridge {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self {
            ctx,
            cancelled: Mutex::new(Arc::new(AtomicBool::new(false))),
            unlisteners: Mutex::new(Vec::new()),
        }
    }

    /// 注册全部事件监听
    pub async fn setup(&self) -> Result<()> {
        let cancelled = Arc::new(AtomicBool::new(false));
        *self.cancelled.lock().unwrap_or_else(|e| e.into_inner()) = Arc::clone(&cancelled);

        let runtime = Handle::try_current().context("事件监听需要在 tokio 运行时中注册")?;
        let ctx = Arc::clone(&self.ctx);
        let handler: EventHandler = Arc::new(move |event| dispatch(&ctx, &runtime, event));

        for kind in EventKind::ALL {
            let unlisten = match self.ctx.backend.listen(kind, Arc::clone(&handler)).await {
                Ok(unlisten) => unlisten,
                Err(e) => {
                    if !cancelled.load(Ordering::SeqCst) {
                        tracing::error!("注册事件监听 {} 失败: {}", kind.as_str(), e);
                        return Err(e);
                    }
                    return Ok(());
                }
            };

            if cancelled.load(Ordering::SeqCst) {
                tracing::debug!("监听 {} 注册完成时已取消，立即移除", kind.as_str());
                unlisten();
                return Ok(());
            }
            self.unlisteners
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(unlisten);
        }

        tracing::info!("事件监听已就绪");
        Ok(())
    }

    /// 取消全部监听，包括仍在注册中的
    pub fn teardown(&self) {
        self.cancelled
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .store(true, Ordering::SeqCst);

        let unlisteners: Vec<Unlisten> = self
            .unlisteners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for unlisten in unlisteners {
            unlisten();
        }
    }
}

/// 把事件投影到界面状态
fn dispatch(ctx: &Arc<AppContext>, runtime: &Handle, event: BackendEvent) {
    match event {
        BackendEvent::RecordingStarted => {
            let mut ui = ctx.ui();
            ui.status = AppStatus::Recording;
            ui.error = None;
        }
        BackendEvent::RecordingStopped | BackendEvent::Transcribing => {
            ctx.set_status(AppStatus::Transcribing);
        }
        BackendEvent::PostProcessing(mode) => match mode.as_str() {
            "polishing" => ctx.set_status(AppStatus::Polishing),
            "assistant" => ctx.set_status(AppStatus::AssistantProcessing),
            other => tracing::debug!("未知的处理模式: {}", other),
        },
        BackendEvent::TranscriptionComplete(result) => {
            on_transcription_complete(ctx, &result);
            reload_usage_stats(ctx, runtime);
        }
        BackendEvent::Error(message) => {
            tracing::warn!("后端报告错误: {}", message);
            {
                let mut ui = ctx.ui();
                ui.error = Some(message.clone());
                ui.status = AppStatus::Running;
            }
            // 失败不计入统计，重新加载只为保持界面一致
            reload_usage_stats(ctx, runtime);
            ctx.append_history(HistoryRecord::from_error(&message));
        }
        BackendEvent::TranscriptionCancelled => {
            let mut ui = ctx.ui();
            ui.status = AppStatus::Running;
            ui.error = None;
        }
        BackendEvent::CloseRequested => {
            let ctx = Arc::clone(ctx);
            runtime.spawn(async move { handle_close_requested(&ctx).await });
        }
    }
}

fn on_transcription_complete(ctx: &AppContext, result: &TranscriptionResult) {
    {
        let mut ui = ctx.ui();
        ui.transcript = result.text.clone();
        ui.original_transcript = result.original_text.clone();
        ui.current_mode = result.mode.clone();
        ui.asr_time_ms = Some(result.asr_time_ms);
        ui.llm_time_ms = result.llm_time_ms;
        ui.total_time_ms = Some(result.total_time_ms);
        ui.status = AppStatus::Running;
    }

    let preset_name = {
        let store = ctx.store();
        let llm = &store.settings().llm_config;
        llm.presets
            .iter()
            .find(|p| p.id == llm.active_preset_id)
            .map(|p| p.name.clone())
    };
    ctx.append_history(HistoryRecord::from_transcription(
        result,
        preset_name.as_deref(),
    ));
}

fn reload_usage_stats(ctx: &Arc<AppContext>, runtime: &Handle) {
    let ctx = Arc::clone(ctx);
    runtime.spawn(async move { ctx.reload_usage_stats().await });
}

/// 按保存的关闭行为处理；未设置、读取失败或执行失败时弹出确认框
async fn handle_close_requested(ctx: &AppContext) {
    let action = match ctx.backend.load_config().await {
        Ok(config) => config.close_action,
        Err(e) => {
            tracing::warn!("读取关闭行为失败: {}", e);
            None
        }
    };

    let result = match action {
        Some(CloseAction::Close) => ctx.backend.quit_app().await,
        Some(CloseAction::Minimize) => ctx.backend.hide_to_tray().await,
        None => {
            ctx.ui().show_close_dialog = true;
            Ok(())
        }
    };
    if let Err(e) = result {
        tracing::error!("执行关闭行为失败: {}", e);
        ctx.ui().show_close_dialog = true;
    }
}
