// 语音输入助手：设置同步与运行时协调
//
// 原生后端（录音、ASR、LLM、全局热键）通过 Backend trait 接入，
// 本 crate 负责配置的加载/保存/热更新、热键录制、事件投影和本地历史。

pub mod app;
pub mod bridge;
pub mod config;
pub mod config_store;
pub mod dictionary;
pub mod error_parser;
pub mod events;
pub mod history;
pub mod hotkey;
pub mod hotkey_recorder;
pub mod local_store;
pub mod migration;
pub mod presets;
pub mod service;
pub mod sync;
pub mod ui_state;
pub mod usage_stats;

#[cfg(test)]
pub(crate) mod test_support;

pub use app::AppContext;
pub use bridge::{Backend, BackendEvent, ConfigPayload, EventKind, RuntimeConfigUpdate};
pub use config::{AppConfig, DualHotkeyConfig, HotkeyConfig, HotkeyKey};
pub use config_store::{ConfigOverrides, ConfigStore, SettingChange, Settings};
pub use events::EventBridge;
pub use hotkey_recorder::{HotkeyRecorder, RecordingTarget};
pub use local_store::LocalStore;
pub use service::ServiceController;
pub use sync::{SyncCoordinator, SyncStatus, SyncTimings};
pub use ui_state::{AppStatus, UiState};

/// 安装默认的 fmt 日志输出；宿主已安装订阅者时忽略
pub fn init_logging() {
    if tracing_subscriber::fmt::try_init().is_err() {
        tracing::debug!("日志订阅者已存在，跳过初始化");
    }
}
