// Sync 模块 - 配置同步
//
// 三种保存路径：
// - 即时保存：取消待执行的自动保存，保存后（运行中则）重启服务
// - 自动保存：最后一次修改后 900ms 触发，录音/处理中跳过
// - 热更新：无需重启的字段直接推送给运行中的服务

mod coordinator;
mod debounce;
mod status;

pub use coordinator::SyncCoordinator;
pub use debounce::Debouncer;
pub use status::{OptimisticUpdate, SyncIndicator, SyncStatus};

use std::time::Duration;

/// 同步相关的各项时长
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTimings {
    /// 自动保存防抖
    pub autosave_debounce: Duration,
    /// success → idle
    pub success_reset: Duration,
    /// error → idle
    pub error_reset: Duration,
    pub hotkey_error: Duration,
    pub duplicate_hint: Duration,
    pub success_toast: Duration,
    pub copy_toast: Duration,
}

impl Default for SyncTimings {
    fn default() -> Self {
        Self {
            autosave_debounce: Duration::from_millis(900),
            success_reset: Duration::from_millis(1500),
            error_reset: Duration::from_millis(2000),
            hotkey_error: Duration::from_secs(3),
            duplicate_hint: Duration::from_secs(2),
            success_toast: Duration::from_secs(3),
            copy_toast: Duration::from_secs(2),
        }
    }
}
