use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 同步状态：idle → syncing → success/error → idle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    Success,
    Error,
}

#[derive(Debug, Default)]
struct IndicatorState {
    status: SyncStatus,
    generation: u64,
}

/// 单个控件的同步状态指示
///
/// success/error 在超时后自动回到 idle；期间若开始了新的同步，
/// 旧的超时不会覆盖新状态
#[derive(Debug, Clone, Default)]
pub struct SyncIndicator {
    inner: Arc<Mutex<IndicatorState>>,
}

impl SyncIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SyncStatus {
        self.lock().status
    }

    pub fn is_syncing(&self) -> bool {
        self.status() == SyncStatus::Syncing
    }

    /// 进入 syncing；已在同步中则返回 false
    pub fn try_begin(&self) -> bool {
        let mut state = self.lock();
        if state.status == SyncStatus::Syncing {
            return false;
        }
        state.status = SyncStatus::Syncing;
        state.generation += 1;
        true
    }

    /// 标记结果，并在 reset_after 后回到 idle
    pub fn finish(&self, status: SyncStatus, reset_after: Duration) {
        let generation = {
            let mut state = self.lock();
            state.status = status;
            state.generation += 1;
            state.generation
        };

        let inner = Arc::clone(&self.inner);
        let reset = async move {
            tokio::time::sleep(reset_after).await;
            let mut state = inner.lock().unwrap_or_else(|e| e.into_inner());
            if state.generation == generation {
                state.status = SyncStatus::Idle;
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(reset);
            }
            Err(_) => tracing::debug!("无 tokio 运行时，同步状态不会自动复位"),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, IndicatorState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// 乐观更新
///
/// 先把新值写入内存，保存成功后提交，失败则回滚到旧值
#[derive(Debug, Clone, PartialEq)]
pub enum OptimisticUpdate<T> {
    Pending { previous: T, next: T },
    Committed(T),
    RolledBack(T),
}

impl<T> OptimisticUpdate<T> {
    pub fn new(previous: T, next: T) -> Self {
        OptimisticUpdate::Pending { previous, next }
    }

    pub fn commit(self) -> Self {
        match self {
            OptimisticUpdate::Pending { next, .. } => OptimisticUpdate::Committed(next),
            settled => settled,
        }
    }

    pub fn rollback(self) -> Self {
        match self {
            OptimisticUpdate::Pending { previous, .. } => OptimisticUpdate::RolledBack(previous),
            settled => settled,
        }
    }

    /// 当前应显示的值
    pub fn value(&self) -> &T {
        match self {
            OptimisticUpdate::Pending { next, .. } => next,
            OptimisticUpdate::Committed(v) | OptimisticUpdate::RolledBack(v) => v,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, OptimisticUpdate::Committed(_))
    }

    pub fn is_rolled_back(&self) -> bool {
        matches!(self, OptimisticUpdate::RolledBack(_))
    }
}
