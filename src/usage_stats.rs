// 使用统计
//
// 统计数据由后端负责累加，这里只缓存最近一次读取的结果用于显示

use serde::{Deserialize, Serialize};

use crate::bridge::Backend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    #[serde(default)]
    pub total_recording_ms: u64,
    #[serde(default)]
    pub total_recording_count: u64,
    #[serde(default)]
    pub total_recognized_chars: u64,
}

/// 从后端加载统计数据，失败时返回默认值
pub async fn load_usage_stats(backend: &dyn Backend) -> UsageStats {
    match backend.load_usage_stats().await {
        Ok(stats) => {
            tracing::debug!("[UsageStats] 从后端加载统计数据: {:?}", stats);
            stats
        }
        Err(e) => {
            tracing::error!("加载统计数据失败: {}", e);
            UsageStats::default()
        }
    }
}
