// 错误信息解析
//
// 把后端返回的原始错误字符串转换为面向用户的标题和建议。
// 模式按优先级排列，命中第一个即返回。

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Audio,
    Network,
    Auth,
    Service,
    Unknown,
}

impl ErrorCategory {
    pub fn icon(&self) -> &'static str {
        match self {
            ErrorCategory::Audio => "🎤",
            ErrorCategory::Network => "🌐",
            ErrorCategory::Auth => "🔑",
            ErrorCategory::Service => "⚠️",
            ErrorCategory::Unknown => "❓",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FriendlyError {
    pub category: ErrorCategory,
    pub title: &'static str,
    pub suggestion: &'static str,
    /// 原始错误文本
    pub details: String,
}

struct ErrorPattern {
    /// (原始文本, 小写文本)
    matches: fn(&str, &str) -> bool,
    category: ErrorCategory,
    title: &'static str,
    suggestion: &'static str,
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

const ERROR_PATTERNS: &[ErrorPattern] = &[
    // ========== 音频 ==========
    ErrorPattern {
        matches: |raw, _| contains_any(raw, &["录音器未初始化", "流式录音器未初始化"]),
        category: ErrorCategory::Audio,
        title: "音频系统未就绪",
        suggestion: "请重启应用后重试",
    },
    ErrorPattern {
        matches: |raw, _| raw.contains("录音失败") && !raw.contains("停止录音失败"),
        category: ErrorCategory::Audio,
        title: "麦克风启动失败",
        suggestion: "请检查麦克风权限和设备连接",
    },
    ErrorPattern {
        matches: |raw, _| raw.contains("停止录音失败"),
        category: ErrorCategory::Audio,
        title: "录音停止异常",
        suggestion: "请重试",
    },
    ErrorPattern {
        matches: |raw, _| raw.contains("没有录制到音频数据"),
        category: ErrorCategory::Audio,
        title: "未检测到语音",
        suggestion: "请检查麦克风是否静音或被其他应用占用",
    },
    // ========== 认证 ==========
    ErrorPattern {
        matches: |raw, lower| {
            contains_any(lower, &["401", "403", "unauthorized", "forbidden"])
                || (lower.contains("invalid") && lower.contains("key"))
                || contains_any(raw, &["密钥", "认证"])
        },
        category: ErrorCategory::Auth,
        title: "API 密钥无效",
        suggestion: "请检查设置中的服务密钥配置",
    },
    // ========== 网络超时 ==========
    ErrorPattern {
        matches: |raw, lower| contains_any(lower, &["timeout", "timed out"]) || raw.contains("超时"),
        category: ErrorCategory::Network,
        title: "网络连接超时",
        suggestion: "请检查网络连接后重试",
    },
    // ========== 服务端 ==========
    ErrorPattern {
        matches: |_, lower| {
            contains_any(lower, &["500", "502", "503", "504"])
                || (lower.contains("service") && lower.contains("unavailable"))
        },
        category: ErrorCategory::Service,
        title: "服务暂时不可用",
        suggestion: "请稍后重试",
    },
    // ========== 网络连接 ==========
    ErrorPattern {
        matches: |raw, lower| {
            contains_any(lower, &["network", "connection", "fetch", "dns"]) || raw.contains("连接")
        },
        category: ErrorCategory::Network,
        title: "网络连接失败",
        suggestion: "请检查网络设置后重试",
    },
    // ========== 通用失败 ==========
    ErrorPattern {
        matches: |raw, _| raw.contains("转录失败"),
        category: ErrorCategory::Network,
        title: "语音识别失败",
        suggestion: "请检查网络连接或稍后重试",
    },
    ErrorPattern {
        matches: |raw, _| raw.contains("AI 助手处理失败"),
        category: ErrorCategory::Network,
        title: "AI 处理失败",
        suggestion: "请检查网络连接和 AI 服务配置",
    },
];

/// 解析原始错误；未命中任何模式时归为 unknown
pub fn parse_error(raw: Option<&str>) -> FriendlyError {
    let raw = raw.unwrap_or_default();
    let lower = raw.to_lowercase();

    if !raw.is_empty() {
        if let Some(pattern) = ERROR_PATTERNS.iter().find(|p| (p.matches)(raw, &lower)) {
            return FriendlyError {
                category: pattern.category,
                title: pattern.title,
                suggestion: pattern.suggestion,
                details: raw.to_string(),
            };
        }
    }

    FriendlyError {
        category: ErrorCategory::Unknown,
        title: "操作失败",
        suggestion: "请重试或检查配置",
        details: raw.to_string(),
    }
}

// ============================================================================
// 自动更新
// ============================================================================

/// 检查更新失败时的提示
pub fn update_check_message(error: &str) -> &'static str {
    let e = error.to_lowercase();
    if contains_any(&e, &["timeout", "timed out"]) {
        "检查更新超时，请检查网络连接"
    } else if contains_any(&e, &["network", "fetch", "connect"]) {
        "网络连接失败，请检查网络设置"
    } else if contains_any(&e, &["404", "not found"]) {
        "未找到更新信息，可能尚未发布新版本"
    } else if contains_any(&e, &["certificate", "ssl", "tls"]) {
        "安全连接失败，请检查系统时间或网络环境"
    } else if contains_any(&e, &["signature", "verify"]) {
        "更新签名验证失败，请从官方渠道下载"
    } else {
        "检查更新失败，请稍后重试"
    }
}

/// 下载安装更新失败时的提示
pub fn update_download_message(error: &str) -> &'static str {
    let e = error.to_lowercase();
    if e.contains("timeout") {
        "下载超时，请检查网络连接后重试"
    } else if contains_any(&e, &["network", "fetch", "connect"]) {
        "网络连接中断，请检查网络后重试"
    } else if contains_any(&e, &["space", "disk"]) {
        "磁盘空间不足，请清理后重试"
    } else if contains_any(&e, &["permission", "access"]) {
        "没有写入权限，请以管理员身份运行"
    } else if contains_any(&e, &["signature", "verify"]) {
        "安装包签名验证失败，请从官方渠道下载"
    } else {
        "下载更新失败，请稍后重试"
    }
}
