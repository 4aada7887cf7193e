//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载外扩链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧（HTTP 层）可按分支映射状态码。
//!
//! - 输入类：`Validation` / `Decode` / `PayloadTooLarge` / `ResourceLimit`
//! - 服务端类：`Configuration` / `GenerationFailed` / `Network` / `Timeout`
//! - 内部类：`OutOfBounds`（编排缺陷，不应由用户输入触发）/ `Internal`（阻塞任务异常）

/// 外扩处理统一错误类型。
#[derive(Debug, thiserror::Error)]
pub enum OutpaintError {
    #[error("参数错误：{0}")]
    Validation(String),

    #[error("请求体过大：{0}")]
    PayloadTooLarge(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("服务配置缺失：{0}")]
    Configuration(String),

    #[error("生成失败：{0}")]
    GenerationFailed(String),

    #[error("网络错误：{0}")]
    Network(String),

    #[error("超时错误：{0}")]
    Timeout(String),

    #[error("区域越界：{0}")]
    OutOfBounds(String),

    #[error("内部错误：{0}")]
    Internal(String),
}

impl OutpaintError {
    /// 稳定错误码，用于日志检索。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            Self::Decode(_) => "DECODE",
            Self::ResourceLimit(_) => "RESOURCE_LIMIT",
            Self::Configuration(_) => "CONFIGURATION",
            Self::GenerationFailed(_) => "GENERATION_FAILED",
            Self::Network(_) => "NETWORK",
            Self::Timeout(_) => "TIMEOUT",
            Self::OutOfBounds(_) => "OUT_OF_BOUNDS",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// 是否属于调用方输入问题（4xx）。
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Decode(_) | Self::PayloadTooLarge(_) | Self::ResourceLimit(_)
        )
    }

    /// 映射为 HTTP 状态码。
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::Decode(_) => 400,
            Self::PayloadTooLarge(_) | Self::ResourceLimit(_) => 413,
            Self::Configuration(_)
            | Self::GenerationFailed(_)
            | Self::Network(_)
            | Self::Timeout(_)
            | Self::OutOfBounds(_)
            | Self::Internal(_) => 500,
        }
    }
}

impl From<OutpaintError> for String {
    /// 兼容以纯文本返回错误的调用点。
    fn from(error: OutpaintError) -> Self {
        error.to_string()
    }
}
