//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到两个结构体：
//! - `OutpaintConfig`：拼接编排参数（重叠带、步数预算、输入上限、缩放滤镜）
//! - `GenerationConfig`：外部生成服务参数（地址、密钥、模型、超时、重试）
//!
//! `Default` 即生产可用配置；`settings` 模块负责从文件与环境变量覆盖。
//!
//! ## 实现思路
//!
//! - `OutpaintQuality` 负责质量档位字符串解析与反向输出。
//! - `validate` 在服务构建时执行一次，拒绝会导致越界裁剪的参数组合。

use image::imageops::FilterType;

use super::OutpaintError;

const DEFAULT_OVERLAP: u32 = 512;
const DEFAULT_MAX_STEPS: u32 = 4;
const DEFAULT_MAX_DATA_URL_CHARS: usize = 8_000_000;
const DEFAULT_MIN_TARGET_DIMENSION: u32 = 100;
/// 步数预算上限，保证 `tile * max_steps` 等长度运算不溢出 `u32`。
pub const MAX_STEPS_LIMIT: u32 = 16;

const DEFAULT_PROMPT: &str = "Extend the photo naturally beyond its borders. \
Continue the existing scene realistically (photoreal). \
Do NOT change the original content; only fill the transparent area. \
Match lighting, colors, and perspective.";

/// 拼接编排配置。
#[derive(Debug, Clone)]
pub struct OutpaintConfig {
    /// 相邻两次生成之间保留的重叠带厚度（像素）。
    pub overlap: u32,
    /// 单次请求允许的最大生成调用次数（含首块）。
    pub max_steps: u32,
    /// `imageDataUrl` 字符串长度上限。
    pub max_data_url_chars: usize,
    /// 目标宽/高下限。
    pub min_target_dimension: u32,
    /// 目标宽/高上限。
    pub max_target_dimension: u32,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码阶段允许的预计内存上限（按 RGBA 估算，字节）。
    pub max_decoded_bytes: u64,
    /// 缩放滤镜策略。
    pub resize_filter: FilterType,
}

impl Default for OutpaintConfig {
    fn default() -> Self {
        Self {
            overlap: DEFAULT_OVERLAP,
            max_steps: DEFAULT_MAX_STEPS,
            max_data_url_chars: DEFAULT_MAX_DATA_URL_CHARS,
            min_target_dimension: DEFAULT_MIN_TARGET_DIMENSION,
            max_target_dimension: 8192,
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            resize_filter: FilterType::CatmullRom,
        }
    }
}

impl OutpaintConfig {
    /// 校验参数组合。
    ///
    /// 重叠带必须小于任一瓦片的生长轴长度，否则新区域切片为空或越界。
    pub fn validate(&self) -> Result<(), OutpaintError> {
        if self.max_steps == 0 {
            return Err(OutpaintError::Validation("max_steps 不能为 0".to_string()));
        }
        if self.max_steps > MAX_STEPS_LIMIT {
            return Err(OutpaintError::Validation(format!(
                "max_steps 不能超过 {}：{}",
                MAX_STEPS_LIMIT, self.max_steps
            )));
        }
        if self.overlap == 0 {
            return Err(OutpaintError::Validation("overlap 不能为 0".to_string()));
        }
        let shortest_growth_axis = super::TileGeometry::Portrait
            .growth_extent()
            .min(super::TileGeometry::Landscape.growth_extent());
        if self.overlap >= shortest_growth_axis {
            return Err(OutpaintError::Validation(format!(
                "overlap 必须小于瓦片生长轴长度：{} >= {}",
                self.overlap, shortest_growth_axis
            )));
        }
        if self.min_target_dimension == 0 || self.min_target_dimension > self.max_target_dimension {
            return Err(OutpaintError::Validation(format!(
                "目标尺寸范围无效：{}~{}",
                self.min_target_dimension, self.max_target_dimension
            )));
        }
        Ok(())
    }
}

/// 外部生成服务配置。
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// OpenAI 兼容 API 根地址（不含结尾 `/`）。
    pub api_base: String,
    /// 服务密钥；缺失时每个请求以配置错误拒绝。
    pub api_key: Option<String>,
    pub model: String,
    pub prompt: String,
    /// 单次生成请求超时（秒）。需覆盖服务最坏延迟。
    pub request_timeout: u64,
    /// 建立连接超时（秒）。
    pub connect_timeout: u64,
    /// 单次生成调用的最大尝试次数（1 = 不重试）。
    pub max_attempts: u32,
    /// 重试基础间隔（毫秒）。
    pub retry_base_delay_ms: u64,
    /// 单次退避延迟上限（毫秒）。
    pub retry_max_delay_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-image-1-mini".to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            request_timeout: 300,
            connect_timeout: 10,
            max_attempts: 2,
            retry_base_delay_ms: 800,
            retry_max_delay_ms: 8_000,
        }
    }
}

/// 生成质量档位。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutpaintQuality {
    #[default]
    Low,
    Medium,
    High,
    Auto,
}

impl OutpaintQuality {
    /// 从外部字符串解析档位，大小写不敏感。
    pub fn parse(value: &str) -> Result<Self, OutpaintError> {
        match value.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "auto" => Ok(Self::Auto),
            other => Err(OutpaintError::Validation(format!(
                "未知质量档位：{}（可选：low / medium / high / auto）",
                other
            ))),
        }
    }

    /// 输出为外部服务接受的稳定字符串。
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Auto => "auto",
        }
    }
}
