//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `OutpaintHandler` 只负责流程编排与配置管理，不直接与 HTTP 框架绑定。
//! 处理链路固定为：
//! 1. 检查生成服务配置
//! 2. 校验字段与目标尺寸，再校验请求体上限
//! 3. 解码原图并构建首块瓦片
//! 4. 按方向扩展并拼接
//! 5. 非等比缩放到精确目标尺寸并编码 PNG
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<OutpaintConfig>>` 持有，单次请求内使用同一配置快照。
//! - 解码 / 缩放 / 编码等 CPU 密集阶段放入 `spawn_blocking`，不阻塞 async 运行时。
//! - 记录 `decode/extend/finalize/total` 阶段耗时，便于性能诊断。
//! - 处理器本身无请求级可变状态，可被并发请求安全复用。

use std::sync::{Arc, RwLock};
use std::time::Instant;

use serde_json::Value;

use super::compositor::{self, ResizeMode};
use super::engine::ExtensionEngine;
use super::{
    ExtendOutput, ExtendPayload, ExtendRequest, InitialTile, OutpaintClient, OutpaintConfig,
    OutpaintError, OutpaintQuality, TileGeometry, loader, tile,
};

/// 将目标宽高比映射为生长轴所需长度，并夹在 `[tile, tile * max_steps]` 内。
pub fn required_extent(geometry: TileGeometry, target_w: u32, target_h: u32, max_steps: u32) -> u32 {
    let (target_long, target_short) = match geometry {
        TileGeometry::Portrait => (target_h as u64, target_w as u64),
        TileGeometry::Landscape => (target_w as u64, target_h as u64),
    };
    let tile_short = geometry.cross_extent() as u64;
    let tile_long = geometry.growth_extent() as u64;

    let short = target_short.max(1);
    let needed = (tile_short * target_long).div_ceil(short);
    needed.clamp(tile_long, tile_long * max_steps.max(1) as u64) as u32
}

/// 解析目标尺寸：接受整数、可截断的有限浮点数及数字字符串。
fn parse_dimension(value: Option<&Value>, field: &str, config: &OutpaintConfig) -> Result<u32, OutpaintError> {
    let parsed = match value {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Some(Value::String(text)) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    };

    let Some(parsed) = parsed else {
        return Err(OutpaintError::Validation(format!("{} 缺失或不是整数", field)));
    };

    let (min, max) = (config.min_target_dimension as i64, config.max_target_dimension as i64);
    if parsed < min || parsed > max {
        return Err(OutpaintError::Validation(format!(
            "{} 必须在 {}~{} 之间：{}",
            field, min, max, parsed
        )));
    }

    Ok(parsed as u32)
}

/// 外扩处理器。
pub struct OutpaintHandler<C> {
    config: Arc<RwLock<OutpaintConfig>>,
    client: Arc<C>,
}

impl<C: OutpaintClient + 'static> OutpaintHandler<C> {
    /// 根据配置与注入的生成服务创建处理器。
    pub fn new(config: OutpaintConfig, client: Arc<C>) -> Result<Self, OutpaintError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            client,
        })
    }

    pub fn ensure_ready(&self) -> Result<(), OutpaintError> {
        self.client.ensure_ready()
    }

    /// 获取配置快照，保证单次请求链路使用一致参数。
    pub(super) fn config_snapshot(&self) -> Result<OutpaintConfig, OutpaintError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| OutpaintError::Internal("配置读取锁已中毒".to_string()))
    }

    pub(super) fn replace_config(&self, config: OutpaintConfig) -> Result<(), OutpaintError> {
        config.validate()?;
        let mut guard = self
            .config
            .write()
            .map_err(|_| OutpaintError::Internal("配置写入锁已中毒".to_string()))?;
        *guard = config;
        Ok(())
    }

    /// 校验原始请求体。字段错误优先于体积错误返回。
    pub fn validate(payload: ExtendPayload, config: &OutpaintConfig) -> Result<ExtendRequest, OutpaintError> {
        let image_data_url = payload
            .image_data_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| OutpaintError::Validation("缺少 imageDataUrl".to_string()))?;

        let target_w = parse_dimension(payload.target_w.as_ref(), "targetW", config)?;
        let target_h = parse_dimension(payload.target_h.as_ref(), "targetH", config)?;

        loader::check_payload_ceiling(&image_data_url, config)?;

        let quality = match payload.quality.as_deref().map(str::trim) {
            None | Some("") => OutpaintQuality::default(),
            Some(value) => OutpaintQuality::parse(value)?,
        };

        Ok(ExtendRequest {
            image_data_url,
            target_w,
            target_h,
            quality,
        })
    }

    /// 处理主入口：原始请求体 → PNG 结果。
    pub async fn process(&self, payload: ExtendPayload) -> Result<ExtendOutput, OutpaintError> {
        self.ensure_ready()?;
        let config = self.config_snapshot()?;
        let request = Self::validate(payload, &config)?;
        self.extend(request, config).await
    }

    async fn extend(&self, request: ExtendRequest, config: OutpaintConfig) -> Result<ExtendOutput, OutpaintError> {
        let total_start = Instant::now();
        let ExtendRequest {
            image_data_url,
            target_w,
            target_h,
            quality,
        } = request;

        let geometry = TileGeometry::for_target(target_w, target_h);
        let required = required_extent(geometry, target_w, target_h, config.max_steps);
        log::info!(
            "📐 外扩请求 - target={}x{} tile={} required={} quality={}",
            target_w,
            target_h,
            geometry.size_label(),
            required,
            quality.as_str()
        );

        let decode_start = Instant::now();
        let decode_config = config.clone();
        let initial: InitialTile = tokio::task::spawn_blocking(move || {
            let source = loader::load_source_image(&image_data_url, &decode_config)?;
            tile::make_initial_tile(&source, geometry, decode_config.resize_filter)
        })
        .await
        .map_err(|e| OutpaintError::Internal(format!("解码线程执行失败：{}", e)))??;
        let decode_elapsed = decode_start.elapsed();

        let extend_start = Instant::now();
        let engine = ExtensionEngine::new(self.client.as_ref(), geometry, &config, quality)?;
        let stitched = engine.run(&initial.seed, required).await?;
        let extend_elapsed = extend_start.elapsed();

        let finalize_start = Instant::now();
        let filter = config.resize_filter;
        let result_image = stitched.stitched;
        let png_bytes = tokio::task::spawn_blocking(move || {
            let resized = compositor::resize(&result_image, target_w, target_h, ResizeMode::Fill, filter)?;
            compositor::encode_png(&resized)
        })
        .await
        .map_err(|e| OutpaintError::Internal(format!("编码线程执行失败：{}", e)))??;
        let finalize_elapsed = finalize_start.elapsed();

        log::info!(
            "✅ 外扩完成 - steps={} tile={} decode={}ms extend={}ms finalize={}ms total={}ms",
            stitched.steps_taken,
            stitched.tile_label,
            decode_elapsed.as_millis(),
            extend_elapsed.as_millis(),
            finalize_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(ExtendOutput {
            png_bytes,
            steps: stitched.steps_taken,
            tile_label: stitched.tile_label,
        })
    }
}
