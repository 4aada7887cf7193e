//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 在“尽可能早”的阶段执行输入校验，尽快失败，减少不必要的内存与 CPU 消耗：
//! 1. 字符串长度上限（与格式错误区分，单独返回 `PayloadTooLarge`）
//! 2. Data URL 格式解析 + Base64 解码
//! 3. 文件签名（magic bytes）校验
//! 4. 读取 header 尺寸并按像素上限快速拒绝
//! 5. 完整解码为 RGBA

use base64::{Engine as _, engine::general_purpose};
use image::{ImageReader, RgbaImage};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Cursor;

use super::{OutpaintConfig, OutpaintError};

static DATA_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:(image/[a-zA-Z0-9.+-]+);base64,(.+)$").expect("data URL pattern must compile")
});

/// 校验 `imageDataUrl` 长度上限。
pub fn check_payload_ceiling(data_url: &str, config: &OutpaintConfig) -> Result<(), OutpaintError> {
    if data_url.len() > config.max_data_url_chars {
        return Err(OutpaintError::PayloadTooLarge(format!(
            "imageDataUrl 长度 {} 超过上限 {}",
            data_url.len(),
            config.max_data_url_chars
        )));
    }
    Ok(())
}

/// 解析 `data:image/*;base64,...` 并返回原始字节。
pub fn parse_data_url(data_url: &str) -> Result<Vec<u8>, OutpaintError> {
    let captures = DATA_URL_PATTERN
        .captures(data_url.trim())
        .ok_or_else(|| OutpaintError::Validation("imageDataUrl 不是有效的 base64 图片 Data URL".to_string()))?;

    let payload = captures
        .get(2)
        .map(|m| m.as_str())
        .ok_or_else(|| OutpaintError::Validation("缺少 base64 数据".to_string()))?;

    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| OutpaintError::Decode(format!("Base64 解码失败：{}", e)))
}

/// 通过文件签名校验输入是否为图片。
fn validate_image_signature(bytes: &[u8]) -> Result<(), OutpaintError> {
    if bytes.is_empty() {
        return Err(OutpaintError::Decode("图片内容为空".to_string()));
    }

    let kind = infer::get(bytes).ok_or_else(|| OutpaintError::Decode("无法识别图片类型".to_string()))?;

    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(OutpaintError::Decode(format!(
            "文件签名不是图片类型：{}",
            kind.mime_type()
        )));
    }

    Ok(())
}

/// 仅通过图片头信息读取宽高，用于完整解码前的像素限制检查。
fn inspect_dimensions(bytes: &[u8]) -> Result<(u32, u32), OutpaintError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| OutpaintError::Decode(format!("无法识别图片格式：{}", e)))?
        .into_dimensions()
        .map_err(|e| OutpaintError::Decode(format!("无法读取图片尺寸：{}", e)))
}

fn validate_pixel_limits(config: &OutpaintConfig, width: u32, height: u32) -> Result<(), OutpaintError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| OutpaintError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > config.max_decoded_pixels {
        return Err(OutpaintError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, config.max_decoded_pixels
        )));
    }

    let estimated = pixels
        .checked_mul(4)
        .ok_or_else(|| OutpaintError::ResourceLimit("图片解码内存估算溢出".to_string()))?;
    if estimated > config.max_decoded_bytes {
        return Err(OutpaintError::ResourceLimit(format!(
            "图片解码预计内存过大：{:.2} MB（限制：{:.2} MB）",
            estimated as f64 / 1024.0 / 1024.0,
            config.max_decoded_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    Ok(())
}

/// 将原始字节解码为 RGBA 原图。
pub fn decode_source_image(bytes: &[u8], config: &OutpaintConfig) -> Result<RgbaImage, OutpaintError> {
    validate_image_signature(bytes)?;

    let (header_width, header_height) = inspect_dimensions(bytes)?;
    validate_pixel_limits(config, header_width, header_height)?;

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| OutpaintError::Decode(format!("图片解码失败：{}", e)))?;
    let rgba = decoded.to_rgba8();

    log::info!(
        "✅ 原图解码成功 - 输入={}KB 尺寸={}x{}",
        bytes.len() / 1024,
        rgba.width(),
        rgba.height()
    );

    Ok(rgba)
}

/// 完整加载：长度上限 → Data URL → 解码。
pub fn load_source_image(data_url: &str, config: &OutpaintConfig) -> Result<RgbaImage, OutpaintError> {
    check_payload_ceiling(data_url, config)?;
    let bytes = parse_data_url(data_url)?;
    decode_source_image(&bytes, config)
}
