//! # 画布合成模块
//!
//! ## 设计思路
//!
//! 纯函数式缓冲操作：输入缓冲、输出新缓冲，不感知任何拼接策略。
//! 所有绘制均按非预乘 RGBA 直接拷贝像素，保证蒙版“完全不透明 / 完全透明”判断精确。
//!
//! ## 实现思路
//!
//! - 缩放优先走 `fast_image_resize`，失败时回退 `image::imageops::resize`。
//! - 裁剪与粘贴前统一做矩形越界校验，越界即 `OutOfBounds`（属于编排缺陷）。

use fast_image_resize as fr;
use image::imageops::FilterType;
use image::{ImageBuffer, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

use super::{Layer, OutpaintError, Rect};

pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);
pub const OPAQUE_WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const OPAQUE_BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// 缩放模式。
///
/// 调用方自行计算目标矩形，因此内部只需要非等比拉伸。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    Fill,
}

/// 将缓冲缩放到精确的 `width x height`。
pub fn resize(
    image: &RgbaImage,
    width: u32,
    height: u32,
    mode: ResizeMode,
    filter: FilterType,
) -> Result<RgbaImage, OutpaintError> {
    if width == 0 || height == 0 {
        return Err(OutpaintError::OutOfBounds(format!(
            "缩放目标尺寸无效：{}x{}",
            width, height
        )));
    }

    match mode {
        ResizeMode::Fill => {
            if image.dimensions() == (width, height) {
                return Ok(image.clone());
            }

            match resize_with_fast_image_resize(image, width, height, filter) {
                Ok(resized) => Ok(resized),
                Err(err) => {
                    log::warn!(
                        "⚠️ fast_image_resize 缩放失败，回退 image::imageops::resize：{}",
                        err
                    );
                    Ok(image::imageops::resize(image, width, height, filter))
                }
            }
        }
    }
}

fn resize_with_fast_image_resize(
    image: &RgbaImage,
    target_width: u32,
    target_height: u32,
    filter: FilterType,
) -> Result<RgbaImage, OutpaintError> {
    let (src_width, src_height) = image.dimensions();

    let src_image = fr::images::Image::from_vec_u8(
        src_width,
        src_height,
        image.as_raw().clone(),
        fr::PixelType::U8x4,
    )
    .map_err(|e| OutpaintError::Decode(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options =
        fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(to_fast_filter(filter)));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| OutpaintError::Decode(format!("fast_image_resize 执行失败：{}", e)))?;

    ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(target_width, target_height, dst_image.into_vec())
        .ok_or_else(|| OutpaintError::Decode("fast_image_resize 输出缓冲长度异常".to_string()))
}

fn to_fast_filter(filter: FilterType) -> fr::FilterType {
    match filter {
        FilterType::Nearest => fr::FilterType::Box,
        FilterType::Triangle => fr::FilterType::Bilinear,
        FilterType::CatmullRom => fr::FilterType::CatmullRom,
        FilterType::Gaussian => fr::FilterType::Mitchell,
        FilterType::Lanczos3 => fr::FilterType::Lanczos3,
    }
}

/// 裁剪矩形区域。
pub fn extract_region(image: &RgbaImage, rect: Rect) -> Result<RgbaImage, OutpaintError> {
    let (width, height) = image.dimensions();
    if rect.width == 0 || rect.height == 0 || !rect.fits_within(width, height) {
        return Err(OutpaintError::OutOfBounds(format!(
            "裁剪区域 {:?} 超出缓冲 {}x{}",
            rect, width, height
        )));
    }

    Ok(image::imageops::crop_imm(image, rect.left, rect.top, rect.width, rect.height).to_image())
}

/// 在全新画布上按顺序绘制图层，后绘制的图层覆盖先前像素。
pub fn composite_onto(
    width: u32,
    height: u32,
    background: Rgba<u8>,
    layers: &[Layer],
) -> Result<RgbaImage, OutpaintError> {
    let mut canvas = RgbaImage::from_pixel(width, height, background);

    for layer in layers {
        let rect = Rect::new(layer.left, layer.top, layer.image.width(), layer.image.height());
        if !rect.fits_within(width, height) {
            return Err(OutpaintError::OutOfBounds(format!(
                "图层 {:?} 超出画布 {}x{}",
                rect, width, height
            )));
        }
        image::imageops::replace(&mut canvas, &layer.image, layer.left as i64, layer.top as i64);
    }

    Ok(canvas)
}

/// 纯色矩形缓冲（用于构建蒙版）。
pub fn solid_rect(width: u32, height: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(width, height, color)
}

pub fn is_fully_opaque(image: &RgbaImage) -> bool {
    image.pixels().all(|pixel| pixel[3] == u8::MAX)
}

/// 编码为 PNG 字节。
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, OutpaintError> {
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| OutpaintError::Internal(format!("PNG 编码失败：{}", e)))?;
    Ok(cursor.into_inner())
}

/// 解码 PNG（或其他可识别格式）为 RGBA 缓冲。
pub fn decode_png(bytes: &[u8]) -> Result<RgbaImage, OutpaintError> {
    image::load_from_memory(bytes)
        .map(|decoded| decoded.to_rgba8())
        .map_err(|e| OutpaintError::Decode(format!("图片解码失败：{}", e)))
}
