//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入”和“流水线中间结果”解耦：
//! - `ExtendRequest` 表示已校验的外部请求
//! - `TileSeed` / `ExtensionState` / `StitchResult` 表示编排中间态
//! - `ExtendOutput` 表示可直接返回给调用方的结果
//!
//! 所有像素缓冲均为非预乘 RGBA8（`RgbaImage`），生成后不再原地修改。

use image::RgbaImage;

use super::OutpaintQuality;

/// 像素矩形，偏移与尺寸均为非负整数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// 是否完整落在 `width x height` 的缓冲内。
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        let right = self.left as u64 + self.width as u64;
        let bottom = self.top as u64 + self.height as u64;
        right <= width as u64 && bottom <= height as u64
    }
}

/// 拼接生长方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// 自上而下增长高度。
    Vertical,
    /// 自左向右增长宽度。
    Horizontal,
}

/// 外部服务支持的两种瓦片尺寸。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileGeometry {
    /// 1024 x 1536
    Portrait,
    /// 1536 x 1024
    Landscape,
}

impl TileGeometry {
    /// 按目标尺寸选择几何：`target_h >= target_w` 为竖版（正方形走竖版）。
    pub fn for_target(target_w: u32, target_h: u32) -> Self {
        if target_h >= target_w {
            Self::Portrait
        } else {
            Self::Landscape
        }
    }

    pub fn width(self) -> u32 {
        match self {
            Self::Portrait => 1024,
            Self::Landscape => 1536,
        }
    }

    pub fn height(self) -> u32 {
        match self {
            Self::Portrait => 1536,
            Self::Landscape => 1024,
        }
    }

    /// 与几何长边一致的生长轴。
    pub fn axis(self) -> Axis {
        match self {
            Self::Portrait => Axis::Vertical,
            Self::Landscape => Axis::Horizontal,
        }
    }

    /// 生长轴方向的瓦片长度（长边）。
    pub fn growth_extent(self) -> u32 {
        self.width().max(self.height())
    }

    /// 交叉轴方向的瓦片长度（短边）。
    pub fn cross_extent(self) -> u32 {
        self.width().min(self.height())
    }

    /// 外部服务使用的尺寸标签。
    pub fn size_label(self) -> &'static str {
        match self {
            Self::Portrait => "1024x1536",
            Self::Landscape => "1536x1024",
        }
    }
}

/// 合成图层：缓冲 + 绘制偏移。
#[derive(Debug, Clone)]
pub struct Layer {
    pub image: RgbaImage,
    pub left: u32,
    pub top: u32,
}

impl Layer {
    pub fn new(image: RgbaImage, left: u32, top: u32) -> Self {
        Self { image, left, top }
    }
}

/// 提交给生成服务的一组瓦片与蒙版。
///
/// 蒙版不透明白色 = 保留，完全透明 = 生成。两者尺寸始终一致。
#[derive(Debug, Clone)]
pub struct TileSeed {
    pub tile: RgbaImage,
    pub mask: RgbaImage,
}

/// 首块瓦片：种子 + 原图放置区域。
#[derive(Debug, Clone)]
pub struct InitialTile {
    pub seed: TileSeed,
    pub placement: Rect,
}

/// 扩展过程状态。单调增长，每次 `step` 产生新状态。
#[derive(Debug, Clone)]
pub struct ExtensionState {
    pub layers: Vec<Layer>,
    pub accumulated_extent: u32,
    pub steps_taken: u32,
    /// 最近一次生成的完整瓦片，用于提取下一步的重叠带。
    pub last_tile: RgbaImage,
}

/// 拼接结果（最终缩放前）。
#[derive(Debug, Clone)]
pub struct StitchResult {
    pub stitched: RgbaImage,
    pub steps_taken: u32,
    pub tile_label: String,
}

/// `POST /api/extend` 的原始请求体。
///
/// 目标尺寸保留为 JSON 值，数字与数字字符串均可，由编排层统一校验。
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ExtendPayload {
    #[serde(rename = "imageDataUrl", default)]
    pub image_data_url: Option<String>,
    #[serde(rename = "targetW", default)]
    pub target_w: Option<serde_json::Value>,
    #[serde(rename = "targetH", default)]
    pub target_h: Option<serde_json::Value>,
    #[serde(default)]
    pub quality: Option<String>,
}

/// 已校验的外扩请求。
#[derive(Debug, Clone)]
pub struct ExtendRequest {
    pub image_data_url: String,
    pub target_w: u32,
    pub target_h: u32,
    pub quality: OutpaintQuality,
}

/// 外扩结果：PNG 字节与元数据。
#[derive(Debug, Clone)]
pub struct ExtendOutput {
    pub png_bytes: Vec<u8>,
    pub steps: u32,
    pub tile_label: String,
}
