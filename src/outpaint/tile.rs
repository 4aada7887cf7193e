//! # 首块瓦片构建
//!
//! 将任意尺寸的原图等比“contain”放入固定瓦片并居中，
//! 同时生成与之配对的蒙版：原图像素区域不透明白色（保留），其余完全透明（生成）。

use image::RgbaImage;
use image::imageops::FilterType;

use super::compositor::{self, OPAQUE_WHITE, ResizeMode, TRANSPARENT};
use super::{InitialTile, Layer, OutpaintError, Rect, TileGeometry, TileSeed};

/// 计算原图在瓦片内的居中放置矩形。
///
/// 源尺寸为 0 时按 1 处理，避免除零。
pub fn fit_placement(src_w: u32, src_h: u32, tile_w: u32, tile_h: u32) -> Rect {
    let iw = src_w.max(1) as f64;
    let ih = src_h.max(1) as f64;

    let scale = (tile_w as f64 / iw).min(tile_h as f64 / ih);
    let rw = ((iw * scale).round() as u32).clamp(1, tile_w);
    let rh = ((ih * scale).round() as u32).clamp(1, tile_h);

    Rect::new((tile_w - rw) / 2, (tile_h - rh) / 2, rw, rh)
}

/// 构建首块瓦片与蒙版。
pub fn make_initial_tile(
    source: &RgbaImage,
    geometry: TileGeometry,
    filter: FilterType,
) -> Result<InitialTile, OutpaintError> {
    let (tile_w, tile_h) = (geometry.width(), geometry.height());
    let placement = fit_placement(source.width(), source.height(), tile_w, tile_h);

    let resized = compositor::resize(
        source,
        placement.width,
        placement.height,
        ResizeMode::Fill,
        filter,
    )?;

    let tile = compositor::composite_onto(
        tile_w,
        tile_h,
        TRANSPARENT,
        &[Layer::new(resized, placement.left, placement.top)],
    )?;

    let keep = compositor::solid_rect(placement.width, placement.height, OPAQUE_WHITE);
    let mask = compositor::composite_onto(
        tile_w,
        tile_h,
        TRANSPARENT,
        &[Layer::new(keep, placement.left, placement.top)],
    )?;

    log::debug!(
        "🧩 首块瓦片：{} 原图 {}x{} -> 放置 {}x{} @({},{})",
        geometry.size_label(),
        source.width(),
        source.height(),
        placement.width,
        placement.height,
        placement.left,
        placement.top
    );

    Ok(InitialTile {
        seed: TileSeed { tile, mask },
        placement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn landscape_source_in_portrait_tile_is_letterboxed() {
        let placement = fit_placement(800, 600, 1024, 1536);
        assert_eq!(placement, Rect::new(0, 384, 1024, 768));
    }

    #[test]
    fn zero_dimensions_default_to_one_pixel() {
        let placement = fit_placement(0, 0, 1536, 1024);
        assert_eq!(placement.width, 1024);
        assert_eq!(placement.height, 1024);
        assert_eq!(placement.left, 256);
        assert_eq!(placement.top, 0);
    }

    #[test]
    fn mask_marks_exactly_the_placement_rect() {
        let source = RgbaImage::from_pixel(300, 500, Rgba([10, 200, 30, 255]));
        let initial =
            make_initial_tile(&source, TileGeometry::Landscape, FilterType::Triangle).expect("init failed");
        let placement = initial.placement;
        let mask = &initial.seed.mask;

        assert_eq!(mask.dimensions(), (1536, 1024));
        assert_eq!(initial.seed.tile.dimensions(), mask.dimensions());

        for (x, y, pixel) in mask.enumerate_pixels() {
            let inside = x >= placement.left
                && x < placement.left + placement.width
                && y >= placement.top
                && y < placement.top + placement.height;
            if inside {
                assert_eq!(pixel, &OPAQUE_WHITE, "({x},{y}) should be preserved");
            } else {
                assert_eq!(pixel[3], 0, "({x},{y}) should be generated");
            }
        }
    }

    #[test]
    fn tile_carries_source_pixels_inside_placement() {
        let source = RgbaImage::from_pixel(800, 600, Rgba([90, 80, 70, 255]));
        let initial =
            make_initial_tile(&source, TileGeometry::Portrait, FilterType::Triangle).expect("init failed");
        let tile = &initial.seed.tile;

        let center = tile.get_pixel(512, 768);
        for (got, want) in center.0.iter().zip([90_u8, 80, 70, 255]) {
            assert!(got.abs_diff(want) <= 1, "channel {got} vs {want}");
        }
        assert_eq!(tile.get_pixel(512, 10)[3], 0);
    }
}
