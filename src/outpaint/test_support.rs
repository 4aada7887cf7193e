//! 单元测试共用的假生成服务。

use image::{Rgba, RgbaImage};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{OutpaintClient, OutpaintError, OutpaintQuality, TileGeometry, TileSeed};

/// 第 `index` 次调用使用的填充色（从 0 开始）。
pub(crate) fn fill_color(index: usize) -> Rgba<u8> {
    let i = index as u8;
    Rgba([
        40_u8.wrapping_add(i.wrapping_mul(50)),
        200_u8.wrapping_sub(i.wrapping_mul(30)),
        i.wrapping_mul(60),
        255,
    ])
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum FakeBehavior {
    Fill,
    FailOnCall(usize),
    WrongSizeOnCall(usize),
    NotConfigured,
}

/// 按蒙版保留像素、用每次调用专属颜色填充其余区域，并记录收到的种子。
pub(crate) struct FakeClient {
    behavior: FakeBehavior,
    calls: AtomicUsize,
    seeds: Mutex<Vec<TileSeed>>,
}

impl FakeClient {
    pub(crate) fn new() -> Self {
        Self::with_behavior(FakeBehavior::Fill)
    }

    pub(crate) fn with_behavior(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            seeds: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seeds(&self) -> Vec<TileSeed> {
        self.seeds.lock().map(|seeds| seeds.clone()).unwrap_or_default()
    }
}

impl OutpaintClient for FakeClient {
    fn ensure_ready(&self) -> Result<(), OutpaintError> {
        match self.behavior {
            FakeBehavior::NotConfigured => Err(OutpaintError::Configuration("缺少 OPENAI_API_KEY".to_string())),
            _ => Ok(()),
        }
    }

    async fn fill(
        &self,
        seed: &TileSeed,
        geometry: TileGeometry,
        _quality: OutpaintQuality,
    ) -> Result<RgbaImage, OutpaintError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seeds) = self.seeds.lock() {
            seeds.push(seed.clone());
        }

        match self.behavior {
            FakeBehavior::FailOnCall(n) if n == index => {
                return Err(OutpaintError::GenerationFailed("假服务拒绝".to_string()));
            }
            FakeBehavior::WrongSizeOnCall(n) if n == index => {
                return Ok(RgbaImage::from_pixel(8, 8, fill_color(index)));
            }
            _ => {}
        }

        assert_eq!(seed.tile.dimensions(), (geometry.width(), geometry.height()));
        assert_eq!(seed.mask.dimensions(), seed.tile.dimensions());

        let color = fill_color(index);
        let mut filled = seed.tile.clone();
        for (pixel, mask) in filled.pixels_mut().zip(seed.mask.pixels()) {
            if mask[3] == u8::MAX {
                pixel[3] = u8::MAX;
            } else {
                *pixel = color;
            }
        }
        Ok(filled)
    }
}
