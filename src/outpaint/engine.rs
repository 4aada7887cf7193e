//! # 定向扩展引擎
//!
//! ## 设计思路
//!
//! 单个瓦片无法覆盖目标画布时，沿生长轴滑动“外扩窗口”：
//! 每一步取上一次生成结果末端的重叠带作为新种子的保留区域，
//! 让生成内容与紧邻的上一块保持连续，而不是与远处的原图对齐。
//!
//! ## 实现思路
//!
//! - 纵向 / 横向共用同一算法，差异只在 `Axis` 的投影与矩形换算。
//! - `step(state) -> state'` 为归约器：除一次生成调用外全部是纯计算，
//!   `plan_take` / `seed_from` / `absorb` 可单独测试。
//! - 步数预算与目标长度任一达到即停止；不足部分由最终缩放拉伸补齐。

use image::RgbaImage;

use super::client::{self, OutpaintClient};
use super::compositor::{self, OPAQUE_BLACK, OPAQUE_WHITE, TRANSPARENT};
use super::{
    Axis, ExtensionState, Layer, MAX_STEPS_LIMIT, OutpaintConfig, OutpaintError, OutpaintQuality, Rect, StitchResult,
    TileGeometry, TileSeed,
};

impl Axis {
    /// 瓦片末端（远离起点一侧）厚度为 `thickness` 的条带。
    fn trailing_strip(self, tile_w: u32, tile_h: u32, thickness: u32) -> Rect {
        match self {
            Axis::Vertical => Rect::new(0, tile_h - thickness, tile_w, thickness),
            Axis::Horizontal => Rect::new(tile_w - thickness, 0, thickness, tile_h),
        }
    }

    /// 瓦片起始端厚度为 `thickness` 的条带。
    fn leading_band(self, tile_w: u32, tile_h: u32, thickness: u32) -> Rect {
        match self {
            Axis::Vertical => Rect::new(0, 0, tile_w, thickness),
            Axis::Horizontal => Rect::new(0, 0, thickness, tile_h),
        }
    }

    /// 从生长轴位置 `start` 起长度为 `len` 的切片。
    fn slice(self, tile_w: u32, tile_h: u32, start: u32, len: u32) -> Rect {
        match self {
            Axis::Vertical => Rect::new(0, start, tile_w, len),
            Axis::Horizontal => Rect::new(start, 0, len, tile_h),
        }
    }

    /// 生长轴位置映射为画布偏移（交叉轴为 0）。
    fn offset(self, position: u32) -> (u32, u32) {
        match self {
            Axis::Vertical => (0, position),
            Axis::Horizontal => (position, 0),
        }
    }

    /// 累计长度为 `extent` 时的画布尺寸。
    fn canvas_size(self, tile_w: u32, tile_h: u32, extent: u32) -> (u32, u32) {
        match self {
            Axis::Vertical => (tile_w, extent),
            Axis::Horizontal => (extent, tile_h),
        }
    }
}

/// 下一步应追加的长度；`None` 表示已达到目标或步数预算。
pub fn next_take(
    tile_extent: u32,
    overlap: u32,
    max_steps: u32,
    accumulated: u32,
    steps_taken: u32,
    required: u32,
) -> Option<u32> {
    if accumulated >= required || steps_taken >= max_steps {
        return None;
    }
    Some((tile_extent - overlap).min(required - accumulated))
}

/// 定向扩展引擎。
pub struct ExtensionEngine<'a, C> {
    client: &'a C,
    geometry: TileGeometry,
    overlap: u32,
    max_steps: u32,
    quality: OutpaintQuality,
}

impl<'a, C: OutpaintClient> ExtensionEngine<'a, C> {
    pub fn new(
        client: &'a C,
        geometry: TileGeometry,
        config: &OutpaintConfig,
        quality: OutpaintQuality,
    ) -> Result<Self, OutpaintError> {
        if config.overlap == 0 || config.overlap >= geometry.growth_extent() {
            return Err(OutpaintError::OutOfBounds(format!(
                "重叠带 {} 与瓦片 {} 不兼容",
                config.overlap,
                geometry.size_label()
            )));
        }
        if config.max_steps == 0 || config.max_steps > MAX_STEPS_LIMIT {
            return Err(OutpaintError::OutOfBounds(format!(
                "步数预算 {} 不在 1~{} 之间",
                config.max_steps, MAX_STEPS_LIMIT
            )));
        }

        Ok(Self {
            client,
            geometry,
            overlap: config.overlap,
            max_steps: config.max_steps,
            quality,
        })
    }

    pub fn axis(&self) -> Axis {
        self.geometry.axis()
    }

    fn tile_extent(&self) -> u32 {
        self.geometry.growth_extent()
    }

    /// 步数预算内可达到的最大累计长度。
    pub fn reachable_extent(&self) -> u32 {
        let growth = self.tile_extent() - self.overlap;
        self.tile_extent()
            .saturating_add(self.max_steps.saturating_sub(1).saturating_mul(growth))
    }

    async fn fill_validated(&self, seed: &TileSeed) -> Result<RgbaImage, OutpaintError> {
        let filled = self.client.fill(seed, self.geometry, self.quality).await?;
        client::validate_filled(&filled, self.geometry)?;
        Ok(filled)
    }

    /// 生成首块并构建初始状态。
    pub async fn start(&self, seed: &TileSeed) -> Result<ExtensionState, OutpaintError> {
        let first = self.fill_validated(seed).await?;
        log::info!(
            "🧩 首块生成完成 - tile={} extent={}",
            self.geometry.size_label(),
            self.tile_extent()
        );

        Ok(ExtensionState {
            layers: vec![Layer::new(first.clone(), 0, 0)],
            accumulated_extent: self.tile_extent(),
            steps_taken: 1,
            last_tile: first,
        })
    }

    pub fn plan_take(&self, state: &ExtensionState, required: u32) -> Option<u32> {
        next_take(
            self.tile_extent(),
            self.overlap,
            self.max_steps,
            state.accumulated_extent,
            state.steps_taken,
            required,
        )
    }

    pub fn is_complete(&self, state: &ExtensionState, required: u32) -> bool {
        self.plan_take(state, required).is_none()
    }

    /// 以最近一次生成瓦片的末端重叠带构建新种子。
    pub fn seed_from(&self, last_tile: &RgbaImage) -> Result<TileSeed, OutpaintError> {
        let (tile_w, tile_h) = (self.geometry.width(), self.geometry.height());
        let axis = self.axis();

        let strip = compositor::extract_region(last_tile, axis.trailing_strip(tile_w, tile_h, self.overlap))?;
        let band = axis.leading_band(tile_w, tile_h, self.overlap);

        let tile = compositor::composite_onto(tile_w, tile_h, TRANSPARENT, &[Layer::new(strip, 0, 0)])?;
        let protect = compositor::solid_rect(band.width, band.height, OPAQUE_WHITE);
        let mask = compositor::composite_onto(tile_w, tile_h, TRANSPARENT, &[Layer::new(protect, 0, 0)])?;

        Ok(TileSeed { tile, mask })
    }

    /// 将新生成瓦片中紧随重叠带之后、长度为 `take` 的区域追加到状态。
    pub fn absorb(
        &self,
        mut state: ExtensionState,
        filled: RgbaImage,
        take: u32,
    ) -> Result<ExtensionState, OutpaintError> {
        let (tile_w, tile_h) = (self.geometry.width(), self.geometry.height());
        let axis = self.axis();

        let fresh = compositor::extract_region(&filled, axis.slice(tile_w, tile_h, self.overlap, take))?;
        let (left, top) = axis.offset(state.accumulated_extent);

        state.layers.push(Layer::new(fresh, left, top));
        state.accumulated_extent += take;
        state.steps_taken += 1;
        state.last_tile = filled;
        Ok(state)
    }

    /// 执行一步扩展。已完成时原样返回。
    pub async fn step(&self, state: ExtensionState, required: u32) -> Result<ExtensionState, OutpaintError> {
        let Some(take) = self.plan_take(&state, required) else {
            return Ok(state);
        };

        let seed = self.seed_from(&state.last_tile)?;
        let filled = self.fill_validated(&seed).await?;
        let next = self.absorb(state, filled, take)?;

        log::info!(
            "🧩 扩展步骤 {}/{} - take={} extent={}/{}",
            next.steps_taken,
            self.max_steps,
            take,
            next.accumulated_extent,
            required
        );

        Ok(next)
    }

    /// 将全部图层合成到不透明画布。
    pub fn stitch(&self, state: ExtensionState) -> Result<StitchResult, OutpaintError> {
        let (width, height) = self
            .axis()
            .canvas_size(self.geometry.width(), self.geometry.height(), state.accumulated_extent);
        let stitched = compositor::composite_onto(width, height, OPAQUE_BLACK, &state.layers)?;

        Ok(StitchResult {
            stitched,
            steps_taken: state.steps_taken,
            tile_label: format!("{}x{}", width, height),
        })
    }

    /// 完整扩展：首块 → 逐步扩展 → 拼接。
    pub async fn run(&self, seed: &TileSeed, required: u32) -> Result<StitchResult, OutpaintError> {
        if required > self.reachable_extent() {
            log::warn!(
                "⚠️ 目标长度 {} 超过步数预算可达长度 {}，不足部分将由最终缩放拉伸",
                required,
                self.reachable_extent()
            );
        }

        let mut state = self.start(seed).await?;
        while !self.is_complete(&state, required) {
            state = self.step(state, required).await?;
        }
        self.stitch(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outpaint::test_support::{FakeBehavior, FakeClient, fill_color};
    use crate::outpaint::tile;
    use image::Rgba;
    use image::imageops::FilterType;
    use proptest::prelude::*;

    fn initial_seed(geometry: TileGeometry) -> TileSeed {
        let source = RgbaImage::from_pixel(800, 600, Rgba([120, 110, 100, 255]));
        tile::make_initial_tile(&source, geometry, FilterType::Triangle)
            .expect("init failed")
            .seed
    }

    fn engine<'a>(client: &'a FakeClient, geometry: TileGeometry) -> ExtensionEngine<'a, FakeClient> {
        ExtensionEngine::new(client, geometry, &OutpaintConfig::default(), OutpaintQuality::Low)
            .expect("engine init failed")
    }

    #[tokio::test]
    async fn single_tile_when_required_equals_tile() {
        let client = FakeClient::new();
        let engine = engine(&client, TileGeometry::Portrait);

        let result = engine
            .run(&initial_seed(TileGeometry::Portrait), 1536)
            .await
            .expect("run failed");

        assert_eq!(result.steps_taken, 1);
        assert_eq!(result.stitched.dimensions(), (1024, 1536));
        assert_eq!(result.tile_label, "1024x1536");
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn vertical_extension_grows_by_take_each_step() {
        let client = FakeClient::new();
        let engine = engine(&client, TileGeometry::Portrait);
        let required = 3000;

        let mut state = engine.start(&initial_seed(TileGeometry::Portrait)).await.expect("start failed");
        let mut extents = vec![state.accumulated_extent];
        while !engine.is_complete(&state, required) {
            state = engine.step(state, required).await.expect("step failed");
            extents.push(state.accumulated_extent);
        }

        assert_eq!(extents, vec![1536, 2560, 3000]);
        assert_eq!(state.steps_taken, 3);
        let offsets: Vec<(u32, u32)> = state.layers.iter().map(|l| (l.left, l.top)).collect();
        assert_eq!(offsets, vec![(0, 0), (0, 1536), (0, 2560)]);
        assert_eq!(state.layers[2].image.dimensions(), (1024, 440));

        let result = engine.stitch(state).expect("stitch failed");
        assert_eq!(result.stitched.dimensions(), (1024, 3000));
        assert_eq!(result.tile_label, "1024x3000");
        assert_eq!(result.stitched.get_pixel(10, 1600), &fill_color(1));
        assert_eq!(result.stitched.get_pixel(10, 2900), &fill_color(2));
    }

    #[tokio::test]
    async fn horizontal_extension_mirrors_vertical() {
        let client = FakeClient::new();
        let engine = engine(&client, TileGeometry::Landscape);

        let result = engine
            .run(&initial_seed(TileGeometry::Landscape), 2000)
            .await
            .expect("run failed");

        assert_eq!(result.steps_taken, 2);
        assert_eq!(result.stitched.dimensions(), (2000, 1024));
        assert_eq!(result.stitched.get_pixel(1999, 500), &fill_color(1));
    }

    #[tokio::test]
    async fn step_budget_caps_extension() {
        let client = FakeClient::new();
        let engine = engine(&client, TileGeometry::Portrait);

        let result = engine
            .run(&initial_seed(TileGeometry::Portrait), 1536 * 4)
            .await
            .expect("run failed");

        assert_eq!(result.steps_taken, 4);
        assert_eq!(client.calls(), 4);
        assert_eq!(result.stitched.dimensions(), (1024, engine.reachable_extent()));
        assert_eq!(engine.reachable_extent(), 4608);
    }

    #[tokio::test]
    async fn overlap_strip_comes_from_most_recent_tile() {
        let client = FakeClient::new();
        let engine = engine(&client, TileGeometry::Portrait);

        engine
            .run(&initial_seed(TileGeometry::Portrait), 4000)
            .await
            .expect("run failed");

        let seeds = client.seeds();
        assert_eq!(seeds.len(), 4);
        for (index, seed) in seeds.iter().enumerate().skip(1) {
            assert_eq!(seed.tile.get_pixel(5, 511), &fill_color(index - 1));
            assert_eq!(seed.tile.get_pixel(5, 512)[3], 0);
            if index >= 2 {
                assert_eq!(seed.tile.get_pixel(5, 0), &fill_color(index - 1));
            }
        }
    }

    #[test]
    fn seed_mask_protects_exactly_the_leading_band() {
        let client = FakeClient::new();
        let engine = engine(&client, TileGeometry::Landscape);
        let last = RgbaImage::from_pixel(1536, 1024, Rgba([1, 2, 3, 255]));

        let seed = engine.seed_from(&last).expect("seed failed");

        assert_eq!(seed.mask.dimensions(), (1536, 1024));
        assert_eq!(seed.mask.get_pixel(511, 1023), &OPAQUE_WHITE);
        assert_eq!(seed.mask.get_pixel(512, 0)[3], 0);
        assert_eq!(seed.tile.get_pixel(0, 0), &Rgba([1, 2, 3, 255]));
        assert_eq!(seed.tile.get_pixel(1535, 0)[3], 0);
    }

    #[tokio::test]
    async fn adapter_failure_aborts_extension() {
        let client = FakeClient::with_behavior(FakeBehavior::FailOnCall(1));
        let engine = engine(&client, TileGeometry::Portrait);

        let result = engine.run(&initial_seed(TileGeometry::Portrait), 4000).await;

        assert!(matches!(result, Err(OutpaintError::GenerationFailed(_))));
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn wrong_size_output_is_generation_failure() {
        let client = FakeClient::with_behavior(FakeBehavior::WrongSizeOnCall(0));
        let engine = engine(&client, TileGeometry::Landscape);

        let result = engine.run(&initial_seed(TileGeometry::Landscape), 2000).await;

        assert!(matches!(result, Err(OutpaintError::GenerationFailed(_))));
    }

    #[tokio::test]
    async fn step_budget_caps_horizontal_extension() {
        let client = FakeClient::new();
        let engine = engine(&client, TileGeometry::Landscape);

        let result = engine
            .run(&initial_seed(TileGeometry::Landscape), 1536 * 4)
            .await
            .expect("run failed");

        assert_eq!(result.steps_taken, 4);
        assert_eq!(client.calls(), 4);
        assert_eq!(result.stitched.dimensions(), (4608, 1024));
        assert_eq!(result.tile_label, "4608x1024");
        assert_eq!(result.stitched.get_pixel(4607, 500), &fill_color(3));
    }

    #[test]
    fn engine_rejects_step_budget_above_limit() {
        let client = FakeClient::new();
        let mut config = OutpaintConfig::default();
        config.max_steps = 5_000_000;

        let result = ExtensionEngine::new(&client, TileGeometry::Portrait, &config, OutpaintQuality::Low);
        assert!(matches!(result, Err(OutpaintError::OutOfBounds(_))));

        config.max_steps = MAX_STEPS_LIMIT;
        let engine = ExtensionEngine::new(&client, TileGeometry::Portrait, &config, OutpaintQuality::Low)
            .expect("engine init failed");
        assert_eq!(engine.reachable_extent(), 1536 + 15 * 1024);
    }

    #[test]
    fn engine_rejects_overlap_not_smaller_than_tile() {
        let client = FakeClient::new();
        let mut config = OutpaintConfig::default();
        config.overlap = 1536;

        let result = ExtensionEngine::new(&client, TileGeometry::Portrait, &config, OutpaintQuality::Low);
        assert!(matches!(result, Err(OutpaintError::OutOfBounds(_))));
    }

    proptest! {
        #[test]
        fn extents_grow_by_take_and_respect_step_budget(required in 1536_u32..=6144) {
            let (tile, overlap, max_steps) = (1536, 512, 4);
            let mut accumulated = tile;
            let mut steps = 1;

            while let Some(take) = next_take(tile, overlap, max_steps, accumulated, steps, required) {
                prop_assert_eq!(take, (tile - overlap).min(required - accumulated));
                prop_assert!(take > 0);
                accumulated += take;
                steps += 1;
            }

            prop_assert!((1..=max_steps).contains(&steps));
            prop_assert!(accumulated >= tile);
            prop_assert_eq!(accumulated, required.min(tile + (max_steps - 1) * (tile - overlap)));
        }
    }
}
