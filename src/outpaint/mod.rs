//! # 壁纸外扩模块（outpaint）
//!
//! ## 设计思路
//!
//! 该模块将“请求校验 → 解码放置 → 分步生成 → 拼接 → 精确缩放”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `commands`：仅做 HTTP 入参/出参适配（薄封装）
//! - `service`：承载可注入状态（`OutpaintServiceState`）
//! - `handler`：编排整条处理流水线
//! - `loader`：负责 data URL 解析、体积与像素安全校验
//! - `tile`：构建首块瓦片与蒙版
//! - `engine`：沿生长轴分步扩展并拼接
//! - `compositor`：裁剪 / 合成 / 缩放 / 编码等纯像素操作
//! - `client`：外部生成服务抽象与 HTTP 实现（含重试）
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 新同事快速上手
//!
//! 可以按下面顺序理解调用链：
//!
//! ```text
//! POST /api/extend
//!    ↓
//! commands.rs（JSON 解析 + 错误映射）
//!    ↓
//! service.rs（共享状态、服务入口）
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志）
//!    ├─ loader.rs（data URL + 体积/像素校验 + 解码）
//!    ├─ tile.rs（等比放置 + 保留蒙版）
//!    ├─ engine.rs（首块 → 重叠带续写 → 拼接）
//!    │     └─ client.rs（images/edits + 重试）
//!    └─ compositor.rs（最终缩放 + PNG 编码）
//!    ↓
//! 返回 {b64_png, steps, tile} 或 状态码 + 文本
//! ```
//!
//! ## 分层职责建议
//!
//! - 路由与响应格式变更优先改 `commands.rs`
//! - 配置与策略变更优先改 `config.rs`
//! - 业务流程顺序变更优先改 `handler.rs`
//! - 拼接算法变更只改 `engine.rs`，像素细节改 `compositor.rs`

pub mod client;
pub mod commands;
pub mod compositor;
mod config;
pub mod engine;
mod error;
mod handler;
mod loader;
mod service;
mod source;
mod tile;

#[cfg(test)]
mod test_support;

pub use client::{OpenAiOutpaintClient, OutpaintClient};
pub use commands::{ExtendResponse, router};
pub use config::{GenerationConfig, MAX_STEPS_LIMIT, OutpaintConfig, OutpaintQuality};
pub use error::OutpaintError;
pub use handler::{OutpaintHandler, required_extent};
pub use service::OutpaintServiceState;
pub use source::{
    Axis, ExtendOutput, ExtendPayload, ExtendRequest, ExtensionState, InitialTile, Layer, Rect, StitchResult,
    TileGeometry, TileSeed,
};
