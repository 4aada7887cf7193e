//! # 壁纸外扩服务 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  前端 (浏览器单页)                        │
//! │   选择图片 → 选择设备预设 → POST /api/extend → 下载 PNG   │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ HTTP JSON ({b64_png, steps, tile} / 状态码 + 文本)
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            后端 (Rust)                           │
//! │                                                          │
//! │  ┌─ error ────── AppError (启动期统一错误类型)            │
//! │  │                                                       │
//! │  ├─ settings ─── 设置文件 + 环境变量覆盖                 │
//! │  │                                                       │
//! │  ├─ presets ──── 设备壁纸尺寸目录                        │
//! │  │                                                       │
//! │  └─ outpaint ─── 校验·放置·分步生成·拼接·缩放            │
//! │      ├─ commands / service   路由 + 注入状态              │
//! │      ├─ handler              编排 + 阶段耗时              │
//! │      ├─ engine               定向扩展归约器               │
//! │      └─ client               images/edits + 重试          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 应用级错误类型 `AppError`，`main` 的返回类型 |
//! | [`settings`] | 监听地址、编排参数与生成服务参数的加载 |
//! | [`presets`] | iPhone / MacBook 壁纸尺寸预设 |
//! | [`outpaint`] | 将任意图片外扩为精确目标尺寸的壁纸 |

pub mod error;
pub mod outpaint;
pub mod presets;
pub mod settings;
