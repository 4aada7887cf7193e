//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义应用级 `AppError`，承载启动阶段（设置加载、端口绑定）与
//! 外扩服务构建中的所有失败，`main` 只需一个 `?` 即可向上传播。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `OutpaintError` 与 `std::io::Error` 提供 `From` 转换，无需手动 map。
//! - 请求级错误不经过这里，由 `outpaint::commands` 直接映射为 HTTP 响应。

use crate::outpaint::OutpaintError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 外扩服务构建或配置错误
    #[error("{0}")]
    Outpaint(#[from] OutpaintError),

    /// 设置文件或环境变量无效
    #[error("设置错误: {0}")]
    Settings(String),

    /// 文件系统 / 网络 I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
}
