//! # 壁纸外扩服务 — 应用入口
//!
//! 本文件仅负责日志、设置加载与 HTTP 服务启动。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::sync::Arc;

use wallpaper_outpaint::error::AppError;
use wallpaper_outpaint::outpaint::{self, OutpaintServiceState};
use wallpaper_outpaint::settings::ServerSettings;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = ServerSettings::load()?;
    log::info!(
        "setup: settings loaded - model={} base={}",
        settings.generation.model,
        settings.generation.api_base
    );
    if settings.generation.api_key.is_none() {
        log::warn!("⚠️ 未配置 OPENAI_API_KEY，外扩请求将返回 500");
    }

    let state = OutpaintServiceState::with_generation(settings.outpaint, settings.generation)?;
    let app = outpaint::router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(settings.bind).await?;
    log::info!("🌐 服务已启动 - http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("服务已退出");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("监听退出信号失败: {err}");
        std::future::pending::<()>().await;
    }
}
