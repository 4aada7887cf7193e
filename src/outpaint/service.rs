//! # 服务层（可注入状态）
//!
//! ## 设计思路
//!
//! 使用 `OutpaintServiceState` 作为 HTTP 层共享状态，替代全局单例客户端。
//! 生成服务由 `main.rs` 或测试显式构建后注入，生命周期清晰。
//!
//! ## 实现思路
//!
//! 对外仅暴露少量稳定 API：
//! - `extend`：执行完整外扩链路
//! - `config` / `update_config`：读取与替换编排参数

use std::sync::Arc;

use super::{
    ExtendOutput, ExtendPayload, GenerationConfig, OpenAiOutpaintClient, OutpaintClient, OutpaintConfig,
    OutpaintError, OutpaintHandler,
};

/// 外扩服务状态。
///
/// 由 `axum` 路由以 `Arc` 共享，内部持有 `OutpaintHandler`。
pub struct OutpaintServiceState<C> {
    handler: OutpaintHandler<C>,
}

impl OutpaintServiceState<OpenAiOutpaintClient> {
    /// 使用真实生成服务创建服务状态。
    ///
    /// 缺少密钥不会在这里失败，而是在每次请求开始时返回配置错误。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use wallpaper_outpaint::outpaint::{GenerationConfig, OutpaintConfig, OutpaintServiceState};
    ///
    /// let service = OutpaintServiceState::with_generation(OutpaintConfig::default(), GenerationConfig::default())?;
    /// # Ok::<(), wallpaper_outpaint::outpaint::OutpaintError>(())
    /// ```
    pub fn with_generation(config: OutpaintConfig, generation: GenerationConfig) -> Result<Self, OutpaintError> {
        let client = OpenAiOutpaintClient::new(generation)?;
        Self::new(config, Arc::new(client))
    }
}

impl<C: OutpaintClient + 'static> OutpaintServiceState<C> {
    /// 使用注入的生成服务创建服务状态。
    pub fn new(config: OutpaintConfig, client: Arc<C>) -> Result<Self, OutpaintError> {
        Ok(Self {
            handler: OutpaintHandler::new(config, client)?,
        })
    }

    /// 检查生成服务配置，供命令层在解析请求体前调用。
    pub fn ensure_ready(&self) -> Result<(), OutpaintError> {
        self.handler.ensure_ready()
    }

    /// 执行完整处理流程：校验 → 解码 → 扩展 → 缩放编码。
    pub async fn extend(&self, payload: ExtendPayload) -> Result<ExtendOutput, OutpaintError> {
        self.handler.process(payload).await
    }

    pub fn config(&self) -> Result<OutpaintConfig, OutpaintError> {
        self.handler.config_snapshot()
    }

    /// 替换编排参数，后续请求生效；进行中的请求继续使用旧快照。
    pub fn update_config(&self, config: OutpaintConfig) -> Result<(), OutpaintError> {
        self.handler.replace_config(config)?;
        log::info!("🔄 外扩配置已更新");
        Ok(())
    }
}
