//! # 生成服务适配模块
//!
//! ## 设计思路
//!
//! 外部“蒙版填充”服务对编排层是黑盒：输入瓦片 + 蒙版 + 几何，输出同尺寸、完全不透明的瓦片。
//! 通过 `OutpaintClient` trait 注入，测试中可替换为确定性的假实现。
//!
//! ## 实现思路
//!
//! - `OpenAiOutpaintClient`：multipart 上传 PNG，解析 `data[0].b64_json`。
//! - 对超时 / 连接失败 / 408 / 429 / 5xx 做有限重试（指数退避 + 抖动，尊重 `Retry-After`）。
//! - 重试严格串行，一个请求任意时刻最多只有一次生成调用在途。
//! - `validate_filled` 由引擎在每次调用后执行，尺寸或透明度异常均视为 `GenerationFailed`。

use base64::{Engine as _, engine::general_purpose};
use image::RgbaImage;
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::compositor;
use super::{GenerationConfig, OutpaintError, OutpaintQuality, TileGeometry, TileSeed};

/// 蒙版填充服务。
pub trait OutpaintClient: Send + Sync {
    /// 在开始任何处理前检查服务配置是否可用。
    fn ensure_ready(&self) -> Result<(), OutpaintError> {
        Ok(())
    }

    /// 对瓦片中蒙版透明的区域执行生成填充。
    fn fill(
        &self,
        seed: &TileSeed,
        geometry: TileGeometry,
        quality: OutpaintQuality,
    ) -> impl Future<Output = Result<RgbaImage, OutpaintError>> + Send;
}

/// 校验生成结果：尺寸与瓦片一致且完全不透明。
pub fn validate_filled(filled: &RgbaImage, geometry: TileGeometry) -> Result<(), OutpaintError> {
    let expected = (geometry.width(), geometry.height());
    if filled.dimensions() != expected {
        return Err(OutpaintError::GenerationFailed(format!(
            "生成结果尺寸异常：{}x{}（期望 {}）",
            filled.width(),
            filled.height(),
            geometry.size_label()
        )));
    }
    if !compositor::is_fully_opaque(filled) {
        return Err(OutpaintError::GenerationFailed(
            "生成结果包含透明像素".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, serde::Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, serde::Deserialize)]
struct ImageDatum {
    #[serde(default)]
    b64_json: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

struct AttemptFailure {
    error: OutpaintError,
    retryable: bool,
    retry_after_ms: Option<u64>,
}

impl AttemptFailure {
    fn fatal(error: OutpaintError) -> Self {
        Self {
            error,
            retryable: false,
            retry_after_ms: None,
        }
    }
}

/// OpenAI 兼容 `images/edits` 接口客户端。
pub struct OpenAiOutpaintClient {
    http: reqwest::Client,
    config: GenerationConfig,
}

impl OpenAiOutpaintClient {
    /// 构建复用型 HTTP 客户端。
    ///
    /// 密钥缺失不会在这里失败，而是由 `ensure_ready` 在每个请求开始时拒绝。
    pub fn new(config: GenerationConfig) -> Result<Self, OutpaintError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout.max(1)))
            .connect_timeout(Duration::from_secs(config.connect_timeout.max(1)))
            .build()
            .map_err(|e| OutpaintError::Configuration(format!("HTTP 客户端创建失败：{}", e)))?;

        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/images/edits", self.config.api_base.trim_end_matches('/'))
    }

    fn api_key(&self) -> Result<&str, OutpaintError> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| OutpaintError::Configuration("缺少 OPENAI_API_KEY".to_string()))
    }

    fn build_form(
        &self,
        tile_png: Vec<u8>,
        mask_png: Vec<u8>,
        geometry: TileGeometry,
        quality: OutpaintQuality,
    ) -> Result<reqwest::multipart::Form, OutpaintError> {
        let image_part = reqwest::multipart::Part::bytes(tile_png)
            .file_name("image.png")
            .mime_str("image/png")
            .map_err(|e| OutpaintError::GenerationFailed(format!("构建请求失败：{}", e)))?;
        let mask_part = reqwest::multipart::Part::bytes(mask_png)
            .file_name("mask.png")
            .mime_str("image/png")
            .map_err(|e| OutpaintError::GenerationFailed(format!("构建请求失败：{}", e)))?;

        Ok(reqwest::multipart::Form::new()
            .text("model", self.config.model.clone())
            .text("prompt", self.config.prompt.clone())
            .text("size", geometry.size_label())
            .text("quality", quality.as_str())
            .text("output_format", "png")
            .text("n", "1")
            .part("image", image_part)
            .part("mask", mask_part))
    }

    async fn send_once(
        &self,
        api_key: &str,
        tile_png: &[u8],
        mask_png: &[u8],
        geometry: TileGeometry,
        quality: OutpaintQuality,
    ) -> Result<RgbaImage, AttemptFailure> {
        let form = self
            .build_form(tile_png.to_vec(), mask_png.to_vec(), geometry, quality)
            .map_err(AttemptFailure::fatal)?;

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = Self::retry_after_hint_ms(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptFailure {
                error: OutpaintError::GenerationFailed(format!(
                    "生成服务返回 HTTP {}：{}",
                    status.as_u16(),
                    Self::extract_api_error_message(&body)
                )),
                retryable: Self::is_retryable_http_status(status),
                retry_after_ms,
            });
        }

        let payload: ImagesResponse = response
            .json()
            .await
            .map_err(|e| AttemptFailure::fatal(OutpaintError::GenerationFailed(format!("响应解析失败：{}", e))))?;

        let b64 = payload
            .data
            .into_iter()
            .next()
            .and_then(|datum| datum.b64_json)
            .filter(|b64| !b64.is_empty())
            .ok_or_else(|| AttemptFailure::fatal(OutpaintError::GenerationFailed("生成服务未返回图片".to_string())))?;

        let png = general_purpose::STANDARD
            .decode(b64.trim())
            .map_err(|e| AttemptFailure::fatal(OutpaintError::GenerationFailed(format!("生成结果 Base64 无效：{}", e))))?;

        compositor::decode_png(&png)
            .map_err(|e| AttemptFailure::fatal(OutpaintError::GenerationFailed(e.to_string())))
    }

    fn map_reqwest_error(&self, e: reqwest::Error) -> AttemptFailure {
        let retryable = e.is_timeout() || e.is_connect();
        let error = if e.is_timeout() {
            OutpaintError::Timeout(format!("生成请求超时（{}秒）", self.config.request_timeout))
        } else if e.is_connect() {
            OutpaintError::Network(format!("无法连接生成服务：{}", e))
        } else {
            OutpaintError::Network(format!("生成请求失败：{}", e))
        };

        AttemptFailure {
            error,
            retryable,
            retry_after_ms: None,
        }
    }

    fn extract_api_error_message(body: &str) -> String {
        serde_json::from_str::<ApiErrorEnvelope>(body)
            .map(|envelope| envelope.error.message)
            .ok()
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| body.chars().take(300).collect())
    }

    fn retry_after_hint_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
        let value = headers.get(reqwest::header::RETRY_AFTER)?;
        let text = value.to_str().ok()?.trim();
        let secs = text.parse::<u64>().ok()?;
        Some(secs.saturating_mul(1000))
    }

    fn compute_retry_delay_with_jitter(
        attempt: u32,
        base_delay_ms: u64,
        max_delay_ms: u64,
        server_hint_ms: Option<u64>,
    ) -> u64 {
        let exp = base_delay_ms.saturating_mul(1_u64 << attempt.saturating_sub(1).min(8));
        let capped = server_hint_ms.unwrap_or(exp).min(max_delay_ms.max(base_delay_ms));
        let jitter_bound = (capped / 4).max(1);
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        capped.saturating_add(seed % (jitter_bound + 1))
    }

    fn is_retryable_http_status(status: reqwest::StatusCode) -> bool {
        status == reqwest::StatusCode::REQUEST_TIMEOUT
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status.is_server_error()
    }
}

impl OutpaintClient for OpenAiOutpaintClient {
    fn ensure_ready(&self) -> Result<(), OutpaintError> {
        self.api_key().map(|_| ())
    }

    async fn fill(
        &self,
        seed: &TileSeed,
        geometry: TileGeometry,
        quality: OutpaintQuality,
    ) -> Result<RgbaImage, OutpaintError> {
        let api_key = self.api_key()?;
        let tile_png = compositor::encode_png(&seed.tile)?;
        let mask_png = compositor::encode_png(&seed.mask)?;
        let max_attempts = self.config.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            log::info!(
                "🌐 请求生成服务 - size={} quality={} attempt={}/{}",
                geometry.size_label(),
                quality.as_str(),
                attempt,
                max_attempts
            );

            match self
                .send_once(api_key, &tile_png, &mask_png, geometry, quality)
                .await
            {
                Ok(filled) => return Ok(filled),
                Err(failure) if failure.retryable && attempt < max_attempts => {
                    let wait_ms = Self::compute_retry_delay_with_jitter(
                        attempt,
                        self.config.retry_base_delay_ms.max(1),
                        self.config.retry_max_delay_ms,
                        failure.retry_after_ms,
                    );
                    log::warn!(
                        "🔄 生成调用失败（{}），{}ms 后重试 {}/{}：{}",
                        failure.error.code(),
                        wait_ms,
                        attempt + 1,
                        max_attempts,
                        failure.error
                    );
                    tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                    attempt += 1;
                }
                Err(failure) => return Err(failure.error),
            }
        }
    }
}
