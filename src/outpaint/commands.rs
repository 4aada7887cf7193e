//! # HTTP 命令层
//!
//! ## 设计思路
//!
//! 命令层仅做请求体接收与结果返回，不承载业务逻辑。
//! 所有实际处理交由 `OutpaintServiceState`，保持路由函数薄、稳定、易测试。
//!
//! 错误在这里统一转换为 `状态码 + 纯文本消息`。

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;

use super::{ExtendPayload, OutpaintClient, OutpaintError, OutpaintServiceState};
use crate::presets::{DevicePreset, PRESETS};

/// 框架层请求体上限。需高于 data URL 字符上限，保证超限请求由业务层返回 413。
pub const BODY_LIMIT_BYTES: usize = 16 * 1024 * 1024;

/// `POST /api/extend` 成功响应。
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExtendResponse {
    pub b64_png: String,
    pub steps: u32,
    pub tile: String,
}

#[derive(Debug, Clone)]
pub struct CommandError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub client_error: bool,
}

impl From<OutpaintError> for CommandError {
    fn from(error: OutpaintError) -> Self {
        Self {
            status: StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code: error.code(),
            message: error.to_string(),
            client_error: error.is_client_error(),
        }
    }
}

impl IntoResponse for CommandError {
    fn into_response(self) -> Response {
        if !self.client_error {
            log::warn!("⚠️ 外扩请求失败 - code={} {}", self.code, self.message);
        } else {
            log::info!("外扩请求被拒绝 - code={} {}", self.code, self.message);
        }
        (self.status, self.message).into_response()
    }
}

/// 构建全部路由。
pub fn router<C: OutpaintClient + 'static>(state: Arc<OutpaintServiceState<C>>) -> Router {
    Router::new()
        .route("/api/extend", post(extend::<C>).fallback(method_not_allowed))
        .route("/api/presets", get(presets).fallback(method_not_allowed))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}

/// 将图片外扩到目标尺寸。
async fn extend<C: OutpaintClient + 'static>(
    State(state): State<Arc<OutpaintServiceState<C>>>,
    body: Bytes,
) -> Result<Json<ExtendResponse>, CommandError> {
    state.ensure_ready()?;

    let payload: ExtendPayload = serde_json::from_slice(&body)
        .map_err(|e| OutpaintError::Validation(format!("JSON 请求体无效：{}", e)))?;

    let output = state.extend(payload).await?;

    Ok(Json(ExtendResponse {
        b64_png: general_purpose::STANDARD.encode(&output.png_bytes),
        steps: output.steps,
        tile: output.tile_label,
    }))
}

async fn presets() -> Json<&'static [DevicePreset]> {
    Json(PRESETS)
}

async fn method_not_allowed() -> (StatusCode, &'static str) {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_statuses_follow_error_kind() {
        let err = CommandError::from(OutpaintError::PayloadTooLarge("x".into()));
        assert_eq!(err.status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(err.client_error);

        let err = CommandError::from(OutpaintError::Configuration("缺少 OPENAI_API_KEY".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message.contains("OPENAI_API_KEY"));
        assert!(!err.client_error);
    }

    #[test]
    fn body_limit_admits_oversized_data_urls() {
        assert!(BODY_LIMIT_BYTES > crate::outpaint::OutpaintConfig::default().max_data_url_chars + 1024);
    }
}
