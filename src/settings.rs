use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use crate::error::AppError;
use crate::outpaint::{GenerationConfig, OutpaintConfig};

pub const SETTINGS_PATH_ENV: &str = "OUTPAINT_SETTINGS";
const DEFAULT_BIND: &str = "127.0.0.1:8787";

/// 设置文件结构。所有字段可选，缺省沿用内置默认值。
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsFile {
    pub bind: Option<String>,
    pub api_base: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub prompt: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub overlap: Option<u32>,
    pub max_steps: Option<u32>,
    pub max_data_url_chars: Option<usize>,
}

/// 运行期设置：监听地址 + 编排配置 + 生成服务配置。
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind: SocketAddr,
    pub outpaint: OutpaintConfig,
    pub generation: GenerationConfig,
}

impl ServerSettings {
    /// 从 `OUTPAINT_SETTINGS` 指向的文件（可选）与进程环境变量加载。
    pub fn load() -> Result<Self, AppError> {
        let file = match std::env::var(SETTINGS_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => read_settings_file(Path::new(path.trim()))?,
            _ => SettingsFile::default(),
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// 合并设置文件与环境变量，环境变量优先。
    pub fn resolve(file: SettingsFile, env: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let env = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut outpaint = OutpaintConfig::default();
        if let Some(overlap) = file.overlap {
            outpaint.overlap = overlap;
        }
        if let Some(max_steps) = file.max_steps {
            outpaint.max_steps = max_steps;
        }
        if let Some(max_chars) = file.max_data_url_chars {
            outpaint.max_data_url_chars = max_chars;
        }
        outpaint.validate()?;

        let mut generation = GenerationConfig::default();
        if let Some(base) = env("OPENAI_BASE_URL").or(file.api_base) {
            generation.api_base = base.trim_end_matches('/').to_string();
        }
        generation.api_key = env("OPENAI_API_KEY").or(file.api_key);
        if let Some(model) = env("OUTPAINT_MODEL").or(file.model) {
            generation.model = model;
        }
        if let Some(prompt) = file.prompt {
            generation.prompt = prompt;
        }
        if let Some(timeout) = file.request_timeout_secs {
            generation.request_timeout = timeout;
        }
        let attempts = match env("OUTPAINT_MAX_ATTEMPTS") {
            Some(raw) => Some(
                raw.parse::<u32>()
                    .map_err(|e| AppError::Settings(format!("OUTPAINT_MAX_ATTEMPTS 无效：{}", e)))?,
            ),
            None => file.max_attempts,
        };
        if let Some(attempts) = attempts {
            generation.max_attempts = attempts.max(1);
        }

        let bind_raw = env("OUTPAINT_BIND")
            .or(file.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Settings(format!("监听地址无效 {}：{}", bind_raw, e)))?;

        Ok(Self {
            bind,
            outpaint,
            generation,
        })
    }
}

fn read_settings_file(path: &Path) -> Result<SettingsFile, AppError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str::<SettingsFile>(&content)
        .map_err(|e| AppError::Settings(format!("解析设置文件失败 {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_file_or_env() {
        let settings = ServerSettings::resolve(SettingsFile::default(), env_of(&[])).expect("resolve failed");
        assert_eq!(settings.bind.to_string(), DEFAULT_BIND);
        assert_eq!(settings.outpaint.overlap, 512);
        assert!(settings.generation.api_key.is_none());
    }

    #[test]
    fn env_overrides_file_values() {
        let file = SettingsFile {
            api_key: Some("from-file".into()),
            model: Some("file-model".into()),
            bind: Some("0.0.0.0:9000".into()),
            ..SettingsFile::default()
        };
        let settings = ServerSettings::resolve(
            file,
            env_of(&[
                ("OPENAI_API_KEY", "from-env"),
                ("OPENAI_BASE_URL", "http://127.0.0.1:9999/v1/"),
                ("OUTPAINT_MAX_ATTEMPTS", "3"),
            ]),
        )
        .expect("resolve failed");

        assert_eq!(settings.generation.api_key.as_deref(), Some("from-env"));
        assert_eq!(settings.generation.model, "file-model");
        assert_eq!(settings.generation.api_base, "http://127.0.0.1:9999/v1");
        assert_eq!(settings.generation.max_attempts, 3);
        assert_eq!(settings.bind.port(), 9000);
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let file = SettingsFile {
            api_key: Some("from-file".into()),
            ..SettingsFile::default()
        };
        let settings = ServerSettings::resolve(file, env_of(&[("OPENAI_API_KEY", "  ")])).expect("resolve failed");
        assert_eq!(settings.generation.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(ServerSettings::resolve(SettingsFile::default(), env_of(&[("OUTPAINT_BIND", "nope")])).is_err());
        assert!(ServerSettings::resolve(SettingsFile::default(), env_of(&[("OUTPAINT_MAX_ATTEMPTS", "x")])).is_err());

        let file = SettingsFile {
            overlap: Some(2048),
            ..SettingsFile::default()
        };
        assert!(ServerSettings::resolve(file, env_of(&[])).is_err());

        let file = SettingsFile {
            max_steps: Some(5_000_000),
            ..SettingsFile::default()
        };
        assert!(ServerSettings::resolve(file, env_of(&[])).is_err());
    }

    #[test]
    fn settings_file_uses_camel_case_keys() {
        let file: SettingsFile =
            serde_json::from_str(r#"{"apiBase":"http://x/v1","maxSteps":3,"requestTimeoutSecs":60}"#).unwrap();
        assert_eq!(file.api_base.as_deref(), Some("http://x/v1"));
        assert_eq!(file.max_steps, Some(3));
        assert_eq!(file.request_timeout_secs, Some(60));
    }
}
