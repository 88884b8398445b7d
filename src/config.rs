use crate::error::{AppError, AppResult, ConfigError, FileError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "mandala.toml";

/// 程序配置文件
///
/// 启动时构建一次，再显式传入每个客户端的构造函数。
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- Mathpix OCR 配置 ---
    pub mathpix_app_id: String,
    pub mathpix_app_key: String,
    pub mathpix_api_url: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    // --- 图片来源 ---
    /// 上传服务器根地址（提供 /uploads、/files、/delete-all）
    pub upload_base_url: String,
    /// 本地拍照目录，设置后优先于上传服务器
    pub local_capture_dir: Option<String>,
    /// 图片文件名前缀
    pub image_prefix: String,
    /// 图片文件名后缀
    pub image_extension: String,
    /// 等待图片的超时（秒）
    pub poll_timeout_secs: u64,
    /// 轮询间隔（秒）
    pub poll_interval_secs: u64,
    /// 单次 HTTP 请求超时（秒）
    pub http_timeout_secs: u64,
    // --- 批改 ---
    /// 每次生成的数学题数量
    pub question_count: usize,
    /// OCR 最大尝试次数
    pub ocr_max_attempts: usize,
    /// OCR 重试间隔（毫秒）
    pub ocr_retry_backoff_ms: u64,
    // --- 存储 ---
    /// 历史记录目录
    pub history_dir: String,
    /// 诊断输出文件
    pub warn_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mathpix_app_id: String::new(),
            mathpix_app_key: String::new(),
            mathpix_api_url: "https://api.mathpix.com/v3/text".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o".to_string(),
            upload_base_url: "https://mathmandala-upload.onrender.com".to_string(),
            local_capture_dir: None,
            image_prefix: "mathmandala_".to_string(),
            image_extension: ".jpg".to_string(),
            poll_timeout_secs: 60,
            poll_interval_secs: 2,
            http_timeout_secs: 30,
            question_count: 6,
            ocr_max_attempts: 2,
            ocr_retry_backoff_ms: 1500,
            history_dir: ".history".to_string(),
            warn_file: "warn.txt".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 加载配置：配置文件（可选）+ 环境变量覆盖
    ///
    /// 配置文件路径取自 `MATH_MANDALA_CONFIG`，未设置时尝试当前目录下的
    /// `mandala.toml`，都不存在则使用默认值。
    pub fn load() -> AppResult<Self> {
        let path = std::env::var("MATH_MANDALA_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let base = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        Ok(base.with_env_overrides())
    }

    /// 从 TOML 文件读取配置，缺失字段使用默认值
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

        toml::from_str(&content).map_err(|e| {
            AppError::File(FileError::TomlParseFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })
        })
    }

    /// 只使用默认值和环境变量
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 用环境变量覆盖已有配置
    pub fn with_env_overrides(self) -> Self {
        Self {
            mathpix_app_id: env_string("MATHPIX_APP_ID").unwrap_or(self.mathpix_app_id),
            mathpix_app_key: env_string("MATHPIX_APP_KEY").unwrap_or(self.mathpix_app_key),
            mathpix_api_url: env_string("MATHPIX_API_URL").unwrap_or(self.mathpix_api_url),
            llm_api_key: env_string("LLM_API_KEY")
                .or_else(|| env_string("OPENAI_API_KEY"))
                .unwrap_or(self.llm_api_key),
            llm_api_base_url: env_string("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: env_string("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            upload_base_url: env_string("UPLOAD_BASE_URL").unwrap_or(self.upload_base_url),
            local_capture_dir: env_string("LOCAL_CAPTURE_DIR").or(self.local_capture_dir),
            image_prefix: env_string("IMAGE_PREFIX").unwrap_or(self.image_prefix),
            image_extension: env_string("IMAGE_EXTENSION").unwrap_or(self.image_extension),
            poll_timeout_secs: env_parse("POLL_TIMEOUT_SECS").unwrap_or(self.poll_timeout_secs),
            poll_interval_secs: env_parse("POLL_INTERVAL_SECS").unwrap_or(self.poll_interval_secs),
            http_timeout_secs: env_parse("HTTP_TIMEOUT_SECS").unwrap_or(self.http_timeout_secs),
            question_count: env_parse("QUESTION_COUNT").unwrap_or(self.question_count),
            ocr_max_attempts: env_parse("OCR_MAX_ATTEMPTS").unwrap_or(self.ocr_max_attempts),
            ocr_retry_backoff_ms: env_parse("OCR_RETRY_BACKOFF_MS")
                .unwrap_or(self.ocr_retry_backoff_ms),
            history_dir: env_string("HISTORY_DIR").unwrap_or(self.history_dir),
            warn_file: env_string("WARN_FILE").unwrap_or(self.warn_file),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
        }
    }

    /// 检查运行批改流程所需的配置
    pub fn validate(&self) -> AppResult<()> {
        if self.mathpix_app_id.is_empty() {
            return Err(AppError::missing_config("mathpix_app_id", "MATHPIX_APP_ID"));
        }
        if self.mathpix_app_key.is_empty() {
            return Err(AppError::missing_config("mathpix_app_key", "MATHPIX_APP_KEY"));
        }
        if self.llm_api_key.is_empty() {
            return Err(AppError::missing_config("llm_api_key", "LLM_API_KEY"));
        }
        if self.question_count == 0 {
            return Err(ConfigError::InvalidValue {
                name: "question_count".to_string(),
                reason: "至少需要 1 道题".to_string(),
            }
            .into());
        }
        if self.ocr_max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                name: "ocr_max_attempts".to_string(),
                reason: "至少需要尝试 1 次".to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn ocr_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.ocr_retry_backoff_ms)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
