/// Mathpix OCR 客户端
///
/// 封装 Mathpix v3 text 接口的调用
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::CapturedImage;
use crate::services::ocr_service::{OcrFormat, TextRecognizer};

#[derive(Debug, Serialize)]
struct MathpixRequest<'a> {
    src: String,
    formats: [&'a str; 1],
    ocr: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct MathpixResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Mathpix 客户端
pub struct MathpixClient {
    api_url: String,
    app_id: String,
    app_key: String,
    http: reqwest::Client,
}

impl MathpixClient {
    /// 创建新的 Mathpix 客户端，请求超时取自配置
    pub fn new(config: &Config) -> AppResult<Self> {
        if config.mathpix_app_id.is_empty() || config.mathpix_app_key.is_empty() {
            return Err(AppError::missing_config(
                "mathpix_app_id / mathpix_app_key",
                "MATHPIX_APP_ID / MATHPIX_APP_KEY",
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| AppError::api_request_failed(&config.mathpix_api_url, e))?;

        Ok(Self {
            api_url: config.mathpix_api_url.clone(),
            app_id: config.mathpix_app_id.clone(),
            app_key: config.mathpix_app_key.clone(),
            http,
        })
    }

    fn ocr_modes(format: OcrFormat) -> &'static [&'static str] {
        match format {
            OcrFormat::PlainText => &["text"],
            OcrFormat::TextAndMath => &["math", "text"],
        }
    }
}

#[async_trait]
impl TextRecognizer for MathpixClient {
    async fn recognize(&self, image: &CapturedImage, format: OcrFormat) -> AppResult<String> {
        debug!(
            "调用 Mathpix OCR: {} ({} 字节, 模式 {:?})",
            image.name,
            image.bytes.len(),
            format
        );

        let request = MathpixRequest {
            src: image.data_url(),
            formats: ["text"],
            ocr: Self::ocr_modes(format),
        };

        let response = self
            .http
            .post(&self.api_url)
            .header("app_id", &self.app_id)
            .header("app_key", &self.app_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(&self.api_url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.ok();
            return Err(AppError::bad_response(
                &self.api_url,
                Some(status.as_u16()),
                body,
            ));
        }

        let parsed: MathpixResponse = response
            .json()
            .await
            .map_err(|e| AppError::api_request_failed(&self.api_url, e))?;

        if let Some(error) = parsed.error {
            warn!("Mathpix 返回错误: {}", error);
            return Err(AppError::bad_response(
                &self.api_url,
                Some(status.as_u16()),
                Some(error),
            ));
        }

        let text = parsed.text.unwrap_or_default();
        debug!("Mathpix 识别完成，共 {} 行", text.lines().count());
        Ok(text)
    }
}
