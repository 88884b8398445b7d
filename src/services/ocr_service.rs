//! OCR 服务 - 业务能力层
//!
//! 识别 + 分段，并按"至少识别到 N 道题"的要求有限次重试。

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::models::{AnswerSpans, CapturedImage};
use crate::services::segmenter::{detected_count, Segmenter};

/// 识别模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrFormat {
    /// 纯文本（写作计划）
    PlainText,
    /// 文本 + 数学公式（数学作业）
    TextAndMath,
}

/// 图片 → 文本
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &CapturedImage, format: OcrFormat) -> AppResult<String>;
}

/// 一次识别的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recognition {
    /// OCR 原始文本
    pub text: String,
    /// 逐题答案
    pub spans: AnswerSpans,
    /// 实际尝试次数
    pub attempts: usize,
}

/// OCR 服务
///
/// 职责：
/// - 调用识别能力
/// - 识别到的题数不够时等待后重试
/// - 永远返回最近一次结果，题数不够也不报错
pub struct OcrService {
    recognizer: Box<dyn TextRecognizer>,
    max_attempts: usize,
    backoff: Duration,
}

impl OcrService {
    pub fn new(recognizer: Box<dyn TextRecognizer>, config: &Config) -> Self {
        Self::with_policy(recognizer, config.ocr_max_attempts, config.ocr_retry_backoff())
    }

    pub fn with_policy(
        recognizer: Box<dyn TextRecognizer>,
        max_attempts: usize,
        backoff: Duration,
    ) -> Self {
        Self {
            recognizer,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// 单次识别，传输失败时返回空文本
    pub async fn recognize_text(&self, image: &CapturedImage, format: OcrFormat) -> String {
        match self.recognizer.recognize(image, format).await {
            Ok(text) => text,
            Err(e) => {
                warn!("⚠️ OCR 调用失败: {}", e);
                String::new()
            }
        }
    }

    /// 识别并分段，直到识别到 `expected` 道题或用完尝试次数
    pub async fn recognize_answers(
        &self,
        image: &CapturedImage,
        segmenter: &Segmenter,
        expected: usize,
    ) -> Recognition {
        let mut latest = Recognition::default();

        for attempt in 1..=self.max_attempts {
            let text = self.recognize_text(image, OcrFormat::TextAndMath).await;
            let spans = segmenter.segment(&text);
            debug!(
                "OCR 第 {}/{} 次: 识别到 {} 道题",
                attempt,
                self.max_attempts,
                spans.len()
            );

            latest = Recognition {
                text,
                spans,
                attempts: attempt,
            };

            if detected_count(&latest.spans) >= expected {
                info!("✓ OCR 识别到 {}/{} 道题", latest.spans.len(), expected);
                return latest;
            }

            if attempt < self.max_attempts {
                warn!(
                    "⚠️ 只识别到 {}/{} 道题，{} 毫秒后重试...",
                    latest.spans.len(),
                    expected,
                    self.backoff.as_millis()
                );
                sleep(self.backoff).await;
            }
        }

        warn!(
            "⚠️ 已尝试 {} 次，仍只识别到 {}/{} 道题",
            self.max_attempts,
            latest.spans.len(),
            expected
        );
        latest
    }
}
