//! 反馈服务 - 业务能力层
//!
//! 出题、批改，把模型回复转换成结构化结果。只依赖 [`ChatModel`]。

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{CapturedImage, QuestionSet, ReconciledFeedback};
use crate::services::llm_service::ChatModel;
use crate::services::prompts;
use crate::services::reconciler::reconcile;
use crate::services::segmenter::Segmenter;
use crate::utils::truncate_text;

const TASK_TEMPERATURE: f32 = 0.5;
const GRADING_TEMPERATURE: f32 = 0.3;

/// 反馈服务
pub struct FeedbackService {
    model: Box<dyn ChatModel>,
    question_count: usize,
}

impl FeedbackService {
    pub fn new(model: Box<dyn ChatModel>, config: &Config) -> Self {
        Self {
            model,
            question_count: config.question_count,
        }
    }

    /// 生成数学题，按 `Q<n>.` 切分成题目集合
    pub async fn generate_math_questions(&self) -> Result<QuestionSet> {
        let reply = self
            .model
            .send_to_llm(
                &prompts::math_questions(self.question_count),
                Some(prompts::MATH_TUTOR_SYSTEM),
                None,
                TASK_TEMPERATURE,
            )
            .await
            .context("生成数学题失败")?;

        let questions =
            QuestionSet::from(Segmenter::prefix_capture().segment(&reply)).limited_to(self.question_count);

        if questions.len() < self.question_count {
            warn!(
                "⚠️ 模型只生成了 {}/{} 道题: {}",
                questions.len(),
                self.question_count,
                truncate_text(&reply, 120)
            );
        } else {
            info!("✓ 已生成 {} 道数学题", questions.len());
        }

        Ok(questions)
    }

    pub async fn generate_story_task(&self) -> Result<String> {
        self.model
            .send_to_llm(&prompts::story_task(), None, None, TASK_TEMPERATURE)
            .await
            .context("生成写作任务失败")
    }

    pub async fn generate_biology_task(&self) -> Result<String> {
        self.model
            .send_to_llm(
                &prompts::biology_task(),
                Some(prompts::BIOLOGY_TUTOR_SYSTEM),
                None,
                TASK_TEMPERATURE,
            )
            .await
            .context("生成生物任务失败")
    }

    /// 批改数学作业并对账
    pub async fn grade_math(
        &self,
        questions: &QuestionSet,
        recognized_text: &str,
    ) -> Result<ReconciledFeedback> {
        let raw_reply = self
            .model
            .send_to_llm(
                &prompts::math_feedback(questions, recognized_text),
                Some(prompts::MATH_TUTOR_SYSTEM),
                None,
                GRADING_TEMPERATURE,
            )
            .await
            .context("数学批改失败")?;

        debug!("批改回复: {}", truncate_text(&raw_reply, 200));
        Ok(reconcile(questions, &raw_reply))
    }

    pub async fn feedback_on_story(&self, task: &str, text: &str) -> Result<String> {
        self.model
            .send_to_llm(
                &prompts::story_feedback(task, text),
                Some(prompts::WRITING_TUTOR_SYSTEM),
                None,
                GRADING_TEMPERATURE,
            )
            .await
            .context("写作批改失败")
    }

    /// 直接把图片交给视觉模型批改
    pub async fn grade_biology(&self, task: &str, image: &CapturedImage) -> Result<String> {
        let imgs = [image.data_url()];
        self.model
            .send_to_llm(
                &prompts::biology_feedback(task),
                Some(prompts::BIOLOGY_TUTOR_SYSTEM),
                Some(&imgs),
                GRADING_TEMPERATURE,
            )
            .await
            .context("生物批改失败")
    }
}
