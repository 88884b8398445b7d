//! 提交处理流程 - 流程层
//!
//! 核心职责：定义"一次提交"的完整处理流程
//!
//! 流程顺序：
//! 1. 生成任务（数学题 / 写作任务 / 生物任务）
//! 2. 等待最新的图片
//! 3. OCR + 分段（生物跳过）
//! 4. 批改 + 对账
//! 5. 存档 → 清空上传（失败只警告）

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::clients::MathpixClient;
use crate::config::Config;
use crate::infrastructure::image_source::{self, ImageSource, NamePattern};
use crate::models::{
    AnswerSpans, AnswerState, CapturedImage, QuestionSet, ReconciledFeedback, SessionFeedback,
    SessionRecord, Subject,
};
use crate::services::{
    FeedbackService, ImagePoller, LlmService, OcrFormat, OcrService, Segmenter, SessionStore,
    WarnWriter,
};
use crate::utils::logging::log_session_complete;
use crate::workflow::submission_ctx::SubmissionCtx;

/// 交给学生的任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    /// 数学题目
    Questions(QuestionSet),
    /// 写作 / 生物任务文本
    Task(String),
}

/// 提交处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// 已批改并存档
    Completed(SessionRecord),
    /// 超时没有收到图片，可以重新等待
    NoImage,
    /// 没有识别出文字，未批改
    NoText,
}

/// 提交处理流程
///
/// - 编排完整的提交流程
/// - 决定何时等待、何时识别、何时批改、何时兜底
/// - 只依赖业务能力（services）和图片来源
pub struct SubmissionFlow {
    source: Box<dyn ImageSource>,
    pattern: NamePattern,
    poller: ImagePoller,
    ocr: OcrService,
    feedback: FeedbackService,
    segmenter: Segmenter,
    store: SessionStore,
    warn_writer: WarnWriter,
}

impl SubmissionFlow {
    /// 按配置创建真实的图片来源、OCR 和模型客户端
    pub fn new(config: &Config) -> Result<Self> {
        let source = image_source::from_config(config).context("创建图片来源失败")?;
        let recognizer = MathpixClient::new(config).context("创建 OCR 客户端失败")?;
        let model = LlmService::new(config).context("创建 LLM 服务失败")?;

        Ok(Self::from_parts(
            source,
            OcrService::new(Box::new(recognizer), config),
            FeedbackService::new(Box::new(model), config),
            config,
        ))
    }

    /// 用现成的组件组装，其余部分取自配置
    pub fn from_parts(
        source: Box<dyn ImageSource>,
        ocr: OcrService,
        feedback: FeedbackService,
        config: &Config,
    ) -> Self {
        Self {
            source,
            pattern: NamePattern::from_config(config),
            poller: ImagePoller::from_config(config),
            ocr,
            feedback,
            segmenter: Segmenter::strict(),
            store: SessionStore::from_config(config),
            warn_writer: WarnWriter::from_config(config),
        }
    }

    /// 替换轮询器（超时、间隔）
    pub fn with_poller(mut self, poller: ImagePoller) -> Self {
        self.poller = poller;
        self
    }

    /// 生成任务
    pub async fn prepare(&self, ctx: &SubmissionCtx) -> Result<Assignment> {
        info!("{} 🧠 正在生成任务...", ctx);

        let assignment = match ctx.subject {
            Subject::Math => Assignment::Questions(self.feedback.generate_math_questions().await?),
            Subject::StoryMountain => Assignment::Task(self.feedback.generate_story_task().await?),
            Subject::Biology => Assignment::Task(self.feedback.generate_biology_task().await?),
        };

        Ok(assignment)
    }

    /// 等待图片并批改
    pub async fn submit(
        &self,
        ctx: &SubmissionCtx,
        assignment: &Assignment,
    ) -> Result<SubmissionOutcome> {
        let Some(image) = self
            .poller
            .await_latest(self.source.as_ref(), &self.pattern)
            .await
        else {
            warn!("{} ⚠️ 没有收到图片，请重新拍照", ctx);
            return Ok(SubmissionOutcome::NoImage);
        };

        let outcome = match (ctx.subject, assignment) {
            (Subject::Math, Assignment::Questions(questions)) => {
                self.submit_math(ctx, questions, &image).await
            }
            (Subject::StoryMountain, Assignment::Task(task)) => {
                self.submit_story(ctx, task, &image).await
            }
            (Subject::Biology, Assignment::Task(task)) => {
                self.submit_biology(ctx, task, &image).await
            }
            (subject, _) => {
                error!("{} 任务类型与科目 {} 不匹配", ctx, subject);
                anyhow::bail!("任务类型与科目 {} 不匹配", subject)
            }
        };

        self.clear_uploads(ctx).await;
        Ok(outcome)
    }

    /// 生成任务、等待一次图片并批改
    pub async fn run(&self, ctx: &SubmissionCtx) -> Result<SubmissionOutcome> {
        let assignment = self.prepare(ctx).await?;
        self.submit(ctx, &assignment).await
    }

    async fn submit_math(
        &self,
        ctx: &SubmissionCtx,
        questions: &QuestionSet,
        image: &CapturedImage,
    ) -> SubmissionOutcome {
        info!("{} 🔍 正在识别答案...", ctx);
        let recognition = self
            .ocr
            .recognize_answers(image, &self.segmenter, questions.len())
            .await;

        self.warn_missing_answers(ctx, questions, &recognition.spans);

        info!("{} ✍️ 正在批改...", ctx);
        let feedback = match self.feedback.grade_math(questions, &recognition.text).await {
            Ok(feedback) => feedback,
            Err(e) => {
                warn!("{} ⚠️ 批改失败: {:#}", ctx, e);
                ReconciledFeedback::Unstructured {
                    raw_reply: format!("Feedback service unavailable: {:#}", e),
                }
            }
        };

        match &feedback {
            ReconciledFeedback::Unstructured { raw_reply } => {
                warn!("{} ⚠️ 模型回复中没有结构化反馈", ctx);
                self.warn_writer
                    .record(&ctx.timestamp, "unstructured feedback", raw_reply);
            }
            ReconciledFeedback::PerQuestion(_) => {
                for number in feedback.missing_numbers() {
                    warn!("{} ⚠️ Q{} 没有反馈", ctx, number);
                }
            }
        }

        let detected = questions
            .numbers()
            .filter(|n| AnswerState::of(&recognition.spans, *n).is_detected())
            .count();

        let record = SessionRecord {
            timestamp: ctx.timestamp.clone(),
            subject: ctx.subject,
            problems: Some(questions.clone()),
            task: None,
            text: recognition.text,
            answers: Some(recognition.spans),
            feedback: SessionFeedback::from(feedback),
            image: self.image_ref(ctx),
        };

        self.persist(ctx, &record, image).await;
        log_session_complete(&ctx.to_string(), detected, questions.len());
        SubmissionOutcome::Completed(record)
    }

    async fn submit_story(
        &self,
        ctx: &SubmissionCtx,
        task: &str,
        image: &CapturedImage,
    ) -> SubmissionOutcome {
        info!("{} 🔍 正在识别写作计划...", ctx);
        let text = self.ocr.recognize_text(image, OcrFormat::PlainText).await;
        if text.trim().is_empty() {
            warn!("{} ⚠️ 没有识别出文字，跳过批改", ctx);
            return SubmissionOutcome::NoText;
        }

        info!("{} ✍️ 正在批改...", ctx);
        let feedback = match self.feedback.feedback_on_story(task, &text).await {
            Ok(reply) => SessionFeedback::Text(reply),
            Err(e) => {
                warn!("{} ⚠️ 批改失败: {:#}", ctx, e);
                SessionFeedback::Unstructured {
                    raw_reply: format!("Feedback service unavailable: {:#}", e),
                }
            }
        };

        let record = SessionRecord {
            timestamp: ctx.timestamp.clone(),
            subject: ctx.subject,
            problems: None,
            task: Some(task.to_string()),
            text,
            answers: None,
            feedback,
            image: self.image_ref(ctx),
        };

        self.persist(ctx, &record, image).await;
        info!("{} ✓ 完成", ctx);
        SubmissionOutcome::Completed(record)
    }

    async fn submit_biology(
        &self,
        ctx: &SubmissionCtx,
        task: &str,
        image: &CapturedImage,
    ) -> SubmissionOutcome {
        info!("{} ✍️ 正在批改示意图...", ctx);
        let feedback = match self.feedback.grade_biology(task, image).await {
            Ok(reply) => SessionFeedback::Text(reply),
            Err(e) => {
                warn!("{} ⚠️ 批改失败: {:#}", ctx, e);
                SessionFeedback::Unstructured {
                    raw_reply: format!("Feedback service unavailable: {:#}", e),
                }
            }
        };

        let record = SessionRecord {
            timestamp: ctx.timestamp.clone(),
            subject: ctx.subject,
            problems: None,
            task: Some(task.to_string()),
            text: String::new(),
            answers: None,
            feedback,
            image: self.image_ref(ctx),
        };

        self.persist(ctx, &record, image).await;
        info!("{} ✓ 完成", ctx);
        SubmissionOutcome::Completed(record)
    }

    /// 每道没识别到答案的题写一条警告
    fn warn_missing_answers(&self, ctx: &SubmissionCtx, questions: &QuestionSet, spans: &AnswerSpans) {
        for number in questions.numbers() {
            match AnswerState::of(spans, number) {
                AnswerState::Answered(_) => {}
                AnswerState::Blank => {
                    warn!("{} ⚠️ Q{} 识别到题号但答案为空", ctx, number);
                    self.warn_writer
                        .record(&ctx.timestamp, "answer blank", &format!("Q{}", number));
                }
                AnswerState::Missing => {
                    warn!("{} ⚠️ 没有识别到 Q{} 的答案", ctx, number);
                    self.warn_writer
                        .record(&ctx.timestamp, "answer not detected", &format!("Q{}", number));
                }
            }
        }
    }

    fn image_ref(&self, ctx: &SubmissionCtx) -> String {
        self.store.image_path(&ctx.timestamp).display().to_string()
    }

    /// 存档失败只警告，批改结果照常返回
    async fn persist(&self, ctx: &SubmissionCtx, record: &SessionRecord, image: &CapturedImage) {
        if let Err(e) = self.store.save(record, image).await {
            warn!("{} ⚠️ 保存会话记录失败: {}", ctx, e);
        }
    }

    async fn clear_uploads(&self, ctx: &SubmissionCtx) {
        if let Err(e) = self.source.delete_all().await {
            warn!("{} ⚠️ 清空已上传图片失败: {}", ctx, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};
    use crate::models::capture::test_support::tiny_png;
    use crate::models::FeedbackRecord;
    use crate::services::feedback_service::test_support::ScriptedModel;
    use crate::services::TextRecognizer;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct OneImageSource {
        name: Option<String>,
        deletes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ImageSource for OneImageSource {
        fn describe(&self) -> String {
            "stub".to_string()
        }

        async fn list_names(&self) -> AppResult<Vec<String>> {
            Ok(self.name.iter().cloned().collect())
        }

        async fn fetch(&self, _name: &str) -> AppResult<Vec<u8>> {
            Ok(tiny_png())
        }

        async fn delete_all(&self) -> AppResult<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Other("server asleep".to_string()))
        }
    }

    struct FixedText(&'static str);

    #[async_trait]
    impl TextRecognizer for FixedText {
        async fn recognize(&self, _image: &CapturedImage, _format: OcrFormat) -> AppResult<String> {
            Ok(self.0.to_string())
        }
    }

    struct Harness {
        flow: SubmissionFlow,
        deletes: Arc<AtomicUsize>,
        dir: tempfile::TempDir,
    }

    fn harness(image: bool, ocr_text: &'static str, replies: &[&str]) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            question_count: 2,
            image_extension: ".png".to_string(),
            history_dir: dir.path().join("history").display().to_string(),
            warn_file: dir.path().join("warn.txt").display().to_string(),
            ..Config::default()
        };
        let deletes = Arc::new(AtomicUsize::new(0));
        let source = OneImageSource {
            name: image.then(|| "mathmandala_2026.png".to_string()),
            deletes: deletes.clone(),
        };
        let ocr = OcrService::with_policy(Box::new(FixedText(ocr_text)), 1, Duration::ZERO);
        let feedback = FeedbackService::new(Box::new(ScriptedModel::new(replies)), &config);

        let flow = SubmissionFlow::from_parts(Box::new(source), ocr, feedback, &config)
            .with_poller(ImagePoller::new(Duration::from_millis(30), Duration::from_millis(10)));

        Harness { flow, deletes, dir }
    }

    #[tokio::test]
    async fn test_math_session_end_to_end() {
        let h = harness(
            true,
            "Q1. x=5\nQ2. 40 cm^2",
            &[
                "Q1. Solve x\nQ2. Find area",
                r#"{"1":"correct","2":"check units"}"#,
            ],
        );
        let ctx = SubmissionCtx::new(Subject::Math, "2026-10-18_09-00-00");

        let outcome = h.flow.run(&ctx).await.unwrap();
        let SubmissionOutcome::Completed(record) = outcome else {
            panic!("expected a completed session");
        };

        let answers = record.answers.clone().unwrap();
        assert_eq!(answers.get(&1).map(String::as_str), Some("x=5"));
        assert_eq!(answers.get(&2).map(String::as_str), Some("40 cm^2"));

        let reconciled = record.reconciled().unwrap();
        assert_eq!(reconciled.get(2).map(FeedbackRecord::feedback), Some("check units"));

        assert!(h.dir.path().join("history/2026-10-18_09-00-00.json").exists());
        assert!(h.dir.path().join("history/2026-10-18_09-00-00.jpg").exists());
        assert_eq!(h.deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_math_unstructured_reply_goes_to_warn_file() {
        let h = harness(
            true,
            "Q1.\n5",
            &["Q1. Solve x\nQ2. Find area", "Sorry, I can't read that."],
        );
        let ctx = SubmissionCtx::new(Subject::Math, "2026-10-18_09-00-00");

        let SubmissionOutcome::Completed(record) = h.flow.run(&ctx).await.unwrap() else {
            panic!("expected a completed session");
        };
        assert_eq!(
            record.feedback,
            SessionFeedback::Unstructured {
                raw_reply: "Sorry, I can't read that.".to_string()
            }
        );

        let warn = std::fs::read_to_string(h.dir.path().join("warn.txt")).unwrap();
        assert!(warn.contains("answer not detected | Q2"));
        assert!(warn.contains("unstructured feedback | Sorry, I can't read that."));
    }

    #[tokio::test]
    async fn test_no_image_is_not_an_error() {
        let h = harness(false, "", &["Q1. Solve x\nQ2. Find area"]);
        let ctx = SubmissionCtx::new(Subject::Math, "2026-10-18_09-00-00");

        assert_eq!(h.flow.run(&ctx).await.unwrap(), SubmissionOutcome::NoImage);
        assert_eq!(h.deletes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_story_without_text_skips_feedback() {
        let h = harness(true, "   ", &["Genre: mystery"]);
        let ctx = SubmissionCtx::new(Subject::StoryMountain, "2026-10-18_09-00-00");

        assert_eq!(h.flow.run(&ctx).await.unwrap(), SubmissionOutcome::NoText);
        assert!(!h.dir.path().join("history").exists());
        assert_eq!(h.deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_biology_grades_image_without_ocr() {
        let h = harness(true, "", &["Label the plant cell", "All labels correct"]);
        let ctx = SubmissionCtx::new(Subject::Biology, "2026-10-18_09-00-00");

        let SubmissionOutcome::Completed(record) = h.flow.run(&ctx).await.unwrap() else {
            panic!("expected a completed session");
        };
        assert_eq!(record.task.as_deref(), Some("Label the plant cell"));
        assert_eq!(record.feedback, SessionFeedback::Text("All labels correct".to_string()));
    }

    #[tokio::test]
    async fn test_mismatched_assignment_is_error() {
        let h = harness(true, "", &[]);
        let ctx = SubmissionCtx::new(Subject::Math, "2026-10-18_09-00-00");
        let assignment = Assignment::Task("not questions".to_string());

        assert!(h.flow.submit(&ctx, &assignment).await.is_err());
    }
}
