//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：打印启动信息、持有配置
//! 2. **批改会话**：创建 SubmissionFlow，展示任务，等待图片（可重复等待）
//! 3. **历史记录**：列出、查看已保存的会话
//! 4. **离线工具**：对现成的文本做分段、对账
//!
//! 只做调度和输出，不做具体业务判断。

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::{load_question_set, Subject};
use crate::presentation::{render_history, render_math, render_session};
use crate::services::{reconcile, MarkerMode, Segmenter, SessionStore};
use crate::utils::logging::log_startup;
use crate::workflow::{Assignment, SubmissionCtx, SubmissionFlow, SubmissionOutcome};

/// 应用主结构
pub struct App {
    config: Config,
    store: SessionStore,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);
        let store = SessionStore::from_config(&config);
        Ok(Self { config, store })
    }

    /// 运行一次批改会话
    ///
    /// `waits` 为最多等待图片的轮数，超时后沿用同一份任务重新等待。
    pub async fn run_session(&self, subject: Subject, waits: usize) -> Result<SubmissionOutcome> {
        self.config.validate().context("配置不完整")?;

        let flow = SubmissionFlow::new(&self.config)?;
        let ctx = SubmissionCtx::now(subject);

        let assignment = flow.prepare(&ctx).await?;
        println!("{}", render_assignment(&assignment));

        let waits = waits.max(1);
        for round in 1..=waits {
            let outcome = flow.submit(&ctx, &assignment).await?;
            match &outcome {
                SubmissionOutcome::Completed(record) => {
                    println!("{}", render_session(record));
                    return Ok(outcome);
                }
                SubmissionOutcome::NoText => {
                    println!("No text was recognized in the image. Please try again.");
                    return Ok(outcome);
                }
                SubmissionOutcome::NoImage if round < waits => {
                    warn!("{} ⚠️ 第 {}/{} 轮没有收到图片，重新等待", ctx, round, waits);
                }
                SubmissionOutcome::NoImage => {
                    println!("No image received in time. Please try again.");
                }
            }
        }

        Ok(SubmissionOutcome::NoImage)
    }

    /// 列出历史会话
    pub async fn history(&self) -> Result<Vec<String>> {
        let names = self.store.list().await?;
        info!("📚 共 {} 条历史记录", names.len());
        println!("{}", render_history(&names));
        Ok(names)
    }

    /// 查看一条历史会话
    pub async fn review(&self, name: &str) -> Result<()> {
        let record = self
            .store
            .load(name)
            .await
            .with_context(|| format!("读取历史记录 {} 失败", name))?;
        println!("{}", render_session(&record));
        Ok(())
    }

    /// 对文本文件做分段，输出 JSON
    pub async fn segment_file(&self, path: &Path, mode: MarkerMode) -> Result<String> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("读取文件 {} 失败", path.display()))?;

        let spans = Segmenter::new(mode).segment(&text);
        info!("✓ 识别到 {} 个题号", spans.len());

        let json = serde_json::to_string_pretty(&spans)?;
        println!("{}", json);
        Ok(json)
    }

    /// 用题目文件和回复文件做一次对账
    pub async fn reconcile_files(&self, questions: &Path, reply: &Path) -> Result<String> {
        let questions = load_question_set(questions).await?;
        let raw_reply = tokio::fs::read_to_string(reply)
            .await
            .with_context(|| format!("读取文件 {} 失败", reply.display()))?;

        let feedback = reconcile(&questions, &raw_reply);
        if !feedback.is_structured() {
            warn!("⚠️ 回复中没有结构化反馈");
        }

        let rendered = render_math(&questions, &Default::default(), &feedback);
        println!("{}", rendered);
        Ok(rendered)
    }
}

fn render_assignment(assignment: &Assignment) -> String {
    match assignment {
        Assignment::Questions(questions) => questions
            .iter()
            .map(|(n, q)| format!("Q{}. {}", n, q))
            .collect::<Vec<_>>()
            .join("\n"),
        Assignment::Task(task) => task.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SessionFeedback, SessionRecord};

    fn app(dir: &Path) -> App {
        let config = Config {
            history_dir: dir.display().to_string(),
            ..Config::default()
        };
        App::initialize(config).unwrap()
    }

    #[tokio::test]
    async fn test_segment_file_outputs_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocr.txt");
        std::fs::write(&path, "Q1.\nx = 5\nQ2.\n40 cm^2").unwrap();

        let json = app(dir.path())
            .segment_file(&path, MarkerMode::Strict)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["1"], "x = 5");
        assert_eq!(value["2"], "40 cm^2");
    }

    #[tokio::test]
    async fn test_reconcile_files() {
        let dir = tempfile::tempdir().unwrap();
        let questions = dir.path().join("questions.toml");
        let reply = dir.path().join("reply.txt");
        std::fs::write(&questions, "[questions]\n1 = \"Solve x\"\n2 = \"Find area\"\n").unwrap();
        std::fs::write(&reply, r#"Here: {"1":"correct"}"#).unwrap();

        let rendered = app(dir.path())
            .reconcile_files(&questions, &reply)
            .await
            .unwrap();
        assert!(rendered.contains("Feedback: correct"));
        assert!(rendered.contains("No feedback available"));
    }

    #[tokio::test]
    async fn test_run_session_requires_credentials() {
        let dir = tempfile::tempdir().unwrap();
        assert!(app(dir.path()).run_session(Subject::Math, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_history_and_review_missing() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());

        let record = SessionRecord {
            timestamp: "2026-10-18_09-00-00".to_string(),
            subject: Subject::Biology,
            problems: None,
            task: Some("Label a flower".to_string()),
            text: String::new(),
            answers: None,
            feedback: SessionFeedback::Text("Good".to_string()),
            image: String::new(),
        };
        std::fs::write(
            dir.path().join("2026-10-18_09-00-00.json"),
            serde_json::to_string(&record).unwrap(),
        )
        .unwrap();

        assert_eq!(app.history().await.unwrap(), vec!["2026-10-18_09-00-00"]);
        tokio_test::assert_ok!(app.review("2026-10-18_09-00-00").await);
        assert!(app.review("missing").await.is_err());
    }
}
