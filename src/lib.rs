//! # Math Mandala
//!
//! 拍照交作业、逐题批改的学习助手
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure / Clients）
//! - `infrastructure/` - 图片来源（上传服务器 / 本地目录），只暴露能力
//! - `clients/` - Mathpix OCR 客户端
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `Segmenter` - 把识别文本按题号切分
//! - `reconcile` - 把模型回复对回到题号
//! - `ImagePoller` - 等待最新上传的图片
//! - `OcrService` / `FeedbackService` - 识别、出题、批改能力
//! - `SessionStore` / `WarnWriter` - 存档、写诊断文件
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次提交"的完整处理流程
//! - `SubmissionCtx` - 上下文封装（科目 + 时间戳）
//! - `SubmissionFlow` - 流程编排（出题 → 等图 → 识别 → 批改 → 存档）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 命令分派和输出
//!
//! 另有 `presentation/` 负责终端渲染，`models/` 放数据类型。

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod presentation;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{
    AnswerSpans, FeedbackRecord, QuestionSet, ReconciledFeedback, SessionRecord, Subject,
};
pub use orchestrator::App;
pub use services::{reconcile, MarkerMode, Segmenter};
pub use workflow::{Assignment, SubmissionCtx, SubmissionFlow, SubmissionOutcome};
