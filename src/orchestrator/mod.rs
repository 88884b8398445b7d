//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责把命令分派到流程层，是整个系统的"指挥中心"。
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App (命令：run / history / review / segment / reconcile)
//!     ↓
//! workflow::SubmissionFlow (处理一次提交)
//!     ↓
//! services (能力层：segment / reconcile / poll / ocr / feedback / store / warn)
//!     ↓
//! infrastructure + clients (图片来源、Mathpix、LLM)
//! ```
//!
//! ## 设计原则
//!
//! 1. **向下依赖**：编排层 → workflow → services → infrastructure
//! 2. **无业务逻辑**：只做调度和输出

pub mod app;

pub use app::App;
