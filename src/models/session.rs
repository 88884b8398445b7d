use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::feedback::{FeedbackRecord, ReconciledFeedback};
use crate::models::question::{AnswerSpans, QuestionSet};
use crate::models::subject::Subject;

/// 会话记录中保存的反馈
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionFeedback {
    /// 逐题反馈（数学）
    PerQuestion(BTreeMap<u32, Option<FeedbackRecord>>),
    /// 模型回复无法解析，保留原文
    Unstructured { raw_reply: String },
    /// 整段文字反馈（故事山、生物）
    Text(String),
}

impl From<ReconciledFeedback> for SessionFeedback {
    fn from(reconciled: ReconciledFeedback) -> Self {
        match reconciled {
            ReconciledFeedback::PerQuestion(map) => SessionFeedback::PerQuestion(map),
            ReconciledFeedback::Unstructured { raw_reply } => {
                SessionFeedback::Unstructured { raw_reply }
            }
        }
    }
}

/// 一次提交的持久化记录，创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// 时间戳，同时作为文件名
    pub timestamp: String,
    pub subject: Subject,
    /// 数学题目
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problems: Option<QuestionSet>,
    /// 非数学科目的任务文本
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    /// OCR 识别文本
    pub text: String,
    /// 逐题答案（数学）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<AnswerSpans>,
    pub feedback: SessionFeedback,
    /// 保存的图片路径
    pub image: String,
}

impl SessionRecord {
    /// 数学记录的逐题反馈
    pub fn reconciled(&self) -> Option<ReconciledFeedback> {
        match &self.feedback {
            SessionFeedback::PerQuestion(map) => Some(ReconciledFeedback::PerQuestion(map.clone())),
            SessionFeedback::Unstructured { raw_reply } => Some(ReconciledFeedback::Unstructured {
                raw_reply: raw_reply.clone(),
            }),
            SessionFeedback::Text(_) => None,
        }
    }
}
