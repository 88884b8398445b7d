//! 反馈对账 - 业务能力层
//!
//! 把模型返回的自由文本（其中夹带一个 JSON 对象）对回到已知题号上。

use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::feedback::{
    FeedbackRecord, ReconciledFeedback, ANSWER_NOT_DETECTED, FEEDBACK_NOT_RECEIVED,
};
use crate::models::question::QuestionSet;

/// 取出第一个 `{` 到最后一个 `}` 之间的内容（含括号）
///
/// 不做括号配对：回复正文里还有别的花括号时，截取范围会变大，解析失败
/// 后退回原文显示。
pub fn extract_json_span(raw_reply: &str) -> Option<&str> {
    let start = raw_reply.find('{')?;
    let end = raw_reply.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw_reply[start..=end])
}

/// 把模型回复对回到题目集合
///
/// 永远不会失败：无法解析时返回 [`ReconciledFeedback::Unstructured`]，
/// 携带原始回复。
pub fn reconcile(questions: &QuestionSet, raw_reply: &str) -> ReconciledFeedback {
    let Some(object) = parse_reply_object(raw_reply) else {
        debug!("模型回复中没有可解析的 JSON 对象");
        return ReconciledFeedback::Unstructured {
            raw_reply: raw_reply.to_string(),
        };
    };

    let per_question: BTreeMap<u32, Option<FeedbackRecord>> = questions
        .numbers()
        .map(|number| {
            let record = object.get(&number.to_string()).map(to_record);
            (number, record)
        })
        .collect();

    ReconciledFeedback::PerQuestion(per_question)
}

fn parse_reply_object(raw_reply: &str) -> Option<Map<String, JsonValue>> {
    let span = extract_json_span(raw_reply)?;
    match serde_json::from_str::<JsonValue>(span) {
        Ok(JsonValue::Object(map)) => Some(map),
        Ok(other) => {
            debug!("JSON 不是对象: {}", other);
            None
        }
        Err(e) => {
            debug!("JSON 解析失败: {}", e);
            None
        }
    }
}

fn to_record(value: &JsonValue) -> FeedbackRecord {
    match value {
        JsonValue::String(text) => FeedbackRecord::FeedbackOnly(text.clone()),
        JsonValue::Object(fields) => FeedbackRecord::FeedbackWithAnswer {
            student_answer: field_text(fields, "student_answer")
                .unwrap_or_else(|| ANSWER_NOT_DETECTED.to_string()),
            feedback: field_text(fields, "feedback")
                .unwrap_or_else(|| FEEDBACK_NOT_RECEIVED.to_string()),
        },
        other => FeedbackRecord::FeedbackOnly(other.to_string()),
    }
}

fn field_text(fields: &Map<String, JsonValue>, key: &str) -> Option<String> {
    match fields.get(key)? {
        JsonValue::Null => None,
        JsonValue::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
