use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 学生答案字段缺失时的占位文本
pub const ANSWER_NOT_DETECTED: &str = "Not detected";
/// 反馈字段缺失时的占位文本
pub const FEEDBACK_NOT_RECEIVED: &str = "Not received";

/// 单道题的反馈
///
/// 模型可能返回纯文本，也可能返回 `{student_answer, feedback}` 对象，
/// 在对账时统一转换成这个枚举，下游不再判断原始形状。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeedbackRecord {
    /// 只有反馈文本（markdown 或纯文本）
    FeedbackOnly(String),
    /// 模型识别出的学生答案 + 反馈
    FeedbackWithAnswer {
        student_answer: String,
        feedback: String,
    },
}

impl FeedbackRecord {
    pub fn feedback(&self) -> &str {
        match self {
            FeedbackRecord::FeedbackOnly(text) => text,
            FeedbackRecord::FeedbackWithAnswer { feedback, .. } => feedback,
        }
    }

    pub fn student_answer(&self) -> Option<&str> {
        match self {
            FeedbackRecord::FeedbackOnly(_) => None,
            FeedbackRecord::FeedbackWithAnswer { student_answer, .. } => Some(student_answer),
        }
    }
}

/// 对账结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciledFeedback {
    /// 成功解析 JSON：每道题一条，`None` 表示没有该题的反馈
    PerQuestion(BTreeMap<u32, Option<FeedbackRecord>>),
    /// 回复里没有可解析的 JSON，原样保留供人工查看
    Unstructured { raw_reply: String },
}

impl ReconciledFeedback {
    pub fn get(&self, number: u32) -> Option<&FeedbackRecord> {
        match self {
            ReconciledFeedback::PerQuestion(map) => map.get(&number).and_then(Option::as_ref),
            ReconciledFeedback::Unstructured { .. } => None,
        }
    }

    /// 没有反馈的题号
    pub fn missing_numbers(&self) -> Vec<u32> {
        match self {
            ReconciledFeedback::PerQuestion(map) => map
                .iter()
                .filter(|(_, record)| record.is_none())
                .map(|(n, _)| *n)
                .collect(),
            ReconciledFeedback::Unstructured { .. } => Vec::new(),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, ReconciledFeedback::PerQuestion(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_wire_shapes() {
        let only: FeedbackRecord = serde_json::from_str(r#""ok""#).unwrap();
        assert_eq!(only, FeedbackRecord::FeedbackOnly("ok".to_string()));

        let pair: FeedbackRecord =
            serde_json::from_str(r#"{"student_answer":"x","feedback":"y"}"#).unwrap();
        assert_eq!(pair.student_answer(), Some("x"));
        assert_eq!(pair.feedback(), "y");
    }

    #[test]
    fn test_missing_numbers() {
        let mut map = BTreeMap::new();
        map.insert(1, Some(FeedbackRecord::FeedbackOnly("ok".to_string())));
        map.insert(2, None);
        let reconciled = ReconciledFeedback::PerQuestion(map);

        assert_eq!(reconciled.missing_numbers(), vec![2]);
        assert_eq!(reconciled.get(1).map(FeedbackRecord::feedback), Some("ok"));
        assert!(reconciled.get(2).is_none());
    }
}
