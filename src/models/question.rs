use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 分段结果：题号 → 该题的答案文本（已合并、去首尾空白）
///
/// 键不存在表示"未识别到该题"，键存在但值为空表示"识别到题号但没有内容"。
pub type AnswerSpans = BTreeMap<u32, String>;

/// 题目集合：题号 → 题目文本
///
/// 每次生成任务时创建一次，之后只读。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionSet(BTreeMap<u32, String>);

impl QuestionSet {
    /// 按题号获取题目
    pub fn get(&self, number: u32) -> Option<&str> {
        self.0.get(&number).map(String::as_str)
    }

    /// 按题号升序遍历
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.0.iter().map(|(n, q)| (*n, q.as_str()))
    }

    pub fn numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 只保留 1..=max 的题目
    pub fn limited_to(self, max: usize) -> Self {
        Self(
            self.0
                .into_iter()
                .filter(|(n, _)| *n >= 1 && (*n as usize) <= max)
                .collect(),
        )
    }
}

impl FromIterator<(u32, String)> for QuestionSet {
    fn from_iter<I: IntoIterator<Item = (u32, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<AnswerSpans> for QuestionSet {
    fn from(spans: AnswerSpans) -> Self {
        Self(spans)
    }
}

/// 某道题的答案状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerState<'a> {
    /// 识别到答案
    Answered(&'a str),
    /// 识别到题号，但内容为空
    Blank,
    /// 完全没有识别到该题
    Missing,
}

impl<'a> AnswerState<'a> {
    pub fn of(spans: &'a AnswerSpans, number: u32) -> Self {
        match spans.get(&number) {
            None => AnswerState::Missing,
            Some(text) if text.is_empty() => AnswerState::Blank,
            Some(text) => AnswerState::Answered(text),
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, AnswerState::Answered(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> QuestionSet {
        [(1, "Solve x"), (2, "Find area"), (7, "Bonus")]
            .into_iter()
            .map(|(n, q)| (n, q.to_string()))
            .collect()
    }

    #[test]
    fn test_limited_to_keeps_leading_numbers() {
        let set = sample().limited_to(6);
        assert_eq!(set.numbers().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_serializes_with_string_keys() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(json, r#"{"1":"Solve x","2":"Find area","7":"Bonus"}"#);
        let back: QuestionSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_answer_state_distinguishes_blank_and_missing() {
        let mut spans = AnswerSpans::new();
        spans.insert(1, "x=5".to_string());
        spans.insert(2, String::new());

        assert_eq!(AnswerState::of(&spans, 1), AnswerState::Answered("x=5"));
        assert_eq!(AnswerState::of(&spans, 2), AnswerState::Blank);
        assert_eq!(AnswerState::of(&spans, 3), AnswerState::Missing);
        assert!(!AnswerState::of(&spans, 2).is_detected());
    }
}
