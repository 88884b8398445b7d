//! 答案分段 - 业务能力层
//!
//! 把 OCR 识别出的多行文本按题号切成逐题答案。纯函数，无状态。

use regex::Regex;
use std::collections::BTreeMap;

use crate::models::question::AnswerSpans;

/// 题号行的识别方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerMode {
    /// 题号行必须是 `Q<数字>.`，同一行后面的内容丢弃
    /// （该题完全没有正文时才用它兜底）
    #[default]
    Strict,
    /// 题号行为 `Q<数字>.` 或 `<数字>.`，同一行后面的内容作为答案第一行
    /// （用于切分模型生成的题目列表）
    PrefixCapture,
}

/// 答案分段器
#[derive(Debug, Clone)]
pub struct Segmenter {
    mode: MarkerMode,
    marker: Regex,
}

/// 单道题在扫描过程中的缓冲
#[derive(Debug, Default)]
struct SpanBuffer {
    lines: Vec<String>,
    /// 题号行同一行的内容
    marker_text: Vec<String>,
}

impl Segmenter {
    pub fn new(mode: MarkerMode) -> Self {
        let pattern = match mode {
            MarkerMode::Strict => r"^Q(\d+)\.(.*)$",
            MarkerMode::PrefixCapture => r"^Q?(\d+)\.(.*)$",
        };
        let marker = Regex::new(pattern).expect("题号正则是常量，必然合法");

        Self { mode, marker }
    }

    pub fn strict() -> Self {
        Self::new(MarkerMode::Strict)
    }

    pub fn prefix_capture() -> Self {
        Self::new(MarkerMode::PrefixCapture)
    }

    /// 把识别文本切分为逐题答案
    ///
    /// - 第一个题号之前的行全部丢弃
    /// - 题号重复出现时，光标回到该题继续追加
    /// - 没有内容的题保留为空字符串，不会被删除
    pub fn segment(&self, raw_text: &str) -> AnswerSpans {
        let mut buffers: BTreeMap<u32, SpanBuffer> = BTreeMap::new();
        let mut cursor: Option<u32> = None;

        for line in raw_text.lines() {
            if let Some((number, trailing)) = self.match_marker(line) {
                cursor = Some(number);
                let buffer = buffers.entry(number).or_default();
                match self.mode {
                    MarkerMode::PrefixCapture => buffer.lines.push(trailing.to_string()),
                    MarkerMode::Strict => buffer.marker_text.push(trailing.to_string()),
                }
                continue;
            }

            if let Some(number) = cursor {
                buffers
                    .entry(number)
                    .or_default()
                    .lines
                    .push(line.to_string());
            }
        }

        buffers
            .into_iter()
            .map(|(number, buffer)| {
                let body = buffer.lines.join("\n").trim().to_string();
                let span = if body.is_empty() {
                    buffer.marker_text.join("\n").trim().to_string()
                } else {
                    body
                };
                (number, span)
            })
            .collect()
    }

    /// 识别题号行，返回 (题号, 同一行剩余内容)
    fn match_marker<'a>(&self, line: &'a str) -> Option<(u32, &'a str)> {
        let caps = self.marker.captures(line.trim())?;
        let number = caps.get(1)?.as_str().parse::<u32>().ok()?;
        let trailing = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        Some((number, trailing))
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::strict()
    }
}

/// 统计识别到的题号数量
pub fn detected_count(spans: &AnswerSpans) -> usize {
    spans.len()
}
