use crate::models::question::QuestionSet;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;

/// 题目文件格式
///
/// ```toml
/// [questions]
/// 1 = "Solve 2x + 3 = 13"
/// 2 = "Find the area of a 5 cm by 8 cm rectangle"
/// ```
#[derive(Debug, Deserialize)]
struct QuestionFile {
    questions: BTreeMap<String, String>,
}

/// 从 TOML 文件加载题目集合
pub async fn load_question_set(path: &Path) -> Result<QuestionSet> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取题目文件: {}", path.display()))?;

    parse_question_set(&content).with_context(|| format!("无法解析题目文件: {}", path.display()))
}

/// 解析 TOML 文本，题号必须是正整数
pub fn parse_question_set(content: &str) -> Result<QuestionSet> {
    let file: QuestionFile = toml::from_str(content)?;

    file.questions
        .into_iter()
        .map(|(key, text)| {
            let number = key
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .with_context(|| format!("题号必须是正整数: {}", key))?;
            Ok((number, text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_question_set() {
        let set = parse_question_set("[questions]\n1 = \"Solve x\"\n2 = \"Find area\"\n").unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(2), Some("Find area"));
    }

    #[test]
    fn test_parse_rejects_non_numeric_keys() {
        assert!(parse_question_set("[questions]\nfirst = \"Solve x\"\n").is_err());
        assert!(parse_question_set("[questions]\n0 = \"Solve x\"\n").is_err());
    }

    #[tokio::test]
    async fn test_load_question_set_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questions.toml");
        std::fs::write(&path, "[questions]\n3 = \"Factorise\"\n").unwrap();

        let set = load_question_set(&path).await.unwrap();
        assert_eq!(set.get(3), Some("Factorise"));
    }
}
