//! 诊断写入服务 - 业务能力层
//!
//! 只负责"追加写 warn.txt"能力，不关心流程

use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::{debug, warn};

use crate::config::Config;
use crate::utils::truncate_text;

/// 诊断写入服务
///
/// 职责：
/// - 把无法解析的模型回复、没识别到的答案追加写入诊断文件
/// - 一行一条，带会话时间戳
/// - 写失败只记日志，不影响流程
pub struct WarnWriter {
    warn_file_path: String,
}

impl WarnWriter {
    /// 默认写到 warn.txt
    pub fn new() -> Self {
        Self {
            warn_file_path: "warn.txt".to_string(),
        }
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            warn_file_path: path.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_path(&config.warn_file)
    }

    /// 写入一条诊断
    ///
    /// # 参数
    /// - `session`: 会话时间戳
    /// - `reason`: 原因（例如 "unstructured feedback"）
    /// - `detail`: 原始内容，换行会被转义成 `\n`
    pub fn write(&self, session: &str, reason: &str, detail: &str) -> Result<()> {
        debug!(
            "写入诊断: 会话 {} | {} | 内容长度: {}",
            session,
            reason,
            detail.len()
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.warn_file_path)?;

        let warn_msg = format!(
            "会话 {} | {} | {}\n",
            session,
            reason,
            detail.replace('\n', "\\n")
        );

        file.write_all(warn_msg.as_bytes())?;

        Ok(())
    }

    /// 写入诊断，失败时只记录警告
    pub fn record(&self, session: &str, reason: &str, detail: &str) {
        if let Err(e) = self.write(session, reason, detail) {
            warn!(
                "⚠️ 写入诊断文件 {} 失败: {} ({})",
                self.warn_file_path,
                e,
                truncate_text(detail, 60)
            );
        }
    }
}

impl Default for WarnWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warn.txt");
        let writer = WarnWriter::with_path(path.display().to_string());

        writer
            .write("2026-10-18_09-00-00", "unstructured feedback", "line one\nline two")
            .unwrap();
        writer.record("2026-10-18_09-00-00", "answer not detected", "Q3");

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "会话 2026-10-18_09-00-00 | unstructured feedback | line one\\nline two"
        );
        assert!(lines[1].ends_with("| answer not detected | Q3"));
    }

    #[test]
    fn test_unwritable_path_is_not_fatal() {
        let writer = WarnWriter::with_path("/definitely/not/here/warn.txt");
        assert!(writer.write("s", "r", "d").is_err());
        writer.record("s", "r", "d");
    }
}
