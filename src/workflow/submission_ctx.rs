//! 会话上下文
//!
//! 封装"这是哪一次提交、哪个科目"这一信息

use std::fmt::Display;

use crate::models::Subject;
use crate::services::SessionStore;

/// 提交上下文
#[derive(Debug, Clone)]
pub struct SubmissionCtx {
    /// 科目
    pub subject: Subject,

    /// 会话时间戳，同时作为存档文件名
    pub timestamp: String,
}

impl SubmissionCtx {
    pub fn new(subject: Subject, timestamp: impl Into<String>) -> Self {
        Self {
            subject,
            timestamp: timestamp.into(),
        }
    }

    /// 以当前时间创建
    pub fn now(subject: Subject) -> Self {
        Self::new(subject, SessionStore::timestamp())
    }
}

impl Display for SubmissionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[会话 {} {}]", self.timestamp, self.subject)
    }
}
