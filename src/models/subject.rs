use serde::{Deserialize, Serialize};

/// 科目枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    /// 数学：多道编号题，逐题批改
    Math,
    /// 故事山写作计划
    #[serde(rename = "Story Mountain")]
    StoryMountain,
    /// 生物示意图，直接把图片交给模型批改
    Biology,
}

impl Subject {
    pub const ALL: [Subject; 3] = [Subject::Math, Subject::StoryMountain, Subject::Biology];

    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            Subject::Math => "Math",
            Subject::StoryMountain => "Story Mountain",
            Subject::Biology => "Biology",
        }
    }

    /// 尝试从字符串解析科目（忽略大小写、空格、连字符和下划线）
    pub fn find(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "math" | "maths" => Some(Subject::Math),
            "storymountain" | "story" => Some(Subject::StoryMountain),
            "biology" | "bio" => Some(Subject::Biology),
            _ => None,
        }
    }
}

impl std::str::FromStr for Subject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::find(s).ok_or_else(|| format!("未知科目: {}", s))
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
