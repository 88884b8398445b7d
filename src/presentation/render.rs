use std::fmt::Write;

use crate::models::{
    AnswerSpans, AnswerState, FeedbackRecord, QuestionSet, ReconciledFeedback, SessionFeedback,
    SessionRecord,
};

const RULE: &str = "────────────────────────────────────────";

pub const NO_FEEDBACK: &str = "No feedback available";
pub const NO_STRUCTURED_FEEDBACK: &str = "No structured feedback detected. Raw reply:";

fn answer_line(answers: &AnswerSpans, number: u32) -> String {
    match AnswerState::of(answers, number) {
        AnswerState::Answered(text) => format!("Your answer: {}", text),
        AnswerState::Blank => format!("⚠️ Q{} was found but the answer is blank", number),
        AnswerState::Missing => format!("⚠️ Answer for Q{} not detected", number),
    }
}

fn feedback_lines(out: &mut String, record: Option<&FeedbackRecord>) {
    match record {
        Some(FeedbackRecord::FeedbackOnly(text)) => {
            let _ = writeln!(out, "Feedback: {}", text);
        }
        Some(FeedbackRecord::FeedbackWithAnswer {
            student_answer,
            feedback,
        }) => {
            let _ = writeln!(out, "Read as: {}", student_answer);
            let _ = writeln!(out, "Feedback: {}", feedback);
        }
        None => {
            let _ = writeln!(out, "⚠️ {}", NO_FEEDBACK);
        }
    }
}

/// 逐题渲染数学作业
///
/// 反馈无法解析时，逐题部分只显示答案，最后附上原始回复。
pub fn render_math(
    questions: &QuestionSet,
    answers: &AnswerSpans,
    feedback: &ReconciledFeedback,
) -> String {
    let mut out = String::new();

    for (number, question) in questions.iter() {
        let _ = writeln!(out, "Q{}. {}", number, question);
        let _ = writeln!(out, "{}", answer_line(answers, number));
        if feedback.is_structured() {
            feedback_lines(&mut out, feedback.get(number));
        }
        let _ = writeln!(out, "{}", RULE);
    }

    if let ReconciledFeedback::Unstructured { raw_reply } = feedback {
        let _ = writeln!(out, "⚠️ {}", NO_STRUCTURED_FEEDBACK);
        let _ = writeln!(out, "{}", raw_reply);
    }

    out
}

/// 渲染一条历史记录
pub fn render_session(record: &SessionRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "📅 {} | {}", record.timestamp, record.subject);
    let _ = writeln!(out, "🖼️ {}", record.image);
    let _ = writeln!(out, "{}", RULE);

    if let Some(task) = &record.task {
        let _ = writeln!(out, "Task:\n{}", task);
        let _ = writeln!(out, "{}", RULE);
    }

    match (&record.problems, record.reconciled()) {
        (Some(problems), Some(reconciled)) => {
            let empty = AnswerSpans::new();
            let answers = record.answers.as_ref().unwrap_or(&empty);
            out.push_str(&render_math(problems, answers, &reconciled));
        }
        _ => {
            let _ = writeln!(out, "Recognized text:\n{}", record.text);
            let _ = writeln!(out, "{}", RULE);
            match &record.feedback {
                SessionFeedback::Text(text) => {
                    let _ = writeln!(out, "Feedback:\n{}", text);
                }
                SessionFeedback::Unstructured { raw_reply } => {
                    let _ = writeln!(out, "⚠️ {}\n{}", NO_STRUCTURED_FEEDBACK, raw_reply);
                }
                SessionFeedback::PerQuestion(map) => {
                    for (number, record) in map {
                        let _ = writeln!(out, "Q{}.", number);
                        feedback_lines(&mut out, record.as_ref());
                    }
                }
            }
        }
    }

    out
}

/// 历史记录列表，调用方保证最新的在前
pub fn render_history(names: &[String]) -> String {
    if names.is_empty() {
        return "No saved sessions yet.\n".to_string();
    }

    let mut out = String::new();
    for (index, name) in names.iter().enumerate() {
        let _ = writeln!(out, "{:>3}. {}", index + 1, name);
    }
    out
}
