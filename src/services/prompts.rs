//! 提示词构建
//!
//! 纯字符串拼接，便于单独测试。

use crate::models::QuestionSet;

/// 数学出题的系统消息
pub const MATH_TUTOR_SYSTEM: &str = "You are a friendly Year 7 mathematics teacher. \
You write clear problems and give short, encouraging, precise feedback.";

/// 写作批改的系统消息
pub const WRITING_TUTOR_SYSTEM: &str =
    "You are a supportive Year 7 English teacher who gives specific, actionable feedback.";

/// 生物批改的系统消息
pub const BIOLOGY_TUTOR_SYSTEM: &str =
    "You are a Year 7 biology teacher who checks labelled diagrams carefully.";

/// 生成数学题
pub fn math_questions(count: usize) -> String {
    format!(
        r#"Create {count} different math problems for a Year 7 student.
Mix arithmetic, algebra, geometry and word problems, from easier to harder.

Format every problem on its own line exactly like this:
Q1. <problem>
Q2. <problem>
...
Q{count}. <problem>

Do not include answers, hints or any other text."#
    )
}

/// 批改数学作业，要求返回以题号为键的 JSON
pub fn math_feedback(questions: &QuestionSet, recognized_text: &str) -> String {
    let problem_list = questions
        .iter()
        .map(|(n, q)| format!("Q{}. {}", n, q))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"A Year 7 student answered these problems on paper:

{problem_list}

This is the OCR text of the student's handwritten answer sheet (answers are marked Q1., Q2., ...):

{recognized_text}

For every problem, find the student's answer and grade it. Explain mistakes briefly and show the correct method when the answer is wrong.

Reply with a single JSON object and nothing else. Use the problem number as the key:
{{"1": {{"student_answer": "...", "feedback": "..."}}, "2": {{"student_answer": "...", "feedback": "..."}}}}
If you cannot find an answer for a problem, set "student_answer" to "Not detected"."#
    )
}

/// 生成故事山写作任务
pub fn story_task() -> String {
    r#"Create a Story Mountain writing task for a Year 7 student.
Provide the following only:

* Genre
* Main setting
* Central character
* Conflict or challenge

Make it imaginative, challenging, and age-appropriate.

Do not include the Story Mountain structure, summary, or plot outline."#
        .to_string()
}

/// 批改故事山写作计划
pub fn story_feedback(task: &str, text: &str) -> String {
    format!(
        r#"Evaluate this Story Mountain plan written by a Year 7 student. Give feedback on whether each part is present (Opening, Build-up, Climax, Falling Action, Ending), the creativity of the story, and how well it fits the assigned challenge.

Assigned challenge:
{task}

Student's Story Mountain:
{text}"#
    )
}

/// 生成生物示意图任务
pub fn biology_task() -> String {
    r#"Create a biology diagram task for a Year 7 student.
Name one structure to draw (for example a plant cell, an animal cell, the heart, or a flower) and list the parts the student must label.
Keep it short: one sentence for the drawing and a bullet list of parts."#
        .to_string()
}

/// 批改生物示意图（图片随消息一起发送）
pub fn biology_feedback(task: &str) -> String {
    format!(
        r#"The attached photo shows a Year 7 student's labelled biology diagram for this task:

{task}

Check each required label: is it present, is it pointing at the right structure, and is it spelled correctly? Comment on the accuracy of the drawing, then give two specific improvements."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_math_questions_asks_for_marker_format() {
        let prompt = math_questions(6);
        assert!(prompt.contains("Create 6 different"));
        assert!(prompt.contains("Q6. <problem>"));
    }

    #[test]
    fn test_math_feedback_embeds_problems_and_text() {
        let questions: QuestionSet = [(1, "Solve x".to_string()), (2, "Find area".to_string())]
            .into_iter()
            .collect();
        let prompt = math_feedback(&questions, "Q1. x=5");

        assert!(prompt.contains("Q1. Solve x\nQ2. Find area"));
        assert!(prompt.contains("Q1. x=5"));
        assert!(prompt.contains(r#"{"1": {"student_answer": "...", "feedback": "..."}"#));
    }

    #[test]
    fn test_story_feedback_includes_task() {
        let prompt = story_feedback("Genre: fantasy", "Opening: a storm");
        assert!(prompt.contains("Genre: fantasy"));
        assert!(prompt.contains("Opening: a storm"));
    }
}
