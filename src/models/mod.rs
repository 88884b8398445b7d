pub mod capture;
pub mod feedback;
pub mod loaders;
pub mod question;
pub mod session;
pub mod subject;

pub use capture::CapturedImage;
pub use feedback::{FeedbackRecord, ReconciledFeedback};
pub use loaders::load_question_set;
pub use question::{AnswerSpans, AnswerState, QuestionSet};
pub use session::{SessionFeedback, SessionRecord};
pub use subject::Subject;
