pub mod feedback_service;
pub mod image_poller;
pub mod llm_service;
pub mod ocr_service;
pub mod prompts;
pub mod reconciler;
pub mod segmenter;
pub mod session_store;
pub mod warn_writer;

pub use feedback_service::FeedbackService;
pub use image_poller::{ImagePoller, PollState};
pub use llm_service::{ChatModel, LlmService};
pub use ocr_service::{OcrFormat, OcrService, Recognition, TextRecognizer};
pub use reconciler::reconcile;
pub use segmenter::{MarkerMode, Segmenter};
pub use session_store::SessionStore;
pub use warn_writer::WarnWriter;
