//! 展示层：把题目、答案、反馈渲染成终端文本

pub mod render;

pub use render::{render_history, render_math, render_session};
