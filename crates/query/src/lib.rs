pub mod llm;
pub mod questions;

pub use llm::{ChatLLM, ChatMessage, ChatModel};
pub use questions::{parse_questions, QuestionConfig, QuestionGenerator};
