use async_trait::async_trait;

pub mod error;
pub mod gemini;
pub mod prompt;

pub use error::{ModelError, ModelResult};
pub use gemini::GeminiClient;
pub use prompt::PromptDispatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// A text-generation backend: takes the full conversation, returns the raw
/// reply text.
#[async_trait]
pub trait ModelClient: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, turns: &[ChatTurn]) -> ModelResult<String>;
}
