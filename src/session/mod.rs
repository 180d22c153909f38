use crate::model::{ChatTurn, Role};

pub mod turn;

pub use turn::TurnRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub is_error: bool,
}

/// Chat shown to the user plus the conversation replayed to the model.
///
/// The two diverge on assistant turns: the user sees a summary of what was
/// applied, the model gets back its own raw reply. Upstream failures are
/// shown but never replayed.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    history: Vec<ChatTurn>,
}

impl Transcript {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn push_user(&mut self, prompt: &str) {
        self.messages.push(Message {
            role: Role::User,
            content: prompt.to_string(),
            is_error: false,
        });
        self.history.push(ChatTurn::user(prompt));
    }

    pub fn push_reply(&mut self, raw: &str, record: &TurnRecord) {
        self.messages.push(Message {
            role: Role::Assistant,
            content: record.summary(),
            is_error: false,
        });
        self.history.push(ChatTurn::assistant(raw));
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        self.messages.push(Message {
            role: Role::Assistant,
            content: message.into(),
            is_error: true,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{Transcript, TurnRecord};
    use crate::model::Role;
    use crate::workspace::WorkspaceStore;

    #[test]
    fn replies_are_replayed_raw_and_errors_are_not_replayed() {
        let mut store = WorkspaceStore::in_memory();
        let mut transcript = Transcript::default();

        transcript.push_user("make index");
        let raw = r#"{"explanation":"done","operations":[{"action":"create","path":"index.html","content":"x"}]}"#;
        let record = TurnRecord::interpret(raw, &mut store);
        transcript.push_reply(raw, &record);

        transcript.push_user("again");
        transcript.push_error("model API quota or rate limit exceeded: slow down");

        assert_eq!(transcript.messages().len(), 4);
        assert_eq!(transcript.messages()[1].content, "Create: index.html\n\ndone");
        assert!(transcript.messages()[3].is_error);

        let history = transcript.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[1].text, raw);
        assert_eq!(history[2].text, "again");
    }
}
