use crate::model::{ChatTurn, ModelClient, ModelResult};
use crate::workspace::WorkspacePath;
use std::sync::Arc;

const SYSTEM_INSTRUCTION: &str = r#"You are an assistant that builds web pages and small web applications inside a file workspace.
You generate HTML, CSS, JavaScript, or self-contained React preview pages.

Respond ONLY with one JSON object of this exact shape:
{"explanation": "<what you did or your answer>", "operations": [ ... ]}

Each entry of "operations" is one of:
- {"action": "create", "path": "path/to/file.ext", "content": "<full file content>"}
- {"action": "update", "path": "path/to/file.ext", "content": "<full file content>"}
- {"action": "delete", "path": "path/to/file.ext"}

JSON rules:
1. Keys and string values use double quotes only.
2. Escape newlines as \n and double quotes inside content as \".
3. Paths are relative to the workspace; never use ".." or a leading "/".
4. Use an empty "operations" list when you only answer a question.

Updating files: always send the ENTIRE new file content in "content". Never send a diff or only the changed lines.

React previews: write ONE self-contained HTML file (for example "react_preview.html") that loads React, ReactDOM and Babel from a CDN, has a <div id="root">, puts the JSX in a <script type="text/babel"> tag that renders into the root, and keeps its CSS in a <style> tag inside <head>.

Conventions: use standard names such as "index.html", "style.css" and "script.js". "style.css" is injected into HTML previews automatically. If the request is unclear, ask in "explanation" and leave "operations" empty."#;

const PRIMING_ACK: &str = r#"{"explanation": "Understood. I will reply only with the JSON object, escape content correctly and always send complete file contents.", "operations": []}"#;

pub fn file_list_line(files: &[WorkspacePath]) -> String {
    if files.is_empty() {
        return "Current files in workspace: None".to_string();
    }
    let names: Vec<&str> = files.iter().map(WorkspacePath::as_str).collect();
    format!("Current files in workspace: {}", names.join(", "))
}

/// Full conversation sent for one turn: the instruction and file context, a
/// priming acknowledgement, then the session history ending with the newest
/// user prompt.
pub fn build_turns(history: &[ChatTurn], files: &[WorkspacePath]) -> Vec<ChatTurn> {
    let mut turns = Vec::with_capacity(history.len() + 2);
    turns.push(ChatTurn::user(format!(
        "{SYSTEM_INSTRUCTION}\n\n{}",
        file_list_line(files)
    )));
    turns.push(ChatTurn::assistant(PRIMING_ACK));
    turns.extend(history.iter().cloned());
    turns
}

#[derive(Clone)]
pub struct PromptDispatcher {
    client: Arc<dyn ModelClient>,
}

impl PromptDispatcher {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self { client }
    }

    pub fn model_name(&self) -> &str {
        self.client.name()
    }

    pub async fn dispatch(
        &self,
        history: &[ChatTurn],
        files: &[WorkspacePath],
    ) -> ModelResult<String> {
        let turns = build_turns(history, files);
        tracing::info!(
            model = self.client.name(),
            turns = turns.len(),
            files = files.len(),
            "dispatching prompt"
        );
        self.client.generate(&turns).await
    }
}
