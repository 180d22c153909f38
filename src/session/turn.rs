use crate::interpreter::{
    apply_reply, parse_response, AppliedChange, ApplyReport, AssistantReply, FileOperation,
};
use crate::workspace::WorkspaceStore;

/// Everything one model reply did to the workspace.
#[derive(Debug)]
pub struct TurnRecord {
    pub plain_text: bool,
    pub reply: AssistantReply,
    pub report: ApplyReport,
}

impl TurnRecord {
    /// Interprets `raw` and applies it to `store`.
    pub fn interpret(raw: &str, store: &mut WorkspaceStore) -> Self {
        let outcome = parse_response(raw);
        let plain_text = outcome.is_plain_text();
        let reply = outcome.into_reply();
        let report = apply_reply(&reply, store);

        tracing::info!(
            plain_text,
            operations = reply.operations.len(),
            applied = report.applied(),
            failed = report.failed(),
            rejected = reply.rejected.len(),
            "turn interpreted"
        );

        Self {
            plain_text,
            reply,
            report,
        }
    }

    /// Chat text for the assistant turn: one line per change, then the
    /// explanation.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for outcome in &self.report.outcomes {
            let path = &outcome.path;
            match &outcome.result {
                Ok(AppliedChange::AlreadyAbsent) => {
                    lines.push(format!("Delete: {path} (already absent)"))
                }
                Ok(_) => lines.push(format!("{}: {path}", verb(&outcome.operation))),
                Err(err) => lines.push(format!(
                    "Failed {} {path}: {err}",
                    outcome.operation.action()
                )),
            }
        }
        for entry in &self.reply.rejected {
            lines.push(format!("Skipped entry #{}: {}", entry.index, entry.reason));
        }

        let explanation = self.reply.explanation.trim();
        if !explanation.is_empty() {
            if !lines.is_empty() {
                lines.push(String::new());
            }
            lines.push(explanation.to_string());
        }

        if lines.is_empty() {
            "(No action)".to_string()
        } else {
            lines.join("\n")
        }
    }
}

fn verb(operation: &FileOperation) -> &'static str {
    match operation {
        FileOperation::Create { .. } => "Create",
        FileOperation::Update { .. } => "Update",
        FileOperation::Delete { .. } => "Delete",
    }
}
