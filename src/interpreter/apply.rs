use crate::interpreter::reply::{AssistantReply, FileOperation};
use crate::workspace::store::{StoreError, WorkspaceStore, WriteKind};
use crate::workspace::WorkspacePath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppliedChange {
    Created,
    Replaced,
    Deleted,
    AlreadyAbsent,
}

#[derive(Debug)]
pub struct OperationOutcome {
    pub operation: FileOperation,
    /// Store key the operation resolved to; the raw path when it is invalid.
    pub path: String,
    pub result: Result<AppliedChange, StoreError>,
}

impl OperationOutcome {
    pub fn is_applied(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Default)]
pub struct ApplyReport {
    pub outcomes: Vec<OperationOutcome>,
}

impl ApplyReport {
    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_applied()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.applied()
    }

    pub fn touched(&self, path: &str) -> bool {
        let key = store_key(path);
        self.outcomes
            .iter()
            .any(|outcome| outcome.is_applied() && outcome.path == key)
    }
}

/// Applies the reply's operations to `store` in order.
///
/// There is no rollback: a failed operation is recorded in the report and the
/// remaining operations still run.
pub fn apply_reply(reply: &AssistantReply, store: &mut WorkspaceStore) -> ApplyReport {
    let mut report = ApplyReport::default();

    for operation in &reply.operations {
        let result = apply_operation(operation, store);
        match &result {
            Ok(change) => tracing::info!(
                action = operation.action(),
                path = operation.path(),
                change = ?change,
                "operation applied"
            ),
            Err(err) => tracing::warn!(
                action = operation.action(),
                path = operation.path(),
                error = %err,
                "operation failed"
            ),
        }
        report.outcomes.push(OperationOutcome {
            path: store_key(operation.path()),
            operation: operation.clone(),
            result,
        });
    }

    for entry in &reply.rejected {
        tracing::warn!(index = entry.index, reason = %entry.reason, "operation entry rejected");
    }

    report
}

fn store_key(path: &str) -> String {
    WorkspacePath::parse(path)
        .map(String::from)
        .unwrap_or_else(|_| path.to_string())
}

fn apply_operation(
    operation: &FileOperation,
    store: &mut WorkspaceStore,
) -> Result<AppliedChange, StoreError> {
    match operation {
        FileOperation::Create { path, content } | FileOperation::Update { path, content } => {
            Ok(match store.write(path, content)? {
                WriteKind::Created => AppliedChange::Created,
                WriteKind::Replaced => AppliedChange::Replaced,
            })
        }
        FileOperation::Delete { path } => Ok(if store.delete(path)? {
            AppliedChange::Deleted
        } else {
            AppliedChange::AlreadyAbsent
        }),
    }
}
