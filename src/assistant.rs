use crate::event::AppEvent;
use crate::model::{ChatTurn, PromptDispatcher};
use crate::workspace::WorkspacePath;
use std::sync::mpsc;
use tokio::runtime::Handle;

/// Runs prompt dispatches on the tokio runtime and reports back to the UI
/// thread over a channel. The workspace never leaves the UI thread; only the
/// file list snapshot travels with the request.
#[derive(Clone)]
pub struct AssistantClient {
    dispatcher: PromptDispatcher,
    tx: mpsc::Sender<AppEvent>,
    runtime_handle: Handle,
}

impl AssistantClient {
    pub fn new(
        dispatcher: PromptDispatcher,
        tx: mpsc::Sender<AppEvent>,
        runtime_handle: Handle,
    ) -> Self {
        Self {
            dispatcher,
            tx,
            runtime_handle,
        }
    }

    pub fn model_name(&self) -> &str {
        self.dispatcher.model_name()
    }

    pub fn send(&self, history: Vec<ChatTurn>, files: Vec<WorkspacePath>) {
        let dispatcher = self.dispatcher.clone();
        let tx = self.tx.clone();

        self.runtime_handle.spawn(async move {
            let event = match dispatcher.dispatch(&history, &files).await {
                Ok(raw) => AppEvent::ModelReplied(raw),
                Err(err) => {
                    tracing::error!(error = %err, "model request failed");
                    AppEvent::UpstreamFailed(err)
                }
            };
            let _ = tx.send(event);
        });
    }
}
