use crate::model::ModelError;

/// Results sent from the runtime back to the UI thread.
#[derive(Debug)]
pub enum AppEvent {
    ModelReplied(String),
    UpstreamFailed(ModelError),
}
