mod app;
mod assistant;
mod config;
mod event;
mod interpreter;
mod logging;
mod model;
mod preview;
mod session;
mod theme;
mod workspace;

use app::WebforgeApp;
use assistant::AssistantClient;
use config::AppConfig;
use eframe::egui;
use model::{GeminiClient, PromptDispatcher};
use std::sync::{mpsc, Arc};
use workspace::WorkspaceStore;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut logging = logging::init();
    let log_rx = logging.as_mut().and_then(|guard| guard.take_log_rx());
    let log_dir = logging.as_ref().map(|guard| guard.log_dir().to_path_buf());

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "configuration error");
            eprintln!("webforge: {err}");
            drop(logging);
            std::process::exit(1);
        }
    };

    let store = match WorkspaceStore::open(&config.workspace_dir) {
        Ok((store, warnings)) => {
            for warning in &warnings {
                tracing::warn!(warning = %warning, "workspace load");
            }
            tracing::info!(
                root = %config.workspace_dir.display(),
                files = store.len(),
                model = %config.model,
                "workspace opened"
            );
            store
        }
        Err(err) => {
            tracing::error!(error = %err, "workspace directory unavailable, keeping files in memory");
            WorkspaceStore::in_memory()
        }
    };

    let (tx, rx) = mpsc::channel();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("webforge-runtime")
        .build()?;

    let gemini = GeminiClient::new(
        config.endpoint.as_str(),
        config.model.as_str(),
        config.api_key.as_str(),
        config.request_timeout,
    )?;
    let dispatcher = PromptDispatcher::new(Arc::new(gemini));
    let assistant = AssistantClient::new(dispatcher, tx, runtime.handle().clone());

    let app = WebforgeApp::new(rx, log_rx, assistant, store, log_dir);
    let _runtime = runtime;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1440.0, 880.0])
            .with_min_inner_size([1024.0, 640.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Webforge",
        native_options,
        Box::new(move |_creation_context| Ok(Box::new(app))),
    )?;

    drop(logging);
    Ok(())
}
