use crate::assistant::AssistantClient;
use crate::event::AppEvent;
use crate::model::Role;
use crate::preview::{render_preview, PreviewDocument};
use crate::session::{Transcript, TurnRecord};
use crate::theme::Theme;
use crate::workspace::{WorkspacePath, WorkspaceStore};
use eframe::egui::{self, RichText, ScrollArea};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};

const MAX_DIAGNOSTIC_LINES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileTab {
    Editor,
    Preview,
}

pub struct WebforgeApp {
    rx: Receiver<AppEvent>,
    log_rx: Option<Receiver<String>>,
    assistant: AssistantClient,
    store: WorkspaceStore,
    transcript: Transcript,
    theme: Theme,
    input_buffer: String,
    awaiting_reply: bool,
    selected: Option<WorkspacePath>,
    editor_buffer: String,
    preview: Option<Result<PreviewDocument, String>>,
    file_tab: FileTab,
    status_line: Option<(String, bool)>,
    diagnostics_log: Vec<String>,
    log_dir: Option<PathBuf>,
    scroll_to_bottom: bool,
    visuals_applied: bool,
}

impl WebforgeApp {
    pub fn new(
        rx: Receiver<AppEvent>,
        log_rx: Option<Receiver<String>>,
        assistant: AssistantClient,
        store: WorkspaceStore,
        log_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            rx,
            log_rx,
            assistant,
            store,
            transcript: Transcript::default(),
            theme: Theme::default(),
            input_buffer: String::new(),
            awaiting_reply: false,
            selected: None,
            editor_buffer: String::new(),
            preview: None,
            file_tab: FileTab::Editor,
            status_line: None,
            diagnostics_log: Vec::new(),
            log_dir,
            scroll_to_bottom: false,
            visuals_applied: false,
        }
    }

    fn set_status(&mut self, message: impl Into<String>, is_error: bool) {
        self.status_line = Some((message.into(), is_error));
    }

    fn submit_prompt(&mut self, ctx: &egui::Context) {
        let prompt = self.input_buffer.trim().to_string();
        if prompt.is_empty() || self.awaiting_reply {
            return;
        }

        self.transcript.push_user(&prompt);
        self.assistant
            .send(self.transcript.history().to_vec(), self.store.list());
        self.awaiting_reply = true;
        self.input_buffer.clear();
        self.scroll_to_bottom = true;
        ctx.request_repaint();
    }

    fn drain_events(&mut self, ctx: &egui::Context) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply_event(event, ctx),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.awaiting_reply {
                        self.awaiting_reply = false;
                        self.transcript.push_error("assistant channel disconnected");
                    }
                    break;
                }
            }
        }

        if let Some(log_rx) = &self.log_rx {
            self.diagnostics_log.extend(log_rx.try_iter());
            let overflow = self.diagnostics_log.len().saturating_sub(MAX_DIAGNOSTIC_LINES);
            if overflow > 0 {
                self.diagnostics_log.drain(..overflow);
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent, ctx: &egui::Context) {
        match event {
            AppEvent::ModelReplied(raw) => {
                let record = TurnRecord::interpret(&raw, &mut self.store);
                self.transcript.push_reply(&raw, &record);
                if !record.plain_text {
                    self.after_workspace_change(|path| record.report.touched(path));
                }
            }
            AppEvent::UpstreamFailed(err) => {
                self.transcript.push_error(err.to_string());
            }
        }
        self.awaiting_reply = false;
        self.scroll_to_bottom = true;
        ctx.request_repaint();
    }

    /// Reconciles selection, editor and preview with the store after a turn.
    fn after_workspace_change(&mut self, touched: impl Fn(&str) -> bool) {
        let Some(selected) = self.selected.clone() else {
            return;
        };

        if !self.store.contains(selected.as_str()) {
            self.selected = None;
            self.editor_buffer.clear();
            self.preview = None;
            self.set_status(format!("{selected} was deleted"), false);
            return;
        }

        if touched(selected.as_str()) {
            self.reload_editor();
        }
        self.refresh_preview();
    }

    fn select_file(&mut self, path: WorkspacePath) {
        self.selected = Some(path);
        self.status_line = None;
        self.reload_editor();
        self.refresh_preview();
    }

    fn reload_editor(&mut self) {
        let Some(selected) = &self.selected else {
            return;
        };
        match self.store.read(selected.as_str()) {
            Ok(content) => self.editor_buffer = content.to_string(),
            Err(err) => {
                self.editor_buffer.clear();
                self.set_status(err.to_string(), true);
            }
        }
    }

    fn refresh_preview(&mut self) {
        self.preview = self.selected.as_ref().map(|selected| {
            render_preview(&self.store, selected.as_str()).map_err(|err| err.to_string())
        });
    }

    fn save_manual_changes(&mut self) {
        let Some(selected) = self.selected.clone() else {
            return;
        };
        match self.store.write(selected.as_str(), &self.editor_buffer) {
            Ok(_) => {
                tracing::info!(path = %selected, "manual changes saved");
                self.set_status(format!("Saved {selected}"), false);
                self.refresh_preview();
            }
            Err(err) => {
                tracing::warn!(path = %selected, error = %err, "manual save failed");
                self.set_status(format!("Failed to save {selected}: {err}"), true);
            }
        }
    }

    fn open_preview_in_browser(&mut self) {
        let Some(Ok(preview)) = &self.preview else {
            return;
        };
        let dir = std::env::temp_dir().join("webforge").join("preview");
        let result = preview
            .write_to(&dir)
            .map_err(|err| err.to_string())
            .and_then(|path| opener::open(&path).map(|_| path).map_err(|err| err.to_string()));
        match result {
            Ok(path) => self.set_status(format!("Opened {}", path.display()), false),
            Err(err) => {
                tracing::warn!(error = %err, "failed to open preview");
                self.set_status(format!("Could not open preview: {err}"), true);
            }
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("Webforge");
                ui.separator();
                ui.label(
                    RichText::new(format!("Model: {}", self.assistant.model_name()))
                        .color(self.theme.text_muted),
                );
                ui.separator();
                if self.awaiting_reply {
                    ui.spinner();
                    ui.label(RichText::new("Waiting for model...").color(self.theme.warning));
                } else {
                    ui.label(RichText::new("Ready").color(self.theme.success));
                }
            });
        });
    }

    fn render_left_panel(&mut self, ctx: &egui::Context) {
        let mut clicked: Option<WorkspacePath> = None;
        egui::SidePanel::left("workspace_panel")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| {
                ui.heading("Workspace");
                let root = self
                    .store
                    .root()
                    .map(|root| root.display().to_string())
                    .unwrap_or_else(|| "(in memory)".to_string());
                ui.label(RichText::new(root).color(self.theme.text_muted).small());
                ui.separator();

                if self.store.is_empty() {
                    ui.label("Workspace is empty");
                }
                let files = self.store.list();
                ScrollArea::vertical()
                    .id_salt("workspace_files")
                    .show(ui, |ui| {
                        for path in files {
                            let is_selected = self.selected.as_ref() == Some(&path);
                            let label = format!("{}  [{}]", path, path.kind().language());
                            if ui.selectable_label(is_selected, label).clicked() && !is_selected {
                                clicked = Some(path);
                            }
                        }
                    });

                if let Some(log_dir) = &self.log_dir {
                    ui.separator();
                    ui.label(
                        RichText::new(format!("Logs: {}", log_dir.display()))
                            .color(self.theme.text_muted)
                            .small(),
                    );
                }
            });

        if let Some(path) = clicked {
            self.select_file(path);
        }
    }

    fn render_file_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("file_panel")
            .resizable(true)
            .default_width(560.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.selectable_value(&mut self.file_tab, FileTab::Editor, "Editor");
                    ui.selectable_value(&mut self.file_tab, FileTab::Preview, "Preview");
                });
                ui.separator();

                if let Some((message, is_error)) = &self.status_line {
                    let color = if *is_error {
                        self.theme.danger
                    } else {
                        self.theme.text_muted
                    };
                    ui.label(RichText::new(message).color(color));
                }

                let Some(selected) = self.selected.clone() else {
                    ui.label("Select a file from the workspace.");
                    return;
                };

                match self.file_tab {
                    FileTab::Editor => self.render_editor(ui, &selected),
                    FileTab::Preview => self.render_preview_tab(ui, &selected),
                }
            });
    }

    fn render_editor(&mut self, ui: &mut egui::Ui, selected: &WorkspacePath) {
        ui.label(
            RichText::new(format!("Editing {selected} ({})", selected.kind().language()))
                .color(self.theme.text_muted),
        );

        let dirty = self
            .store
            .read(selected.as_str())
            .map(|saved| saved != self.editor_buffer)
            .unwrap_or(true);
        let save_clicked = ui
            .add_enabled(dirty, egui::Button::new("Save manual changes"))
            .clicked();

        ScrollArea::vertical()
            .id_salt("file_editor")
            .show(ui, |ui| {
                ui.add(
                    egui::TextEdit::multiline(&mut self.editor_buffer)
                        .code_editor()
                        .desired_width(f32::INFINITY)
                        .desired_rows(30),
                );
            });

        if save_clicked {
            self.save_manual_changes();
        }
    }

    fn render_preview_tab(&mut self, ui: &mut egui::Ui, selected: &WorkspacePath) {
        if !selected.kind().is_previewable() {
            ui.label(format!(
                "Preview is available for HTML files only. Selected: {selected}"
            ));
            return;
        }

        let mut open_clicked = false;
        match &self.preview {
            None => {
                ui.label("No preview rendered.");
            }
            Some(Err(err)) => {
                ui.label(RichText::new(format!("Preview failed: {err}")).color(self.theme.danger));
            }
            Some(Ok(preview)) => {
                ui.label(RichText::new(preview.summary()).color(self.theme.text_muted));
                ui.horizontal(|ui| {
                    open_clicked = ui.button("Open in browser").clicked();
                    if ui.button("Copy data URI").clicked() {
                        ui.ctx().copy_text(preview.data_uri());
                    }
                });
                ui.add_space(self.theme.spacing_4);
                self.theme.card_frame().show(ui, |ui| {
                    ScrollArea::vertical()
                        .id_salt("preview_markup")
                        .show(ui, |ui| {
                            ui.label(RichText::new(preview.html.as_str()).monospace());
                        });
                });
            }
        }

        if open_clicked {
            self.open_preview_in_browser();
        }
    }

    fn render_center_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Chat");
            ui.separator();

            let transcript_height = (ui.available_height() - 170.0).max(120.0);
            ScrollArea::vertical()
                .id_salt("chat_transcript")
                .max_height(transcript_height)
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    if self.transcript.messages().is_empty() {
                        ui.label(
                            RichText::new("Ask for a page, e.g. \"Create index.html with a title\"")
                                .color(self.theme.text_muted),
                        );
                    }

                    for message in self.transcript.messages() {
                        let from_user = message.role == Role::User;
                        self.theme.message_frame(from_user).show(ui, |ui| {
                            let speaker = if from_user { "You" } else { "Assistant" };
                            ui.label(RichText::new(speaker).color(self.theme.text_muted).small());
                            let text = RichText::new(message.content.as_str());
                            if message.is_error {
                                ui.label(text.color(self.theme.danger));
                            } else {
                                ui.label(text);
                            }
                        });
                        ui.add_space(self.theme.spacing_4);
                    }

                    if self.scroll_to_bottom {
                        ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                    }
                });
            self.scroll_to_bottom = false;

            ui.separator();
            egui::CollapsingHeader::new("Diagnostics")
                .default_open(false)
                .show(ui, |ui| {
                    ScrollArea::vertical()
                        .id_salt("diagnostics_log")
                        .max_height(90.0)
                        .stick_to_bottom(true)
                        .show(ui, |ui| {
                            for entry in &self.diagnostics_log {
                                ui.label(RichText::new(entry).small().monospace());
                            }
                        });
                });

            ui.separator();
            let input_enabled = !self.awaiting_reply;
            let hint = if self.awaiting_reply {
                "Waiting for response..."
            } else {
                "e.g. Create index.html with a title"
            };

            let mut send_now = false;
            ui.horizontal(|ui| {
                let response = ui.add_enabled(
                    input_enabled,
                    egui::TextEdit::singleline(&mut self.input_buffer)
                        .desired_width(ui.available_width() - 70.0)
                        .hint_text(hint),
                );
                if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    send_now = true;
                }

                let clicked = ui
                    .add_enabled(
                        input_enabled && !self.input_buffer.trim().is_empty(),
                        egui::Button::new("Send"),
                    )
                    .clicked();
                send_now |= clicked;
            });

            if send_now && input_enabled {
                self.submit_prompt(ctx);
            }
        });
    }
}

impl eframe::App for WebforgeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.visuals_applied {
            self.theme.apply_visuals(ctx);
            self.visuals_applied = true;
        }
        self.drain_events(ctx);
        self.render_top_bar(ctx);
        self.render_left_panel(ctx);
        self.render_file_panel(ctx);
        self.render_center_panel(ctx);

        if self.awaiting_reply {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}
