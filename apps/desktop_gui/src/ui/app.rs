use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use chrono::{Datelike, Local};
use client_core::{
    workflow::{DEFAULT_NUM_QUESTIONS, DEFAULT_PAPER_LIMIT},
    Notification, NotificationLevel, ReviewSession, Section, Step,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{is_present, model_label, PaperSource, DEFAULT_MODEL, KNOWN_MODELS},
    protocol::{MAX_PAPER_LIMIT, MAX_QUESTIONS, MIN_START_YEAR},
};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};
use crate::controller::orchestration::{dispatch_backend_command, start_step};

pub const SETTINGS_STORAGE_KEY: &str = "litreview_gui.settings";

const MAX_TOASTS: usize = 6;
const TOAST_TTL: Duration = Duration::from_secs(8);

/// Form values remembered between launches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedSettings {
    pub model: String,
    pub num_questions: u32,
    pub paper_limit: u32,
    pub save_dir: Option<PathBuf>,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            num_questions: DEFAULT_NUM_QUESTIONS,
            paper_limit: DEFAULT_PAPER_LIMIT,
            save_dir: None,
        }
    }
}

impl PersistedSettings {
    fn apply(&self, session: &mut ReviewSession) {
        if !self.model.trim().is_empty() {
            session.model = self.model.clone();
        }
        session.num_questions = self.num_questions.clamp(1, MAX_QUESTIONS);
        session.paper_limit = self.paper_limit.clamp(1, MAX_PAPER_LIMIT);
    }

    fn from_runtime(session: &ReviewSession, save_dir: Option<PathBuf>) -> Self {
        Self {
            model: session.model.clone(),
            num_questions: session.num_questions,
            paper_limit: session.paper_limit,
            save_dir,
        }
    }
}

struct Toast {
    notification: Notification,
    stamp: String,
    shown_at: Instant,
}

pub struct ReviewApp {
    session: ReviewSession,
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    server_url: String,
    server_reachable: Option<bool>,
    status: String,
    toasts: Vec<Toast>,
    questions_draft: String,
    search_draft: String,
    abstract_draft: String,
    introduction_draft: String,
    conclusion_draft: String,
    save_dir: Option<PathBuf>,
    last_saved: Option<PathBuf>,
    pending_step: Option<Step>,
    pending_save: bool,
}

impl ReviewApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        server_url: String,
        settings: Option<PersistedSettings>,
    ) -> Self {
        let settings = settings.unwrap_or_default();
        let mut session = ReviewSession::new();
        settings.apply(&mut session);

        let mut app = Self {
            session,
            cmd_tx,
            ui_rx,
            server_url,
            server_reachable: None,
            status: String::new(),
            toasts: Vec::new(),
            questions_draft: String::new(),
            search_draft: String::new(),
            abstract_draft: String::new(),
            introduction_draft: String::new(),
            conclusion_draft: String::new(),
            save_dir: settings.save_dir,
            last_saved: None,
            pending_step: None,
            pending_save: false,
        };
        app.check_server();
        app
    }

    fn check_server(&mut self) {
        dispatch_backend_command(&self.cmd_tx, BackendCommand::CheckHealth, &mut self.status);
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            self.apply_event(event);
        }
        self.collect_notifications();
    }

    fn apply_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Info(message) => self.status = message,
            UiEvent::ServerReachable(reachable) => {
                self.server_reachable = Some(reachable);
                self.status = if reachable {
                    format!("Connected to {}", self.server_url)
                } else {
                    format!("Server at {} is not reachable", self.server_url)
                };
            }
            UiEvent::StepFinished { step, result } => match result {
                Ok(outcome) => {
                    let is_document = matches!(outcome, client_core::StepOutcome::Document(_));
                    if !self.session.complete(outcome) {
                        return;
                    }
                    self.sync_drafts(step);
                    self.status = format!("{}: done", step.label());
                    self.pending_save |= is_document;
                }
                Err(message) => {
                    let error = UiError::from_message(UiErrorContext::Step, message.clone());
                    tracing::warn!(
                        step = step.label(),
                        category = ?error.category(),
                        "step failed: {message}"
                    );
                    self.status = error.hint();
                    self.session.fail(step, message);
                }
            },
            UiEvent::DocumentSaved(path) => {
                self.status = format!("Saved {}", path.display());
                self.save_dir = path.parent().map(PathBuf::from);
                self.last_saved = Some(path);
            }
            UiEvent::Error(error) => {
                tracing::warn!(context = ?error.context(), "{}", error.message());
                self.status = error.hint();
            }
        }
    }

    fn sync_drafts(&mut self, step: Step) {
        match step {
            Step::GenerateQuestions => self.questions_draft = self.session.questions_text(),
            Step::GenerateSearchString => {
                self.search_draft = self.session.search_string().to_string()
            }
            Step::GenerateAbstract => {
                self.abstract_draft = self.session.abstract_summary().to_string()
            }
            Step::GenerateIntroduction => {
                self.introduction_draft = self.session.introduction().to_string()
            }
            Step::GenerateConclusion => {
                self.conclusion_draft = self.session.conclusion().to_string()
            }
            _ => {}
        }
    }

    fn collect_notifications(&mut self) {
        let stamp = Local::now().format("%H:%M:%S").to_string();
        for notification in self.session.drain_notifications() {
            self.toasts.push(Toast {
                notification,
                stamp: stamp.clone(),
                shown_at: Instant::now(),
            });
        }
        if self.toasts.len() > MAX_TOASTS {
            let excess = self.toasts.len() - MAX_TOASTS;
            self.toasts.drain(..excess);
        }
    }

    fn run_pending_step(&mut self) {
        if let Some(step) = self.pending_step.take() {
            start_step(&mut self.session, step, &self.cmd_tx, &mut self.status);
            self.collect_notifications();
        }
    }

    fn prompt_save(&mut self) {
        let Some(document) = self.session.document() else {
            return;
        };
        let mut dialog = rfd::FileDialog::new()
            .set_file_name(document.filename.as_str())
            .add_filter("LaTeX", &["tex"]);
        if let Some(dir) = self.save_dir.clone().or_else(dirs::document_dir) {
            dialog = dialog.set_directory(dir);
        }
        match dialog.save_file() {
            Some(path) => {
                let cmd = BackendCommand::SaveDocument {
                    path,
                    bytes: document.bytes.clone(),
                };
                dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status);
            }
            None => self.status = "Save cancelled".to_string(),
        }
    }

    fn show_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Systematic Literature Review");
                ui.separator();
                let (color, text) = match self.server_reachable {
                    Some(true) => (egui::Color32::GREEN, "online"),
                    Some(false) => (egui::Color32::RED, "offline"),
                    None => (egui::Color32::GRAY, "checking"),
                };
                ui.label(self.server_url.as_str());
                ui.colored_label(color, text);
                if ui.small_button("Check").clicked() {
                    self.server_reachable = None;
                    self.check_server();
                }
            });
        });
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            for toast in &self.toasts {
                let color = match toast.notification.level {
                    NotificationLevel::Info => egui::Color32::LIGHT_BLUE,
                    NotificationLevel::Success => egui::Color32::GREEN,
                    NotificationLevel::Warning => egui::Color32::YELLOW,
                    NotificationLevel::Error => egui::Color32::RED,
                };
                ui.horizontal_wrapped(|ui| {
                    ui.weak(toast.stamp.as_str());
                    ui.colored_label(color, toast.notification.title.as_str());
                    if let Some(detail) = &toast.notification.detail {
                        ui.label(detail.as_str());
                    }
                });
            }
            ui.separator();
            ui.label(self.status.as_str());
        });
    }

    fn show_sections(&mut self, ctx: &egui::Context) {
        let sections = self.session.visible_sections();
        let last_summary = sections
            .iter()
            .rev()
            .find(|section| {
                matches!(
                    section,
                    Section::Abstract | Section::Introduction | Section::Conclusion
                )
            })
            .copied();
        let busy = self.session.is_busy();

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui.add_enabled_ui(!busy, |ui| {
                        for section in sections {
                            match section {
                                Section::Objective => self.objective_section(ui),
                                Section::Questions => self.questions_section(ui),
                                Section::SearchString => self.search_string_section(ui),
                                Section::Papers => self.papers_section(ui),
                                Section::SelectedPapers => self.selected_section(ui),
                                Section::Answers => self.answers_section(ui),
                                Section::Abstract
                                | Section::Introduction
                                | Section::Conclusion => self.summary_section(ui, section),
                                Section::Document => self.document_section(ui),
                            }
                            if Some(section) == last_summary {
                                self.step_button(ui, Step::ComposeDocument);
                            }
                            ui.add_space(8.0);
                        }
                    });
                });
        });
    }

    fn step_button(&mut self, ui: &mut egui::Ui, step: Step) {
        if ui.button(step.label()).clicked() {
            self.pending_step = Some(step);
        }
    }

    fn objective_section(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.heading("Research Objective");
            ui.add(
                egui::TextEdit::multiline(&mut self.session.objective)
                    .desired_rows(3)
                    .desired_width(f32::INFINITY),
            );
            let current_year = Local::now().year();
            egui::Grid::new("parameters").num_columns(2).show(ui, |ui| {
                ui.label("Number of questions");
                ui.add(
                    egui::DragValue::new(&mut self.session.num_questions).range(1..=MAX_QUESTIONS),
                );
                ui.end_row();

                ui.label("Model");
                egui::ComboBox::from_id_salt("model")
                    .selected_text(model_label(&self.session.model).to_string())
                    .show_ui(ui, |ui| {
                        for option in KNOWN_MODELS {
                            ui.selectable_value(
                                &mut self.session.model,
                                option.value.to_string(),
                                option.label,
                            );
                        }
                    });
                ui.end_row();

                ui.label("Start year");
                ui.add(
                    egui::DragValue::new(&mut self.session.start_year)
                        .range(MIN_START_YEAR..=current_year),
                );
                ui.end_row();

                ui.label("Papers per search");
                ui.add(
                    egui::DragValue::new(&mut self.session.paper_limit).range(1..=MAX_PAPER_LIMIT),
                );
                ui.end_row();
            });
            self.step_button(ui, Step::GenerateQuestions);
        });
    }

    fn questions_section(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.heading("Research Questions");
            ui.weak("One question per line.");
            let response = ui.add(
                egui::TextEdit::multiline(&mut self.questions_draft)
                    .desired_rows(4)
                    .desired_width(f32::INFINITY),
            );
            if response.changed() {
                self.session.set_questions_text(&self.questions_draft);
            }
            for (question, n) in self.session.questions().iter().zip(1..) {
                ui.weak(format!("Purpose {n}: {}", question.purpose));
            }
            self.step_button(ui, Step::GenerateSearchString);
        });
    }

    fn search_string_section(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.heading("Search String");
            let response = ui.add(
                egui::TextEdit::multiline(&mut self.search_draft)
                    .desired_rows(2)
                    .desired_width(f32::INFINITY),
            );
            if response.changed() {
                self.session.set_search_string(self.search_draft.clone());
            }
            ui.horizontal(|ui| {
                for source in PaperSource::ALL {
                    self.step_button(ui, Step::SearchPapers(source));
                }
            });
        });
    }

    fn papers_section(&mut self, ui: &mut egui::Ui) {
        let mut toggled = Vec::new();
        ui.group(|ui| {
            ui.heading(format!("Papers ({})", self.session.papers().len()));
            egui::Grid::new("papers")
                .striped(true)
                .num_columns(5)
                .show(ui, |ui| {
                    ui.strong("Use");
                    ui.strong("Title");
                    ui.strong("Authors");
                    ui.strong("Year");
                    ui.strong("Venue");
                    ui.end_row();

                    for (row, paper) in self.session.papers().iter().enumerate() {
                        let mut selected = self.session.is_selected(row);
                        if ui.checkbox(&mut selected, "").changed() {
                            toggled.push(row);
                        }
                        if is_present(&paper.link) {
                            ui.hyperlink_to(paper.title.as_str(), &paper.link);
                        } else {
                            ui.label(paper.title.as_str());
                        }
                        ui.label(paper.creator.as_str());
                        ui.label(paper.year.as_str());
                        ui.label(paper.publication_name.as_str());
                        ui.end_row();
                    }
                });
            ui.horizontal(|ui| {
                self.step_button(ui, Step::FilterPapers);
                self.step_button(ui, Step::GenerateConclusion);
            });
        });
        for row in toggled {
            self.session.toggle_paper(row);
        }
    }

    fn selected_section(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.heading(format!(
                "Selected Papers ({})",
                self.session.selected_papers().len()
            ));
            for paper in self.session.selected_papers() {
                ui.label(format!("- {} ({})", paper.title, paper.year));
            }
            self.step_button(ui, Step::AnswerQuestions);
        });
    }

    fn answers_section(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.heading("Answers");
            for answer in self.session.answers() {
                ui.strong(answer.question.as_str());
                if answer.error {
                    ui.colored_label(egui::Color32::RED, answer.answer.as_str());
                } else {
                    ui.label(answer.answer.as_str());
                }
                ui.add_space(4.0);
            }
            ui.horizontal(|ui| {
                self.step_button(ui, Step::GenerateAbstract);
                self.step_button(ui, Step::GenerateIntroduction);
                self.step_button(ui, Step::GenerateConclusion);
            });
        });
    }

    fn summary_section(&mut self, ui: &mut egui::Ui, section: Section) {
        let (title, draft) = match section {
            Section::Abstract => ("Summary Abstract", &mut self.abstract_draft),
            Section::Introduction => ("Introduction", &mut self.introduction_draft),
            _ => ("Conclusion", &mut self.conclusion_draft),
        };
        let changed = ui
            .group(|ui| {
                ui.heading(title);
                ui.add(
                    egui::TextEdit::multiline(&mut *draft)
                        .desired_rows(6)
                        .desired_width(f32::INFINITY),
                )
                .changed()
            })
            .inner;
        if !changed {
            return;
        }
        let text = draft.clone();
        match section {
            Section::Abstract => self.session.set_abstract_summary(text),
            Section::Introduction => self.session.set_introduction(text),
            _ => self.session.set_conclusion(text),
        }
    }

    fn document_section(&mut self, ui: &mut egui::Ui) {
        let Some(document) = self.session.document() else {
            return;
        };
        let summary = format!("{} ({} bytes)", document.filename, document.bytes.len());
        ui.group(|ui| {
            ui.heading("LaTeX Summary");
            ui.label(summary);
            if let Some(path) = &self.last_saved {
                ui.weak(format!("Last saved to {}", path.display()));
            }
            if ui.button("Save as...").clicked() {
                self.pending_save = true;
            }
        });
    }

    fn show_busy_overlay(&self, ctx: &egui::Context) {
        let Some(step) = self.session.in_flight() else {
            return;
        };
        // Modal dims the window and swallows input until the step finishes.
        egui::Modal::new(egui::Id::new("busy_overlay")).show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(format!("{}...", step.label()));
            });
        });
    }
}


impl eframe::App for ReviewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.toasts.retain(|toast| toast.shown_at.elapsed() < TOAST_TTL);
        if std::mem::take(&mut self.pending_save) {
            self.prompt_save();
        }

        self.show_header(ctx);
        self.show_status_bar(ctx);
        self.show_sections(ctx);
        self.show_busy_overlay(ctx);
        self.run_pending_step();

        if self.session.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(50));
        } else {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedSettings::from_runtime(&self.session, self.save_dir.clone());
        if let Ok(serialized) = serde_json::to_string(&settings) {
            storage.set_string(SETTINGS_STORAGE_KEY, serialized);
        }
    }
}

#[cfg(test)]
#[path = "../tests/app_tests.rs"]
mod tests;
