use super::*;
use client_core::{DownloadedDocument, StepOutcome};
use crossbeam_channel::bounded;
use shared::domain::ResearchQuestion;

struct Harness {
    app: ReviewApp,
    cmd_rx: Receiver<BackendCommand>,
}

fn harness(settings: Option<PersistedSettings>) -> Harness {
    let (cmd_tx, cmd_rx) = bounded(16);
    let (_ui_tx, ui_rx) = bounded(16);
    let app = ReviewApp::new(cmd_tx, ui_rx, "http://127.0.0.1:5000".to_string(), settings);
    Harness { app, cmd_rx }
}

fn toast_titles(app: &ReviewApp) -> Vec<String> {
    app.toasts
        .iter()
        .map(|toast| toast.notification.title.clone())
        .collect()
}

#[test]
fn startup_applies_settings_and_checks_server() {
    let Harness { app, cmd_rx } = harness(Some(PersistedSettings {
        model: "deepseek-chat".to_string(),
        num_questions: 50,
        paper_limit: 0,
        save_dir: Some(PathBuf::from("/tmp/reviews")),
    }));

    assert_eq!(app.session.model, "deepseek-chat");
    assert_eq!(app.session.num_questions, MAX_QUESTIONS);
    assert_eq!(app.session.paper_limit, 1);
    assert_eq!(app.save_dir, Some(PathBuf::from("/tmp/reviews")));
    assert!(matches!(cmd_rx.try_recv(), Ok(BackendCommand::CheckHealth)));
}

#[test]
fn missing_settings_fields_fall_back_to_defaults() {
    let settings: PersistedSettings =
        serde_json::from_str(r#"{"model":"gpt-4.1"}"#).expect("settings");
    assert_eq!(settings.model, "gpt-4.1");
    assert_eq!(settings.num_questions, DEFAULT_NUM_QUESTIONS);
    assert_eq!(settings.paper_limit, DEFAULT_PAPER_LIMIT);
    assert_eq!(settings.save_dir, None);
}

#[test]
fn generated_questions_fill_the_editable_draft() {
    let Harness { mut app, cmd_rx } = harness(None);
    let _ = cmd_rx.try_recv();

    app.pending_step = Some(Step::GenerateQuestions);
    app.run_pending_step();
    assert!(app.session.is_busy());
    assert!(matches!(cmd_rx.try_recv(), Ok(BackendCommand::Execute(_))));

    app.apply_event(UiEvent::StepFinished {
        step: Step::GenerateQuestions,
        result: Ok(StepOutcome::Questions(vec![
            ResearchQuestion::new("Q1?", "P1"),
            ResearchQuestion::new("Q2?", "P2"),
        ])),
    });
    app.collect_notifications();

    assert!(!app.session.is_busy());
    assert_eq!(app.questions_draft, "Question 1: Q1?\nQuestion 2: Q2?");
    assert_eq!(toast_titles(&app), vec!["Research Questions Generated"]);
    assert_eq!(app.status, "Generate research questions: done");
}

#[test]
fn failed_step_shows_hint_and_error_toast() {
    let Harness {
        mut app,
        cmd_rx: _cmd_rx,
    } = harness(None);
    app.pending_step = Some(Step::GenerateQuestions);
    app.run_pending_step();

    app.apply_event(UiEvent::StepFinished {
        step: Step::GenerateQuestions,
        result: Err("request failed: connection refused".to_string()),
    });
    app.collect_notifications();

    assert!(!app.session.is_busy());
    assert!(app.status.starts_with("Server unreachable"));
    let toast = app.toasts.last().expect("toast");
    assert_eq!(toast.notification.level, NotificationLevel::Error);
    assert_eq!(
        toast.notification.detail.as_deref(),
        Some("request failed: connection refused")
    );
}

#[test]
fn gated_step_warns_without_queueing() {
    let Harness { mut app, cmd_rx } = harness(None);
    let _ = cmd_rx.try_recv();

    app.pending_step = Some(Step::GenerateSearchString);
    app.run_pending_step();

    assert!(cmd_rx.try_recv().is_err());
    assert_eq!(app.status, "Please generate research questions first.");
    assert_eq!(
        toast_titles(&app),
        vec!["Please generate research questions first."]
    );
}

#[test]
fn toasts_keep_only_the_most_recent() {
    let Harness {
        mut app,
        cmd_rx: _cmd_rx,
    } = harness(None);
    for _ in 0..(MAX_TOASTS + 3) {
        app.pending_step = Some(Step::FilterPapers);
        app.run_pending_step();
    }
    assert_eq!(app.toasts.len(), MAX_TOASTS);
}

#[test]
fn composed_document_requests_a_save_dialog() {
    let Harness {
        mut app,
        cmd_rx: _cmd_rx,
    } = harness(None);
    app.pending_step = Some(Step::ComposeDocument);
    app.run_pending_step();

    app.apply_event(UiEvent::StepFinished {
        step: Step::ComposeDocument,
        result: Ok(StepOutcome::Document(DownloadedDocument {
            filename: "paper_summary.tex".to_string(),
            bytes: b"\\documentclass{article}".to_vec(),
        })),
    });

    assert!(app.pending_save);
    assert!(app.session.document().is_some());
}

#[test]
fn saved_document_updates_directory_and_status() {
    let Harness {
        mut app,
        cmd_rx: _cmd_rx,
    } = harness(None);
    let path = PathBuf::from("/tmp/reviews/paper_summary.tex");

    app.apply_event(UiEvent::DocumentSaved(path.clone()));

    assert_eq!(app.save_dir, Some(PathBuf::from("/tmp/reviews")));
    assert_eq!(app.last_saved, Some(path));
    assert_eq!(app.status, "Saved /tmp/reviews/paper_summary.tex");

    let settings = PersistedSettings::from_runtime(&app.session, app.save_dir.clone());
    assert_eq!(settings.save_dir, Some(PathBuf::from("/tmp/reviews")));
}

#[test]
fn server_reachability_updates_header_state() {
    let Harness {
        mut app,
        cmd_rx: _cmd_rx,
    } = harness(None);
    app.apply_event(UiEvent::ServerReachable(false));
    assert_eq!(app.server_reachable, Some(false));
    assert_eq!(app.status, "Server at http://127.0.0.1:5000 is not reachable");
}

#[test]
fn generated_abstract_fills_the_editable_draft() {
    let Harness { mut app, cmd_rx } = harness(None);
    let _ = cmd_rx.try_recv();

    app.pending_step = Some(Step::GenerateAbstract);
    app.run_pending_step();
    assert!(matches!(
        cmd_rx.try_recv(),
        Ok(BackendCommand::Execute(client_core::StepRequest::GenerateAbstract(_)))
    ));

    app.apply_event(UiEvent::StepFinished {
        step: Step::GenerateAbstract,
        result: Ok(StepOutcome::Abstract("Generated abstract.".to_string())),
    });

    assert_eq!(app.abstract_draft, "Generated abstract.");
    assert!(app.introduction_draft.is_empty());
    assert!(app.session.visible_sections().contains(&Section::Abstract));
}

#[test]
fn outcome_for_a_step_not_in_flight_changes_nothing() {
    let Harness {
        mut app,
        cmd_rx: _cmd_rx,
    } = harness(None);
    let status = app.status.clone();

    app.apply_event(UiEvent::StepFinished {
        step: Step::GenerateConclusion,
        result: Ok(StepOutcome::Conclusion("Late.".to_string())),
    });
    app.collect_notifications();

    assert_eq!(app.status, status);
    assert!(app.conclusion_draft.is_empty());
    assert_eq!(app.session.conclusion(), "");
    assert!(app.toasts.is_empty());
}
