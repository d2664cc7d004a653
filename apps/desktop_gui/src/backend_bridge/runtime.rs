//! Backend worker: owns the tokio runtime and the review client, and turns
//! queued commands into UI events.

use std::{path::Path, thread};

use anyhow::Context;
use client_core::{ReviewBackend, ReviewClient};
use crossbeam_channel::{Receiver, Sender};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn launch(server_url: String, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        let client = match ReviewClient::new(&server_url) {
            Ok(client) => client,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    err.to_string(),
                )));
                tracing::error!(server_url, "invalid review server url: {err}");
                return;
            }
        };
        tracing::info!(server_url = %client.base_url(), "backend worker ready");

        runtime.block_on(async move {
            while let Ok(cmd) = cmd_rx.recv() {
                let event = handle_command(&client, cmd).await;
                // Step results must reach the UI or it stays busy; block on a full queue.
                if ui_tx.send(event).is_err() {
                    break;
                }
            }
            tracing::info!("ui closed; backend worker exiting");
        });
    });
}

async fn handle_command(backend: &dyn ReviewBackend, cmd: BackendCommand) -> UiEvent {
    match cmd {
        BackendCommand::CheckHealth => UiEvent::ServerReachable(check_health(backend).await),
        BackendCommand::Execute(request) => {
            let step = request.step();
            tracing::info!(step = step.label(), "executing step");
            let result = backend.execute(request).await.map_err(|err| {
                tracing::warn!(step = step.label(), "step failed: {err:#}");
                err.to_string()
            });
            UiEvent::StepFinished { step, result }
        }
        BackendCommand::SaveDocument { path, bytes } => match save_document(&path, &bytes).await {
            Ok(()) => UiEvent::DocumentSaved(path),
            Err(err) => UiEvent::Error(UiError::from_message(
                UiErrorContext::SaveDocument,
                format!("{err:#}"),
            )),
        },
    }
}

async fn check_health(backend: &dyn ReviewBackend) -> bool {
    backend.health().await.is_ok()
}

async fn save_document(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), size = bytes.len(), "document saved");
    Ok(())
}
