//! Command orchestration helpers from UI actions to backend command queue.

use client_core::{PrepareError, ReviewSession, Step};
use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

/// Queues `cmd`; returns false and sets `status` when the queue rejects it.
pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) -> bool {
    let cmd_name = cmd.name();

    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->backend command");
            true
        }
        Err(TrySendError::Full(_)) => {
            *status = "UI command queue is full; please retry".to_string();
            false
        }
        Err(TrySendError::Disconnected(_)) => {
            *status =
                "Backend command processor disconnected (possible startup/runtime failure); restart the app"
                    .to_string();
            false
        }
    }
}

/// Prepares `step` on the session and hands the request to the backend.
/// A rejected dispatch is reported as a failed step so the session never
/// stays busy.
pub fn start_step(
    session: &mut ReviewSession,
    step: Step,
    cmd_tx: &Sender<BackendCommand>,
    status: &mut String,
) {
    match session.prepare(step) {
        Ok(request) => {
            *status = format!("{}...", step.label());
            if !dispatch_backend_command(cmd_tx, BackendCommand::Execute(request), status) {
                session.fail(step, status.clone());
            }
        }
        Err(PrepareError::Busy) => {
            *status = "A request is already in progress".to_string();
        }
        // The session queued a warning notification for the gate.
        Err(PrepareError::Gate(message)) => {
            *status = message.to_string();
        }
    }
}
