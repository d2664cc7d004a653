//! Backend commands queued from UI to backend worker.

use client_core::StepRequest;
use std::path::PathBuf;

pub enum BackendCommand {
    CheckHealth,
    Execute(StepRequest),
    SaveDocument { path: PathBuf, bytes: Vec<u8> },
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CheckHealth => "check_health",
            Self::Execute(_) => "execute_step",
            Self::SaveDocument { .. } => "save_document",
        }
    }
}
