//! UI/backend events and error modeling for the review window.

use std::path::PathBuf;

use client_core::{Step, StepOutcome};

pub enum UiEvent {
    Info(String),
    ServerReachable(bool),
    StepFinished {
        step: Step,
        result: Result<StepOutcome, String>,
    },
    DocumentSaved(PathBuf),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Configuration,
    Transport,
    Upstream,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Step,
    SaveDocument,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();
        let category = if lower.contains("api key")
            || lower.contains("not configured")
            || lower.contains("invalid server url")
        {
            UiErrorCategory::Configuration
        } else if lower.contains("request failed")
            || lower.contains("connection")
            || lower.contains("timed out")
            || lower.contains("dns")
            || lower.contains("disconnected")
        {
            UiErrorCategory::Transport
        } else if lower.contains("must")
            || lower.contains("required")
            || lower.contains("cannot be empty")
            || lower.contains("status: 400")
        {
            UiErrorCategory::Validation
        } else if lower.contains("upstream")
            || lower.contains("failed to")
            || lower.contains("model")
            || lower.contains("status: 5")
        {
            UiErrorCategory::Upstream
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    /// One-line guidance for the status bar.
    pub fn hint(&self) -> String {
        match (self.context, self.category) {
            (UiErrorContext::BackendStartup, _) => {
                format!("Backend worker startup failure: {}", self.message)
            }
            (UiErrorContext::SaveDocument, _) => {
                format!("Could not save the document: {}", self.message)
            }
            (_, UiErrorCategory::Configuration) => {
                "The server is missing configuration for this request; check its API keys."
                    .to_string()
            }
            (_, UiErrorCategory::Transport) => {
                "Server unreachable; check the server URL and that it is running.".to_string()
            }
            (_, UiErrorCategory::Validation) => format!("Check the inputs: {}", self.message),
            (_, UiErrorCategory::Upstream) => {
                "The model or paper source failed; try again or pick another model.".to_string()
            }
            (_, UiErrorCategory::Unknown) => self.message.clone(),
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_failures() {
        let cases = [
            ("OpenAI API key not found", UiErrorCategory::Configuration),
            (
                "request failed: error sending request: connection refused",
                UiErrorCategory::Transport,
            ),
            ("num_questions must be between 1 and 10", UiErrorCategory::Validation),
            ("failed to fetch papers from Scopus", UiErrorCategory::Upstream),
            ("HTTP error! status: 502", UiErrorCategory::Upstream),
            ("something odd", UiErrorCategory::Unknown),
        ];
        for (message, expected) in cases {
            let error = UiError::from_message(UiErrorContext::Step, message);
            assert_eq!(error.category(), expected, "{message}");
            assert_eq!(error.message(), message);
        }
    }

    #[test]
    fn hint_depends_on_context_first() {
        let error = UiError::from_message(UiErrorContext::SaveDocument, "permission denied");
        assert_eq!(error.context(), UiErrorContext::SaveDocument);
        assert_eq!(error.hint(), "Could not save the document: permission denied");

        let error = UiError::from_message(UiErrorContext::Step, "timed out");
        assert!(error.hint().starts_with("Server unreachable"));
    }
}
