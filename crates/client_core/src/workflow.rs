//! Single-screen review workflow.
//!
//! A `ReviewSession` holds the form fields and everything the server has
//! returned so far. Each user action is a [`Step`]: [`ReviewSession::prepare`]
//! checks the gate and builds the request, the caller executes it, and the
//! result is fed back through [`ReviewSession::complete`] or
//! [`ReviewSession::fail`]. Only one step is in flight at a time.

use std::collections::VecDeque;

use chrono::{Datelike, Utc};
use shared::{
    domain::{Paper, PaperSource, QuestionAnswer, ResearchQuestion, DEFAULT_MODEL},
    protocol::{
        AbstractSummaryRequest, AnswerQuestionsRequest, ComposeDocumentRequest,
        ConclusionSummaryRequest, FilterPapersRequest, GenerateQuestionsRequest,
        GenerateSearchStringRequest, IntroductionSummaryRequest, SearchPapersRequest,
    },
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{DownloadedDocument, ReviewBackend};

pub const DEFAULT_OBJECTIVE: &str = "My work aims to systematically identify and analyze the literature on Large language models in software development";
pub const DEFAULT_NUM_QUESTIONS: u32 = 2;
pub const DEFAULT_PAPER_LIMIT: u32 = 10;
pub const PURPOSE_NEEDS_REVIEW: &str = "Purpose needs review after edit";

const QUESTION_PREFIX: &str = "Question ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    GenerateQuestions,
    GenerateSearchString,
    SearchPapers(PaperSource),
    FilterPapers,
    AnswerQuestions,
    GenerateAbstract,
    GenerateIntroduction,
    GenerateConclusion,
    ComposeDocument,
}

impl Step {
    pub fn label(self) -> &'static str {
        match self {
            Self::GenerateQuestions => "Generate research questions",
            Self::GenerateSearchString => "Create search string",
            Self::SearchPapers(PaperSource::Scopus) => "Fetch papers from Scopus",
            Self::SearchPapers(PaperSource::SemanticScholar) => {
                "Fetch papers from Semantic Scholar"
            }
            Self::FilterPapers => "Filter papers",
            Self::AnswerQuestions => "Find answers",
            Self::GenerateAbstract => "Generate summary abstract",
            Self::GenerateIntroduction => "Generate introduction summary",
            Self::GenerateConclusion => "Generate conclusion summary",
            Self::ComposeDocument => "Create LaTeX paper summary",
        }
    }

    fn failure_title(self) -> &'static str {
        match self {
            Self::ComposeDocument => "LaTeX Generation Failed",
            _ => "Operation Failed",
        }
    }
}

#[derive(Debug, Clone)]
pub enum StepRequest {
    GenerateQuestions(GenerateQuestionsRequest),
    GenerateSearchString(GenerateSearchStringRequest),
    SearchPapers(SearchPapersRequest),
    FilterPapers(FilterPapersRequest),
    AnswerQuestions(AnswerQuestionsRequest),
    GenerateAbstract(AbstractSummaryRequest),
    GenerateIntroduction(IntroductionSummaryRequest),
    GenerateConclusion(ConclusionSummaryRequest),
    ComposeDocument(ComposeDocumentRequest),
}

impl StepRequest {
    pub fn step(&self) -> Step {
        match self {
            Self::GenerateQuestions(_) => Step::GenerateQuestions,
            Self::GenerateSearchString(_) => Step::GenerateSearchString,
            Self::SearchPapers(req) => Step::SearchPapers(req.source),
            Self::FilterPapers(_) => Step::FilterPapers,
            Self::AnswerQuestions(_) => Step::AnswerQuestions,
            Self::GenerateAbstract(_) => Step::GenerateAbstract,
            Self::GenerateIntroduction(_) => Step::GenerateIntroduction,
            Self::GenerateConclusion(_) => Step::GenerateConclusion,
            Self::ComposeDocument(_) => Step::ComposeDocument,
        }
    }
}

#[derive(Debug, Clone)]
pub enum StepOutcome {
    Questions(Vec<ResearchQuestion>),
    SearchString(String),
    Papers {
        source: PaperSource,
        papers: Vec<Paper>,
    },
    Filtered(Vec<Paper>),
    Answers(Vec<QuestionAnswer>),
    Abstract(String),
    Introduction(String),
    Conclusion(String),
    Document(DownloadedDocument),
}

impl StepOutcome {
    /// The step whose response this is.
    pub fn step(&self) -> Step {
        match self {
            Self::Questions(_) => Step::GenerateQuestions,
            Self::SearchString(_) => Step::GenerateSearchString,
            Self::Papers { source, .. } => Step::SearchPapers(*source),
            Self::Filtered(_) => Step::FilterPapers,
            Self::Answers(_) => Step::AnswerQuestions,
            Self::Abstract(_) => Step::GenerateAbstract,
            Self::Introduction(_) => Step::GenerateIntroduction,
            Self::Conclusion(_) => Step::GenerateConclusion,
            Self::Document(_) => Step::ComposeDocument,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrepareError {
    #[error("a request is already in progress")]
    Busy,
    #[error("{0}")]
    Gate(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub detail: Option<String>,
}

impl Notification {
    fn new(level: NotificationLevel, title: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            detail: None,
        }
    }
}

/// Screen sections, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Objective,
    Questions,
    SearchString,
    Papers,
    SelectedPapers,
    Answers,
    Abstract,
    Introduction,
    Conclusion,
    Document,
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
    pub objective: String,
    pub num_questions: u32,
    pub model: String,
    pub start_year: i32,
    pub paper_limit: u32,
    questions: Vec<ResearchQuestion>,
    search_string: String,
    papers: Vec<Paper>,
    /// Rows of `papers`, ascending.
    selected: Vec<usize>,
    answers: Vec<QuestionAnswer>,
    abstract_summary: Option<String>,
    introduction: Option<String>,
    conclusion: Option<String>,
    document: Option<DownloadedDocument>,
    in_flight: Option<Step>,
    notifications: VecDeque<Notification>,
}

impl Default for ReviewSession {
    fn default() -> Self {
        Self {
            objective: DEFAULT_OBJECTIVE.to_string(),
            num_questions: DEFAULT_NUM_QUESTIONS,
            model: DEFAULT_MODEL.to_string(),
            start_year: Utc::now().year() - 1,
            paper_limit: DEFAULT_PAPER_LIMIT,
            questions: Vec::new(),
            search_string: String::new(),
            papers: Vec::new(),
            selected: Vec::new(),
            answers: Vec::new(),
            abstract_summary: None,
            introduction: None,
            conclusion: None,
            document: None,
            in_flight: None,
            notifications: VecDeque::new(),
        }
    }
}

impl ReviewSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<Step> {
        self.in_flight
    }

    pub fn questions(&self) -> &[ResearchQuestion] {
        &self.questions
    }

    pub fn search_string(&self) -> &str {
        &self.search_string
    }

    pub fn papers(&self) -> &[Paper] {
        &self.papers
    }

    pub fn selected_papers(&self) -> Vec<&Paper> {
        self.selected
            .iter()
            .filter_map(|&row| self.papers.get(row))
            .collect()
    }

    pub fn answers(&self) -> &[QuestionAnswer] {
        &self.answers
    }

    pub fn abstract_summary(&self) -> &str {
        self.abstract_summary.as_deref().unwrap_or_default()
    }

    pub fn introduction(&self) -> &str {
        self.introduction.as_deref().unwrap_or_default()
    }

    pub fn conclusion(&self) -> &str {
        self.conclusion.as_deref().unwrap_or_default()
    }

    pub fn document(&self) -> Option<&DownloadedDocument> {
        self.document.as_ref()
    }

    fn question_texts(&self) -> Vec<String> {
        self.questions.iter().map(|q| q.question.clone()).collect()
    }

    fn selected_owned(&self) -> Vec<Paper> {
        self.selected_papers().into_iter().cloned().collect()
    }

    fn model_name(&self) -> Option<String> {
        Some(self.model.clone())
    }

    fn gate(&self, step: Step) -> Result<(), &'static str> {
        match step {
            Step::GenerateSearchString if self.questions.is_empty() => {
                Err("Please generate research questions first.")
            }
            Step::SearchPapers(_) if self.search_string.trim().is_empty() => {
                Err("Please generate a search string first.")
            }
            Step::FilterPapers if self.papers.is_empty() => Err("Please fetch papers first."),
            Step::AnswerQuestions if self.selected.is_empty() => {
                Err("Please filter or select papers first.")
            }
            Step::AnswerQuestions if self.questions.is_empty() => {
                Err("No research questions to answer.")
            }
            Step::GenerateConclusion if self.papers.is_empty() && self.selected.is_empty() => {
                Err("Please fetch papers first.")
            }
            _ => Ok(()),
        }
    }

    /// Checks the gate for `step` and, when it passes, marks the session busy
    /// and returns the request built from the current state.
    pub fn prepare(&mut self, step: Step) -> Result<StepRequest, PrepareError> {
        if self.is_busy() {
            return Err(PrepareError::Busy);
        }
        if let Err(message) = self.gate(step) {
            self.notify(Notification::new(NotificationLevel::Warning, message));
            return Err(PrepareError::Gate(message));
        }

        let request = self.build_request(step);
        self.in_flight = Some(step);
        debug!(step = step.label(), "step started");
        Ok(request)
    }

    fn build_request(&self, step: Step) -> StepRequest {
        match step {
            Step::GenerateQuestions => StepRequest::GenerateQuestions(GenerateQuestionsRequest {
                objective: self.objective.clone(),
                num_questions: self.num_questions,
                model_name: self.model_name(),
            }),
            Step::GenerateSearchString => {
                StepRequest::GenerateSearchString(GenerateSearchStringRequest {
                    objective: self.objective.clone(),
                    research_questions: self.question_texts(),
                    model_name: self.model_name(),
                })
            }
            Step::SearchPapers(source) => StepRequest::SearchPapers(SearchPapersRequest {
                search_string: self.search_string.clone(),
                start_year: self.start_year,
                limit: self.paper_limit,
                source,
                model_name: self.model_name(),
            }),
            Step::FilterPapers => StepRequest::FilterPapers(FilterPapersRequest {
                search_string: self.search_string.clone(),
                papers: self.papers.clone(),
                model_name: self.model_name(),
            }),
            Step::AnswerQuestions => StepRequest::AnswerQuestions(AnswerQuestionsRequest {
                questions: self.question_texts(),
                papers_info: self.selected_owned(),
                model_name: self.model_name(),
            }),
            Step::GenerateAbstract => StepRequest::GenerateAbstract(AbstractSummaryRequest {
                research_questions: self.question_texts(),
                objective: self.objective.clone(),
                search_string: self.search_string.clone(),
                model_name: self.model_name(),
            }),
            Step::GenerateIntroduction => {
                StepRequest::GenerateIntroduction(IntroductionSummaryRequest {
                    research_questions: self.question_texts(),
                    objective: self.objective.clone(),
                    search_string: self.search_string.clone(),
                    total_papers: self.papers.clone(),
                    filtered_papers: self.selected_owned(),
                    answers: self.answers.clone(),
                    model_name: self.model_name(),
                })
            }
            Step::GenerateConclusion => {
                let papers = if self.selected.is_empty() {
                    self.papers.clone()
                } else {
                    self.selected_owned()
                };
                StepRequest::GenerateConclusion(ConclusionSummaryRequest {
                    papers_info: papers,
                    model_name: self.model_name(),
                })
            }
            Step::ComposeDocument => {
                let non_empty = |text: &str| (!text.trim().is_empty()).then(|| text.to_string());
                // Without a generated conclusion the abstract stands in for it.
                let conclusion = non_empty(self.conclusion())
                    .or_else(|| non_empty(self.abstract_summary()));
                StepRequest::ComposeDocument(ComposeDocumentRequest {
                    abstract_summary: non_empty(self.abstract_summary()),
                    intro_summary: non_empty(self.introduction()),
                    conclusion_summary: conclusion,
                    model_name: self.model_name(),
                })
            }
        }
    }

    /// Copies a successful response into the session and clears the busy flag.
    /// An outcome for a step that is not in flight is dropped; returns whether
    /// it was applied.
    pub fn complete(&mut self, outcome: StepOutcome) -> bool {
        let step = outcome.step();
        if self.in_flight != Some(step) {
            warn!(step = step.label(), in_flight = ?self.in_flight, "ignoring stale step outcome");
            return false;
        }
        self.in_flight = None;
        match outcome {
            StepOutcome::Questions(questions) => {
                let empty = questions.is_empty();
                self.questions = questions;
                if empty {
                    self.notify(Notification::new(
                        NotificationLevel::Warning,
                        "No research questions returned or unexpected format.",
                    ));
                } else {
                    self.success("Research Questions Generated");
                }
            }
            StepOutcome::SearchString(search_string) => {
                self.search_string = search_string;
                self.success("Search String Generated");
            }
            StepOutcome::Papers { source, papers } => {
                info!(source = source.label(), count = papers.len(), "papers received");
                self.papers = papers;
                self.selected.clear();
                self.success(format!("Papers Found from {}", source.label()));
            }
            StepOutcome::Filtered(filtered) => {
                let kept = filtered.len();
                let message = if kept < self.papers.len() {
                    format!("Filtered down to {kept} relevant papers.")
                } else {
                    format!("All {kept} papers deemed relevant.")
                };
                self.selected = self.rows_of(&filtered);
                self.success("Papers Filtered by LLM");
                self.notify(Notification::new(NotificationLevel::Info, message));
            }
            StepOutcome::Answers(answers) => {
                self.answers = answers;
                self.success("Answers Generated");
            }
            StepOutcome::Abstract(text) => {
                self.abstract_summary = Some(text);
                self.success("Summary Abstract Generated");
            }
            StepOutcome::Introduction(text) => {
                self.introduction = Some(text);
                self.success("Introduction Summary Generated");
            }
            StepOutcome::Conclusion(text) => {
                self.conclusion = Some(text);
                self.success("Summary Conclusion Generated");
            }
            StepOutcome::Document(document) => {
                self.document = Some(document);
                self.success("LaTeX Paper Summary Downloading");
            }
        }
        true
    }

    /// Maps the papers kept by the filter back onto rows of `papers`. The
    /// filter preserves order, so each match starts after the previous one.
    fn rows_of(&self, filtered: &[Paper]) -> Vec<usize> {
        let mut rows = Vec::with_capacity(filtered.len());
        let mut next = 0;
        for paper in filtered {
            match self.papers[next..].iter().position(|candidate| candidate == paper) {
                Some(offset) => {
                    rows.push(next + offset);
                    next += offset + 1;
                }
                None => warn!(title = %paper.title, "filtered paper is not in the fetched list"),
            }
        }
        rows
    }

    /// Clears the busy flag and reports the failure. State is left untouched.
    /// A failure for a step that is not in flight is dropped.
    pub fn fail(&mut self, step: Step, message: impl Into<String>) {
        if self.in_flight != Some(step) {
            warn!(step = step.label(), in_flight = ?self.in_flight, "ignoring stale step failure");
            return;
        }
        self.in_flight = None;
        let message = message.into();
        info!(step = step.label(), error = %message, "step failed");
        self.notify(Notification {
            level: NotificationLevel::Error,
            title: step.failure_title().to_string(),
            detail: Some(message),
        });
    }

    /// Runs one step end to end against `backend`.
    pub async fn run(
        &mut self,
        step: Step,
        backend: &dyn ReviewBackend,
    ) -> Result<(), PrepareError> {
        let request = self.prepare(step)?;
        match backend.execute(request).await {
            Ok(outcome) => {
                self.complete(outcome);
            }
            Err(e) => self.fail(step, e.to_string()),
        }
        Ok(())
    }

    pub fn visible_sections(&self) -> Vec<Section> {
        let mut sections = vec![Section::Objective];
        let shown = [
            (Section::Questions, !self.questions.is_empty()),
            (Section::SearchString, !self.search_string.is_empty()),
            (Section::Papers, !self.papers.is_empty()),
            (Section::SelectedPapers, !self.selected.is_empty()),
            (Section::Answers, !self.answers.is_empty()),
            (Section::Abstract, self.abstract_summary.is_some()),
            (Section::Introduction, self.introduction.is_some()),
            (Section::Conclusion, self.conclusion.is_some()),
            (Section::Document, self.document.is_some()),
        ];
        sections.extend(
            shown
                .into_iter()
                .filter_map(|(section, visible)| visible.then_some(section)),
        );
        sections
    }

    /// The editable question list, one `Question N: ...` line per question.
    pub fn questions_text(&self) -> String {
        self.questions
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{QUESTION_PREFIX}{}: {}", i + 1, q.question))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Replaces the questions from edited text. Purposes stay attached by
    /// position; rows beyond the previous list are flagged for review.
    pub fn set_questions_text(&mut self, text: &str) {
        let edited: Vec<String> = text
            .lines()
            .map(strip_question_prefix)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        self.questions = edited
            .into_iter()
            .enumerate()
            .map(|(i, question)| {
                let purpose = self
                    .questions
                    .get(i)
                    .map(|previous| previous.purpose.clone())
                    .unwrap_or_else(|| PURPOSE_NEEDS_REVIEW.to_string());
                ResearchQuestion { question, purpose }
            })
            .collect();
    }

    pub fn set_search_string(&mut self, search_string: impl Into<String>) {
        self.search_string = search_string.into();
    }

    /// Once shown, a summary section stays visible even if its text is
    /// cleared.
    pub fn set_abstract_summary(&mut self, text: impl Into<String>) {
        self.abstract_summary = Some(text.into());
    }

    pub fn set_introduction(&mut self, text: impl Into<String>) {
        self.introduction = Some(text.into());
    }

    pub fn set_conclusion(&mut self, text: impl Into<String>) {
        self.conclusion = Some(text.into());
    }

    /// Whether row `index` of [`papers`](Self::papers) is selected.
    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.binary_search(&index).is_ok()
    }

    /// Adds or removes row `index` of [`papers`](Self::papers) from the
    /// selection. Returns whether it is selected afterwards.
    pub fn toggle_paper(&mut self, index: usize) -> bool {
        if index >= self.papers.len() {
            return false;
        }
        match self.selected.binary_search(&index) {
            Ok(pos) => {
                self.selected.remove(pos);
                false
            }
            Err(pos) => {
                self.selected.insert(pos, index);
                true
            }
        }
    }

    pub fn select_all_papers(&mut self) {
        self.selected = (0..self.papers.len()).collect();
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    fn success(&mut self, title: impl Into<String>) {
        self.notify(Notification::new(NotificationLevel::Success, title));
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push_back(notification);
    }
}

fn strip_question_prefix(line: &str) -> &str {
    let Some(rest) = line.strip_prefix(QUESTION_PREFIX) else {
        return line;
    };
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return line;
    }
    rest[digits..].strip_prefix(": ").unwrap_or(line)
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
