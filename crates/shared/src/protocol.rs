use serde::{Deserialize, Serialize};

use crate::domain::{Paper, PaperSource, QuestionAnswer, ResearchQuestion};

pub const HEALTHZ_ROUTE: &str = "/healthz";
pub const GENERATE_QUESTIONS_ROUTE: &str = "/api/generate_research_questions_and_purpose";
pub const GENERATE_SEARCH_STRING_ROUTE: &str = "/api/generate_search_string";
pub const SEARCH_PAPERS_ROUTE: &str = "/api/search_papers";
pub const FILTER_PAPERS_ROUTE: &str = "/api/filter_papers";
pub const ANSWER_QUESTIONS_ROUTE: &str = "/api/answer_question";
pub const SUMMARY_ABSTRACT_ROUTE: &str = "/api/generate-summary-abstract";
pub const SUMMARY_INTRODUCTION_ROUTE: &str = "/api/generate-introduction-summary";
pub const SUMMARY_CONCLUSION_ROUTE: &str = "/api/generate-summary-conclusion";
pub const COMPOSE_DOCUMENT_ROUTE: &str = "/api/generate-summary-all";

pub const DOCUMENT_FILENAME: &str = "paper_summary.tex";
pub const DOCUMENT_CONTENT_TYPE: &str = "application/x-tex";

pub const MAX_QUESTIONS: u32 = 10;
pub const MAX_PAPER_LIMIT: u32 = 25;
pub const MIN_START_YEAR: i32 = 1900;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateQuestionsRequest {
    pub objective: String,
    #[serde(default = "default_num_questions")]
    pub num_questions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

fn default_num_questions() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateQuestionsResponse {
    pub research_questions: Vec<ResearchQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateSearchStringRequest {
    pub objective: String,
    #[serde(default)]
    pub research_questions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateSearchStringResponse {
    pub search_string: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPapersRequest {
    pub search_string: String,
    pub start_year: i32,
    pub limit: u32,
    #[serde(default)]
    pub source: PaperSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterPapersRequest {
    #[serde(default)]
    pub search_string: String,
    #[serde(default)]
    pub papers: Vec<Paper>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterPapersResponse {
    pub filtered_papers: Vec<Paper>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerQuestionsRequest {
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub papers_info: Vec<Paper>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerQuestionsResponse {
    pub answers: Vec<QuestionAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbstractSummaryRequest {
    #[serde(default)]
    pub research_questions: Vec<String>,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub search_string: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbstractSummaryResponse {
    pub summary_abstract: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntroductionSummaryRequest {
    #[serde(default)]
    pub research_questions: Vec<String>,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub search_string: String,
    #[serde(default)]
    pub total_papers: Vec<Paper>,
    #[serde(default)]
    pub filtered_papers: Vec<Paper>,
    #[serde(default)]
    pub answers: Vec<QuestionAnswer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntroductionSummaryResponse {
    pub introduction_summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConclusionSummaryRequest {
    #[serde(default)]
    pub papers_info: Vec<Paper>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConclusionSummaryResponse {
    pub summary_conclusion: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComposeDocumentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}
