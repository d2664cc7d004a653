use std::sync::Arc;

use chrono::{Datelike, Utc};
use futures::{stream, StreamExt};
use shared::{
    domain::{Paper, QuestionAnswer, ResearchQuestion, DEFAULT_MODEL},
    error::{ApiError, ErrorCode},
    protocol::{
        AbstractSummaryRequest, AnswerQuestionsRequest, ComposeDocumentRequest,
        ConclusionSummaryRequest, FilterPapersRequest, GenerateQuestionsRequest,
        GenerateSearchStringRequest, IntroductionSummaryRequest, SearchPapersRequest,
        MAX_PAPER_LIMIT, MAX_QUESTIONS, MIN_START_YEAR,
    },
};
use tracing::{info, warn};

pub mod document;
pub mod extract;
pub mod llm;
pub mod prompts;
pub mod sources;

use document::ComposedDocument;
use llm::{ChatCompletion, ChatMessage, ChatRequest};
use sources::{PaperQuery, PaperSources};

const RELEVANCE_TEMPERATURE: f32 = 0.2;
const ANSWER_MAX_TOKENS: u32 = 512;
const FILTER_CONCURRENCY: usize = 4;

#[derive(Clone)]
pub struct ApiContext {
    pub llm: Arc<dyn ChatCompletion>,
    pub sources: PaperSources,
    pub default_model: String,
}

impl ApiContext {
    pub fn new(llm: Arc<dyn ChatCompletion>, sources: PaperSources) -> Self {
        Self {
            llm,
            sources,
            default_model: DEFAULT_MODEL.to_string(),
        }
    }

    fn model(&self, requested: Option<&str>) -> String {
        requested
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .unwrap_or(self.default_model.as_str())
            .to_string()
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        self.llm
            .complete(request)
            .await
            .map_err(|e| ApiError::upstream(e.to_string()))
    }
}

pub async fn generate_research_questions(
    ctx: &ApiContext,
    req: &GenerateQuestionsRequest,
) -> Result<Vec<ResearchQuestion>, ApiError> {
    let objective = req.objective.trim();
    if objective.is_empty() {
        return Err(ApiError::validation("Objective is required"));
    }
    if req.num_questions < 1 {
        return Err(ApiError::validation(
            "Number of questions must be at least 1",
        ));
    }
    if req.num_questions > MAX_QUESTIONS {
        return Err(ApiError::validation(format!(
            "Number of questions must be at most {MAX_QUESTIONS}"
        )));
    }

    let model = ctx.model(req.model_name.as_deref());
    let content = ctx
        .chat(ChatRequest::new(
            &model,
            prompts::research_questions(objective, req.num_questions),
        ))
        .await?;

    let questions = extract::parse_questions(&content, req.num_questions as usize);
    if questions.is_empty() {
        warn!(%model, "model reply did not contain question/purpose pairs");
        return Err(ApiError::upstream(format!(
            "Could not parse questions and purposes from model {model}'s response. Response: {content}"
        )));
    }
    info!(%model, count = questions.len(), "generated research questions");
    Ok(questions)
}

pub async fn generate_search_string(
    ctx: &ApiContext,
    req: &GenerateSearchStringRequest,
) -> Result<String, ApiError> {
    let questions: Vec<String> = req
        .research_questions
        .iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect();
    if req.objective.trim().is_empty() || questions.is_empty() {
        return Err(ApiError::validation(
            "Objective and research questions are required.",
        ));
    }

    let model = ctx.model(req.model_name.as_deref());
    let content = ctx
        .chat(ChatRequest::new(
            &model,
            prompts::search_string(req.objective.trim(), &questions),
        ))
        .await?;
    let search_string = extract::extract_search_string(&content);
    if search_string.is_empty() {
        return Err(ApiError::upstream(format!(
            "Model {model} returned an empty search string"
        )));
    }
    Ok(search_string)
}

pub async fn search_papers(
    ctx: &ApiContext,
    req: &SearchPapersRequest,
) -> Result<Vec<Paper>, ApiError> {
    let search_string = req.search_string.trim();
    if search_string.is_empty() {
        return Err(ApiError::validation("Search string is required."));
    }
    if !(1..=MAX_PAPER_LIMIT).contains(&req.limit) {
        return Err(ApiError::validation(format!(
            "Number of papers must be between 1 and {MAX_PAPER_LIMIT}"
        )));
    }
    let current_year = Utc::now().year();
    if !(MIN_START_YEAR..=current_year).contains(&req.start_year) {
        return Err(ApiError::validation(format!(
            "Start year must be between {MIN_START_YEAR} and {current_year}"
        )));
    }

    let query = PaperQuery {
        search_string: search_string.to_string(),
        start_year: req.start_year,
        limit: req.limit,
    };
    let papers = ctx
        .sources
        .for_source(req.source)
        .search(&query)
        .await
        .map_err(|e| {
            warn!(source = req.source.label(), error = %e, "paper search failed");
            ApiError::upstream(e.to_string())
        })?;
    info!(source = req.source.label(), count = papers.len(), "papers fetched");
    Ok(papers)
}

/// Keeps the papers the model judges relevant, in their original order.
///
/// A failed relevance check drops the paper rather than failing the request.
pub async fn filter_papers(
    ctx: &ApiContext,
    req: &FilterPapersRequest,
) -> Result<Vec<Paper>, ApiError> {
    let model = ctx.model(req.model_name.as_deref());
    let search_string = req.search_string.as_str();

    let verdicts: Vec<(Paper, bool)> = stream::iter(req.papers.iter().cloned())
        .filter(|paper| {
            let keep = paper.has_title();
            if !keep {
                warn!(identifier = %paper.identifier, "paper skipped due to missing title");
            }
            futures::future::ready(keep)
        })
        .map(|paper| {
            let model = model.clone();
            async move {
                let request = ChatRequest::new(
                    &model,
                    prompts::relevance(&paper.title, search_string),
                )
                .with_temperature(RELEVANCE_TEMPERATURE);
                let relevant = match ctx.llm.complete(request).await {
                    Ok(reply) => {
                        let relevant = extract::classify_relevance(&reply);
                        tracing::debug!(title = %paper.title, %reply, relevant, "relevance check");
                        relevant
                    }
                    Err(e) => {
                        warn!(title = %paper.title, error = %e, "relevance check failed");
                        false
                    }
                };
                (paper, relevant)
            }
        })
        .buffered(FILTER_CONCURRENCY)
        .collect()
        .await;

    let filtered: Vec<Paper> = verdicts
        .into_iter()
        .filter_map(|(paper, relevant)| relevant.then_some(paper))
        .collect();
    info!(%model, total = req.papers.len(), kept = filtered.len(), "papers filtered");
    Ok(filtered)
}

/// Answers each question in order. A failed answer is reported inline with
/// `error` set rather than failing the whole request.
pub async fn answer_questions(
    ctx: &ApiContext,
    req: &AnswerQuestionsRequest,
) -> Result<Vec<QuestionAnswer>, ApiError> {
    if req.questions.is_empty() || req.papers_info.is_empty() {
        return Err(ApiError::validation(
            "Both questions and papers information are required.",
        ));
    }

    let model = ctx.model(req.model_name.as_deref());
    let mut answers = Vec::with_capacity(req.questions.len());
    for question in &req.questions {
        let request = ChatRequest::new(&model, prompts::answer(question, &req.papers_info))
            .with_max_tokens(ANSWER_MAX_TOKENS);
        let answer = match ctx.llm.complete(request).await {
            Ok(answer) => QuestionAnswer {
                question: question.clone(),
                answer,
                error: false,
            },
            Err(e) => {
                warn!(%model, error = %e, "answer generation failed");
                QuestionAnswer {
                    question: question.clone(),
                    answer: format!(
                        "An error occurred while generating the response with {model}: {e}"
                    ),
                    error: true,
                }
            }
        };
        answers.push(answer);
    }
    Ok(answers)
}

async fn summarize(
    ctx: &ApiContext,
    model_name: Option<&str>,
    messages: Vec<ChatMessage>,
) -> Result<String, ApiError> {
    let model = ctx.model(model_name);
    let summary = ctx.chat(ChatRequest::new(&model, messages)).await?;
    Ok(summary.trim().to_string())
}

pub async fn generate_abstract(
    ctx: &ApiContext,
    req: &AbstractSummaryRequest,
) -> Result<String, ApiError> {
    summarize(
        ctx,
        req.model_name.as_deref(),
        prompts::abstract_summary(&req.research_questions, &req.objective, &req.search_string),
    )
    .await
}

pub async fn generate_introduction(
    ctx: &ApiContext,
    req: &IntroductionSummaryRequest,
) -> Result<String, ApiError> {
    let input = prompts::IntroductionInput {
        total_papers: req.total_papers.len(),
        filtered_papers: req.filtered_papers.len(),
        search_string: &req.search_string,
        objective: &req.objective,
        questions: &req.research_questions,
        answers: &req.answers,
    };
    summarize(
        ctx,
        req.model_name.as_deref(),
        prompts::introduction_summary(&input),
    )
    .await
}

pub async fn generate_conclusion(
    ctx: &ApiContext,
    req: &ConclusionSummaryRequest,
) -> Result<String, ApiError> {
    summarize(
        ctx,
        req.model_name.as_deref(),
        prompts::conclusion_summary(&req.papers_info),
    )
    .await
}

pub fn compose_document(req: &ComposeDocumentRequest) -> ComposedDocument {
    document::compose(
        req.abstract_summary.as_deref(),
        req.intro_summary.as_deref(),
        req.conclusion_summary.as_deref(),
    )
}

pub fn status_for(code: ErrorCode) -> u16 {
    match code {
        ErrorCode::Validation => 400,
        ErrorCode::NotFound => 404,
        ErrorCode::Upstream => 502,
        ErrorCode::Internal => 500,
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
