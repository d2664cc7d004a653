use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{Paper, QuestionAnswer, ResearchQuestion},
    error::ApiError,
    protocol::{
        AbstractSummaryRequest, AbstractSummaryResponse, AnswerQuestionsRequest,
        AnswerQuestionsResponse, ComposeDocumentRequest, ConclusionSummaryRequest,
        ConclusionSummaryResponse, FilterPapersRequest, FilterPapersResponse,
        GenerateQuestionsRequest, GenerateQuestionsResponse, GenerateSearchStringRequest,
        GenerateSearchStringResponse, IntroductionSummaryRequest, IntroductionSummaryResponse,
        SearchPapersRequest, ANSWER_QUESTIONS_ROUTE, COMPOSE_DOCUMENT_ROUTE, DOCUMENT_FILENAME,
        FILTER_PAPERS_ROUTE, GENERATE_QUESTIONS_ROUTE, GENERATE_SEARCH_STRING_ROUTE,
        HEALTHZ_ROUTE, SEARCH_PAPERS_ROUTE, SUMMARY_ABSTRACT_ROUTE, SUMMARY_CONCLUSION_ROUTE,
        SUMMARY_INTRODUCTION_ROUTE,
    },
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub mod workflow;

pub use workflow::{
    Notification, NotificationLevel, PrepareError, ReviewSession, Section, Step, StepOutcome,
    StepRequest,
};

/// Generation steps can take minutes when a model answers several questions.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server url '{url}': {reason}")]
    InvalidServerUrl { url: String, reason: String },
    #[error("{}", .error.message)]
    Api { status: u16, error: ApiError },
    #[error("HTTP error! status: {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait ReviewBackend: Send + Sync {
    async fn execute(&self, request: StepRequest) -> anyhow::Result<StepOutcome>;

    async fn health(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ReviewClient {
    http: Client,
    base_url: Url,
}

impl ReviewClient {
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Self::with_client(http, server_url)
    }

    pub fn with_client(http: Client, server_url: &str) -> Result<Self, ClientError> {
        let invalid = |reason: String| ClientError::InvalidServerUrl {
            url: server_url.to_string(),
            reason,
        };
        let mut base_url = Url::parse(server_url.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(invalid("server url must start with http:// or https://".into()));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, route: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(route.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidServerUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn post_json<Req, Resp>(
        &self,
        route: &str,
        body: &Req,
    ) -> Result<Resp, ClientError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.endpoint(route)?;
        debug!(%url, "posting request");
        let response = self.http.post(url).json(body).send().await?;
        Ok(checked(response).await?.json().await?)
    }

    pub async fn health(&self) -> Result<(), ClientError> {
        let response = self.http.get(self.endpoint(HEALTHZ_ROUTE)?).send().await?;
        checked(response).await?;
        Ok(())
    }

    pub async fn generate_questions(
        &self,
        req: &GenerateQuestionsRequest,
    ) -> Result<Vec<ResearchQuestion>, ClientError> {
        let res: GenerateQuestionsResponse = self.post_json(GENERATE_QUESTIONS_ROUTE, req).await?;
        Ok(res.research_questions)
    }

    pub async fn generate_search_string(
        &self,
        req: &GenerateSearchStringRequest,
    ) -> Result<String, ClientError> {
        let res: GenerateSearchStringResponse =
            self.post_json(GENERATE_SEARCH_STRING_ROUTE, req).await?;
        Ok(res.search_string)
    }

    pub async fn search_papers(
        &self,
        req: &SearchPapersRequest,
    ) -> Result<Vec<Paper>, ClientError> {
        self.post_json(SEARCH_PAPERS_ROUTE, req).await
    }

    pub async fn filter_papers(
        &self,
        req: &FilterPapersRequest,
    ) -> Result<Vec<Paper>, ClientError> {
        let res: FilterPapersResponse = self.post_json(FILTER_PAPERS_ROUTE, req).await?;
        Ok(res.filtered_papers)
    }

    pub async fn answer_questions(
        &self,
        req: &AnswerQuestionsRequest,
    ) -> Result<Vec<QuestionAnswer>, ClientError> {
        let res: AnswerQuestionsResponse = self.post_json(ANSWER_QUESTIONS_ROUTE, req).await?;
        Ok(res.answers)
    }

    pub async fn generate_abstract(
        &self,
        req: &AbstractSummaryRequest,
    ) -> Result<String, ClientError> {
        let res: AbstractSummaryResponse = self.post_json(SUMMARY_ABSTRACT_ROUTE, req).await?;
        Ok(res.summary_abstract)
    }

    pub async fn generate_introduction(
        &self,
        req: &IntroductionSummaryRequest,
    ) -> Result<String, ClientError> {
        let res: IntroductionSummaryResponse =
            self.post_json(SUMMARY_INTRODUCTION_ROUTE, req).await?;
        Ok(res.introduction_summary)
    }

    pub async fn generate_conclusion(
        &self,
        req: &ConclusionSummaryRequest,
    ) -> Result<String, ClientError> {
        let res: ConclusionSummaryResponse =
            self.post_json(SUMMARY_CONCLUSION_ROUTE, req).await?;
        Ok(res.summary_conclusion)
    }

    pub async fn download_document(
        &self,
        req: &ComposeDocumentRequest,
    ) -> Result<DownloadedDocument, ClientError> {
        let response = self
            .http
            .post(self.endpoint(COMPOSE_DOCUMENT_ROUTE)?)
            .json(req)
            .send()
            .await?;
        let response = checked(response).await?;
        let filename = filename_from_disposition(
            response
                .headers()
                .get(header::CONTENT_DISPOSITION)
                .and_then(|value| value.to_str().ok()),
        );
        let bytes = response.bytes().await?.to_vec();
        Ok(DownloadedDocument { filename, bytes })
    }
}

#[async_trait]
impl ReviewBackend for ReviewClient {
    async fn execute(&self, request: StepRequest) -> anyhow::Result<StepOutcome> {
        let outcome = match request {
            StepRequest::GenerateQuestions(req) => {
                StepOutcome::Questions(self.generate_questions(&req).await?)
            }
            StepRequest::GenerateSearchString(req) => {
                StepOutcome::SearchString(self.generate_search_string(&req).await?)
            }
            StepRequest::SearchPapers(req) => StepOutcome::Papers {
                source: req.source,
                papers: self.search_papers(&req).await?,
            },
            StepRequest::FilterPapers(req) => {
                StepOutcome::Filtered(self.filter_papers(&req).await?)
            }
            StepRequest::AnswerQuestions(req) => {
                StepOutcome::Answers(self.answer_questions(&req).await?)
            }
            StepRequest::GenerateAbstract(req) => {
                StepOutcome::Abstract(self.generate_abstract(&req).await?)
            }
            StepRequest::GenerateIntroduction(req) => {
                StepOutcome::Introduction(self.generate_introduction(&req).await?)
            }
            StepRequest::GenerateConclusion(req) => {
                StepOutcome::Conclusion(self.generate_conclusion(&req).await?)
            }
            StepRequest::ComposeDocument(req) => {
                StepOutcome::Document(self.download_document(&req).await?)
            }
        };
        Ok(outcome)
    }

    async fn health(&self) -> anyhow::Result<()> {
        Ok(ReviewClient::health(self).await?)
    }
}

/// Passes 2xx responses through; otherwise decodes the server's `ApiError`
/// body, falling back to the bare status.
async fn checked(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    Err(error_from_body(status, &body))
}

fn error_from_body(status: StatusCode, body: &[u8]) -> ClientError {
    match serde_json::from_slice::<ApiError>(body) {
        Ok(error) => {
            warn!(status = status.as_u16(), message = %error.message, "server rejected request");
            ClientError::Api {
                status: status.as_u16(),
                error,
            }
        }
        Err(_) => {
            warn!(status = status.as_u16(), "server returned a non-json error");
            ClientError::Status(status.as_u16())
        }
    }
}

/// Reads `filename=` from a Content-Disposition value; quotes are dropped.
pub fn filename_from_disposition(value: Option<&str>) -> String {
    value
        .and_then(|value| value.split("filename=").nth(1))
        .map(|name| name.split(';').next().unwrap_or(name))
        .map(|name| name.trim().replace('"', ""))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DOCUMENT_FILENAME.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
