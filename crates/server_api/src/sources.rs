//! Bibliographic search backends.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use reqwest::Client;
use serde::Deserialize;
use shared::domain::{Paper, PaperSource, NOT_AVAILABLE};
use thiserror::Error;
use url::Url;

pub const SCOPUS_BASE_URL: &str = "https://api.elsevier.com";
pub const SEMANTIC_SCHOLAR_BASE_URL: &str = "https://api.semanticscholar.org";

const SEMANTIC_SCHOLAR_FIELDS: &str =
    "title,authors,year,url,venue,abstract,externalIds,openAccessPdf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperQuery {
    pub search_string: String,
    pub start_year: i32,
    pub limit: u32,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0} API key not found")]
    MissingApiKey(&'static str),
    #[error("invalid {source_name} base url: {reason}")]
    InvalidBaseUrl {
        source_name: &'static str,
        reason: String,
    },
    #[error("failed to fetch papers from {source_name}: {source}")]
    Transport {
        source_name: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to fetch papers from {source_name}: status {status}: {body}")]
    Status {
        source_name: &'static str,
        status: u16,
        body: String,
    },
}

#[async_trait]
pub trait PaperSearch: Send + Sync {
    fn source(&self) -> PaperSource;
    async fn search(&self, query: &PaperQuery) -> Result<Vec<Paper>, SourceError>;
}

#[derive(Clone)]
pub struct PaperSources {
    pub scopus: Arc<dyn PaperSearch>,
    pub semantic_scholar: Arc<dyn PaperSearch>,
}

impl PaperSources {
    pub fn for_source(&self, source: PaperSource) -> &dyn PaperSearch {
        match source {
            PaperSource::Scopus => self.scopus.as_ref(),
            PaperSource::SemanticScholar => self.semantic_scholar.as_ref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceEndpoint {
    pub base_url: String,
    pub api_key: Option<String>,
}

fn join_endpoint(
    source_name: &'static str,
    base_url: &str,
    path: &str,
) -> Result<Url, SourceError> {
    let invalid = |reason: String| SourceError::InvalidBaseUrl {
        source_name,
        reason,
    };
    let mut base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(path).map_err(|e| invalid(e.to_string()))
}

fn or_not_available(value: Option<String>) -> String {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

async fn fetch_json<T: serde::de::DeserializeOwned>(
    source_name: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<T, SourceError> {
    let transport = |source| SourceError::Transport {
        source_name,
        source,
    };
    let response = request.send().await.map_err(transport)?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(source = source_name, status = status.as_u16(), "paper search rejected");
        return Err(SourceError::Status {
            source_name,
            status: status.as_u16(),
            body,
        });
    }
    response.json().await.map_err(transport)
}

pub struct ScopusClient {
    http: Client,
    endpoint: SourceEndpoint,
}

impl ScopusClient {
    const NAME: &'static str = "Scopus";

    pub fn new(http: Client, endpoint: SourceEndpoint) -> Self {
        Self { http, endpoint }
    }
}

#[derive(Debug, Deserialize)]
struct ScopusEnvelope {
    #[serde(rename = "search-results", default)]
    search_results: ScopusResults,
}

#[derive(Debug, Default, Deserialize)]
struct ScopusResults {
    #[serde(default)]
    entry: Vec<ScopusEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScopusEntry {
    error: Option<String>,
    #[serde(rename = "dc:creator")]
    creator: Option<String>,
    #[serde(rename = "dc:identifier")]
    identifier: Option<String>,
    #[serde(rename = "dc:title")]
    title: Option<String>,
    #[serde(rename = "prism:coverDate")]
    cover_date: Option<String>,
    openaccess: Option<serde_json::Value>,
    #[serde(rename = "prism:publicationName")]
    publication_name: Option<String>,
    #[serde(rename = "prism:aggregationType")]
    aggregation_type: Option<String>,
    #[serde(rename = "prism:volume")]
    volume: Option<String>,
    #[serde(rename = "prism:doi")]
    doi: Option<String>,
    affiliation: Vec<ScopusAffiliation>,
    link: Vec<ScopusLink>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScopusAffiliation {
    affilname: Option<String>,
    #[serde(rename = "affiliation-country")]
    affiliation_country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ScopusLink {
    #[serde(rename = "@ref")]
    rel: Option<String>,
    #[serde(rename = "@href")]
    href: Option<String>,
}

fn scopus_open_access(value: Option<&serde_json::Value>) -> bool {
    match value {
        Some(serde_json::Value::String(flag)) => flag == "1",
        Some(serde_json::Value::Number(flag)) => flag.as_u64() == Some(1),
        Some(serde_json::Value::Bool(flag)) => *flag,
        _ => false,
    }
}

impl From<ScopusEntry> for Paper {
    fn from(entry: ScopusEntry) -> Self {
        let affiliation = entry.affiliation.into_iter().next().unwrap_or_default();
        let link = entry
            .link
            .into_iter()
            .find(|link| link.rel.as_deref() == Some("scopus"))
            .and_then(|link| link.href);
        let year = entry
            .cover_date
            .as_deref()
            .and_then(|date| date.split('-').next())
            .map(str::to_string);

        Paper {
            identifier: or_not_available(entry.identifier),
            title: or_not_available(entry.title),
            creator: or_not_available(entry.creator),
            year: or_not_available(year),
            publication_name: or_not_available(entry.publication_name),
            aggregation_type: or_not_available(entry.aggregation_type),
            volume: or_not_available(entry.volume),
            doi: or_not_available(entry.doi),
            link: or_not_available(link),
            open_access: scopus_open_access(entry.openaccess.as_ref()),
            affiliation_name: or_not_available(affiliation.affilname),
            affiliation_country: or_not_available(affiliation.affiliation_country),
            abstract_text: None,
            pdf_url: None,
        }
    }
}

#[async_trait]
impl PaperSearch for ScopusClient {
    fn source(&self) -> PaperSource {
        PaperSource::Scopus
    }

    async fn search(&self, query: &PaperQuery) -> Result<Vec<Paper>, SourceError> {
        let api_key = self
            .endpoint
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(SourceError::MissingApiKey(Self::NAME))?;
        let url = join_endpoint(Self::NAME, &self.endpoint.base_url, "content/search/scopus")?;
        let scopus_query = format!(
            "TITLE-ABS-KEY({}) AND PUBYEAR = {}",
            query.search_string, query.start_year
        );

        let request = self
            .http
            .get(url)
            .header("X-ELS-APIKey", api_key)
            .header("Accept", "application/json")
            .query(&[
                ("query", scopus_query),
                ("count", query.limit.to_string()),
            ]);
        let envelope: ScopusEnvelope = fetch_json(Self::NAME, request).await?;

        // Scopus reports an empty result set as a single entry carrying `error`.
        let papers: Vec<Paper> = envelope
            .search_results
            .entry
            .into_iter()
            .filter(|entry| entry.error.is_none())
            .map(Paper::from)
            .collect();
        tracing::info!(count = papers.len(), "scopus search complete");
        Ok(papers)
    }
}

pub struct SemanticScholarClient {
    http: Client,
    endpoint: SourceEndpoint,
}

impl SemanticScholarClient {
    const NAME: &'static str = "Semantic Scholar";

    pub fn new(http: Client, endpoint: SourceEndpoint) -> Self {
        Self { http, endpoint }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SemanticScholarPage {
    #[serde(default)]
    data: Vec<SemanticScholarPaper>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SemanticScholarPaper {
    paper_id: Option<String>,
    title: Option<String>,
    authors: Vec<SemanticScholarAuthor>,
    year: Option<i32>,
    url: Option<String>,
    venue: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    external_ids: Option<SemanticScholarIds>,
    open_access_pdf: Option<SemanticScholarPdf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SemanticScholarAuthor {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SemanticScholarIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SemanticScholarPdf {
    url: Option<String>,
}

impl From<SemanticScholarPaper> for Paper {
    fn from(paper: SemanticScholarPaper) -> Self {
        let authors = paper
            .authors
            .into_iter()
            .filter_map(|author| author.name)
            .collect::<Vec<_>>()
            .join(", ");
        let venue = paper.venue.unwrap_or_default();
        let aggregation_type = if venue.to_ascii_lowercase().contains("journal") {
            "Journal"
        } else {
            "Conference"
        };

        Paper {
            identifier: or_not_available(paper.paper_id),
            title: or_not_available(paper.title),
            creator: or_not_available(Some(authors)),
            year: or_not_available(paper.year.map(|year| year.to_string())),
            publication_name: or_not_available(Some(venue)),
            aggregation_type: aggregation_type.to_string(),
            volume: NOT_AVAILABLE.to_string(),
            doi: or_not_available(paper.external_ids.and_then(|ids| ids.doi)),
            link: or_not_available(paper.url),
            open_access: paper.open_access_pdf.is_some(),
            affiliation_name: NOT_AVAILABLE.to_string(),
            affiliation_country: NOT_AVAILABLE.to_string(),
            abstract_text: paper.abstract_text.filter(|text| !text.trim().is_empty()),
            pdf_url: paper
                .open_access_pdf
                .and_then(|pdf| pdf.url)
                .filter(|url| !url.trim().is_empty()),
        }
    }
}

#[async_trait]
impl PaperSearch for SemanticScholarClient {
    fn source(&self) -> PaperSource {
        PaperSource::SemanticScholar
    }

    async fn search(&self, query: &PaperQuery) -> Result<Vec<Paper>, SourceError> {
        let url = join_endpoint(Self::NAME, &self.endpoint.base_url, "graph/v1/paper/search")?;
        let years = format!("{}-{}", query.start_year, Utc::now().year());

        let mut request = self.http.get(url).query(&[
            ("query", query.search_string.clone()),
            ("year", years),
            ("limit", query.limit.to_string()),
            ("fields", SEMANTIC_SCHOLAR_FIELDS.to_string()),
        ]);
        if let Some(api_key) = self
            .endpoint
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
        {
            request = request.header("x-api-key", api_key);
        }

        let page: SemanticScholarPage = fetch_json(Self::NAME, request).await?;
        let papers: Vec<Paper> = page.data.into_iter().map(Paper::from).collect();
        tracing::info!(count = papers.len(), "semantic scholar search complete");
        Ok(papers)
    }
}

/// Builds both HTTP-backed sources sharing one connection pool.
pub fn http_sources(
    scopus: SourceEndpoint,
    semantic_scholar: SourceEndpoint,
    timeout: Duration,
) -> Result<PaperSources, reqwest::Error> {
    let http = Client::builder().timeout(timeout).build()?;
    Ok(PaperSources {
        scopus: Arc::new(ScopusClient::new(http.clone(), scopus)),
        semantic_scholar: Arc::new(SemanticScholarClient::new(http, semantic_scholar)),
    })
}

#[cfg(test)]
#[path = "tests/sources_tests.rs"]
mod tests;
