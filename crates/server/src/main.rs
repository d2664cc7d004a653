use std::{net::SocketAddr, path::Path, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use server_api::{
    answer_questions, compose_document, filter_papers, generate_abstract, generate_conclusion,
    generate_introduction, generate_research_questions, generate_search_string,
    llm::HttpChatClient, search_papers, sources::http_sources, status_for, ApiContext,
};
use shared::{
    error::ApiError,
    protocol::{
        AbstractSummaryRequest, AbstractSummaryResponse, AnswerQuestionsRequest,
        AnswerQuestionsResponse, ComposeDocumentRequest, ConclusionSummaryRequest,
        ConclusionSummaryResponse, FilterPapersRequest, FilterPapersResponse,
        GenerateQuestionsRequest, GenerateQuestionsResponse, GenerateSearchStringRequest,
        GenerateSearchStringResponse, IntroductionSummaryRequest, IntroductionSummaryResponse,
        SearchPapersRequest, ANSWER_QUESTIONS_ROUTE, COMPOSE_DOCUMENT_ROUTE, FILTER_PAPERS_ROUTE,
        GENERATE_QUESTIONS_ROUTE, GENERATE_SEARCH_STRING_ROUTE, HEALTHZ_ROUTE,
        SEARCH_PAPERS_ROUTE, SUMMARY_ABSTRACT_ROUTE, SUMMARY_CONCLUSION_ROUTE,
        SUMMARY_INTRODUCTION_ROUTE,
    },
};
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    services::{ServeDir, ServeFile},
};
use tracing::{error, info, warn};

mod config;

use config::{load_settings, Settings};

struct AppState {
    api: ApiContext,
}

type HttpResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings()?;
    warn_missing_keys(&settings);

    let llm = HttpChatClient::new(settings.llm_config())?;
    let sources = http_sources(
        settings.scopus_endpoint(),
        settings.semantic_scholar_endpoint(),
        settings.source_timeout(),
    )?;
    let mut api = ApiContext::new(Arc::new(llm), sources);
    api.default_model = settings.default_model.clone();

    let app = build_router(
        Arc::new(AppState { api }),
        settings.body_limit_bytes,
        settings.static_dir.as_deref(),
    );

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, default_model = %settings.default_model, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn warn_missing_keys(settings: &Settings) {
    let keys = [
        ("OPENAI_API_KEY", settings.openai_api_key.is_some()),
        ("DEEPSEEK_API_KEY", settings.deepseek_api_key.is_some()),
        ("SCOPUS_API_KEY", settings.scopus_api_key.is_some()),
    ];
    for (name, present) in keys {
        if !present {
            warn!(key = name, "api key not configured; dependent requests will fail");
        }
    }
}

fn build_router(state: Arc<AppState>, body_limit: usize, static_dir: Option<&Path>) -> Router {
    let api = Router::new()
        .route(HEALTHZ_ROUTE, get(healthz))
        .route(GENERATE_QUESTIONS_ROUTE, post(http_generate_questions))
        .route(GENERATE_SEARCH_STRING_ROUTE, post(http_generate_search_string))
        .route(SEARCH_PAPERS_ROUTE, post(http_search_papers))
        .route(FILTER_PAPERS_ROUTE, post(http_filter_papers))
        .route(ANSWER_QUESTIONS_ROUTE, post(http_answer_questions))
        .route(SUMMARY_ABSTRACT_ROUTE, post(http_summary_abstract))
        .route(SUMMARY_INTRODUCTION_ROUTE, post(http_summary_introduction))
        .route(SUMMARY_CONCLUSION_ROUTE, post(http_summary_conclusion))
        .route(COMPOSE_DOCUMENT_ROUTE, post(http_compose_document))
        .with_state(state);

    let app = match static_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "serving static front-end");
            api.fallback_service(
                ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
            )
        }
        None => api,
    };

    app.layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(CorsLayer::permissive())
}

fn reject(error: ApiError) -> (StatusCode, Json<ApiError>) {
    let status =
        StatusCode::from_u16(status_for(error.code)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(code = ?error.code, message = %error.message, "request failed");
    }
    (status, Json(error))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_generate_questions(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateQuestionsRequest>,
) -> HttpResult<GenerateQuestionsResponse> {
    let research_questions = generate_research_questions(&state.api, &req)
        .await
        .map_err(reject)?;
    Ok(Json(GenerateQuestionsResponse { research_questions }))
}

async fn http_generate_search_string(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateSearchStringRequest>,
) -> HttpResult<GenerateSearchStringResponse> {
    let search_string = generate_search_string(&state.api, &req)
        .await
        .map_err(reject)?;
    Ok(Json(GenerateSearchStringResponse { search_string }))
}

async fn http_search_papers(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchPapersRequest>,
) -> HttpResult<Vec<shared::domain::Paper>> {
    let papers = search_papers(&state.api, &req).await.map_err(reject)?;
    Ok(Json(papers))
}

async fn http_filter_papers(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FilterPapersRequest>,
) -> HttpResult<FilterPapersResponse> {
    let filtered_papers = filter_papers(&state.api, &req).await.map_err(reject)?;
    Ok(Json(FilterPapersResponse { filtered_papers }))
}

async fn http_answer_questions(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnswerQuestionsRequest>,
) -> HttpResult<AnswerQuestionsResponse> {
    let answers = answer_questions(&state.api, &req).await.map_err(reject)?;
    Ok(Json(AnswerQuestionsResponse { answers }))
}

async fn http_summary_abstract(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AbstractSummaryRequest>,
) -> HttpResult<AbstractSummaryResponse> {
    let summary_abstract = generate_abstract(&state.api, &req).await.map_err(reject)?;
    Ok(Json(AbstractSummaryResponse { summary_abstract }))
}

async fn http_summary_introduction(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IntroductionSummaryRequest>,
) -> HttpResult<IntroductionSummaryResponse> {
    let introduction_summary = generate_introduction(&state.api, &req)
        .await
        .map_err(reject)?;
    Ok(Json(IntroductionSummaryResponse {
        introduction_summary,
    }))
}

async fn http_summary_conclusion(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConclusionSummaryRequest>,
) -> HttpResult<ConclusionSummaryResponse> {
    let summary_conclusion = generate_conclusion(&state.api, &req)
        .await
        .map_err(reject)?;
    Ok(Json(ConclusionSummaryResponse { summary_conclusion }))
}

async fn http_compose_document(Json(req): Json<ComposeDocumentRequest>) -> impl IntoResponse {
    let document = compose_document(&req);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(document.content_type),
    );
    if let Ok(value) =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", document.filename))
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    (StatusCode::OK, headers, document.bytes)
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
