use super::*;
use axum::{extract::Query, http::HeaderMap, routing::get, Json, Router};
use std::collections::HashMap;
use tokio::{net::TcpListener, sync::Mutex};

type Seen = Arc<Mutex<Option<(HashMap<String, String>, HeaderMap)>>>;

async fn spawn_source(path: &'static str, reply: serde_json::Value) -> (String, Seen) {
    let seen: Seen = Arc::new(Mutex::new(None));
    let state = seen.clone();
    let app = Router::new().route(
        path,
        get(
            move |Query(params): Query<HashMap<String, String>>, headers: HeaderMap| {
                let state = state.clone();
                let reply = reply.clone();
                async move {
                    *state.lock().await = Some((params, headers));
                    Json(reply)
                }
            },
        ),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (format!("http://{addr}"), seen)
}

fn query() -> PaperQuery {
    PaperQuery {
        search_string: "\"LLM\" AND testing".to_string(),
        start_year: 2023,
        limit: 5,
    }
}

#[tokio::test]
async fn scopus_search_builds_query_and_maps_entries() {
    let (base_url, seen) = spawn_source(
        "/content/search/scopus",
        serde_json::json!({
            "search-results": {
                "entry": [{
                    "dc:identifier": "SCOPUS_ID:123",
                    "dc:title": "Testing with LLMs",
                    "dc:creator": "Smith A.",
                    "prism:coverDate": "2023-06-01",
                    "prism:publicationName": "Empirical SE",
                    "prism:aggregationType": "Journal",
                    "prism:doi": "10.1000/xyz",
                    "openaccess": "1",
                    "affiliation": [
                        { "affilname": "Uni A", "affiliation-country": "Sweden" },
                        { "affilname": "Uni B", "affiliation-country": "Chile" }
                    ],
                    "link": [
                        { "@ref": "self", "@href": "https://api/self" },
                        { "@ref": "scopus", "@href": "https://scopus/record" }
                    ]
                }]
            }
        }),
    )
    .await;
    let client = ScopusClient::new(
        Client::new(),
        SourceEndpoint {
            base_url,
            api_key: Some("els-key".to_string()),
        },
    );

    let papers = client.search(&query()).await.expect("papers");

    assert_eq!(papers.len(), 1);
    let paper = &papers[0];
    assert_eq!(paper.identifier, "SCOPUS_ID:123");
    assert_eq!(paper.year, "2023");
    assert_eq!(paper.link, "https://scopus/record");
    assert_eq!(paper.affiliation_name, "Uni A");
    assert_eq!(paper.affiliation_country, "Sweden");
    assert!(paper.open_access);
    assert_eq!(paper.volume, NOT_AVAILABLE);

    let (params, headers) = seen.lock().await.take().expect("request seen");
    assert_eq!(
        params.get("query").map(String::as_str),
        Some("TITLE-ABS-KEY(\"LLM\" AND testing) AND PUBYEAR = 2023")
    );
    assert_eq!(params.get("count").map(String::as_str), Some("5"));
    assert_eq!(
        headers.get("x-els-apikey").and_then(|v| v.to_str().ok()),
        Some("els-key")
    );
}

#[tokio::test]
async fn scopus_empty_result_marker_is_not_a_paper() {
    let (base_url, _seen) = spawn_source(
        "/content/search/scopus",
        serde_json::json!({
            "search-results": { "entry": [{ "@_fa": "true", "error": "Result set was empty" }] }
        }),
    )
    .await;
    let client = ScopusClient::new(
        Client::new(),
        SourceEndpoint {
            base_url,
            api_key: Some("k".to_string()),
        },
    );
    assert!(client.search(&query()).await.expect("papers").is_empty());
}

#[tokio::test]
async fn scopus_requires_api_key() {
    let client = ScopusClient::new(
        Client::new(),
        SourceEndpoint {
            base_url: SCOPUS_BASE_URL.to_string(),
            api_key: None,
        },
    );
    let err = client.search(&query()).await.expect_err("should fail");
    assert!(matches!(err, SourceError::MissingApiKey("Scopus")));
}

#[tokio::test]
async fn semantic_scholar_maps_authors_venue_and_pdf() {
    let (base_url, seen) = spawn_source(
        "/graph/v1/paper/search",
        serde_json::json!({
            "total": 1,
            "data": [{
                "paperId": "abc123",
                "title": "Code generation survey",
                "authors": [{ "name": "A. One" }, { "name": "B. Two" }],
                "year": 2024,
                "url": "https://s2/abc123",
                "venue": "Journal of Systems and Software",
                "abstract": "We survey.",
                "externalIds": { "DOI": "10.2/abc" },
                "openAccessPdf": { "url": "https://pdf/abc.pdf" }
            }, {
                "paperId": "def456",
                "title": "Workshop paper",
                "authors": [],
                "year": null,
                "venue": "ICSE Workshops",
                "abstract": null,
                "externalIds": {},
                "openAccessPdf": null
            }]
        }),
    )
    .await;
    let client = SemanticScholarClient::new(
        Client::new(),
        SourceEndpoint {
            base_url,
            api_key: None,
        },
    );

    let papers = client.search(&query()).await.expect("papers");

    assert_eq!(papers.len(), 2);
    assert_eq!(papers[0].creator, "A. One, B. Two");
    assert_eq!(papers[0].aggregation_type, "Journal");
    assert_eq!(papers[0].doi, "10.2/abc");
    assert_eq!(papers[0].pdf_url.as_deref(), Some("https://pdf/abc.pdf"));
    assert_eq!(papers[0].abstract_text.as_deref(), Some("We survey."));
    assert_eq!(papers[1].aggregation_type, "Conference");
    assert_eq!(papers[1].creator, NOT_AVAILABLE);
    assert_eq!(papers[1].year, NOT_AVAILABLE);
    assert!(!papers[1].open_access);

    let (params, headers) = seen.lock().await.take().expect("request seen");
    let expected_years = format!("2023-{}", Utc::now().year());
    assert_eq!(params.get("year"), Some(&expected_years));
    assert_eq!(params.get("limit").map(String::as_str), Some("5"));
    assert!(headers.get("x-api-key").is_none());
}

#[tokio::test]
async fn non_success_status_carries_body() {
    let app = Router::new().route(
        "/content/search/scopus",
        get(|| async { (axum::http::StatusCode::UNAUTHORIZED, "bad key") }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    let client = ScopusClient::new(
        Client::new(),
        SourceEndpoint {
            base_url: format!("http://{addr}/"),
            api_key: Some("k".to_string()),
        },
    );
    let err = client.search(&query()).await.expect_err("should fail");
    assert!(
        matches!(err, SourceError::Status { status: 401, ref body, .. } if body == "bad key"),
        "unexpected error: {err}"
    );
}

#[test]
fn joins_paths_onto_base_urls_with_or_without_trailing_slash() {
    let a = join_endpoint("x", "https://example.org/proxy", "content/search/scopus").expect("url");
    let b = join_endpoint("x", "https://example.org/proxy/", "content/search/scopus").expect("url");
    assert_eq!(a.as_str(), "https://example.org/proxy/content/search/scopus");
    assert_eq!(a, b);
    assert!(join_endpoint("x", "not a url", "p").is_err());
}
