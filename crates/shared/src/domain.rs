use serde::{Deserialize, Serialize};

/// Placeholder used by the bibliographic sources for absent fields.
pub const NOT_AVAILABLE: &str = "Not Available";

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelOption {
    pub value: &'static str,
    pub label: &'static str,
}

pub const KNOWN_MODELS: &[ModelOption] = &[
    ModelOption {
        value: "gpt-3.5-turbo",
        label: "GPT-3.5 Turbo (OpenAI)",
    },
    ModelOption {
        value: "gpt-4-turbo-preview",
        label: "GPT-4 Turbo Preview (OpenAI)",
    },
    ModelOption {
        value: "gpt-4.1",
        label: "GPT-4.1 (OpenAI)",
    },
    ModelOption {
        value: "deepseek-chat",
        label: "DeepSeek Chat (General)",
    },
    ModelOption {
        value: "deepseek-coder",
        label: "DeepSeek Coder (Specific)",
    },
];

pub fn model_label(model: &str) -> &str {
    KNOWN_MODELS
        .iter()
        .find(|option| option.value == model)
        .map(|option| option.label)
        .unwrap_or(model)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    OpenAi,
    DeepSeek,
}

impl ModelFamily {
    /// Providers are chosen by model name prefix; unknown prefixes are unsupported.
    pub fn for_model(model: &str) -> Option<Self> {
        let model = model.trim().to_ascii_lowercase();
        if model.starts_with("gpt") {
            Some(Self::OpenAi)
        } else if model.starts_with("deepseek") {
            Some(Self::DeepSeek)
        } else {
            None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::DeepSeek => "DeepSeek",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperSource {
    #[default]
    Scopus,
    #[serde(alias = "semanticscholar")]
    SemanticScholar,
}

impl PaperSource {
    pub const ALL: [PaperSource; 2] = [PaperSource::Scopus, PaperSource::SemanticScholar];

    pub fn label(self) -> &'static str {
        match self {
            Self::Scopus => "Scopus",
            Self::SemanticScholar => "Semantic Scholar",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchQuestion {
    pub question: String,
    pub purpose: String,
}

impl ResearchQuestion {
    pub fn new(question: impl Into<String>, purpose: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            purpose: purpose.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

/// A bibliographic record normalised from any supported source.
///
/// Field names on the wire follow the Scopus search API so that records from
/// both sources can be fed back to the server unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paper {
    pub identifier: String,
    pub title: String,
    pub creator: String,
    pub year: String,
    #[serde(rename = "publicationName")]
    pub publication_name: String,
    #[serde(rename = "aggregationType")]
    pub aggregation_type: String,
    pub volume: String,
    pub doi: String,
    pub link: String,
    #[serde(rename = "openaccess")]
    pub open_access: bool,
    #[serde(rename = "affilname")]
    pub affiliation_name: String,
    #[serde(rename = "affiliation-country")]
    pub affiliation_country: String,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
}

impl Default for Paper {
    fn default() -> Self {
        Self {
            identifier: NOT_AVAILABLE.to_string(),
            title: NOT_AVAILABLE.to_string(),
            creator: NOT_AVAILABLE.to_string(),
            year: NOT_AVAILABLE.to_string(),
            publication_name: NOT_AVAILABLE.to_string(),
            aggregation_type: NOT_AVAILABLE.to_string(),
            volume: NOT_AVAILABLE.to_string(),
            doi: NOT_AVAILABLE.to_string(),
            link: NOT_AVAILABLE.to_string(),
            open_access: false,
            affiliation_name: NOT_AVAILABLE.to_string(),
            affiliation_country: NOT_AVAILABLE.to_string(),
            abstract_text: None,
            pdf_url: None,
        }
    }
}

impl Paper {
    pub fn has_title(&self) -> bool {
        is_present(&self.title)
    }
}

pub fn is_present(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != NOT_AVAILABLE
}
