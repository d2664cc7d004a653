//! LaTeX rendering of the accumulated summaries.

use shared::protocol::{DOCUMENT_CONTENT_TYPE, DOCUMENT_FILENAME};

const MISSING_ABSTRACT: &str = "No abstract provided.";
const MISSING_INTRODUCTION: &str = "No introduction provided.";
const MISSING_CONCLUSION: &str = "No conclusion provided.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

pub fn compose(
    abstract_summary: Option<&str>,
    introduction: Option<&str>,
    conclusion: Option<&str>,
) -> ComposedDocument {
    let source = format!(
        "\\documentclass[11pt]{{article}}\n\
         \\usepackage[utf8]{{inputenc}}\n\
         \\usepackage[T1]{{fontenc}}\n\
         \\title{{Systematic Literature Review Summary}}\n\
         \\date{{\\today}}\n\
         \\begin{{document}}\n\
         \\maketitle\n\
         \n\
         \\begin{{abstract}}\n{}\n\\end{{abstract}}\n\
         \n\
         \\section{{Introduction}}\n{}\n\
         \n\
         \\section{{Conclusion}}\n{}\n\
         \n\
         \\end{{document}}\n",
        section(abstract_summary, MISSING_ABSTRACT),
        section(introduction, MISSING_INTRODUCTION),
        section(conclusion, MISSING_CONCLUSION),
    );

    ComposedDocument {
        filename: DOCUMENT_FILENAME.to_string(),
        content_type: DOCUMENT_CONTENT_TYPE,
        bytes: source.into_bytes(),
    }
}

fn section(text: Option<&str>, missing: &str) -> String {
    escape_latex(
        text.map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or(missing),
    )
}

/// Escapes characters with special meaning in LaTeX body text.
pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(ch);
            }
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            _ => out.push(ch),
        }
    }
    out
}
