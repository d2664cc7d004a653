//! Parsing of free-form model replies into structured values.

use shared::domain::ResearchQuestion;

const PURPOSE_PREFIX: &str = "purpose:";
const MISSING_PURPOSE: &str = "Purpose not provided";

/// Pairs question lines with the `Purpose:` line that follows them.
///
/// When the reply carries no recognisable `Purpose:` markers, consecutive
/// lines are paired instead, provided there are enough of them. Returns at
/// most `count` pairs; an empty result means the reply was unusable.
pub fn parse_questions(content: &str, count: usize) -> Vec<ResearchQuestion> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut pairs = Vec::new();
    let mut pending: Option<String> = None;
    for line in &lines {
        let cleaned = strip_decoration(line);
        if let Some(purpose) = strip_purpose(cleaned) {
            if let Some(question) = pending.take() {
                pairs.push(ResearchQuestion::new(question, purpose));
            }
        } else {
            let question = strip_question_label(cleaned);
            if !question.is_empty() {
                pending = Some(question.to_string());
            }
        }
    }

    if pairs.is_empty() && count > 0 && lines.len() >= count * 2 {
        for chunk in lines[..count * 2].chunks(2) {
            let question = strip_question_label(strip_decoration(chunk[0])).to_string();
            let purpose = chunk
                .get(1)
                .map(|line| {
                    let cleaned = strip_decoration(line);
                    strip_purpose(cleaned).unwrap_or(cleaned).to_string()
                })
                .unwrap_or_else(|| MISSING_PURPOSE.to_string());
            pairs.push(ResearchQuestion::new(question, purpose));
        }
    }

    pairs.truncate(count);
    pairs
}

/// Picks the search string out of a reply that may include chatter.
pub fn extract_search_string(content: &str) -> String {
    let candidate = content
        .lines()
        .map(|line| line.replace("1. ", "").replace("2. ", "").trim().to_string())
        .find(|line| {
            let fully_quoted = line.len() >= 2 && line.starts_with('"') && line.ends_with('"');
            let upper = line.to_ascii_uppercase();
            let has_operator = [" AND ", " OR ", " NOT "]
                .iter()
                .any(|op| upper.contains(op));
            fully_quoted || (has_operator && line.len() > 10)
        })
        .or_else(|| {
            content
                .lines()
                .next()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| content.to_string());

    let trimmed = candidate.trim();
    trimmed
        .strip_prefix("1. ")
        .or_else(|| trimmed.strip_prefix("2. "))
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

/// Reads a relevance verdict. Anything other than a clear "Relevant" counts as
/// not relevant.
pub fn classify_relevance(reply: &str) -> bool {
    let reply = reply.to_ascii_lowercase();
    if reply.contains("not relevant") {
        false
    } else {
        reply.contains("relevant")
    }
}

fn strip_decoration(line: &str) -> &str {
    let line = line.trim_start_matches(['*', '#', '-', '•', ' ']);
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    let line = if digits > 0 {
        let rest = &line[digits..];
        rest.strip_prefix('.')
            .or_else(|| rest.strip_prefix(')'))
            .map(str::trim_start)
            .unwrap_or(line)
    } else {
        line
    };
    line.trim_start_matches(['*', ' ']).trim_end_matches(['*', ' '])
}

fn strip_purpose(line: &str) -> Option<&str> {
    let head = line.get(..PURPOSE_PREFIX.len())?;
    if head.eq_ignore_ascii_case(PURPOSE_PREFIX) {
        Some(line[PURPOSE_PREFIX.len()..].trim_matches(['*', ' ']))
    } else {
        None
    }
}

/// Removes any number of leading `Research Question N:` / `Question N:` labels.
fn strip_question_label(mut line: &str) -> &str {
    loop {
        let lower = line.to_ascii_lowercase();
        let label_len = ["research question", "question"]
            .iter()
            .find(|label| lower.starts_with(*label))
            .map(|label| label.len());
        let Some(label_len) = label_len else {
            return line;
        };
        let rest = line[label_len..].trim_start();
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        let rest = &rest[digits..];
        let after_colon = rest.strip_prefix(':').unwrap_or(rest);
        let stripped = after_colon.trim_start_matches(['*', ' ']);
        // A bare word "Question..." without number or colon is part of the text.
        if digits == 0 && after_colon.len() == rest.len() {
            return line;
        }
        line = stripped;
    }
}

#[cfg(test)]
#[path = "tests/extract_tests.rs"]
mod tests;
