//! Prompt construction for each generation task.

use shared::domain::{Paper, QuestionAnswer};

use crate::llm::ChatMessage;

const ANSWER_PREVIEW_CHARS: usize = 150;

const QUESTION_ASSISTANT: &str = "You are a helpful assistant capable of generating research questions along with their purposes for a systematic literature review.";

pub fn research_questions(objective: &str, num_questions: u32) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(QUESTION_ASSISTANT),
        ChatMessage::user(format!(
            "{QUESTION_ASSISTANT}\nGiven the research objective: '{objective}', generate {num_questions} distinct research questions, \
             each followed by its specific purpose. Start purpose with 'Purpose: To examine', or 'Purpose: To investigate'."
        )),
    ]
}

pub fn search_string(objective: &str, questions: &[String]) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You are a helpful assistant that generates academic search strings."),
        ChatMessage::user(format!(
            "Given the research objective: '{objective}', and the following research questions: {}, \
             generate one concise and effective search string for identifying relevant literature for a systematic literature review. \
             The search string should use appropriate keywords and boolean operators (like AND, OR). \
             Provide only the search string itself without any extra explanation or numbering.",
            questions.join(", ")
        )),
    ]
}

pub fn relevance(title: &str, search_string: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You are an assistant that determines paper relevance."),
        ChatMessage::user(format!(
            "Determine if the paper titled '{title}' is relevant to the research topic described by '{search_string}'. \
             Respond with 'Relevant' or 'Not Relevant' only."
        )),
    ]
}

pub fn papers_context(papers: &[Paper]) -> String {
    if papers.is_empty() {
        return "No paper information provided.".to_string();
    }
    papers
        .iter()
        .map(|paper| {
            format!(
                "- Title: '{}', Author(s): {}, Year: {}.",
                paper.title, paper.creator, paper.year
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn answer(question: &str, papers: &[Paper]) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You are a knowledgeable assistant who can answer research questions based on provided papers information.",
        ),
        ChatMessage::system(format!(
            "Research Question: {question}\n\nPapers Information:\n{}",
            papers_context(papers)
        )),
        ChatMessage::user(
            "Based on the provided papers information, please answer the research question. \
             If possible, cite relevant paper titles or authors for cross-verification. \
             Provide a comprehensive answer.",
        ),
    ]
}

fn summary(prompt: String) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You are a helpful assistant."),
        ChatMessage::user(prompt),
    ]
}

pub fn abstract_summary(questions: &[String], objective: &str, search_string: &str) -> Vec<ChatMessage> {
    let questions = if questions.is_empty() {
        "No research questions provided.".to_string()
    } else {
        questions.join("; ")
    };
    let objective = or_placeholder(objective, "No objective provided.");
    let search_string = or_placeholder(search_string, "No search string provided.");
    summary(format!(
        "Based on the research questions: '{questions}', the objective: '{objective}', \
         and the search string: '{search_string}', generate a comprehensive abstract."
    ))
}

pub struct IntroductionInput<'a> {
    pub total_papers: usize,
    pub filtered_papers: usize,
    pub search_string: &'a str,
    pub objective: &'a str,
    pub questions: &'a [String],
    pub answers: &'a [QuestionAnswer],
}

pub fn introduction_summary(input: &IntroductionInput<'_>) -> Vec<ChatMessage> {
    let questions = input
        .questions
        .iter()
        .map(|question| format!("- {question}"))
        .collect::<Vec<_>>()
        .join("\n");
    let findings = input
        .answers
        .iter()
        .map(|answer| {
            format!(
                "- For question '{}': {}",
                answer.question,
                preview(&answer.answer, ANSWER_PREVIEW_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    summary(format!(
        "This document synthesizes findings. Initially, {} papers related to \"{}\" were considered. \
         After filtering, {} papers were thoroughly examined. The primary research objective is: {}.\
         \n\nKey Research Questions Addressed:\n{questions}\
         \n\nSummary of Key Findings:\n{findings}\
         \n\nBased on this information, generate a coherent introduction and high-level summary of the findings for a research paper section.",
        input.total_papers, input.search_string, input.filtered_papers, input.objective
    ))
}

pub fn conclusion_summary(papers: &[Paper]) -> Vec<ChatMessage> {
    let mut parts = vec!["Summarize the conclusions of the following papers:".to_string()];
    parts.extend(
        papers
            .iter()
            .map(|paper| format!("- '{}' by {} ({})", paper.title, paper.creator, paper.year)),
    );
    summary(parts.join(" "))
}

/// Truncates on a char boundary and marks the cut with `...`.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_answers_only() {
        assert_eq!(preview("short", 150), "short");
        let long = "x".repeat(151);
        let cut = preview(&long, 150);
        assert_eq!(cut.len(), 153);
        assert!(cut.ends_with("..."));
        assert_eq!(preview("ééé", 2), "éé...");
    }

    #[test]
    fn empty_paper_list_has_explicit_context() {
        assert_eq!(papers_context(&[]), "No paper information provided.");
    }

    #[test]
    fn answer_prompt_lists_each_paper() {
        let papers = vec![Paper {
            title: "Copilot in practice".into(),
            creator: "Doe J.".into(),
            year: "2024".into(),
            ..Paper::default()
        }];
        let messages = answer("What is known?", &papers);
        assert_eq!(messages.len(), 3);
        assert!(messages[1]
            .content
            .contains("- Title: 'Copilot in practice', Author(s): Doe J., Year: 2024."));
        assert_eq!(messages[2].role, "user");
    }

    #[test]
    fn introduction_prompt_reports_counts_and_trimmed_findings() {
        let questions = vec!["RQ1".to_string()];
        let answers = vec![QuestionAnswer {
            question: "RQ1".into(),
            answer: "a".repeat(200),
            error: false,
        }];
        let messages = introduction_summary(&IntroductionInput {
            total_papers: 10,
            filtered_papers: 4,
            search_string: "llm AND testing",
            objective: "study llms",
            questions: &questions,
            answers: &answers,
        });
        let prompt = &messages[1].content;
        assert!(prompt.contains("Initially, 10 papers related to \"llm AND testing\""));
        assert!(prompt.contains("After filtering, 4 papers"));
        assert!(prompt.contains("- RQ1"));
        assert!(prompt.contains(&format!("- For question 'RQ1': {}...", "a".repeat(150))));
    }

    #[test]
    fn abstract_prompt_uses_placeholders_for_missing_inputs() {
        let messages = abstract_summary(&[], "", "");
        let prompt = &messages[1].content;
        assert!(prompt.contains("No research questions provided."));
        assert!(prompt.contains("No objective provided."));
        assert!(prompt.contains("No search string provided."));
    }
}
