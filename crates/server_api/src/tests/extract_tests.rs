use super::*;

#[test]
fn pairs_labelled_questions_with_their_purposes() {
    let reply = "Here are the questions:\n\n\
        Research Question 1: How are LLMs used in code review?\n\
        Purpose: To examine adoption of LLMs in review workflows.\n\
        \n\
        Research Question 2: What risks do LLM-generated tests carry?\n\
        Purpose: To investigate test quality issues.";

    let questions = parse_questions(reply, 2);

    assert_eq!(
        questions,
        vec![
            ResearchQuestion::new(
                "How are LLMs used in code review?",
                "To examine adoption of LLMs in review workflows."
            ),
            ResearchQuestion::new(
                "What risks do LLM-generated tests carry?",
                "To investigate test quality issues."
            ),
        ]
    );
}

#[test]
fn handles_markdown_numbering_and_lowercase_purpose() {
    let reply = "1. **Research Question 1:** Which tools dominate?\n   purpose: To examine tool usage.";
    let questions = parse_questions(reply, 1);
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].question, "Which tools dominate?");
    assert_eq!(questions[0].purpose, "To examine tool usage.");
}

#[test]
fn truncates_to_requested_count() {
    let reply = "Q one?\nPurpose: p1\nQ two?\nPurpose: p2\nQ three?\nPurpose: p3";
    assert_eq!(parse_questions(reply, 2).len(), 2);
}

#[test]
fn falls_back_to_consecutive_lines_without_purpose_markers() {
    let reply = "What is A?\nTo examine A.\nWhat is B?\nTo examine B.";
    let questions = parse_questions(reply, 2);
    assert_eq!(questions[1], ResearchQuestion::new("What is B?", "To examine B."));
}

#[test]
fn unusable_reply_yields_nothing() {
    assert!(parse_questions("I cannot help with that.", 3).is_empty());
    assert!(parse_questions("", 1).is_empty());
}

#[test]
fn keeps_questions_that_start_with_the_word_question() {
    assert_eq!(
        strip_question_label("Questions remain about scale?"),
        "Questions remain about scale?"
    );
    assert_eq!(strip_question_label("Question 3: Why?"), "Why?");
}

#[test]
fn search_string_prefers_boolean_lines_over_chatter() {
    let reply = "Sure! Here is a search string:\n(\"large language model\" OR LLM) AND \"software development\"\nGood luck.";
    assert_eq!(
        extract_search_string(reply),
        "(\"large language model\" OR LLM) AND \"software development\""
    );
}

#[test]
fn search_string_prefers_fully_quoted_line() {
    let reply = "\"LLM AND testing\"";
    assert_eq!(extract_search_string(reply), "\"LLM AND testing\"");
}

#[test]
fn search_string_strips_numbering_and_falls_back_to_first_line() {
    assert_eq!(
        extract_search_string("1. llm software engineering\nsecond line"),
        "llm software engineering"
    );
    assert_eq!(extract_search_string("plain"), "plain");
}

#[test]
fn relevance_verdicts() {
    assert!(classify_relevance("Relevant"));
    assert!(classify_relevance("relevant."));
    assert!(!classify_relevance("Not Relevant"));
    assert!(!classify_relevance("I am unsure."));
}
