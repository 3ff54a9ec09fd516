use regex::Regex;
use std::sync::LazyLock;

static LIST_MARKER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•]+|\d+\s*[.):-]|\(\d+\))\s*").expect("Invalid list marker regex")
});

const KEYWORD_SUFFIXES: [&str; 12] = [
    "guide",
    "tips",
    "best practices",
    "for beginners",
    "strategy",
    "tools",
    "examples",
    "checklist",
    "benefits",
    "trends",
    "mistakes to avoid",
    "how to",
];

/// Templated keyword list: the topic itself followed by topic + suffix
/// variants, truncated to `count`.
pub fn mock_keywords(topic: &str, count: usize) -> Vec<String> {
    let topic = topic.trim().to_lowercase();
    if topic.is_empty() {
        return Vec::new();
    }

    std::iter::once(topic.clone())
        .chain(KEYWORD_SUFFIXES.iter().map(|suffix| {
            if *suffix == "how to" {
                format!("how to {topic}")
            } else {
                format!("{topic} {suffix}")
            }
        }))
        .take(count)
        .collect()
}

/// Splits a newline-delimited completion into clean items: strips bullet
/// and numbering markers and wrapping quotes, drops blanks and duplicates.
pub fn parse_list_response(response: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for line in response.lines() {
        let cleaned = LIST_MARKER_REGEX.replace(line, "");
        let cleaned = cleaned
            .trim()
            .trim_matches(|c| c == '"' || c == '\'' || c == '`')
            .trim_end_matches(',')
            .trim();
        if cleaned.is_empty() || items.iter().any(|i| i.eq_ignore_ascii_case(cleaned)) {
            continue;
        }
        items.push(cleaned.to_string());
    }
    items
}

pub fn keyword_prompt(topic: &str, count: usize) -> String {
    format!(
        "Generate {count} SEO keywords for the topic \"{topic}\". \
         Mix short-tail and long-tail phrases. \
         Return one keyword per line with no numbering or commentary."
    )
}
