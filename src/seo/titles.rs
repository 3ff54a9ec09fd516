const TITLE_TEMPLATES: [&str; 8] = [
    "The Ultimate Guide to {topic}",
    "{count} Proven {Topic} Strategies That Actually Work",
    "{Topic}: Everything You Need to Know",
    "How to Master {topic} in {year_hint}",
    "{Topic} for Beginners: A Step-by-Step Guide",
    "Why {topic} Matters More Than Ever",
    "{Topic} Best Practices: {keyword} and Beyond",
    "The Complete {Topic} Checklist",
];

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Templated candidate titles. The first keyword (or the topic) fills the
/// `{keyword}` slot.
pub fn mock_titles(topic: &str, keywords: &[String], count: usize) -> Vec<String> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Vec::new();
    }

    let topic_title = title_case(topic);
    let keyword = keywords
        .iter()
        .map(|k| k.trim())
        .find(|k| !k.is_empty())
        .map(title_case)
        .unwrap_or_else(|| topic_title.clone());

    TITLE_TEMPLATES
        .iter()
        .take(count)
        .map(|template| {
            template
                .replace("{topic}", &topic.to_lowercase())
                .replace("{Topic}", &topic_title)
                .replace("{keyword}", &keyword)
                .replace("{count}", "10")
                .replace("{year_hint}", "30 Days")
        })
        .collect()
}

pub fn title_prompt(topic: &str, keywords: &[String], count: usize) -> String {
    format!(
        "Write {count} engaging, click-worthy blog post titles about \"{topic}\" \
         that naturally include some of these keywords: {}. \
         Keep each under 60 characters. Return one title per line with no numbering.",
        keywords.join(", ")
    )
}
