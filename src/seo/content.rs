use serde::{Deserialize, Serialize};

use super::html::{escape_text, text_content};
use super::outline::{parse_outline, OutlineItem};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentInput {
    pub topic: String,
    pub keywords: Vec<String>,
    pub title: String,
    pub outline: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentOptions {
    /// Build sections from the outline headings when an outline exists.
    pub use_outline: bool,
    pub paragraphs_per_section: usize,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self {
            use_outline: true,
            paragraphs_per_section: 1,
        }
    }
}

const SECTION_PARAGRAPHS: [&str; 3] = [
    "When it comes to {heading}, the details make the difference. Understanding how {topic} fits into your wider goals helps you prioritise the work that moves the needle.",
    "Start small, measure what happens and iterate. Teams that treat {heading} as an ongoing process rather than a one-off project consistently see better results.",
    "Keep your audience in mind throughout. Every decision about {topic} should make it easier for readers to find, understand and act on your content.",
];

fn section_paragraphs(heading: &str, topic: &str, count: usize) -> String {
    SECTION_PARAGRAPHS
        .iter()
        .cycle()
        .take(count.max(1))
        .map(|p| {
            format!(
                "<p>{}</p>\n",
                p.replace("{heading}", &heading.to_lowercase())
                    .replace("{topic}", topic)
            )
        })
        .collect()
}

fn intro(topic: &str, keywords: &[String]) -> String {
    let mentioned = if keywords.is_empty() {
        String::new()
    } else {
        format!(
            " We will cover {} and more.",
            keywords
                .iter()
                .take(3)
                .map(|k| escape_text(k))
                .collect::<Vec<_>>()
                .join(", ")
        )
    };
    format!(
        "<p>In today's competitive digital landscape, {topic} has become essential for businesses that want to grow their online presence. This article walks through what you need to know to get real results.{mentioned}</p>\n"
    )
}

fn template_body(topic: &str, keywords: &[String], options: &ContentOptions) -> String {
    let primary = keywords
        .first()
        .map(|k| escape_text(k))
        .unwrap_or_else(|| topic.to_string());

    let mut html = String::new();
    for heading in [
        format!("What Is {topic}?"),
        format!("Why {topic} Matters"),
    ] {
        html.push_str(&format!("<h2>{heading}</h2>\n"));
        html.push_str(&section_paragraphs(&heading, topic, options.paragraphs_per_section));
    }

    let strategies = format!("Key Strategies for {primary}");
    html.push_str(&format!("<h2>{strategies}</h2>\n"));
    html.push_str(&section_paragraphs(&strategies, topic, options.paragraphs_per_section));
    if !keywords.is_empty() {
        html.push_str("<ul>\n");
        for keyword in keywords {
            html.push_str(&format!("<li>{}</li>\n", escape_text(keyword)));
        }
        html.push_str("</ul>\n");
    }

    html.push_str("<h2>Best Practices</h2>\n");
    html.push_str(&section_paragraphs("best practices", topic, options.paragraphs_per_section));
    html.push_str("<h2>Conclusion</h2>\n");
    html.push_str(&format!(
        "<p>Investing in {topic} pays off over time. Apply these ideas consistently, track your results and refine your approach as you learn.</p>\n"
    ));
    html
}

fn outline_body(items: &[OutlineItem], topic: &str, options: &ContentOptions) -> String {
    let mut html = String::new();
    let mut in_list = false;

    for item in items {
        if in_list && !matches!(item, OutlineItem::Bullet { .. }) {
            html.push_str("</ul>\n");
            in_list = false;
        }

        match item {
            OutlineItem::Heading { level: 1, .. } => {}
            OutlineItem::Heading { level, text } => {
                let level = (*level).min(4);
                let text = escape_text(text);
                html.push_str(&format!("<h{level}>{text}</h{level}>\n"));
                html.push_str(&section_paragraphs(&text, topic, options.paragraphs_per_section));
            }
            OutlineItem::Bullet { text } => {
                if !in_list {
                    html.push_str("<ul>\n");
                    in_list = true;
                }
                html.push_str(&format!("<li>{}</li>\n", escape_text(text)));
            }
            OutlineItem::Text { text } => {
                html.push_str(&format!("<p>{}</p>\n", escape_text(text)));
            }
        }
    }

    if in_list {
        html.push_str("</ul>\n");
    }
    html
}

/// Renders the article. The outline's own H1 is replaced by the chosen
/// title, which in turn falls back to the outline H1 and then the topic.
pub fn assemble_content(input: &ContentInput, options: &ContentOptions) -> String {
    let topic = escape_text(input.topic.trim());
    let items = parse_outline(&input.outline);

    let outline_title = items.iter().find_map(|item| match item {
        OutlineItem::Heading { level: 1, text } => Some(text.as_str()),
        _ => None,
    });
    let title = [Some(input.title.trim()), outline_title, Some(input.topic.trim())]
        .into_iter()
        .flatten()
        .find(|t| !t.is_empty())
        .unwrap_or_default();

    let keywords: Vec<String> = input
        .keywords
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();

    let mut html = format!("<h1>{}</h1>\n", escape_text(title));
    html.push_str(&intro(&topic, &keywords));

    let has_sections = items
        .iter()
        .any(|item| matches!(item, OutlineItem::Heading { level, .. } if *level > 1));
    if options.use_outline && has_sections {
        html.push_str(&outline_body(&items, &topic, options));
    } else {
        html.push_str(&template_body(&topic, &keywords, options));
    }
    html
}

pub fn word_count(html: &str) -> usize {
    text_content(html).split_whitespace().count()
}

pub fn content_prompt(input: &ContentInput) -> String {
    format!(
        "Write a complete, SEO-optimized blog post in HTML titled \"{}\" about \"{}\". \
         Naturally include these keywords: {}. Follow this outline:\n{}\n\
         Use <h1> for the title, <h2>/<h3> for sections and <p>/<ul> for body text. \
         Return only the HTML.",
        input.title,
        input.topic,
        input.keywords.join(", "),
        input.outline
    )
}
