use serde::Deserialize;

use super::draft::SeoDraft;
use super::html::{escape_text, tokenize, Node, Tag, TagKind};
use super::links::slugify;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Html,
    #[serde(alias = "md")]
    Markdown,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Html => "text/html; charset=utf-8",
            Self::Markdown => "text/markdown; charset=utf-8",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Markdown => "md",
        }
    }
}

pub fn file_name(draft: &SeoDraft, format: ExportFormat) -> String {
    let title = if draft.selected_title.is_empty() {
        &draft.topic
    } else {
        &draft.selected_title
    };
    let slug = slugify(title);
    let stem = if slug.is_empty() { "article" } else { slug.as_str() };
    format!("{stem}.{}", format.extension())
}

pub fn to_html_document(draft: &SeoDraft) -> String {
    let title = if draft.selected_title.is_empty() {
        draft.topic.as_str()
    } else {
        draft.selected_title.as_str()
    };
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<meta name=\"keywords\" content=\"{}\">\n</head>\n<body>\n<article>\n{}\n</article>\n</body>\n</html>\n",
        escape_text(title),
        escape_text(&draft.selected_keywords.join(", ")).replace('"', "&quot;"),
        draft.content.trim()
    )
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn block_break(out: &mut String) {
    let trimmed = out.trim_end_matches(' ').len();
    out.truncate(trimmed);
    if out.is_empty() || out.ends_with("\n\n") {
        return;
    }
    if out.ends_with('\n') {
        out.push('\n');
    } else {
        out.push_str("\n\n");
    }
}

/// Converts the generated article to Markdown: headings, paragraphs, lists,
/// links, images and emphasis. Unknown tags are dropped, their text kept.
pub fn html_to_markdown(html: &str) -> String {
    let mut out = String::new();
    let mut link_stack: Vec<Option<String>> = Vec::new();
    let mut skip_depth = 0usize;

    for node in tokenize(html) {
        let tag: Tag = match node {
            Node::Text(text) => {
                if skip_depth == 0 {
                    let text = decode_entities(&text);
                    if out.ends_with('\n') || out.is_empty() {
                        out.push_str(text.trim_start());
                    } else {
                        out.push_str(&text);
                    }
                }
                continue;
            }
            Node::Comment(_) => continue,
            Node::Tag(tag) => tag,
        };

        match (tag.name.as_str(), tag.kind) {
            ("script" | "style" | "figcaption", TagKind::Open) => skip_depth += 1,
            ("script" | "style" | "figcaption", TagKind::Close) => {
                skip_depth = skip_depth.saturating_sub(1)
            }
            (name @ ("h1" | "h2" | "h3" | "h4" | "h5" | "h6"), TagKind::Open) => {
                block_break(&mut out);
                let level = name[1..].parse::<usize>().unwrap_or(1);
                out.push_str(&"#".repeat(level));
                out.push(' ');
            }
            ("p" | "ul" | "ol" | "figure" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6", _) => {
                block_break(&mut out)
            }
            ("li", TagKind::Open) => {
                if !out.ends_with('\n') && !out.is_empty() {
                    out.push('\n');
                }
                out.push_str("- ");
            }
            ("li", TagKind::Close) => out.push('\n'),
            ("br", _) => out.push_str("  \n"),
            ("strong" | "b", _) => out.push_str("**"),
            ("em" | "i", _) => out.push('*'),
            ("a", TagKind::Open) => {
                link_stack.push(tag.attr("href").map(|h| decode_entities(&h)));
                out.push('[');
            }
            ("a", TagKind::Close) => {
                let href = link_stack.pop().flatten().unwrap_or_default();
                out.push_str(&format!("]({href})"));
            }
            ("img", _) => {
                let src = tag.attr("src").map(|s| decode_entities(&s)).unwrap_or_default();
                let alt = tag.attr("alt").map(|a| decode_entities(&a)).unwrap_or_default();
                block_break(&mut out);
                out.push_str(&format!("![{alt}]({src})"));
            }
            _ => {}
        }
    }

    let mut markdown = out.trim().to_string();
    markdown.push('\n');
    markdown
}

pub fn render(draft: &SeoDraft, format: ExportFormat) -> String {
    match format {
        ExportFormat::Html => to_html_document(draft),
        ExportFormat::Markdown => html_to_markdown(&draft.content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_conversion() {
        let html = "<h1>10 Tips for SEO</h1>\n<p>Learn about <a href=\"/seo\">SEO</a> &amp; <strong>links</strong>.</p>\n<h2>Basics</h2><figure class=\"content-image\"><img src=\"https://img/1.jpg?w=1&amp;q=2\" alt=\"Basics\"><figcaption>Basics</figcaption></figure>\n<ul>\n<li>one</li>\n<li>two</li>\n</ul>\n";
        let md = html_to_markdown(html);
        assert_eq!(
            md,
            "# 10 Tips for SEO\n\nLearn about [SEO](/seo) & **links**.\n\n## Basics\n\n![Basics](https://img/1.jpg?w=1&q=2)\n\n- one\n- two\n"
        );
    }

    #[test]
    fn test_html_document_and_file_name() {
        let draft = SeoDraft {
            topic: "SEO".to_string(),
            selected_title: "10 Tips for \"SEO\"".to_string(),
            selected_keywords: vec!["a".to_string(), "b".to_string()],
            content: "<h1>x</h1>".to_string(),
            ..SeoDraft::default()
        };
        let doc = to_html_document(&draft);
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>10 Tips for \"SEO\"</title>"));
        assert!(doc.contains("content=\"a, b\""));
        assert!(doc.contains("<article>\n<h1>x</h1>\n</article>"));

        assert_eq!(file_name(&draft, ExportFormat::Markdown), "10-tips-for-seo.md");
        assert_eq!(file_name(&SeoDraft::default(), ExportFormat::Html), "article.html");
    }
}
