//! Minimal HTML token walker used to post-process generated content.
//!
//! Content is split into text, tag and comment nodes; insertions happen on
//! the node list so markup is never matched as text and existing anchors
//! are never re-wrapped.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use super::links::LinkSuggestion;

static ATTR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/=`]+))"#)
        .expect("Invalid attribute regex")
});

const VOID_ELEMENTS: [&str; 10] = [
    "area", "base", "br", "col", "hr", "img", "input", "link", "meta", "source",
];

/// Elements whose text must never receive a link.
const NO_LINK_ELEMENTS: [&str; 5] = ["a", "script", "style", "code", "pre"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Open,
    Close,
    SelfClosing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub kind: TagKind,
    raw: String,
}

impl Tag {
    fn parse(raw: &str) -> Self {
        let inner = &raw[1..raw.len() - 1];
        let (closing, body) = match inner.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, inner),
        };
        let name: String = body
            .trim_start_matches('!')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect::<String>()
            .to_ascii_lowercase();

        let kind = if closing {
            TagKind::Close
        } else if body.starts_with('!')
            || body.trim_end().ends_with('/')
            || VOID_ELEMENTS.contains(&name.as_str())
        {
            TagKind::SelfClosing
        } else {
            TagKind::Open
        };

        Self {
            name,
            kind,
            raw: raw.to_string(),
        }
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.kind != TagKind::Close && self.name == name
    }

    pub fn is_close(&self, name: &str) -> bool {
        self.kind == TagKind::Close && self.name == name
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        ATTR_REGEX.captures_iter(&self.raw).find_map(|caps| {
            let key = caps.get(1)?.as_str();
            if !key.eq_ignore_ascii_case(name) {
                return None;
            }
            caps.get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string())
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Tag(Tag),
    Comment(String),
}

/// Length of the tag starting at `s[0] == '<'`, honouring quoted attribute
/// values. `None` when `<` does not open a tag.
fn tag_len(s: &str) -> Option<usize> {
    let mut chars = s.char_indices().skip(1);
    let (_, first) = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '/' || first == '!') {
        return None;
    }

    let mut quote: Option<char> = None;
    for (i, c) in chars {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(i + 1),
            (None, '<') => return None,
            _ => {}
        }
    }
    None
}

pub fn tokenize(html: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut text = String::new();
    let mut rest = html;

    let flush = |text: &mut String, nodes: &mut Vec<Node>| {
        if !text.is_empty() {
            nodes.push(Node::Text(std::mem::take(text)));
        }
    };

    while let Some(pos) = rest.find('<') {
        text.push_str(&rest[..pos]);
        let candidate = &rest[pos..];

        if candidate.starts_with("<!--") {
            if let Some(end) = candidate.find("-->") {
                flush(&mut text, &mut nodes);
                nodes.push(Node::Comment(candidate[..end + 3].to_string()));
                rest = &candidate[end + 3..];
                continue;
            }
        } else if let Some(len) = tag_len(candidate) {
            flush(&mut text, &mut nodes);
            nodes.push(Node::Tag(Tag::parse(&candidate[..len])));
            rest = &candidate[len..];
            continue;
        }

        text.push('<');
        rest = &candidate[1..];
    }

    text.push_str(rest);
    flush(&mut text, &mut nodes);
    nodes
}

pub fn render(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Tag(tag) => out.push_str(&tag.raw),
            Node::Comment(comment) => out.push_str(comment),
        }
    }
    out
}

pub fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

/// Visible text with tags and comments removed.
pub fn text_content(html: &str) -> String {
    tokenize(html)
        .into_iter()
        .filter_map(|node| match node {
            Node::Text(text) => Some(text),
            _ => None,
        })
        .collect()
}

fn link_pattern(title: &str) -> Option<Regex> {
    let first = title.chars().next()?;
    let last = title.chars().last()?;
    let is_word = |c: char| c.is_alphanumeric() || c == '_';

    let mut pattern = String::new();
    if is_word(first) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(title));
    if is_word(last) {
        pattern.push_str(r"\b");
    }
    Regex::new(&pattern).ok()
}

fn anchor_hrefs(nodes: &[Node]) -> HashSet<String> {
    nodes
        .iter()
        .filter_map(|node| match node {
            Node::Tag(tag) if tag.is_open("a") => tag.attr("href"),
            _ => None,
        })
        .collect()
}

/// Wraps the first linkable occurrence of `title`. Returns false when the
/// title only appears inside excluded elements or not at all.
fn wrap_first(nodes: &mut Vec<Node>, pattern: &Regex, open_tag: &str) -> bool {
    let mut excluded_depth = 0usize;

    for index in 0..nodes.len() {
        let (start, end) = match &nodes[index] {
            Node::Tag(tag) if NO_LINK_ELEMENTS.contains(&tag.name.as_str()) => {
                match tag.kind {
                    TagKind::Open => excluded_depth += 1,
                    TagKind::Close => excluded_depth = excluded_depth.saturating_sub(1),
                    TagKind::SelfClosing => {}
                }
                continue;
            }
            Node::Text(text) if excluded_depth == 0 => match pattern.find(text) {
                Some(m) => (m.start(), m.end()),
                None => continue,
            },
            _ => continue,
        };

        let Node::Text(text) = nodes[index].clone() else {
            continue;
        };

        let mut replacement = Vec::with_capacity(5);
        if start > 0 {
            replacement.push(Node::Text(text[..start].to_string()));
        }
        replacement.push(Node::Tag(Tag::parse(open_tag)));
        replacement.push(Node::Text(text[start..end].to_string()));
        replacement.push(Node::Tag(Tag::parse("</a>")));
        if end < text.len() {
            replacement.push(Node::Text(text[end..].to_string()));
        }
        nodes.splice(index..=index, replacement);
        return true;
    }

    false
}

/// Wraps the first whole-word occurrence of each link title in an anchor.
/// Links whose URL is already linked are skipped, so running this twice with
/// the same list changes nothing.
pub fn insert_links_into_content(
    content: &str,
    links: &[LinkSuggestion],
    is_external: bool,
) -> String {
    let mut nodes = tokenize(content);
    let mut linked = anchor_hrefs(&nodes);

    for link in links {
        let title = link.title.trim();
        let href = escape_attr(link.url.trim());
        if title.is_empty() || href.is_empty() || linked.contains(&href) {
            continue;
        }
        let Some(pattern) = link_pattern(title) else {
            continue;
        };

        let open_tag = if is_external {
            format!(r#"<a href="{href}" target="_blank" rel="noopener noreferrer">"#)
        } else {
            format!(r#"<a href="{href}">"#)
        };

        if wrap_first(&mut nodes, &pattern, &open_tag) {
            linked.insert(href);
        }
    }

    render(&nodes)
}

/// `caption` is heading text taken from the document, so it is already
/// escaped for text content.
fn figure_nodes(src: &str, caption: &str) -> Vec<Node> {
    let caption = caption.trim();
    tokenize(&format!(
        r#"<figure class="content-image"><img src="{}" alt="{}" loading="lazy"><figcaption>{}</figcaption></figure>"#,
        escape_attr(src),
        caption.replace('"', "&quot;"),
        caption
    ))
}

fn next_is_figure(nodes: &[Node], from: usize) -> bool {
    nodes[from..]
        .iter()
        .find(|node| !matches!(node, Node::Text(t) if t.trim().is_empty()))
        .is_some_and(|node| matches!(node, Node::Tag(tag) if tag.is_open("figure")))
}

/// Places one `<figure>` after each `</h2>` until the images run out.
/// Sections that already start with a figure, and images already present,
/// are left alone.
pub fn insert_images_into_content(content: &str, images: &[String]) -> String {
    let mut nodes = tokenize(content);

    let present: HashSet<String> = nodes
        .iter()
        .filter_map(|node| match node {
            Node::Tag(tag) if tag.is_open("img") => tag.attr("src"),
            _ => None,
        })
        .collect();

    let mut pending = images
        .iter()
        .map(|src| src.trim())
        .filter(|src| !src.is_empty() && !present.contains(&escape_attr(src)))
        .peekable();

    let mut heading = String::new();
    let mut in_h2 = false;
    let mut index = 0;

    while index < nodes.len() && pending.peek().is_some() {
        let mut section_end = false;
        match &nodes[index] {
            Node::Tag(tag) if tag.is_open("h2") => {
                in_h2 = true;
                heading.clear();
            }
            Node::Text(text) if in_h2 => heading.push_str(text),
            Node::Tag(tag) if tag.is_close("h2") => {
                in_h2 = false;
                section_end = !next_is_figure(&nodes, index + 1);
            }
            _ => {}
        }

        if section_end {
            if let Some(src) = pending.next() {
                let figure = figure_nodes(src, &heading);
                let inserted = figure.len();
                nodes.splice(index + 1..index + 1, figure);
                index += inserted;
            }
        }
        index += 1;
    }

    render(&nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(title: &str, url: &str) -> LinkSuggestion {
        LinkSuggestion::new(title, url)
    }

    #[test]
    fn test_tokenize_round_trips_markup() {
        let html = r#"<h1 class="t">Hi</h1><!-- note --><p>a < b and <br/> c</p><img src='x.png'>"#;
        let nodes = tokenize(html);
        assert_eq!(render(&nodes), html);
        assert!(matches!(&nodes[0], Node::Tag(t) if t.is_open("h1")));
        assert!(nodes.iter().any(|n| matches!(n, Node::Comment(_))));
        assert!(nodes
            .iter()
            .any(|n| matches!(n, Node::Tag(t) if t.name == "img" && t.kind == TagKind::SelfClosing)));
    }

    #[test]
    fn test_quoted_gt_does_not_end_tag() {
        let nodes = tokenize(r#"<a title="a > b" href="/x">go</a>"#);
        let Node::Tag(tag) = &nodes[0] else {
            panic!("expected tag");
        };
        assert_eq!(tag.attr("title").as_deref(), Some("a > b"));
        assert_eq!(tag.attr("HREF").as_deref(), Some("/x"));
        assert_eq!(nodes.len(), 3);
    }

    #[test]
    fn test_single_link_inserted_once() {
        let out = insert_links_into_content(
            "Learn about SEO today. SEO matters.",
            &[link("SEO", "/seo")],
            false,
        );
        assert_eq!(out.matches(r#"<a href="/seo">SEO</a>"#).count(), 1);
        assert_eq!(out, r#"Learn about <a href="/seo">SEO</a> today. SEO matters."#);
    }

    #[test]
    fn test_link_insertion_is_idempotent() {
        let links = [link("SEO", "/seo"), link("content marketing", "https://example.com/cm")];
        let html = "<p>SEO and content marketing work together.</p>";
        let once = insert_links_into_content(html, &links, true);
        let twice = insert_links_into_content(&once, &links, true);
        assert_eq!(once, twice);
        assert_eq!(once.matches("<a ").count(), 2);
        assert!(once.contains(r#"target="_blank" rel="noopener noreferrer""#));
    }

    #[test]
    fn test_existing_anchor_text_is_not_wrapped() {
        let html = r#"<p><a href="/other">SEO guide</a> covers SEO basics.</p>"#;
        let out = insert_links_into_content(html, &[link("SEO", "/seo")], false);
        assert_eq!(
            out,
            r#"<p><a href="/other">SEO guide</a> covers <a href="/seo">SEO</a> basics.</p>"#
        );
    }

    #[test]
    fn test_markup_and_partial_words_are_not_matched() {
        let html = r#"<p class="seo">SEOs and seo</p>"#;
        let out = insert_links_into_content(html, &[link("seo", "/seo")], false);
        assert_eq!(out, r#"<p class="seo">SEOs and <a href="/seo">seo</a></p>"#);

        let none = insert_links_into_content("<p>SEOs only</p>", &[link("SEO", "/seo")], false);
        assert_eq!(none, "<p>SEOs only</p>");
    }

    #[test]
    fn test_link_url_is_escaped() {
        let out = insert_links_into_content(
            "Read the guide",
            &[link("guide", "/g?a=1&b=\"2\"")],
            false,
        );
        assert_eq!(
            out,
            r#"Read the <a href="/g?a=1&amp;b=&quot;2&quot;">guide</a>"#
        );
        let again = insert_links_into_content(&out, &[link("guide", "/g?a=1&b=\"2\"")], false);
        assert_eq!(again, out);
    }

    #[test]
    fn test_images_follow_h2_up_to_available_count() {
        let html = "<h1>T</h1><h2>One</h2><p>a</p><h2>Two</h2><p>b</p><h2>Three</h2>";
        let images = vec!["https://img/1.jpg".to_string(), "https://img/2.jpg".to_string()];
        let out = insert_images_into_content(html, &images);

        assert_eq!(out.matches("<figure").count(), 2);
        assert!(out.contains(
            r#"<h2>One</h2><figure class="content-image"><img src="https://img/1.jpg" alt="One" loading="lazy"><figcaption>One</figcaption></figure>"#
        ));
        assert!(out.contains(r#"<h2>Two</h2><figure class="content-image"><img src="https://img/2.jpg""#));
        assert!(out.ends_with("<h2>Three</h2>"));

        let again = insert_images_into_content(&out, &images);
        assert_eq!(again, out);
    }

    #[test]
    fn test_text_content_strips_tags() {
        assert_eq!(text_content("<p>Hello <b>world</b></p><!-- x -->"), "Hello world");
    }
}
