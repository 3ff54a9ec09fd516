use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSuggestion {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub selected: bool,
}

impl LinkSuggestion {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            selected: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Internal,
    External,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSet {
    pub internal: Vec<LinkSuggestion>,
    pub external: Vec<LinkSuggestion>,
}

const INTERNAL_LINKS: [(&str, &str); 6] = [
    ("SEO best practices", "/blog/seo-best-practices"),
    ("content marketing", "/blog/content-marketing-guide"),
    ("keyword research", "/blog/keyword-research"),
    ("link building", "/blog/link-building-strategies"),
    ("on-page optimization", "/blog/on-page-optimization"),
    ("analytics dashboard", "/features/analytics"),
];

const EXTERNAL_SOURCES: [&str; 3] = [
    "https://en.wikipedia.org/wiki/",
    "https://developers.google.com/search/docs?q=",
    "https://moz.com/learn/seo/",
];

pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    for c in value.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// The site's fixed internal link list.
pub fn mock_internal_links() -> Vec<LinkSuggestion> {
    INTERNAL_LINKS
        .iter()
        .map(|(title, url)| LinkSuggestion::new(*title, *url))
        .collect()
}

/// One external reference per keyword, rotating through a few sources. The
/// link title is the keyword itself so it can be matched in the content.
pub fn mock_external_links(keywords: &[String]) -> Vec<LinkSuggestion> {
    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .enumerate()
        .map(|(i, keyword)| {
            let base = EXTERNAL_SOURCES[i % EXTERNAL_SOURCES.len()];
            let url = if base.ends_with("q=") {
                format!("{base}{}", urlencoding::encode(keyword))
            } else {
                format!("{base}{}", slugify(keyword))
            };
            LinkSuggestion::new(keyword, url)
        })
        .collect()
}

pub fn mock_link_set(keywords: &[String]) -> LinkSet {
    LinkSet {
        internal: mock_internal_links(),
        external: mock_external_links(keywords),
    }
}

pub fn selected(links: &[LinkSuggestion]) -> Vec<LinkSuggestion> {
    links.iter().filter(|l| l.selected).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("  Local SEO: A Guide! "), "local-seo-a-guide");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn test_external_links_follow_keywords() {
        let keywords = vec![
            "backlinks".to_string(),
            " ".to_string(),
            "page speed".to_string(),
            "core web vitals".to_string(),
        ];
        let links = mock_external_links(&keywords);
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].title, "backlinks");
        assert_eq!(links[0].url, "https://en.wikipedia.org/wiki/backlinks");
        assert_eq!(
            links[1].url,
            "https://developers.google.com/search/docs?q=page%20speed"
        );
        assert_eq!(links[2].url, "https://moz.com/learn/seo/core-web-vitals");
        assert!(links.iter().all(|l| !l.selected));
    }

    #[test]
    fn test_selected_filters() {
        let mut links = mock_internal_links();
        links[1].selected = true;
        let chosen = selected(&links);
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].title, "content marketing");
    }
}
