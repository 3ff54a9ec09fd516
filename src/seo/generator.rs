use async_trait::async_trait;
use log::warn;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::content::{assemble_content, ContentInput, ContentOptions};
use super::draft::{SeoDraft, WizardStage};
use super::images::{image_prompt, mock_images};
use super::keywords::mock_keywords;
use super::links::{mock_link_set, LinkSet};
use super::outline::generate_mock_outlines;
use super::titles::mock_titles;
use super::SeoError;
use crate::core::config::SeoConfig;

pub const MAX_PARAGRAPHS_PER_SECTION: usize = 5;

/// What the client asks a stage to do. Only the options meaningful for
/// each stage exist on its variant; inputs come from the session draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageConfig {
    Keywords {
        #[serde(default)]
        count: Option<usize>,
    },
    Titles {
        #[serde(default)]
        count: Option<usize>,
    },
    Outlines,
    Images {
        #[serde(default)]
        prompt: Option<String>,
    },
    Links,
    Content {
        #[serde(default)]
        options: ContentOptions,
    },
}

/// Fully resolved input of one stage run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageRequest {
    Keywords {
        topic: String,
        count: usize,
    },
    Titles {
        topic: String,
        keywords: Vec<String>,
        count: usize,
    },
    Outlines {
        title: String,
        topic: String,
        keywords: Vec<String>,
    },
    Images {
        prompt: String,
    },
    Links {
        keywords: Vec<String>,
    },
    Content {
        input: ContentInput,
        options: ContentOptions,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "result", rename_all = "snake_case")]
pub enum StageOutput {
    Keywords(Vec<String>),
    Titles(Vec<String>),
    Outlines(Vec<String>),
    Images(Vec<String>),
    Links(LinkSet),
    Content(String),
}

fn bounded_options(options: &ContentOptions) -> ContentOptions {
    let paragraphs = options
        .paragraphs_per_section
        .clamp(1, MAX_PARAGRAPHS_PER_SECTION);
    if paragraphs != options.paragraphs_per_section {
        warn!(
            "paragraphs_per_section {} is out of range, using {}",
            options.paragraphs_per_section, paragraphs
        );
    }
    ContentOptions {
        paragraphs_per_section: paragraphs,
        ..*options
    }
}

fn require(value: &str, what: &str) -> Result<String, SeoError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SeoError::Validation(format!("{what} is required")));
    }
    Ok(value.to_string())
}

impl StageConfig {
    pub fn stage(&self) -> WizardStage {
        match self {
            Self::Keywords { .. } => WizardStage::Keywords,
            Self::Titles { .. } => WizardStage::Title,
            Self::Outlines => WizardStage::Outline,
            Self::Images { .. } => WizardStage::Images,
            Self::Links => WizardStage::Links,
            Self::Content { .. } => WizardStage::Content,
        }
    }
}

impl StageRequest {
    /// Validates that the draft has what the stage needs. Nothing runs when
    /// this fails.
    pub fn from_draft(
        draft: &SeoDraft,
        config: &StageConfig,
        defaults: &SeoConfig,
    ) -> Result<Self, SeoError> {
        let request = match config {
            StageConfig::Keywords { count } => Self::Keywords {
                topic: require(&draft.topic, "topic")?,
                count: count.unwrap_or(defaults.keyword_count).max(1),
            },
            StageConfig::Titles { count } => Self::Titles {
                topic: require(&draft.topic, "topic")?,
                keywords: draft.selected_keywords.clone(),
                count: count.unwrap_or(defaults.title_count).max(1),
            },
            StageConfig::Outlines => Self::Outlines {
                title: require(&draft.selected_title, "selected title")?,
                topic: require(&draft.topic, "topic")?,
                keywords: draft.selected_keywords.clone(),
            },
            StageConfig::Images { prompt } => {
                let derived = image_prompt(&draft.topic, &draft.selected_keywords);
                let prompt = prompt
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(String::from)
                    .unwrap_or(derived);
                Self::Images {
                    prompt: require(&prompt, "image prompt or topic")?,
                }
            }
            StageConfig::Links => {
                if draft.selected_keywords.is_empty() && draft.topic.trim().is_empty() {
                    return Err(SeoError::Validation(
                        "keywords or topic are required".to_string(),
                    ));
                }
                let keywords = if draft.selected_keywords.is_empty() {
                    vec![draft.topic.trim().to_string()]
                } else {
                    draft.selected_keywords.clone()
                };
                Self::Links { keywords }
            }
            StageConfig::Content { options } => Self::Content {
                input: ContentInput {
                    topic: require(&draft.topic, "topic")?,
                    keywords: draft.selected_keywords.clone(),
                    title: draft.selected_title.clone(),
                    outline: draft.outline.clone(),
                },
                options: bounded_options(options),
            },
        };
        Ok(request)
    }
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, request: &StageRequest) -> Result<StageOutput, SeoError>;
}

/// Template-driven generator with a simulated service latency.
#[derive(Debug, Clone, Default)]
pub struct MockGenerator {
    latency: Duration,
}

impl MockGenerator {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn render(request: &StageRequest) -> StageOutput {
        match request {
            StageRequest::Keywords { topic, count } => {
                StageOutput::Keywords(mock_keywords(topic, *count))
            }
            StageRequest::Titles {
                topic,
                keywords,
                count,
            } => StageOutput::Titles(mock_titles(topic, keywords, *count)),
            StageRequest::Outlines {
                title,
                topic,
                keywords,
            } => StageOutput::Outlines(generate_mock_outlines(title, topic, keywords)),
            StageRequest::Images { prompt } => StageOutput::Images(mock_images(prompt)),
            StageRequest::Links { keywords } => StageOutput::Links(mock_link_set(keywords)),
            StageRequest::Content { input, options } => {
                StageOutput::Content(assemble_content(input, options))
            }
        }
    }
}

#[async_trait]
impl ContentGenerator for MockGenerator {
    fn name(&self) -> &'static str {
        "template"
    }

    async fn generate(&self, request: &StageRequest) -> Result<StageOutput, SeoError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(Self::render(request))
    }
}

#[cfg(feature = "llm")]
pub use ai::LlmGenerator;

#[cfg(feature = "llm")]
mod ai {
    use super::*;
    use crate::llm::{ChatMessage, LLMProvider};
    use crate::seo::content::content_prompt;
    use crate::seo::keywords::{keyword_prompt, parse_list_response};
    use crate::seo::outline::outline_prompt;
    use crate::seo::titles::title_prompt;
    use log::debug;
    use std::sync::Arc;

    const SYSTEM_PROMPT: &str =
        "You are an expert SEO copywriter. Follow the requested output format exactly.";

    const OUTLINE_SEPARATOR: &str = "---";
    const OUTLINE_ALTERNATIVES: usize = 3;

    /// Chat-completion backed stages. Images and links have no AI variant and
    /// go through the template generator.
    pub struct LlmGenerator {
        provider: Arc<dyn LLMProvider>,
        fallback: MockGenerator,
    }

    impl LlmGenerator {
        pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
            Self {
                provider,
                fallback: MockGenerator::default(),
            }
        }

        async fn ask(&self, prompt: String) -> Result<String, SeoError> {
            let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];
            Ok(self.provider.generate(&messages).await?)
        }

        fn non_empty(items: Vec<String>, what: &str) -> Result<Vec<String>, SeoError> {
            if items.is_empty() {
                warn!("LLM returned no usable {}", what);
                return Err(SeoError::Upstream(format!("LLM returned no {what}")));
            }
            Ok(items)
        }
    }

    /// Splits on `---` lines, keeps at most three outlines and makes every
    /// one open with `# {title}`, replacing whatever H1 the model wrote.
    pub(crate) fn parse_outlines(response: &str, title: &str) -> Vec<String> {
        let mut outlines = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for line in response.lines().chain(std::iter::once(OUTLINE_SEPARATOR)) {
            if line.trim() != OUTLINE_SEPARATOR {
                current.push(line);
                continue;
            }
            let body: Vec<&str> = current
                .drain(..)
                .skip_while(|l| l.trim().is_empty())
                .collect();
            let sections = match body.first() {
                Some(first) if first.trim_start().starts_with("# ") => &body[1..],
                _ => &body[..],
            };
            let sections = sections.join("\n").trim().to_string();
            if sections.is_empty() {
                continue;
            }
            outlines.push(format!("# {title}\n{sections}"));
            if outlines.len() == OUTLINE_ALTERNATIVES {
                break;
            }
        }
        outlines
    }

    pub(crate) fn strip_code_fence(response: &str) -> String {
        let trimmed = response.trim();
        let Some(rest) = trimmed.strip_prefix("```") else {
            return trimmed.to_string();
        };
        let body = rest.split_once('\n').map_or("", |(_, body)| body);
        body.trim_end()
            .strip_suffix("```")
            .unwrap_or(body)
            .trim()
            .to_string()
    }

    #[async_trait]
    impl ContentGenerator for LlmGenerator {
        fn name(&self) -> &'static str {
            "llm"
        }

        async fn generate(&self, request: &StageRequest) -> Result<StageOutput, SeoError> {
            debug!("LLM stage request: {:?}", request);
            match request {
                StageRequest::Keywords { topic, count } => {
                    let response = self.ask(keyword_prompt(topic, *count)).await?;
                    let mut keywords = parse_list_response(&response);
                    keywords.truncate(*count);
                    Ok(StageOutput::Keywords(Self::non_empty(keywords, "keywords")?))
                }
                StageRequest::Titles {
                    topic,
                    keywords,
                    count,
                } => {
                    let response = self.ask(title_prompt(topic, keywords, *count)).await?;
                    let mut titles = parse_list_response(&response);
                    titles.truncate(*count);
                    Ok(StageOutput::Titles(Self::non_empty(titles, "titles")?))
                }
                StageRequest::Outlines {
                    title,
                    topic,
                    keywords,
                } => {
                    let prompt = format!(
                        "{} Write 3 alternative outlines separated by a line containing only {}.",
                        outline_prompt(title, topic, keywords),
                        OUTLINE_SEPARATOR
                    );
                    let response = self.ask(prompt).await?;
                    let outlines = parse_outlines(&response, title);
                    Ok(StageOutput::Outlines(Self::non_empty(outlines, "outlines")?))
                }
                StageRequest::Content { input, .. } => {
                    let response = self.ask(content_prompt(input)).await?;
                    let html = strip_code_fence(&response);
                    if html.is_empty() {
                        return Err(SeoError::Upstream("LLM returned empty content".to_string()));
                    }
                    Ok(StageOutput::Content(html))
                }
                StageRequest::Images { .. } | StageRequest::Links { .. } => {
                    self.fallback.generate(request).await
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seo::draft::{DraftAction, SeoDraft};

    fn draft() -> SeoDraft {
        SeoDraft::default().apply([
            DraftAction::SetTopic {
                topic: "SEO".to_string(),
            },
            DraftAction::SetKeywords {
                keywords: vec!["backlinks".to_string(), "content".to_string()],
            },
        ])
    }

    #[test]
    fn test_validation_happens_before_generation() {
        let defaults = SeoConfig::default();
        let err = StageRequest::from_draft(
            &SeoDraft::default(),
            &StageConfig::Keywords { count: None },
            &defaults,
        )
        .unwrap_err();
        assert!(matches!(err, SeoError::Validation(_)));

        let err = StageRequest::from_draft(&draft(), &StageConfig::Outlines, &defaults).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: selected title is required");
    }

    #[test]
    fn test_request_uses_config_defaults_and_overrides() {
        let defaults = SeoConfig::default();
        let request =
            StageRequest::from_draft(&draft(), &StageConfig::Keywords { count: None }, &defaults)
                .unwrap();
        assert_eq!(
            request,
            StageRequest::Keywords {
                topic: "SEO".to_string(),
                count: defaults.keyword_count
            }
        );

        let request = StageRequest::from_draft(
            &draft(),
            &StageConfig::Images {
                prompt: Some("  ".to_string()),
            },
            &defaults,
        )
        .unwrap();
        assert_eq!(
            request,
            StageRequest::Images {
                prompt: "SEO backlinks content".to_string()
            }
        );
    }

    #[test]
    fn test_paragraph_count_is_clamped() {
        let config: StageConfig = serde_json::from_value(serde_json::json!({
            "stage": "content",
            "options": { "paragraphs_per_section": 200000 }
        }))
        .unwrap();
        let request = StageRequest::from_draft(&draft(), &config, &SeoConfig::default()).unwrap();
        let StageRequest::Content { options, .. } = request else {
            panic!("expected content request");
        };
        assert_eq!(options.paragraphs_per_section, MAX_PARAGRAPHS_PER_SECTION);
        assert!(options.use_outline);

        let config = StageConfig::Content {
            options: ContentOptions {
                use_outline: false,
                paragraphs_per_section: 0,
            },
        };
        let request = StageRequest::from_draft(&draft(), &config, &SeoConfig::default()).unwrap();
        assert!(matches!(
            request,
            StageRequest::Content { options, .. } if options.paragraphs_per_section == 1
        ));
    }

    #[test]
    fn test_stage_config_is_tagged_by_stage() {
        let config: StageConfig = serde_json::from_value(serde_json::json!({
            "stage": "content",
            "options": { "use_outline": false }
        }))
        .unwrap();
        assert_eq!(config.stage(), WizardStage::Content);
        assert_eq!(
            config,
            StageConfig::Content {
                options: ContentOptions {
                    use_outline: false,
                    paragraphs_per_section: 1
                }
            }
        );

        let outlines: StageConfig =
            serde_json::from_value(serde_json::json!({ "stage": "outlines" })).unwrap();
        assert_eq!(outlines.stage(), WizardStage::Outline);
    }

    #[tokio::test]
    async fn test_mock_generator_renders_every_stage() {
        let generator = MockGenerator::default();
        let output = generator
            .generate(&StageRequest::Links {
                keywords: vec!["backlinks".to_string()],
            })
            .await
            .unwrap();
        let StageOutput::Links(links) = output else {
            panic!("expected links");
        };
        assert_eq!(links.external.len(), 1);
        assert!(!links.internal.is_empty());

        let output = generator
            .generate(&StageRequest::Outlines {
                title: "10 Tips for SEO".to_string(),
                topic: "SEO".to_string(),
                keywords: vec![],
            })
            .await
            .unwrap();
        assert!(matches!(output, StageOutput::Outlines(ref o) if o.len() == 3));
    }

    #[cfg(feature = "llm")]
    mod llm_backed {
        use super::super::ai::{parse_outlines, strip_code_fence};
        use crate::llm::{ChatMessage, LLMProvider, LlmError, ModelInfo};
        use crate::seo::generator::{ContentGenerator, LlmGenerator, StageOutput, StageRequest};
        use crate::seo::SeoError;
        use async_trait::async_trait;
        use std::sync::Arc;

        struct CannedProvider(&'static str);

        #[async_trait]
        impl LLMProvider for CannedProvider {
            async fn generate(&self, _messages: &[ChatMessage]) -> Result<String, LlmError> {
                Ok(self.0.to_string())
            }

            async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
                Ok(Vec::new())
            }
        }

        #[tokio::test]
        async fn test_keywords_are_parsed_and_truncated() {
            let generator = LlmGenerator::new(Arc::new(CannedProvider("1. a\n2. b\n3. c")));
            let output = generator
                .generate(&StageRequest::Keywords {
                    topic: "seo".to_string(),
                    count: 2,
                })
                .await
                .unwrap();
            assert_eq!(
                output,
                StageOutput::Keywords(vec!["a".to_string(), "b".to_string()])
            );
        }

        #[tokio::test]
        async fn test_empty_completion_is_upstream_error() {
            let generator = LlmGenerator::new(Arc::new(CannedProvider("\n\n")));
            let err = generator
                .generate(&StageRequest::Titles {
                    topic: "seo".to_string(),
                    keywords: vec![],
                    count: 3,
                })
                .await
                .unwrap_err();
            assert!(matches!(err, SeoError::Upstream(_)));
        }

        #[test]
        fn test_parse_outlines_adds_missing_title() {
            let outlines = parse_outlines("# T\n## A\n---\n## B\n---\n\n", "T");
            assert_eq!(outlines, vec!["# T\n## A", "# T\n## B"]);
        }

        #[test]
        fn test_parse_outlines_forces_title_and_keeps_three() {
            let response = "# Some Other Title\n## A\n---\n## B\n---\n# T\n## C\n---\n## D";
            let outlines = parse_outlines(response, "10 Tips for SEO");
            assert_eq!(
                outlines,
                vec![
                    "# 10 Tips for SEO\n## A",
                    "# 10 Tips for SEO\n## B",
                    "# 10 Tips for SEO\n## C",
                ]
            );
            assert!(parse_outlines("# Only a title\n---\n", "T").is_empty());
        }

        #[test]
        fn test_strip_code_fence() {
            assert_eq!(strip_code_fence("```html\n<h1>x</h1>\n```"), "<h1>x</h1>");
            assert_eq!(strip_code_fence("  <p>y</p> "), "<p>y</p>");
        }
    }
}
