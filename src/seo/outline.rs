//! Outline markup: `# ` is the title, `## ` and `### ` are sections, `- `
//! is a bullet. Anything else is free text.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutlineItem {
    Heading { level: u8, text: String },
    Bullet { text: String },
    Text { text: String },
}

pub fn parse_outline(outline: &str) -> Vec<OutlineItem> {
    outline
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let hashes = line.chars().take_while(|c| *c == '#').count();
            if (1..=6).contains(&hashes) && line[hashes..].starts_with(' ') {
                OutlineItem::Heading {
                    level: hashes as u8,
                    text: line[hashes..].trim().to_string(),
                }
            } else if let Some(text) = line
                .strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
            {
                OutlineItem::Bullet {
                    text: text.trim().to_string(),
                }
            } else {
                OutlineItem::Text {
                    text: line.to_string(),
                }
            }
        })
        .collect()
}

/// Problem/solution, step-by-step guide and research analysis variants of
/// the same article, each opening with `# {title}`.
pub fn generate_mock_outlines(title: &str, topic: &str, keywords: &[String]) -> Vec<String> {
    let title = title.trim();
    let topic = topic.trim();
    let primary = keywords
        .first()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .unwrap_or(topic);
    let secondary = keywords
        .get(1)
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .unwrap_or(primary);

    let problem_solution = format!(
        "# {title}\n\
         ## Introduction\n\
         - Why {topic} is a challenge for most teams\n\
         - What this article will help you solve\n\
         ## The Problem with {topic}\n\
         ### Common mistakes\n\
         - Ignoring {primary}\n\
         - Underestimating {secondary}\n\
         ### The cost of getting it wrong\n\
         ## The Solution\n\
         ### A better approach to {primary}\n\
         ### Putting {secondary} to work\n\
         ## Results You Can Expect\n\
         ## Conclusion\n\
         - Key takeaways\n\
         - Next steps"
    );

    let guide = format!(
        "# {title}\n\
         ## What Is {topic}?\n\
         ## Why {topic} Matters\n\
         ## Step 1: Research {primary}\n\
         - Tools you will need\n\
         - Setting goals\n\
         ## Step 2: Plan Around {secondary}\n\
         ## Step 3: Execute and Optimize\n\
         ### Quick wins\n\
         ### Long-term habits\n\
         ## Step 4: Measure Your Results\n\
         ## Frequently Asked Questions\n\
         ## Conclusion"
    );

    let research = format!(
        "# {title}\n\
         ## Executive Summary\n\
         ## Background: The State of {topic}\n\
         ## Methodology\n\
         - Data sources\n\
         - Evaluation criteria\n\
         ## Key Findings\n\
         ### Finding 1: The impact of {primary}\n\
         ### Finding 2: Trends in {secondary}\n\
         ## Analysis and Implications\n\
         ## Recommendations\n\
         ## Conclusion"
    );

    vec![problem_solution, guide, research]
}

pub fn outline_prompt(title: &str, topic: &str, keywords: &[String]) -> String {
    format!(
        "Create a blog post outline for the title \"{title}\" about \"{topic}\". \
         Target keywords: {}. Use '# ' for the title line, '## ' for sections, \
         '### ' for subsections and '- ' for bullet points. Return only the outline.",
        keywords.join(", ")
    )
}
