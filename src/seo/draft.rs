use serde::{Deserialize, Serialize};

use super::html::{insert_images_into_content, insert_links_into_content};
use super::links::{selected, LinkKind, LinkSet, LinkSuggestion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStage {
    Topic,
    Keywords,
    Title,
    Outline,
    Images,
    Links,
    Content,
}

impl WizardStage {
    pub const ORDER: [Self; 7] = [
        Self::Topic,
        Self::Keywords,
        Self::Title,
        Self::Outline,
        Self::Images,
        Self::Links,
        Self::Content,
    ];

    pub fn next(self) -> Option<Self> {
        let index = Self::ORDER.iter().position(|s| *s == self)?;
        Self::ORDER.get(index + 1).copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoDraft {
    pub topic: String,
    pub selected_keywords: Vec<String>,
    pub selected_title: String,
    pub outline: String,
    pub selected_images: Vec<String>,
    pub internal_links: Vec<LinkSuggestion>,
    pub external_links: Vec<LinkSuggestion>,
    pub content: String,
}

/// Every user edit the wizard supports. Each action touches only the fields
/// of its own stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DraftAction {
    SetTopic { topic: String },
    SetKeywords { keywords: Vec<String> },
    ToggleKeyword { keyword: String },
    SelectTitle { title: String },
    SetOutline { outline: String },
    SetImages { images: Vec<String> },
    ToggleImage { url: String },
    SetLinks { links: LinkSet },
    ToggleLink { kind: LinkKind, url: String },
    SetContent { content: String },
    InsertSelectedLinks,
    InsertSelectedImages,
    Reset,
}

fn dedup_keep_order(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim().to_string();
        if !value.is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

fn toggle(values: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }
    match values.iter().position(|v| v == value) {
        Some(index) => {
            values.remove(index);
        }
        None => values.push(value.to_string()),
    }
}

/// Pure transition: returns the next draft without touching the input.
/// Editing an earlier stage never clears later ones.
pub fn reduce(draft: &SeoDraft, action: DraftAction) -> SeoDraft {
    let mut next = draft.clone();
    match action {
        DraftAction::SetTopic { topic } => next.topic = topic.trim().to_string(),
        DraftAction::SetKeywords { keywords } => next.selected_keywords = dedup_keep_order(keywords),
        DraftAction::ToggleKeyword { keyword } => toggle(&mut next.selected_keywords, &keyword),
        DraftAction::SelectTitle { title } => next.selected_title = title.trim().to_string(),
        DraftAction::SetOutline { outline } => next.outline = outline,
        DraftAction::SetImages { images } => next.selected_images = dedup_keep_order(images),
        DraftAction::ToggleImage { url } => toggle(&mut next.selected_images, &url),
        DraftAction::SetLinks { links } => {
            next.internal_links = links.internal;
            next.external_links = links.external;
        }
        DraftAction::ToggleLink { kind, url } => {
            let list = match kind {
                LinkKind::Internal => &mut next.internal_links,
                LinkKind::External => &mut next.external_links,
            };
            if let Some(link) = list.iter_mut().find(|l| l.url == url) {
                link.selected = !link.selected;
            }
        }
        DraftAction::SetContent { content } => next.content = content,
        DraftAction::InsertSelectedLinks => {
            let with_internal =
                insert_links_into_content(&next.content, &selected(&next.internal_links), false);
            next.content =
                insert_links_into_content(&with_internal, &selected(&next.external_links), true);
        }
        DraftAction::InsertSelectedImages => {
            next.content = insert_images_into_content(&next.content, &next.selected_images);
        }
        DraftAction::Reset => next = SeoDraft::default(),
    }
    next
}

impl SeoDraft {
    pub fn apply(&self, actions: impl IntoIterator<Item = DraftAction>) -> SeoDraft {
        actions
            .into_iter()
            .fold(self.clone(), |draft, action| reduce(&draft, action))
    }

    pub fn is_stage_complete(&self, stage: WizardStage) -> bool {
        match stage {
            WizardStage::Topic => !self.topic.is_empty(),
            WizardStage::Keywords => !self.selected_keywords.is_empty(),
            WizardStage::Title => !self.selected_title.is_empty(),
            WizardStage::Outline => !self.outline.trim().is_empty(),
            WizardStage::Images => !self.selected_images.is_empty(),
            WizardStage::Links => self
                .internal_links
                .iter()
                .chain(&self.external_links)
                .any(|l| l.selected),
            WizardStage::Content => !self.content.is_empty(),
        }
    }

    /// The first stage in wizard order that still has nothing chosen.
    pub fn current_stage(&self) -> WizardStage {
        WizardStage::ORDER
            .into_iter()
            .find(|stage| !self.is_stage_complete(*stage))
            .unwrap_or(WizardStage::Content)
    }
}
