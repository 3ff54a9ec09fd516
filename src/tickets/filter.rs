use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::SupportTicket;

pub const ALL: &str = "all";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Every predicate of the ticket list view. `None` and `"all"` both bypass
/// a filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketQuery {
    #[serde(alias = "search")]
    pub search_query: String,
    #[serde(alias = "status", alias = "tab")]
    pub active_tab: Option<String>,
    #[serde(alias = "priority")]
    pub priority_filter: Option<String>,
    #[serde(alias = "category")]
    pub category_filter: Option<String>,
    #[serde(alias = "department")]
    pub department_filter: Option<String>,
    #[serde(alias = "agent", alias = "assigned_to")]
    pub agent_filter: Option<String>,
    #[serde(alias = "sort")]
    pub sort_field: Option<String>,
    #[serde(alias = "order")]
    pub sort_order: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortKey {
    CreatedAt,
    UpdatedAt,
    Priority,
    Text(TextField),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextField {
    Id,
    Subject,
    Description,
    Status,
    Category,
    Department,
    AssignedTo,
}

impl SortKey {
    /// Unknown names yield `None`, which sorts as a no-op.
    fn parse(field: &str) -> Option<Self> {
        let key = match field {
            "created_at" | "createdAt" => Self::CreatedAt,
            "updated_at" | "updatedAt" => Self::UpdatedAt,
            "priority" => Self::Priority,
            "id" => Self::Text(TextField::Id),
            "subject" => Self::Text(TextField::Subject),
            "description" => Self::Text(TextField::Description),
            "status" => Self::Text(TextField::Status),
            "category" => Self::Text(TextField::Category),
            "department" => Self::Text(TextField::Department),
            "assigned_to" | "assignedTo" => Self::Text(TextField::AssignedTo),
            _ => return None,
        };
        Some(key)
    }

    fn compare(self, a: &SupportTicket, b: &SupportTicket) -> Ordering {
        match self {
            Self::CreatedAt => a
                .created_at
                .timestamp_millis()
                .cmp(&b.created_at.timestamp_millis()),
            Self::UpdatedAt => a
                .updated_at
                .timestamp_millis()
                .cmp(&b.updated_at.timestamp_millis()),
            Self::Priority => a.priority.rank().cmp(&b.priority.rank()),
            Self::Text(field) => text_value(a, field).cmp(&text_value(b, field)),
        }
    }
}

fn text_value(ticket: &SupportTicket, field: TextField) -> String {
    match field {
        TextField::Id => ticket.id.to_string(),
        TextField::Subject => ticket.subject.clone(),
        TextField::Description => ticket.description.clone(),
        TextField::Status => ticket.status.as_str().to_string(),
        TextField::Category => ticket.category.clone(),
        TextField::Department => ticket.department.clone(),
        TextField::AssignedTo => ticket.assigned_to.clone().unwrap_or_default(),
    }
}

fn is_active(filter: &Option<String>) -> Option<&str> {
    match filter.as_deref() {
        None | Some(ALL) => None,
        Some(value) => Some(value),
    }
}

impl TicketQuery {
    pub fn matches(&self, ticket: &SupportTicket) -> bool {
        let search = self.search_query.to_lowercase();
        if !search.is_empty()
            && !ticket.subject.to_lowercase().contains(&search)
            && !ticket.description.to_lowercase().contains(&search)
        {
            return false;
        }

        if let Some(status) = is_active(&self.active_tab) {
            if ticket.status.as_str() != status {
                return false;
            }
        }

        if let Some(priority) = is_active(&self.priority_filter) {
            if ticket.priority.as_str() != priority {
                return false;
            }
        }

        if let Some(category) = is_active(&self.category_filter) {
            if ticket.category != category {
                return false;
            }
        }

        if let Some(department) = is_active(&self.department_filter) {
            if ticket.department != department {
                return false;
            }
        }

        if let Some(agent) = is_active(&self.agent_filter) {
            if ticket.assigned_to.as_deref() != Some(agent) {
                return false;
            }
        }

        true
    }
}

/// Filters conjunctively, then stable-sorts. A missing or unrecognised
/// `sort_field` keeps the input order.
pub fn filter_and_sort_tickets(tickets: &[SupportTicket], query: &TicketQuery) -> Vec<SupportTicket> {
    let mut result: Vec<SupportTicket> = tickets
        .iter()
        .filter(|ticket| query.matches(ticket))
        .cloned()
        .collect();

    let key = query.sort_field.as_deref().and_then(SortKey::parse);
    if key.is_none() {
        if let Some(field) = query.sort_field.as_deref() {
            debug!("Ignoring unknown ticket sort field '{}'", field);
        }
    }

    result.sort_by(|a, b| {
        let ordering = key.map_or(Ordering::Equal, |key| key.compare(a, b));
        match query.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });

    result
}

fn extract_unique<'a>(label: &str, values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let unique: BTreeSet<&str> = values.filter(|v| !v.trim().is_empty()).collect();
    debug!("Extracted {} unique {}: {:?}", unique.len(), label, unique);
    unique.into_iter().map(String::from).collect()
}

pub fn extract_unique_categories(tickets: &[SupportTicket]) -> Vec<String> {
    extract_unique("categories", tickets.iter().map(|t| t.category.as_str()))
}

pub fn extract_unique_departments(tickets: &[SupportTicket]) -> Vec<String> {
    extract_unique("departments", tickets.iter().map(|t| t.department.as_str()))
}

pub fn extract_unique_agents(tickets: &[SupportTicket]) -> Vec<String> {
    extract_unique(
        "agents",
        tickets.iter().filter_map(|t| t.assigned_to.as_deref()),
    )
}
