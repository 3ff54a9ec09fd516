use chrono::{Duration, Utc};
use log::debug;
use std::collections::BTreeSet;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::filter::{filter_and_sort_tickets, TicketQuery};
use super::{
    CreateMessageRequest, CreateTicketRequest, SenderType, SupportMessage, SupportTicket,
    TicketPriority, TicketStats, TicketStatus, TicketsError,
};

/// In-process ticket list. Order of insertion is the "natural" order the
/// filter engine preserves on ties.
#[derive(Debug, Default)]
pub struct TicketStore {
    tickets: RwLock<Vec<SupportTicket>>,
}

impl TicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tickets(tickets: Vec<SupportTicket>) -> Self {
        Self {
            tickets: RwLock::new(tickets),
        }
    }

    pub async fn snapshot(&self) -> Vec<SupportTicket> {
        self.tickets.read().await.clone()
    }

    pub async fn query(&self, query: &TicketQuery) -> Vec<SupportTicket> {
        let tickets = self.tickets.read().await;
        filter_and_sort_tickets(&tickets, query)
    }

    pub async fn get(&self, id: Uuid) -> Option<SupportTicket> {
        self.tickets.read().await.iter().find(|t| t.id == id).cloned()
    }

    pub async fn create(&self, req: CreateTicketRequest) -> Result<SupportTicket, TicketsError> {
        let subject = req.subject.trim();
        if subject.is_empty() {
            return Err(TicketsError::Validation("subject is required".to_string()));
        }

        let now = Utc::now();
        let ticket = SupportTicket {
            id: Uuid::new_v4(),
            subject: subject.to_string(),
            description: req.description,
            status: TicketStatus::Open,
            priority: req.priority.unwrap_or(TicketPriority::Medium),
            category: req.category,
            department: req.department,
            assigned_to: req.assigned_to.filter(|a| !a.trim().is_empty()),
            tags: req.tags,
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
        };

        self.tickets.write().await.push(ticket.clone());
        Ok(ticket)
    }

    async fn update<F>(&self, id: Uuid, apply: F) -> Result<SupportTicket, TicketsError>
    where
        F: FnOnce(&mut SupportTicket),
    {
        let mut tickets = self.tickets.write().await;
        let ticket = tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TicketsError::NotFound(format!("Ticket {id} not found")))?;
        apply(ticket);
        ticket.updated_at = Utc::now();
        Ok(ticket.clone())
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: TicketStatus,
    ) -> Result<SupportTicket, TicketsError> {
        debug!("Ticket {} status -> {}", id, status.as_str());
        self.update(id, |ticket| ticket.status = status).await
    }

    pub async fn set_priority(
        &self,
        id: Uuid,
        priority: TicketPriority,
    ) -> Result<SupportTicket, TicketsError> {
        debug!("Ticket {} priority -> {}", id, priority.as_str());
        self.update(id, |ticket| ticket.priority = priority).await
    }

    pub async fn append_message(
        &self,
        id: Uuid,
        req: CreateMessageRequest,
    ) -> Result<SupportMessage, TicketsError> {
        if req.content.trim().is_empty() {
            return Err(TicketsError::Validation("message content is required".to_string()));
        }

        let message = SupportMessage {
            id: Uuid::new_v4(),
            ticket_id: id,
            content: req.content,
            sender_id: req.sender_id,
            sender_type: req.sender_type.unwrap_or(SenderType::Agent),
            is_internal: req.is_internal.unwrap_or(false),
            created_at: Utc::now(),
        };

        let stored = message.clone();
        self.update(id, move |ticket| ticket.messages.push(stored))
            .await?;
        Ok(message)
    }

    pub async fn stats(&self) -> TicketStats {
        let tickets = self.tickets.read().await;
        let count_status = |s: TicketStatus| tickets.iter().filter(|t| t.status == s).count();
        let count_priority = |p: TicketPriority| tickets.iter().filter(|t| t.priority == p).count();

        TicketStats {
            total_tickets: tickets.len(),
            open_tickets: count_status(TicketStatus::Open),
            pending_tickets: count_status(TicketStatus::Pending),
            in_progress_tickets: count_status(TicketStatus::InProgress),
            resolved_tickets: count_status(TicketStatus::Resolved),
            closed_tickets: count_status(TicketStatus::Closed),
            urgent_tickets: count_priority(TicketPriority::Urgent),
            high_priority_tickets: count_priority(TicketPriority::High),
        }
    }
}

pub fn demo_tickets() -> Vec<SupportTicket> {
    let now = Utc::now();
    let rows = [
        (
            "Cannot access my account",
            "Password reset email never arrives.",
            TicketStatus::Open,
            TicketPriority::High,
            "account",
            "support",
            Some("sarah.johnson"),
            48,
        ),
        (
            "Billing discrepancy on last invoice",
            "Charged twice for the Pro plan this month.",
            TicketStatus::InProgress,
            TicketPriority::Urgent,
            "billing",
            "finance",
            Some("michael.chen"),
            30,
        ),
        (
            "Feature request: export to PDF",
            "Would like to export analytics dashboards as PDF.",
            TicketStatus::Pending,
            TicketPriority::Low,
            "feature_request",
            "product",
            None,
            120,
        ),
        (
            "Chatbot not responding on website",
            "The widget loads but never answers visitors.",
            TicketStatus::Open,
            TicketPriority::Urgent,
            "technical",
            "engineering",
            Some("sarah.johnson"),
            5,
        ),
        (
            "How to connect CRM to email campaigns",
            "Looking for documentation on the campaign integration.",
            TicketStatus::Resolved,
            TicketPriority::Medium,
            "general",
            "support",
            Some("emma.davis"),
            200,
        ),
        (
            "SEO report shows no keywords",
            "The keyword tab is empty after the last sync.",
            TicketStatus::Closed,
            TicketPriority::Medium,
            "technical",
            "engineering",
            Some("michael.chen"),
            360,
        ),
    ];

    rows.into_iter()
        .map(
            |(subject, description, status, priority, category, department, agent, age_hours)| {
                let created_at = now - Duration::hours(age_hours);
                let id = Uuid::new_v4();
                SupportTicket {
                    id,
                    subject: subject.to_string(),
                    description: description.to_string(),
                    status,
                    priority,
                    category: category.to_string(),
                    department: department.to_string(),
                    assigned_to: agent.map(String::from),
                    tags: BTreeSet::from([category.to_string()]),
                    created_at,
                    updated_at: created_at + Duration::hours(age_hours / 4),
                    messages: vec![SupportMessage {
                        id: Uuid::new_v4(),
                        ticket_id: id,
                        content: description.to_string(),
                        sender_id: "customer".to_string(),
                        sender_type: SenderType::Customer,
                        is_internal: false,
                        created_at,
                    }],
                }
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(subject: &str) -> CreateTicketRequest {
        CreateTicketRequest {
            subject: subject.to_string(),
            description: "details".to_string(),
            priority: None,
            category: "general".to_string(),
            department: "support".to_string(),
            assigned_to: Some("   ".to_string()),
            tags: BTreeSet::new(),
        }
    }

    #[tokio::test]
    async fn test_create_defaults_and_validation() {
        let store = TicketStore::new();
        let ticket = store.create(create_request("  Printer on fire ")).await.unwrap();
        assert_eq!(ticket.subject, "Printer on fire");
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.priority, TicketPriority::Medium);
        assert_eq!(ticket.assigned_to, None);

        let err = store.create(create_request(" ")).await.unwrap_err();
        assert!(matches!(err, TicketsError::Validation(_)));
        assert_eq!(store.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_updates_bump_updated_at_and_append_messages() {
        let store = TicketStore::with_tickets(demo_tickets());
        let original = store.snapshot().await.remove(0);

        let updated = store
            .set_status(original.id, TicketStatus::Resolved)
            .await
            .unwrap();
        assert_eq!(updated.status, TicketStatus::Resolved);
        assert!(updated.updated_at > original.updated_at);

        let message = store
            .append_message(
                original.id,
                CreateMessageRequest {
                    content: "Looking into it".to_string(),
                    sender_id: "agent-1".to_string(),
                    sender_type: None,
                    is_internal: Some(true),
                },
            )
            .await
            .unwrap();
        assert_eq!(message.ticket_id, original.id);
        assert_eq!(message.sender_type, SenderType::Agent);

        let reloaded = store.get(original.id).await.unwrap();
        assert_eq!(reloaded.messages.len(), original.messages.len() + 1);
        assert!(reloaded.messages.last().unwrap().is_internal);
    }

    #[tokio::test]
    async fn test_unknown_ticket_is_not_found() {
        let store = TicketStore::new();
        let err = store
            .set_priority(Uuid::new_v4(), TicketPriority::Urgent)
            .await
            .unwrap_err();
        assert!(matches!(err, TicketsError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stats_count_demo_data() {
        let store = TicketStore::with_tickets(demo_tickets());
        let stats = store.stats().await;
        assert_eq!(stats.total_tickets, 6);
        assert_eq!(stats.open_tickets, 2);
        assert_eq!(stats.urgent_tickets, 2);
        assert_eq!(stats.closed_tickets, 1);
    }
}
