pub mod export;
pub mod filter;
pub mod store;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::state::AppState;

pub use filter::{filter_and_sort_tickets, SortOrder, TicketQuery};
pub use store::TicketStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    Pending,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub const ALL: [Self; 5] = [
        Self::Open,
        Self::Pending,
        Self::InProgress,
        Self::Resolved,
        Self::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// low=1 … urgent=4
    pub fn rank(&self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Urgent => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Customer,
    Agent,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportMessage {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub content: String,
    pub sender_id: String,
    pub sender_type: SenderType,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportTicket {
    pub id: Uuid,
    pub subject: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub category: String,
    pub department: String,
    pub assigned_to: Option<String>,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<SupportMessage>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub subject: String,
    #[serde(default)]
    pub description: String,
    pub priority: Option<TicketPriority>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub department: String,
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: TicketStatus,
}

#[derive(Debug, Deserialize)]
pub struct ChangePriorityRequest {
    pub priority: TicketPriority,
}

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub content: String,
    pub sender_id: String,
    pub sender_type: Option<SenderType>,
    pub is_internal: Option<bool>,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicketStats {
    pub total_tickets: usize,
    pub open_tickets: usize,
    pub pending_tickets: usize,
    pub in_progress_tickets: usize,
    pub resolved_tickets: usize,
    pub closed_tickets: usize,
    pub urgent_tickets: usize,
    pub high_priority_tickets: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TicketFacets {
    pub statuses: Vec<String>,
    pub priorities: Vec<String>,
    pub categories: Vec<String>,
    pub departments: Vec<String>,
    pub agents: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TicketsError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Export error: {0}")]
    Export(String),
}

impl IntoResponse for TicketsError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TicketQuery>,
) -> Json<Vec<SupportTicket>> {
    Json(state.tickets.query(&query).await)
}

pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<SupportTicket>), TicketsError> {
    let ticket = state.tickets.create(req).await?;
    info!("Created ticket {} ({})", ticket.id, ticket.priority.as_str());
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SupportTicket>, TicketsError> {
    state
        .tickets
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| TicketsError::NotFound(format!("Ticket {id} not found")))
}

pub async fn change_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<SupportTicket>, TicketsError> {
    let ticket = state.tickets.set_status(id, req.status).await?;
    Ok(Json(ticket))
}

pub async fn change_priority(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChangePriorityRequest>,
) -> Result<Json<SupportTicket>, TicketsError> {
    let ticket = state.tickets.set_priority(id, req.priority).await?;
    Ok(Json(ticket))
}

pub async fn add_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<SupportMessage>), TicketsError> {
    let message = state.tickets.append_message(id, req).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn get_ticket_stats(State(state): State<Arc<AppState>>) -> Json<TicketStats> {
    Json(state.tickets.stats().await)
}

pub async fn get_ticket_facets(State(state): State<Arc<AppState>>) -> Json<TicketFacets> {
    let tickets = state.tickets.snapshot().await;
    Json(TicketFacets {
        statuses: TicketStatus::ALL.iter().map(|s| s.as_str().to_string()).collect(),
        priorities: TicketPriority::ALL
            .iter()
            .map(|p| p.as_str().to_string())
            .collect(),
        categories: filter::extract_unique_categories(&tickets),
        departments: filter::extract_unique_departments(&tickets),
        agents: filter::extract_unique_agents(&tickets),
    })
}

pub async fn export_tickets_csv(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TicketQuery>,
) -> Result<impl IntoResponse, TicketsError> {
    let tickets = state.tickets.query(&query).await;
    let body = export::tickets_to_csv(&tickets)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"tickets.csv\"",
            ),
        ],
        body,
    ))
}

pub fn configure_tickets_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tickets", get(list_tickets).post(create_ticket))
        .route("/api/tickets/stats", get(get_ticket_stats))
        .route("/api/tickets/facets", get(get_ticket_facets))
        .route("/api/tickets/export.csv", get(export_tickets_csv))
        .route("/api/tickets/:id", get(get_ticket))
        .route("/api/tickets/:id/status", put(change_status))
        .route("/api/tickets/:id/priority", put(change_priority))
        .route("/api/tickets/:id/messages", post(add_message))
}
