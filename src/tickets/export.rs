use super::{SupportTicket, TicketsError};

const HEADER: [&str; 10] = [
    "id",
    "subject",
    "status",
    "priority",
    "category",
    "department",
    "assigned_to",
    "tags",
    "created_at",
    "updated_at",
];

pub fn tickets_to_csv(tickets: &[SupportTicket]) -> Result<String, TicketsError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(HEADER)
        .map_err(|e| TicketsError::Export(e.to_string()))?;

    for ticket in tickets {
        let tags = ticket.tags.iter().cloned().collect::<Vec<_>>().join(";");
        writer
            .write_record([
                ticket.id.to_string(),
                ticket.subject.clone(),
                ticket.status.as_str().to_string(),
                ticket.priority.as_str().to_string(),
                ticket.category.clone(),
                ticket.department.clone(),
                ticket.assigned_to.clone().unwrap_or_default(),
                tags,
                ticket.created_at.to_rfc3339(),
                ticket.updated_at.to_rfc3339(),
            ])
            .map_err(|e| TicketsError::Export(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| TicketsError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| TicketsError::Export(e.to_string()))
}
