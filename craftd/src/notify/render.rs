//! Card rendering
//!
//! Pure functions from a request snapshot to the card shown on each surface.
//! The timestamp is the request's `updated_at`, so rendering the same snapshot
//! twice yields the same card.

use chrono::{DateTime, Utc};

use crate::domain::{CraftRequest, RequestStatus};

/// Embed color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u32);

impl Color {
    pub const BLUE: Color = Color(0x3498db);
    pub const GOLD: Color = Color(0xf1c40f);
    pub const GREEN: Color = Color(0x2ecc71);

    /// Color for a status; depends on nothing else
    pub fn for_status(status: RequestStatus) -> Self {
        match status {
            RequestStatus::Pending => Self::BLUE,
            RequestStatus::Accepted | RequestStatus::InProgress => Self::GOLD,
            RequestStatus::ReadyForPickup => Self::GREEN,
        }
    }
}

/// One name/value row on a card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl Field {
    fn inline(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            inline: true,
        }
    }

    fn block(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            inline: false,
        }
    }
}

/// Presentation artifact for one surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub title: String,
    pub description: Option<String>,
    pub color: Color,
    pub fields: Vec<Field>,
    pub footer: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Card {
    /// Look up a field value by name
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.value.as_str())
    }
}

const CRAFTER_NOTE: &str = "Crafter's Note";

/// Audit log card
pub fn log_card(request: &CraftRequest) -> Card {
    let mut fields = vec![
        Field::inline("User", request.requester.mention()),
        Field::inline("Item", request.item.clone()),
    ];
    if let Some(notes) = &request.notes {
        fields.push(Field::block("Notes", notes.clone()));
    }
    fields.push(Field::inline("Status", request.status.label()));
    if let Some(accepter) = &request.accepter {
        fields.push(Field::inline("Accepted by", accepter.mention()));
    }
    if let Some(note) = &request.completion_note {
        fields.push(Field::block(CRAFTER_NOTE, note.clone()));
    }

    Card {
        title: format!("🔨 Craft Request {}", request.id),
        description: None,
        color: Color::for_status(request.status),
        fields,
        footer: Some(format!("Request ID: {}", request.id)),
        timestamp: request.updated_at,
    }
}

/// Crafter card; same content as the log entry, controls are attached separately
pub fn fulfiller_card(request: &CraftRequest) -> Card {
    log_card(request)
}

/// Direct message card for the requester
pub fn requester_card(request: &CraftRequest) -> Card {
    let crafter = request
        .accepter
        .as_ref()
        .map(|a| a.mention())
        .unwrap_or_else(|| "A crafter".to_string());

    let (title, description) = match request.status {
        RequestStatus::Accepted => ("🪵 Crafting Accepted", format!("{} accepted and is on it!", crafter)),
        RequestStatus::InProgress => (
            "⛏️ Craft In Progress",
            format!("{} is now working on your request.", crafter),
        ),
        RequestStatus::ReadyForPickup => (
            "🎁 Craft Ready",
            format!("{} has completed it—ready for pickup!", crafter),
        ),
        RequestStatus::Pending => ("🪵 Request Update", String::new()),
    };

    let mut fields = Vec::new();
    if let Some(note) = &request.completion_note {
        fields.push(Field::block(CRAFTER_NOTE, note.clone()));
    }

    Card {
        title: title.to_string(),
        description: Some(description).filter(|d| !d.is_empty()),
        color: Color::for_status(request.status),
        fields,
        footer: Some(format!("Request ID: {}", request.id)),
        timestamp: request.updated_at,
    }
}

/// Persistent "start a request" card posted by the entry-point command
pub fn entry_point_card(now: DateTime<Utc>) -> Card {
    Card {
        title: "Need something crafted?".to_string(),
        description: Some("Click below to submit your crafting request.".to_string()),
        color: Color::GREEN,
        fields: Vec::new(),
        footer: Some("Craft System".to_string()),
        timestamp: now,
    }
}
