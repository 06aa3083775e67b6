//! JSON bodies for the Discord REST API

use serde_json::{Value, json};

use crate::notify::{ButtonStyle, Card, Controls, SurfaceEdit};

/// Component type of an action row
const ACTION_ROW: u8 = 1;

/// Component type of a button
const BUTTON: u8 = 2;

fn button_style(style: ButtonStyle) -> u8 {
    match style {
        ButtonStyle::Primary => 1,
        ButtonStyle::Success => 3,
    }
}

/// Render a card as an embed object
pub fn embed(card: &Card) -> Value {
    let mut embed = json!({
        "title": card.title,
        "color": card.color.0,
        "timestamp": card.timestamp.to_rfc3339(),
        "fields": card
            .fields
            .iter()
            .map(|f| json!({"name": f.name, "value": f.value, "inline": f.inline}))
            .collect::<Vec<_>>(),
    });
    if let Some(description) = &card.description {
        embed["description"] = json!(description);
    }
    if let Some(footer) = &card.footer {
        embed["footer"] = json!({ "text": footer });
    }
    embed
}

/// Render controls as message components; empty for [`Controls::None`]
pub fn components(controls: &Controls) -> Value {
    let buttons: Vec<Value> = controls
        .buttons()
        .into_iter()
        .map(|b| {
            json!({
                "type": BUTTON,
                "style": button_style(b.style),
                "label": b.label,
                "custom_id": b.control.encode(),
            })
        })
        .collect();

    if buttons.is_empty() {
        json!([])
    } else {
        json!([{ "type": ACTION_ROW, "components": buttons }])
    }
}

/// Body for creating a message
pub fn create_message(card: &Card, controls: &Controls) -> Value {
    json!({
        "embeds": [embed(card)],
        "components": components(controls),
    })
}

/// Body for editing a message; untouched parts are left out
pub fn edit_message(edit: &SurfaceEdit) -> Value {
    let mut body = json!({});
    if let Some(card) = &edit.card {
        body["embeds"] = json!([embed(card)]);
    }
    if let Some(controls) = &edit.controls {
        body["components"] = components(controls);
    }
    body
}
