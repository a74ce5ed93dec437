//! The outward response shape both HTTP entry points
//! return (`POST /process` and `POST /callback` share one schema). Built
//! here, not in the gateway, so the gateway crate is a thin HTTP skin that
//! only serializes what the orchestrator already decided.

use serde::Serialize;
use serde_json::Value;
use waypoint_core::transport::Button;
use waypoint_core::types::{ResponseType, SetId};

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub response_type: ResponseType,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_id: Option<SetId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<Vec<Button>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessResponse {
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            success: true,
            response_type: ResponseType::FinalText,
            text: text.into(),
            items: None,
            set_id: None,
            buttons: None,
            error: None,
        }
    }

    pub fn final_text_with_buttons(text: impl Into<String>, buttons: Vec<Vec<Button>>) -> Self {
        Self {
            success: true,
            response_type: ResponseType::FinalText,
            text: text.into(),
            items: None,
            set_id: None,
            buttons: Some(buttons),
            error: None,
        }
    }

    pub fn render_table(text: impl Into<String>, items: Value, set_id: SetId) -> Self {
        Self {
            success: true,
            response_type: ResponseType::RenderTable,
            text: text.into(),
            items: Some(items),
            set_id: Some(set_id),
            buttons: None,
            error: None,
        }
    }

    pub fn ask_clarification(text: impl Into<String>) -> Self {
        Self {
            success: true,
            response_type: ResponseType::AskClarification,
            text: text.into(),
            items: None,
            set_id: None,
            buttons: None,
            error: None,
        }
    }

    pub fn ask_clarification_with_buttons(text: impl Into<String>, buttons: Vec<Vec<Button>>) -> Self {
        Self {
            success: true,
            response_type: ResponseType::AskClarification,
            text: text.into(),
            items: None,
            set_id: None,
            buttons: Some(buttons),
            error: None,
        }
    }

    /// Every taxonomy member maps to a fixed
    /// Russian-language template; this is the one place that template
    /// becomes an HTTP-shaped `ProcessResponse`.
    pub fn from_taxonomy(taxonomy: waypoint_core::taxonomy::ErrorTaxonomy) -> Self {
        Self {
            success: false,
            response_type: ResponseType::FinalText,
            text: taxonomy.user_message().to_string(),
            items: None,
            set_id: None,
            buttons: None,
            error: Some(format!("{taxonomy:?}")),
        }
    }
}

pub fn day_pref_buttons(selected: &[u8]) -> Vec<Vec<Button>> {
    const LABELS: [&str; 7] = ["Пн", "Вт", "Ср", "Чт", "Пт", "Сб", "Вс"];
    let mut row = Vec::with_capacity(7);
    for (n, label) in LABELS.iter().enumerate() {
        let marker = if selected.contains(&(n as u8)) { "✓ " } else { "" };
        row.push(Button {
            text: format!("{marker}{label}"),
            callback_data: format!("day_pref:{n}"),
        });
    }
    vec![
        row,
        vec![Button {
            text: "Готово".to_string(),
            callback_data: "day_pref_done".to_string(),
        }],
    ]
}

pub fn time_pref_buttons() -> Vec<Vec<Button>> {
    vec![
        vec![
            Button {
                text: "Утро".to_string(),
                callback_data: "time_pref:morning".to_string(),
            },
            Button {
                text: "День".to_string(),
                callback_data: "time_pref:afternoon".to_string(),
            },
            Button {
                text: "Вечер".to_string(),
                callback_data: "time_pref:evening".to_string(),
            },
        ],
        vec![Button {
            text: "Готово".to_string(),
            callback_data: "time_pref_done".to_string(),
        }],
    ]
}
