use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type StageId = Uuid;

/// A pipeline column. `order_position` defines the column order on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub name: String,
    pub color_token: String,
    pub order_position: i32,
    /// Win probability (0-100) applied to deals that carry none of their own.
    pub default_probability: Option<u8>,
}

impl Stage {
    pub fn new(name: &str, color_token: &str, order_position: i32, default_probability: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            color_token: color_token.to_string(),
            order_position,
            default_probability: Some(default_probability),
        }
    }

    /// Resolved stages ("Closed Won", "closed-lost", ...) are excluded from
    /// the active pipeline value.
    pub fn is_closed(&self) -> bool {
        self.name.to_lowercase().contains("closed")
    }

    /// Terminal winning stage. Plain "Won" does not qualify.
    pub fn is_closed_won(&self) -> bool {
        normalized_name(&self.name).contains("closed won")
    }
}

fn normalized_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
