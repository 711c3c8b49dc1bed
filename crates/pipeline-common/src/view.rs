use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::filter::FilterSet;

/// Whose deals the board is scoped to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope", content = "owner_id")]
pub enum OwnerScope {
    #[default]
    All,
    Owner(String),
}

impl OwnerScope {
    /// Owner id to pass to the deal store's list call.
    pub fn owner_filter(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Owner(id) => Some(id.as_str()),
        }
    }
}

/// Ordering applied inside each column when the board is seeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Keep the order the engine produced (store order plus manual drags).
    #[default]
    Manual,
    ValueDesc,
    ValueAsc,
    CloseDate,
    DaysInStage,
    Name,
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "value_desc" => Ok(Self::ValueDesc),
            "value_asc" => Ok(Self::ValueAsc),
            "close_date" => Ok(Self::CloseDate),
            "days_in_stage" => Ok(Self::DaysInStage),
            "name" => Ok(Self::Name),
            _ => Err(format!("Invalid sort mode: {}", s)),
        }
    }
}

/// Explicit view inputs for the board: who is looking, at what scope, with
/// which search and filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewState {
    pub current_user_id: String,
    pub owner_scope: OwnerScope,
    pub search_term: String,
    pub filters: FilterSet,
    pub sort_mode: SortMode,
}

impl ViewState {
    pub fn for_user(user_id: &str) -> Self {
        Self {
            current_user_id: user_id.to_string(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_scope_filter() {
        assert_eq!(OwnerScope::All.owner_filter(), None);
        assert_eq!(
            OwnerScope::Owner("alice".into()).owner_filter(),
            Some("alice")
        );
    }

    #[test]
    fn owner_scope_serializes_tagged() {
        let json = serde_json::to_value(OwnerScope::Owner("bob".into())).unwrap();
        assert_eq!(json["scope"], "owner");
        assert_eq!(json["owner_id"], "bob");
    }

    #[test]
    fn view_state_for_user_uses_defaults() {
        let view = ViewState::for_user("carol");
        assert_eq!(view.current_user_id, "carol");
        assert_eq!(view.owner_scope, OwnerScope::All);
        assert_eq!(view.sort_mode, SortMode::Manual);
        assert!(view.filters.is_empty());
    }

    #[test]
    fn sort_mode_parses() {
        assert_eq!(SortMode::from_str("value_desc").unwrap(), SortMode::ValueDesc);
        assert!(SortMode::from_str("random").is_err());
    }
}
