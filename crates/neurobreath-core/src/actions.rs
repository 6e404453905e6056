//! Recommended follow-up actions rendered as buttons by the client widget.

use crate::router::QueryType;
use crate::types::{AssistantRole, PageHeading};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Navigate,
    Scroll,
    StartExercise,
    OpenTool,
    Download,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionIcon {
    Target,
    Play,
    Book,
    Timer,
    File,
    Heart,
    Brain,
    Sparkles,
    Map,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedAction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActionType,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<ActionIcon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub primary: bool,
}

pub fn breathing() -> RecommendedAction {
    RecommendedAction {
        id: "breathing".into(),
        kind: ActionType::Navigate,
        label: "Breathing Exercises".into(),
        description: Some("Try a calming technique".into()),
        icon: Some(ActionIcon::Heart),
        target: Some("/breathing".into()),
        primary: true,
    }
}

pub fn page_tour() -> RecommendedAction {
    RecommendedAction {
        id: "tour".into(),
        kind: ActionType::Scroll,
        label: "Page Tour".into(),
        description: Some("Get a guided walkthrough".into()),
        icon: Some(ActionIcon::Map),
        target: Some("#".into()),
        primary: false,
    }
}

pub fn jump_to_section(heading: &PageHeading) -> RecommendedAction {
    RecommendedAction {
        id: "jump-to-section".into(),
        kind: ActionType::Scroll,
        label: format!("Go to {}", heading.text),
        description: None,
        icon: Some(ActionIcon::Target),
        target: Some(format!("#{}", heading.id)),
        primary: true,
    }
}

/// Offered with the fault apology.
pub fn refresh() -> RecommendedAction {
    RecommendedAction {
        id: "refresh".into(),
        kind: ActionType::Navigate,
        label: "Refresh Page".into(),
        description: None,
        icon: Some(ActionIcon::Sparkles),
        target: Some("/".into()),
        primary: false,
    }
}

/// Action table for non-escalated answers. `matched_heading` is the navigation target the
/// knowledge-base answer picked, if any.
pub fn recommended_actions(
    query_type: QueryType,
    role: AssistantRole,
    matched_heading: Option<&PageHeading>,
) -> Vec<RecommendedAction> {
    let mut actions = Vec::new();
    if query_type == QueryType::Navigation {
        if let Some(h) = matched_heading.filter(|h| !h.id.is_empty()) {
            actions.push(jump_to_section(h));
        }
    }
    if query_type == QueryType::HealthEvidence {
        actions.push(breathing());
    }
    if role == AssistantRole::Buddy {
        actions.push(page_tour());
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_buddy_gets_breathing_then_tour() {
        let ids: Vec<String> = recommended_actions(QueryType::HealthEvidence, AssistantRole::Buddy, None)
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["breathing", "tour"]);
    }

    #[test]
    fn coach_general_info_has_no_actions() {
        assert!(recommended_actions(QueryType::GeneralInfo, AssistantRole::Coach, None).is_empty());
    }

    #[test]
    fn navigation_with_heading_jumps_there() {
        let h = PageHeading {
            text: "Breathing Tools".into(),
            id: "breathing-tools".into(),
            level: 2,
        };
        let actions = recommended_actions(QueryType::Navigation, AssistantRole::Buddy, Some(&h));
        assert_eq!(actions[0].target.as_deref(), Some("#breathing-tools"));
        assert_eq!(actions[1].label, "Page Tour");
    }

    #[test]
    fn serializes_with_wire_names() {
        let v = serde_json::to_value(page_tour()).unwrap();
        assert_eq!(v["type"], "scroll");
        assert_eq!(v["icon"], "map");
        assert!(v.get("primary").is_none());
        let v = serde_json::to_value(breathing()).unwrap();
        assert_eq!(v["primary"], true);
    }
}
