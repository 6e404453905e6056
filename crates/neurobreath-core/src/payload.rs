//! Wire shape of every assistant reply, plus the fixed replies used on the error paths.

use crate::actions::{self, RecommendedAction};
use crate::citations::{default_citations, format_group, group, to_references, Reference};
use crate::safety::SafetyAssessment;
use serde::Serialize;

pub const EMPTY_QUERY_ANSWER: &str = "Please ask me a question!";
pub const MODEL_TROUBLE_ANSWER: &str =
    "I'm having trouble connecting right now. In the meantime, try the Quick Questions or page tour!";
pub const MODEL_EMPTY_ANSWER: &str = "I apologize, I had trouble generating a response.";
pub const FAULT_ANSWER: &str = "I apologize for the interruption! Please try asking your question again in a moment.\n\nIn the meantime, you can browse the page sections or try the Quick Questions.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafetyMeta {
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signposting: Option<String>,
}

impl From<&SafetyAssessment> for SafetyMeta {
    fn from(a: &SafetyAssessment) -> Self {
        Self {
            level: a.level.as_str().to_string(),
            signposting: a.signposting.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub answer: String,
    pub recommended_actions: Vec<RecommendedAction>,
    pub references: Vec<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety: Option<SafetyMeta>,
}

impl ResponsePayload {
    /// Reply to a blank query (sent with status 400).
    pub fn empty_query() -> Self {
        let defaults = default_citations();
        Self {
            error: Some("Query is required".to_string()),
            answer: EMPTY_QUERY_ANSWER.to_string(),
            references: to_references(&defaults),
            citations: Some(format_group(&group(&defaults))),
            ..Default::default()
        }
    }

    /// Generic apology for malformed input or an internal fault (sent with status 200).
    pub fn fault() -> Self {
        Self {
            error: Some("Internal server error".to_string()),
            answer: FAULT_ANSWER.to_string(),
            recommended_actions: vec![actions::refresh()],
            references: to_references(&default_citations()),
            ..Default::default()
        }
    }
}

/// HTTP status plus body; the gateway only translates `status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub status: u16,
    pub payload: ResponsePayload,
}

impl AssistantReply {
    pub fn ok(payload: ResponsePayload) -> Self {
        Self { status: 200, payload }
    }

    pub fn bad_request(payload: ResponsePayload) -> Self {
        Self { status: 400, payload }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_payload_shape() {
        let v = serde_json::to_value(ResponsePayload::empty_query()).unwrap();
        assert_eq!(v["answer"], EMPTY_QUERY_ANSWER);
        assert_eq!(v["references"].as_array().unwrap().len(), 2);
        assert_eq!(v["references"][0]["isExternal"], true);
        assert!(v.get("safety").is_none());
        assert!(v.get("routing").is_none());
    }

    #[test]
    fn fault_payload_offers_refresh() {
        let v = serde_json::to_value(ResponsePayload::fault()).unwrap();
        assert_eq!(v["recommendedActions"][0]["id"], "refresh");
        assert_eq!(v["error"], "Internal server error");
    }
}
