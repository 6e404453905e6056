//! NeuroBreath assistant core.
//! Safety Gate, Query Router and Response Assembler behind the buddy, coach and blog widgets.

pub mod actions;
pub mod assistant;
pub mod citations;
pub mod config;
pub mod evidence;
pub mod model;
pub mod payload;
pub mod prompts;
pub mod router;
pub mod safety;
pub mod sanitize;
pub mod templates;
pub mod types;

pub use assistant::Assistant;
pub use config::{AssistantConfig, ConfigError, ModelConfig, NhsContentConfig, RuntimeEnvironment};
pub use evidence::{EvidenceLookup, EvidenceSummary, LiveEvidence, NoEvidence};
pub use model::{ChatCompletionsClient, ChatModel, ModelError};
pub use payload::{AssistantReply, ResponsePayload};
pub use router::{route, QueryType, RoutingDecision, Topic};
pub use safety::{SafetyAssessment, SafetyGate, SafetyLevel};
pub use types::{AssistantRequest, AssistantRole, BuddyRequest, ChatMessage, Jurisdiction, MessageRole};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
