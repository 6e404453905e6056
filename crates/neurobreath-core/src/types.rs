//! Request-side vocabulary shared by the gateway and the pipeline.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Region code that decides which emergency numbers and guideline bodies apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Jurisdiction {
    #[default]
    #[serde(rename = "UK")]
    Uk,
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "EU")]
    Eu,
}

impl Jurisdiction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Jurisdiction::Uk => "UK",
            Jurisdiction::Us => "US",
            Jurisdiction::Eu => "EU",
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which assistant surface is answering. Each has its own prompt template and tone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantRole {
    /// Page guide embedded on content pages.
    #[default]
    Buddy,
    /// Personalised wellbeing coach.
    Coach,
    /// Research / blog assistant.
    Blog,
}

impl AssistantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssistantRole::Buddy => "buddy",
            AssistantRole::Coach => "coach",
            AssistantRole::Blog => "blog",
        }
    }
}

/// Who the coach is talking to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Parent,
    Teacher,
    Carer,
    Individual,
    Professional,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Parent => "parent",
            UserRole::Teacher => "teacher",
            UserRole::Carer => "carer",
            UserRole::Individual => "individual",
            UserRole::Professional => "professional",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

/// One turn of chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSection {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageHeading {
    pub text: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub level: u8,
}

/// What the client tells us about the page the assistant is embedded in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    #[serde(default)]
    pub sections: Vec<PageSection>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub headings: Vec<PageHeading>,
}

/// Widget bodies are parsed loosely: an unknown, `null` or mistyped value falls back to the
/// field default instead of rejecting the whole body.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Keeps the turns that parse; turns with roles we don't model (e.g. `tool`) are dropped.
fn lenient_messages<'de, D>(deserializer: D) -> Result<Vec<ChatMessage>, D::Error>
where
    D: Deserializer<'de>,
{
    let serde_json::Value::Array(items) = serde_json::Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// Body of `POST /api/ai-assistant`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    #[serde(default, deserialize_with = "lenient")]
    pub query: Option<String>,
    #[serde(default, deserialize_with = "lenient_messages")]
    pub messages: Vec<ChatMessage>,
    #[serde(default, deserialize_with = "lenient")]
    pub role: AssistantRole,
    #[serde(default, deserialize_with = "lenient")]
    pub page_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub page_context: Option<PageContext>,
    #[serde(default, deserialize_with = "lenient")]
    pub jurisdiction: Jurisdiction,
    #[serde(default, deserialize_with = "lenient")]
    pub user_role: Option<UserRole>,
    /// Accepted for compatibility; topic is derived by the router.
    #[serde(default, deserialize_with = "lenient")]
    pub topic: Option<String>,
    /// Legacy free-text prompt appended to the generated system prompt.
    #[serde(default, deserialize_with = "lenient")]
    pub system_prompt: Option<String>,
}

impl AssistantRequest {
    /// `query` when non-empty, otherwise the most recent user turn.
    pub fn effective_query(&self) -> String {
        if let Some(q) = self.query.as_deref().filter(|q| !q.is_empty()) {
            return q.to_string();
        }
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

/// Body of `POST /api/buddy`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuddyRequest {
    #[serde(default, deserialize_with = "lenient")]
    pub question: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub query: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub pathname: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub locale: Option<String>,
    #[serde(default, deserialize_with = "lenient_messages")]
    pub messages: Vec<ChatMessage>,
    #[serde(default, deserialize_with = "lenient")]
    pub jurisdiction: Jurisdiction,
}

impl BuddyRequest {
    pub fn question_text(&self) -> String {
        self.question
            .as_deref()
            .filter(|q| !q.is_empty())
            .or(self.query.as_deref())
            .unwrap_or_default()
            .trim()
            .to_string()
    }

    pub fn pathname(&self) -> &str {
        self.pathname
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or("/")
    }
}
