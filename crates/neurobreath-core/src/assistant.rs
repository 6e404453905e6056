//! Response Assembler: Safety Gate → Query Router → answer source → safety wrap → citations.
//!
//! `Assistant` is immutable after construction and shared across requests behind an `Arc`.
//! Every path returns an [`AssistantReply`]; collaborator failures become fixed texts.

use crate::actions::{self, recommended_actions};
use crate::citations::{
    citations_for, deduplicate, default_citations, format_group, group, internal_reference, to_references, Citation,
};
use crate::config::AssistantConfig;
use crate::evidence::{EvidenceLookup, LiveEvidence, NoEvidence};
use crate::model::{ChatCompletionsClient, ChatModel, ModelError};
use crate::payload::{AssistantReply, ResponsePayload, SafetyMeta, MODEL_EMPTY_ANSWER, MODEL_TROUBLE_ANSWER};
use crate::prompts::{build_system_prompt, PromptOptions};
use crate::router::{route, QueryType, RouteContext, RoutingDecision};
use crate::safety::{emergency_response, validate_answer, wrap_answer, SafetyAssessment, SafetyClassifier, SafetyGate};
use crate::sanitize::sanitize_input;
use crate::templates::{self, best_heading, TemplateInput};
use crate::types::{AssistantRequest, AssistantRole, BuddyRequest, ChatMessage, Jurisdiction, MessageRole};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

const BUDDY_SUMMARY_CHARS: usize = 1600;
const TOPIC_GUESS_CHARS: usize = 120;

static WHAT_IS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^what is\s+").expect("static regex"));
static TRAILING_QUESTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\?+$").expect("static regex"));

/// Where the answer text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnswerSource {
    KnowledgeBase,
    Model,
    ModelFailed,
    Degraded,
}

impl AnswerSource {
    fn as_str(&self) -> &'static str {
        match self {
            AnswerSource::KnowledgeBase => "knowledge_base",
            AnswerSource::Model => "model",
            AnswerSource::ModelFailed => "model_failed",
            AnswerSource::Degraded => "degraded",
        }
    }
}

#[derive(Clone)]
pub struct Assistant {
    config: AssistantConfig,
    gate: SafetyGate,
    model: Option<Arc<dyn ChatModel>>,
    evidence: Arc<dyn EvidenceLookup>,
}

impl Assistant {
    /// Keyword safety gate, no model, no evidence lookups.
    pub fn new(config: AssistantConfig) -> Self {
        Self {
            config,
            gate: SafetyGate::default(),
            model: None,
            evidence: Arc::new(NoEvidence),
        }
    }

    /// Wires the HTTP model client (when a credential is configured) and live evidence
    /// lookups (when enabled).
    pub fn from_config(config: AssistantConfig) -> Self {
        let model = ChatCompletionsClient::from_config(&config.model).map(|c| Arc::new(c) as Arc<dyn ChatModel>);
        let evidence: Arc<dyn EvidenceLookup> = if config.evidence_lookup {
            let live = match config.nhs.credential() {
                Some(key) => LiveEvidence::new().with_nhs(&config.nhs.base_url, key),
                None => LiveEvidence::new(),
            };
            Arc::new(live)
        } else {
            Arc::new(NoEvidence)
        };
        if model.is_none() {
            warn!(target: "neurobreath::assistant", "no model credential configured; health questions use degraded answers");
        }
        Self {
            model,
            evidence,
            ..Self::new(config)
        }
    }

    pub fn with_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn without_model(mut self) -> Self {
        self.model = None;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn SafetyClassifier>) -> Self {
        self.gate = SafetyGate::new(classifier);
        self
    }

    pub fn with_evidence(mut self, evidence: Arc<dyn EvidenceLookup>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// `POST /api/ai-assistant`.
    pub async fn answer(&self, req: AssistantRequest) -> AssistantReply {
        let query = sanitize_input(&req.effective_query());
        if query.is_empty() {
            return AssistantReply::bad_request(ResponsePayload::empty_query());
        }

        let jurisdiction = req.jurisdiction;
        let assessment = self.gate.assess(&query, jurisdiction);
        if assessment.should_escalate() {
            return AssistantReply::ok(escalation_payload(&assessment, jurisdiction, Vec::new()));
        }

        let routing = route(
            &query,
            &RouteContext {
                page_path: req.page_name.as_deref(),
                jurisdiction,
                role: req.role,
            },
        );
        debug!(
            target: "neurobreath::router",
            query_type = routing.query_type.as_str(),
            topic = routing.topic.as_str(),
            priority = routing.priority.as_str(),
            "routed query"
        );

        let template_input = TemplateInput {
            query: &query,
            page_name: req.page_name.as_deref(),
            page_context: req.page_context.as_ref(),
            jurisdiction,
        };

        let (text, source) = match (routing.needs_model, self.model.as_deref()) {
            (false, _) => (
                templates::render(routing.query_type, req.role, &template_input),
                AnswerSource::KnowledgeBase,
            ),
            (true, Some(model)) => {
                let system_prompt = build_system_prompt(&PromptOptions {
                    role: req.role,
                    topic: Some(routing.topic),
                    jurisdiction,
                    page_name: req.page_name.as_deref(),
                    page_context: req.page_context.as_ref(),
                    user_role: req.user_role,
                    legacy_prompt: req.system_prompt.as_deref(),
                });
                match self.call_model(model, system_prompt, &req.messages, &query).await {
                    Ok(text) => (text, AnswerSource::Model),
                    Err(ModelError::Empty) => {
                        warn!(target: "neurobreath::model", model = model.name(), "model returned no content");
                        (MODEL_EMPTY_ANSWER.to_string(), AnswerSource::ModelFailed)
                    }
                    Err(e) => {
                        warn!(target: "neurobreath::model", model = model.name(), error = %e, "model call failed");
                        (MODEL_TROUBLE_ANSWER.to_string(), AnswerSource::ModelFailed)
                    }
                }
            }
            (true, None) => (
                templates::render(routing.query_type, req.role, &template_input),
                AnswerSource::Degraded,
            ),
        };

        let citations = match source {
            AnswerSource::Degraded => default_citations(),
            _ => citations_for(routing.topic),
        };

        let answer = self.finish_answer(&text, &assessment, jurisdiction);
        let heading = match routing.query_type {
            QueryType::Navigation => req
                .page_context
                .as_ref()
                .and_then(|c| best_heading(&query, &c.headings)),
            _ => None,
        };

        info!(
            target: "neurobreath::assistant",
            role = req.role.as_str(),
            query_type = routing.query_type.as_str(),
            topic = routing.topic.as_str(),
            source = source.as_str(),
            safety = assessment.level.as_str(),
            "answered"
        );

        AssistantReply::ok(ResponsePayload {
            answer,
            recommended_actions: recommended_actions(routing.query_type, req.role, heading),
            references: to_references(&citations),
            citations: Some(format_group(&group(&citations))),
            routing: self.routing_debug(&routing),
            safety: Some(SafetyMeta::from(&assessment)),
            ..Default::default()
        })
    }

    /// `POST /api/buddy`: page navigation help or a health summary from evidence lookups.
    pub async fn ask_buddy(&self, req: BuddyRequest) -> AssistantReply {
        let question = sanitize_input(&req.question_text());
        if question.is_empty() {
            return AssistantReply::bad_request(ResponsePayload::empty_query());
        }

        let jurisdiction = req.jurisdiction;
        let pathname = req.pathname();
        let assessment = self.gate.assess(&question, jurisdiction);
        if assessment.should_escalate() {
            let actions = recommended_actions(QueryType::HealthEvidence, AssistantRole::Buddy, None);
            return AssistantReply::ok(escalation_payload(&assessment, jurisdiction, actions));
        }

        let routing = route(
            &question,
            &RouteContext {
                page_path: Some(pathname),
                jurisdiction,
                role: AssistantRole::Buddy,
            },
        );
        let actions = recommended_actions(routing.query_type, AssistantRole::Buddy, None);

        if matches!(routing.query_type, QueryType::Navigation | QueryType::ToolHelp) {
            let text = format!(
                "You're on: **{}**\n\nTell me what you want to do (e.g., \"show breathing\", \"take me to ADHD hub\", \"start a tour\"), and I'll guide you step-by-step.",
                pathname
            );
            let defaults = default_citations();
            return AssistantReply::ok(ResponsePayload {
                answer: self.finish_answer(&text, &assessment, jurisdiction),
                recommended_actions: actions,
                references: to_references(&[internal_reference("NeuroBreath internal navigation", pathname)]),
                citations: Some(format_group(&group(&defaults))),
                safety: Some(SafetyMeta::from(&assessment)),
                ..Default::default()
            });
        }

        let topic = topic_guess(&question);
        let (nhs, medline, research) = tokio::join!(
            self.evidence.nhs_content(&topic),
            self.evidence.summary(&topic),
            self.evidence.research(&topic)
        );
        debug!(
            target: "neurobreath::evidence",
            nhs = nhs.is_some(),
            medlineplus = medline.is_some(),
            research = research.len(),
            "evidence lookups finished"
        );

        let mut citations: Vec<Citation> = default_citations();
        citations.extend(nhs.iter().chain(medline.iter()).filter_map(|s| s.citation.clone()));
        citations.extend(research);
        let citations = deduplicate(citations);

        let body = match nhs.as_ref().or(medline.as_ref()) {
            Some(s) => format!(
                "**About:** {}\n\n{}",
                topic,
                truncate_chars(&format!("{}\n\n{}", s.title, s.summary), BUDDY_SUMMARY_CHARS)
            ),
            None => format!("I couldn't retrieve a reliable summary for \"{}\" right now.", topic),
        };
        let text = format!(
            "Educational information only, not a diagnosis.\n\n{}\n\nIf you tell me:\n\
             • whether this is general info or symptoms\n\
             • how long it's been going on\n\
             • your age group (child/teen/adult)\n\
             …I can tailor safe guidance more precisely.",
            body
        );

        info!(
            target: "neurobreath::assistant",
            role = "buddy",
            query_type = routing.query_type.as_str(),
            topic = routing.topic.as_str(),
            citations = citations.len(),
            "answered"
        );

        AssistantReply::ok(ResponsePayload {
            answer: self.finish_answer(&text, &assessment, jurisdiction),
            recommended_actions: actions,
            references: to_references(&citations),
            citations: Some(format_group(&group(&citations))),
            safety: Some(SafetyMeta::from(&assessment)),
            ..Default::default()
        })
    }

    async fn call_model(
        &self,
        model: &dyn ChatModel,
        system_prompt: String,
        history: &[ChatMessage],
        query: &str,
    ) -> Result<String, ModelError> {
        let messages = build_messages(system_prompt, history, query, self.config.model.history_limit);
        let timeout = self.config.model.timeout();
        match tokio::time::timeout(timeout, model.complete(&messages)).await {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout(timeout)),
        }
    }

    /// Signposting + disclaimer, then the log-only policy check.
    fn finish_answer(&self, text: &str, assessment: &SafetyAssessment, jurisdiction: Jurisdiction) -> String {
        let answer = wrap_answer(text, assessment, jurisdiction);
        let validation = validate_answer(&answer);
        if !validation.is_safe() || !validation.warnings.is_empty() {
            warn!(
                target: "neurobreath::safety",
                errors = ?validation.errors,
                warnings = ?validation.warnings,
                "answer failed safety validation"
            );
        }
        answer
    }

    fn routing_debug(&self, routing: &RoutingDecision) -> Option<String> {
        self.config.is_development().then(|| routing.debug_line())
    }
}

fn escalation_payload(
    assessment: &SafetyAssessment,
    jurisdiction: Jurisdiction,
    recommended_actions: Vec<actions::RecommendedAction>,
) -> ResponsePayload {
    ResponsePayload {
        answer: emergency_response(assessment.level, jurisdiction),
        recommended_actions,
        safety: Some(SafetyMeta::from(assessment)),
        ..Default::default()
    }
}

/// System prompt, the last `limit` non-system history turns, then the sanitized query.
/// A trailing history turn that already carries the query is not repeated.
pub fn build_messages(system_prompt: String, history: &[ChatMessage], query: &str, limit: usize) -> Vec<ChatMessage> {
    let mut turns: Vec<&ChatMessage> = history.iter().filter(|m| m.role != MessageRole::System).collect();
    if turns
        .last()
        .is_some_and(|m| m.role == MessageRole::User && sanitize_input(&m.content) == query)
    {
        turns.pop();
    }
    let skip = turns.len().saturating_sub(limit);

    let mut messages = Vec::with_capacity(turns.len() - skip + 2);
    messages.push(ChatMessage::new(MessageRole::System, system_prompt));
    messages.extend(turns.into_iter().skip(skip).cloned());
    messages.push(ChatMessage::new(MessageRole::User, query));
    messages
}

/// Search term for evidence lookups: drops a leading "what is" and trailing question marks.
pub fn topic_guess(question: &str) -> String {
    let stripped = WHAT_IS.replace(question, "");
    let stripped = TRAILING_QUESTION.replace(stripped.trim_end(), "");
    stripped.chars().take(TOPIC_GUESS_CHARS).collect::<String>().trim().to_string()
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", head.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: MessageRole, content: &str) -> ChatMessage {
        ChatMessage::new(role, content)
    }

    #[test]
    fn history_is_trimmed_and_system_turns_dropped() {
        let history = vec![
            msg(MessageRole::System, "old system"),
            msg(MessageRole::User, "one"),
            msg(MessageRole::Assistant, "two"),
            msg(MessageRole::User, "three"),
        ];
        let out = build_messages("sys".into(), &history, "four", 2);
        let contents: Vec<&str> = out.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["sys", "two", "three", "four"]);
        assert_eq!(out.iter().filter(|m| m.role == MessageRole::System).count(), 1);
    }

    #[test]
    fn trailing_copy_of_query_is_not_repeated() {
        let history = vec![msg(MessageRole::Assistant, "hi"), msg(MessageRole::User, "sleep tips")];
        let out = build_messages("sys".into(), &history, "sleep tips", 12);
        assert_eq!(out.len(), 3);
        assert_eq!(out[2].content, "sleep tips");
    }

    #[test]
    fn topic_guess_strips_question_framing() {
        assert_eq!(topic_guess("What is dyslexia??"), "dyslexia");
        assert_eq!(topic_guess("box breathing"), "box breathing");
        assert_eq!(topic_guess(&"a".repeat(300)).len(), TOPIC_GUESS_CHARS);
    }

    #[test]
    fn truncation_marks_the_cut() {
        assert_eq!(truncate_chars("short", 10), "short");
        let cut = truncate_chars(&"x".repeat(20), 10);
        assert_eq!(cut.chars().count(), 10);
        assert!(cut.ends_with('…'));
    }
}
