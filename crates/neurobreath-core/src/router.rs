//! Query Router: keyword heuristics that pick an intent bucket, a topic and whether the
//! external model is needed.

use crate::types::{AssistantRole, Jurisdiction};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Navigation,
    ToolHelp,
    HealthEvidence,
    GeneralInfo,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Navigation => "navigation",
            QueryType::ToolHelp => "tool_help",
            QueryType::HealthEvidence => "health_evidence",
            QueryType::GeneralInfo => "general_info",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Adhd,
    Autism,
    Dyslexia,
    Anxiety,
    Depression,
    Breathing,
    Sleep,
    Bipolar,
    Stress,
    Burnout,
    Safeguarding,
    General,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Adhd => "adhd",
            Topic::Autism => "autism",
            Topic::Dyslexia => "dyslexia",
            Topic::Anxiety => "anxiety",
            Topic::Depression => "depression",
            Topic::Breathing => "breathing",
            Topic::Sleep => "sleep",
            Topic::Bipolar => "bipolar",
            Topic::Stress => "stress",
            Topic::Burnout => "burnout",
            Topic::Safeguarding => "safeguarding",
            Topic::General => "general",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteContext<'a> {
    pub page_path: Option<&'a str>,
    pub jurisdiction: Jurisdiction,
    pub role: AssistantRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoutingDecision {
    pub query_type: QueryType,
    pub topic: Topic,
    pub priority: Priority,
    pub needs_model: bool,
}

impl RoutingDecision {
    /// `Type: … | Topic: … | Priority: …`, returned to clients in development only.
    pub fn debug_line(&self) -> String {
        format!(
            "Type: {} | Topic: {} | Priority: {}",
            self.query_type.as_str(),
            self.topic.as_str(),
            self.priority.as_str()
        )
    }
}

// Patterns match on word boundaries. A trailing `*` also accepts any word ending
// ("diagnos*" matches "diagnosis" and "diagnosed").
const NAVIGATION_PATTERNS: &[&str] = &[
    "take me to",
    "how do i go to",
    "can i go to",
    "go to the page",
    "go to the section",
    "get to",
    "where is",
    "where are",
    "where can i find",
    "navigate",
    "show me",
    "find the",
    "open the",
    "jump to",
    "which page",
    "link to",
];

const TOOL_HELP_PATTERNS: &[&str] = &[
    "how do i use",
    "how does the",
    "how to use",
    "how do i start",
    "start the",
    "use the",
    "timer*",
    "button*",
    "settings",
    "not working",
    "doesn't work",
    "download*",
    "print",
    "printable",
    "save my progress",
    "tour",
];

const HEALTH_PATTERNS: &[&str] = &[
    "what works",
    "evidence",
    "research*",
    "studies",
    "symptom*",
    "treatment*",
    "therap*",
    "medication*",
    "diagnos*",
    "assessment*",
    "strategies",
    "help with",
    "cope with",
    "manag*",
    "low mood",
    "is it normal",
    "signs of",
    "causes",
];

/// Keyword → topic, checked in order; earlier rows win.
const TOPIC_KEYWORDS: &[(&str, Topic)] = &[
    ("adhd", Topic::Adhd),
    ("attention deficit", Topic::Adhd),
    ("autis*", Topic::Autism),
    ("dyslexi*", Topic::Dyslexia),
    ("bipolar", Topic::Bipolar),
    ("burnout", Topic::Burnout),
    ("burn out", Topic::Burnout),
    ("anxi*", Topic::Anxiety),
    ("panic*", Topic::Anxiety),
    ("worr*", Topic::Anxiety),
    ("depress*", Topic::Depression),
    ("low mood", Topic::Depression),
    ("sad", Topic::Depression),
    ("sadness", Topic::Depression),
    ("sleep*", Topic::Sleep),
    ("insomnia", Topic::Sleep),
    ("breath*", Topic::Breathing),
    ("stress*", Topic::Stress),
    ("safeguard*", Topic::Safeguarding),
];

fn pattern_source(pattern: &str) -> String {
    match pattern.strip_suffix('*') {
        Some(prefix) => format!(r"\b{}\w*", regex::escape(prefix)),
        None => format!(r"\b{}\b", regex::escape(pattern)),
    }
}

fn pattern_set(patterns: &[&str]) -> Regex {
    let alternation: Vec<String> = patterns.iter().map(|p| pattern_source(p)).collect();
    Regex::new(&alternation.join("|")).expect("static regex")
}

static NAVIGATION: Lazy<Regex> = Lazy::new(|| pattern_set(NAVIGATION_PATTERNS));
static TOOL_HELP: Lazy<Regex> = Lazy::new(|| pattern_set(TOOL_HELP_PATTERNS));
static HEALTH: Lazy<Regex> = Lazy::new(|| pattern_set(HEALTH_PATTERNS));
static TOPICS: Lazy<Vec<(Regex, Topic)>> = Lazy::new(|| {
    TOPIC_KEYWORDS
        .iter()
        .map(|(kw, topic)| (Regex::new(&pattern_source(kw)).expect("static regex"), *topic))
        .collect()
});

fn topic_from(text: &str) -> Option<Topic> {
    TOPICS
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, topic)| *topic)
}

/// Classify a (non-emergency) query. Never fails: unmatched queries land in the
/// `general_info` bucket with `low` priority.
pub fn route(query: &str, ctx: &RouteContext<'_>) -> RoutingDecision {
    let lower = query.to_lowercase();

    let query_type = if NAVIGATION.is_match(&lower) || lower.trim_start().starts_with("go to ") {
        QueryType::Navigation
    } else if TOOL_HELP.is_match(&lower) {
        QueryType::ToolHelp
    } else if HEALTH.is_match(&lower) || topic_from(&lower).is_some() {
        QueryType::HealthEvidence
    } else {
        QueryType::GeneralInfo
    };

    let topic = topic_from(&lower)
        .or_else(|| ctx.page_path.and_then(|p| topic_from(&p.to_lowercase())))
        .unwrap_or(Topic::General);

    let priority = match query_type {
        QueryType::HealthEvidence => Priority::High,
        QueryType::Navigation | QueryType::ToolHelp => Priority::Normal,
        QueryType::GeneralInfo => Priority::Low,
    };

    RoutingDecision {
        query_type,
        topic,
        priority,
        needs_model: needs_model(query_type),
    }
}

/// Navigation and tool help are answered from page context; everything else wants the model.
pub fn needs_model(query_type: QueryType) -> bool {
    matches!(query_type, QueryType::HealthEvidence | QueryType::GeneralInfo)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(q: &str) -> RoutingDecision {
        route(q, &RouteContext::default())
    }

    #[test]
    fn navigation_questions_skip_the_model() {
        let d = r("how do I get to the breathing tools");
        assert_eq!(d.query_type, QueryType::Navigation);
        assert_eq!(d.topic, Topic::Breathing);
        assert!(!d.needs_model);
        assert_eq!(d.priority, Priority::Normal);
    }

    #[test]
    fn tool_help_skips_the_model() {
        let d = r("how do I use the focus timer?");
        assert_eq!(d.query_type, QueryType::ToolHelp);
        assert!(!d.needs_model);
    }

    #[test]
    fn health_questions_need_the_model() {
        let d = r("what works for low mood");
        assert_eq!(d.query_type, QueryType::HealthEvidence);
        assert_eq!(d.topic, Topic::Depression);
        assert_eq!(d.priority, Priority::High);
        assert!(d.needs_model);
    }

    #[test]
    fn bare_topic_mention_counts_as_health() {
        assert_eq!(r("tell me about autism").query_type, QueryType::HealthEvidence);
    }

    #[test]
    fn unmatched_query_defaults_to_general_info() {
        let d = r("hello there");
        assert_eq!(d.query_type, QueryType::GeneralInfo);
        assert_eq!(d.topic, Topic::General);
        assert_eq!(d.priority, Priority::Low);
        assert!(d.needs_model);
    }

    #[test]
    fn patterns_match_whole_words_only() {
        assert_eq!(r("tips for a study sprint").query_type, QueryType::GeneralInfo);
        assert_eq!(r("is a detour ever worth it").query_type, QueryType::GeneralInfo);
        assert_eq!(r("can I print my chart").query_type, QueryType::ToolHelp);
        assert_eq!(r("start a tour").query_type, QueryType::ToolHelp);

        let d = r("I go to therapy, what works for anxiety");
        assert_eq!(d.query_type, QueryType::HealthEvidence);
        assert_eq!(d.topic, Topic::Anxiety);
        assert!(d.needs_model);

        assert_eq!(r("go to the adhd hub").query_type, QueryType::Navigation);
        assert_eq!(r("my crusade against clutter").topic, Topic::General);
        assert_eq!(r("feeling sad lately").topic, Topic::Depression);
    }

    #[test]
    fn prefix_patterns_accept_word_endings() {
        assert_eq!(r("was I diagnosed correctly").query_type, QueryType::HealthEvidence);
        assert_eq!(r("I feel worried all day").topic, Topic::Anxiety);
        assert_eq!(r("sleepless nights").topic, Topic::Sleep);
    }

    #[test]
    fn topic_falls_back_to_page_path() {
        let ctx = RouteContext {
            page_path: Some("/conditions/adhd"),
            ..Default::default()
        };
        assert_eq!(route("what should I try first?", &ctx).topic, Topic::Adhd);
    }

    #[test]
    fn debug_line_format() {
        assert_eq!(
            r("what works for low mood").debug_line(),
            "Type: health_evidence | Topic: depression | Priority: high"
        );
    }
}
