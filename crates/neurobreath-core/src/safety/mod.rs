//! Safety Gate: crisis detection, signposting and answer-level safety checks.
//!
//! | Level | Gate | Meaning |
//! |-------|------|---------|
//! | none | pass | nothing detected |
//! | urgent | pass | NHS 111 territory; answer is wrapped with signposting |
//! | crisis | pass | mental health crisis language; answer is wrapped with signposting |
//! | safeguarding | escalate | abuse / child protection; canned response only |
//! | emergency | escalate | immediate danger; canned response only |
//!
//! Escalation is terminal: the router and the model are never reached.

mod classifier;
mod policy;
mod signpost;

pub use classifier::{Classification, ClassifierError, IndicatorLists, KeywordClassifier, SafetyClassifier};
pub use policy::{validate_answer, wrap_answer, SafetyValidation, EDUCATIONAL_DISCLAIMER, MAX_ANSWER_CHARS};
pub use signpost::{crisis_line, emergency_response, signpost_for, signposting, ContactLine, CrisisSignpost};

use crate::types::Jurisdiction;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    None,
    Urgent,
    Crisis,
    Safeguarding,
    Emergency,
}

impl SafetyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyLevel::None => "none",
            SafetyLevel::Urgent => "urgent",
            SafetyLevel::Crisis => "crisis",
            SafetyLevel::Safeguarding => "safeguarding",
            SafetyLevel::Emergency => "emergency",
        }
    }

    pub fn gate_action(&self) -> GateAction {
        match self {
            SafetyLevel::Emergency | SafetyLevel::Safeguarding => GateAction::Escalate,
            _ => GateAction::Pass,
        }
    }
}

/// PASS continues the pipeline; ESCALATE returns the canned emergency text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateAction {
    Pass,
    Escalate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyAssessment {
    pub level: SafetyLevel,
    pub action: GateAction,
    pub signposting: Option<String>,
    pub matched: Vec<String>,
    /// Set when the classifier failed and the gate assumed the highest severity.
    pub fail_safe: bool,
}

impl SafetyAssessment {
    fn from_level(level: SafetyLevel, matched: Vec<String>, jurisdiction: Jurisdiction, fail_safe: bool) -> Self {
        Self {
            level,
            action: level.gate_action(),
            signposting: signposting(level, jurisdiction),
            matched,
            fail_safe,
        }
    }

    pub fn should_escalate(&self) -> bool {
        self.action == GateAction::Escalate
    }
}

/// Wraps a [`SafetyClassifier`] and turns every failure into the highest severity.
#[derive(Clone)]
pub struct SafetyGate {
    classifier: Arc<dyn SafetyClassifier>,
}

impl Default for SafetyGate {
    fn default() -> Self {
        Self::new(Arc::new(KeywordClassifier::default()))
    }
}

impl SafetyGate {
    pub fn new(classifier: Arc<dyn SafetyClassifier>) -> Self {
        Self { classifier }
    }

    /// Classify `query` and attach jurisdiction signposting.
    ///
    /// An error or a panic inside the classifier never fails open: the query is treated
    /// as an emergency.
    pub fn assess(&self, query: &str, jurisdiction: Jurisdiction) -> SafetyAssessment {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.classifier.classify(query)));
        let assessment = match outcome {
            Ok(Ok(c)) => SafetyAssessment::from_level(c.level, c.matched, jurisdiction, false),
            Ok(Err(e)) => {
                error!(target: "neurobreath::safety", error = %e, "classifier failed; escalating");
                SafetyAssessment::from_level(SafetyLevel::Emergency, Vec::new(), jurisdiction, true)
            }
            Err(_) => {
                error!(target: "neurobreath::safety", "classifier panicked; escalating");
                SafetyAssessment::from_level(SafetyLevel::Emergency, Vec::new(), jurisdiction, true)
            }
        };
        if assessment.level != SafetyLevel::None {
            info!(
                target: "neurobreath::safety",
                level = assessment.level.as_str(),
                jurisdiction = %jurisdiction,
                escalate = assessment.should_escalate(),
                "safety indicators detected"
            );
        }
        assessment
    }
}
