//! Answer-level policy: signposting wrap, educational disclaimer and the post-hoc checklist.

use super::{SafetyAssessment, SafetyLevel};
use crate::types::Jurisdiction;
use once_cell::sync::Lazy;
use regex::Regex;

pub const EDUCATIONAL_DISCLAIMER: &str = "**Important:** This information is for educational purposes only and does not constitute medical advice. Always consult a qualified healthcare professional for diagnosis and treatment.";

pub const MAX_ANSWER_CHARS: usize = 2000;

/// More than this many absolute words triggers a cautious-language warning.
const ABSOLUTE_WORD_LIMIT: usize = 3;

static OVERCONFIDENT_CLAIMS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)NHS says.*(?:guaranteed|always|never|100%)",
        r"(?i)NICE recommends.*(?:everyone|all patients)",
        r"(?i)Research proves.*(?:definitively|conclusively)",
        r"(?i)Studies show.*(?:always|never)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

static ABSOLUTE_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(will|must|always|never|guaranteed|definitely|certainly)\b").expect("static regex")
});

/// Prepends signposting for elevated levels and appends the disclaimer once.
pub fn wrap_answer(answer: &str, assessment: &SafetyAssessment, jurisdiction: Jurisdiction) -> String {
    let mut out = String::new();
    if assessment.level != SafetyLevel::None {
        let signpost = assessment
            .signposting
            .clone()
            .or_else(|| super::signposting(assessment.level, jurisdiction));
        if let Some(signpost) = signpost {
            out.push_str(&signpost);
            out.push_str("\n\n---\n\n");
        }
    }
    out.push_str(answer.trim_end());
    if !answer.contains(EDUCATIONAL_DISCLAIMER) {
        out.push_str("\n\n---\n\n");
        out.push_str(EDUCATIONAL_DISCLAIMER);
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafetyValidation {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl SafetyValidation {
    pub fn is_safe(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks the final answer against the evidence policy. The caller logs the outcome;
/// nothing here blocks a response.
pub fn validate_answer(answer: &str) -> SafetyValidation {
    let mut v = SafetyValidation::default();

    let len = answer.chars().count();
    if len > MAX_ANSWER_CHARS {
        v.warnings
            .push(format!("answer exceeds max length ({} > {} chars)", len, MAX_ANSWER_CHARS));
    }

    let has_disclaimer = answer.contains("educational purposes")
        || answer.contains("not medical advice")
        || answer.contains("consult a healthcare professional");
    if !has_disclaimer {
        v.errors.push("missing educational disclaimer".to_string());
    }

    for pattern in OVERCONFIDENT_CLAIMS.iter() {
        if pattern.is_match(answer) {
            v.warnings
                .push(format!("potentially overconfident claim: {}", pattern.as_str()));
        }
    }

    if ABSOLUTE_WORDS.find_iter(answer).count() > ABSOLUTE_WORD_LIMIT {
        v.warnings.push(
            "consider more cautious language (\"may\", \"can\", \"some people\")".to_string(),
        );
    }

    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::SafetyGate;

    #[test]
    fn wrap_adds_disclaimer_once() {
        let a = SafetyGate::default().assess("breathing tips", Jurisdiction::Uk);
        let once = wrap_answer("Try box breathing.", &a, Jurisdiction::Uk);
        assert!(once.ends_with(EDUCATIONAL_DISCLAIMER));
        let twice = wrap_answer(&once, &a, Jurisdiction::Uk);
        assert_eq!(twice.matches(EDUCATIONAL_DISCLAIMER).count(), 1);
    }

    #[test]
    fn wrap_prepends_signposting_for_crisis() {
        let a = SafetyGate::default().assess("everything feels hopeless", Jurisdiction::Us);
        let wrapped = wrap_answer("Here are some ideas.", &a, Jurisdiction::Us);
        assert!(wrapped.starts_with("🚨"));
        assert!(wrapped.contains("988"));
    }

    #[test]
    fn wrapped_answer_validates() {
        let a = SafetyGate::default().assess("sleep", Jurisdiction::Uk);
        let v = validate_answer(&wrap_answer("Sleep routines may help.", &a, Jurisdiction::Uk));
        assert!(v.is_safe());
        assert!(v.warnings.is_empty());
    }

    #[test]
    fn flags_missing_disclaimer_and_absolutes() {
        let v = validate_answer(
            "This will always work. You must never stop. It is guaranteed and definitely certain.",
        );
        assert!(!v.is_safe());
        assert!(v.warnings.iter().any(|w| w.contains("cautious")));
    }

    #[test]
    fn flags_overconfident_claims() {
        let v = validate_answer("NHS says this is guaranteed. Not medical advice.");
        assert!(v.is_safe());
        assert!(v.warnings.iter().any(|w| w.contains("overconfident")));
    }
}
